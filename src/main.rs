// Demo binary: runs one Free Fly session against a scripted wall-approach
// scenario. Frames are paced at the configured video rate; RC commands and
// debug records are drained and logged the way a transport/UI layer would.

use anyhow::Result;
use freefly::scenario;
use freefly::session;
use freefly::types::{Config, TelemetrySample};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    info!("🚁 free fly demo starting (config: {})", config_path);

    let (frame_tx, frame_rx) = watch::channel(None);
    let (telemetry_tx, telemetry_rx) = watch::channel(TelemetrySample::default());
    let (mode_tx, mode_rx) = watch::channel(true);
    let (rc_tx, mut rc_rx) = mpsc::channel::<freefly::RcCommand>(config.output.channel_capacity);
    let (debug_tx, mut debug_rx) =
        mpsc::channel::<freefly::DebugRecord>(config.output.channel_capacity);

    // Scripted camera + telemetry source, paced at the video rate.
    let fps = config.video.fps;
    let (w, h) = (config.video.width, config.video.height);
    let feeder = tokio::spawn(async move {
        let period = Duration::from_millis(1000 / fps.max(1) as u64);
        for tick in scenario::wall_approach(w, h, fps) {
            let _ = telemetry_tx.send(tick.telemetry);
            let _ = frame_tx.send(tick.frame);
            tokio::time::sleep(period).await;
        }
        let _ = mode_tx.send(false);
        // Keep the channels alive until the session drains the last tick.
        tokio::time::sleep(period).await;
        (frame_tx, telemetry_tx, mode_tx)
    });

    // Stand-ins for the flight transport and the UI.
    let rc_sink = tokio::spawn(async move {
        let mut count = 0u64;
        while let Some(cmd) = rc_rx.recv().await {
            debug!(
                "rc lr={} fb={} ud={} yw={}",
                cmd.left_right, cmd.forward_back, cmd.up_down, cmd.yaw
            );
            count += 1;
        }
        count
    });
    let ui_sink = tokio::spawn(async move {
        while let Some(record) = debug_rx.recv().await {
            debug!(
                "ui mode={} edge={:.1} lapVar={:.1} looming={} tof={:?}",
                record.mode, record.edge_density, record.lap_var, record.looming, record.tof_cm
            );
        }
    });

    let report = session::run(&config, frame_rx, telemetry_rx, mode_rx, rc_tx, debug_tx).await?;

    let _ = feeder.await;
    let commands = rc_sink.await?;
    ui_sink.await?;

    info!(
        "session report: end={} ticks={} evades={} stale={} commands_delivered={}",
        report.end.as_str(),
        report.ticks,
        report.evades,
        report.stale_ticks,
        commands
    );

    Ok(())
}
