// One Free Fly session: the frame-driven control loop. Inputs arrive on
// watch channels (latest-value snapshots; the loop never blocks a producer),
// outputs leave on bounded mpsc channels. Every tick emits exactly one RC
// command and one debug record, degraded sensing included.

use crate::classifier::classify;
use crate::command::CommandGenerator;
use crate::debug::{DebugEmitter, DebugRecord};
use crate::error::{SensingError, SessionEnd};
use crate::frame_analysis::FrameAnalyzer;
use crate::navigation::{NavDecision, Navigator};
use crate::types::{
    Config, Frame, FrameFeatures, NavState, RcCommand, TelemetrySample, MAX_STALE_TICKS,
};
use anyhow::Result;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub ticks: u64,
    pub evades: u64,
    pub stale_ticks: u64,
    pub end: SessionEnd,
}

pub async fn run(
    config: &Config,
    mut frame_rx: watch::Receiver<Option<Frame>>,
    telemetry_rx: watch::Receiver<TelemetrySample>,
    mut mode_rx: watch::Receiver<bool>,
    rc_tx: mpsc::Sender<RcCommand>,
    debug_tx: mpsc::Sender<DebugRecord>,
) -> Result<SessionReport> {
    let params = config.freefly;
    let stall_timeout = Duration::from_millis(config.video.stall_timeout_ms);
    let frame_dt = 1.0 / config.video.fps as f64;

    let mut analyzer = FrameAnalyzer::new();
    let mut navigator = Navigator::new(params);
    let generator = CommandGenerator::new(params, config.safety.clone());
    let mut emitter = DebugEmitter::new(debug_tx, config.output.debug_jsonl.as_deref());

    let mut last_features = FrameFeatures::default();
    let mut stale_streak: u32 = 0;
    let mut last_ts: f64 = 0.0;
    let mut report = SessionReport {
        ticks: 0,
        evades: 0,
        stale_ticks: 0,
        end: SessionEnd::ModeExit,
    };

    info!("🚁 free fly session started");

    let end = loop {
        if !*mode_rx.borrow() {
            break SessionEnd::ModeExit;
        }

        tokio::select! {
            changed = frame_rx.changed() => {
                if changed.is_err() {
                    break SessionEnd::InputsClosed;
                }
            }
            changed = mode_rx.changed() => {
                if changed.is_err() {
                    break SessionEnd::InputsClosed;
                }
                // Re-check the mode flag at the top of the loop.
                continue;
            }
            _ = tokio::time::sleep(stall_timeout) => {
                warn!("no frame for {:?}, aborting session", stall_timeout);
                break SessionEnd::VideoStall;
            }
        }

        let frame = frame_rx.borrow_and_update().clone();
        let telemetry = *telemetry_rx.borrow();

        if telemetry.battery <= config.safety.battery_critical {
            warn!("battery critical ({}%), ending session", telemetry.battery);
            break SessionEnd::CriticalBattery;
        }

        // Analyze the frame if one arrived; otherwise this is a dropout tick.
        let analysis = match &frame {
            Some(f) => {
                last_ts = f.timestamp_s;
                analyzer.analyze(f)
            }
            None => Err(SensingError::AnalysisFailed("no frame this tick".into())),
        };

        let (features, stale) = match analysis {
            Ok(f) => {
                stale_streak = 0;
                last_features = f;
                (f, false)
            }
            Err(e) => {
                stale_streak += 1;
                report.stale_ticks += 1;
                last_ts += frame_dt;
                debug!("tick {} degraded: {}", report.ticks, e);
                (last_features, true)
            }
        };
        let now_s = last_ts;

        let hazard = classify(&features, telemetry.tof_cm, stale, &params);

        let was_evading = navigator.state() == NavState::Evade;
        let decision = if stale_streak >= MAX_STALE_TICKS {
            // Sensing has been out long enough that the classifier's Caution
            // floor is no longer conservative enough.
            warn!("sensing degraded for {} ticks, forcing evade", stale_streak);
            navigator.force_evade(now_s);
            NavDecision {
                state: navigator.state(),
                hazard,
                nudge: None,
            }
        } else {
            navigator.step(hazard, &features, now_s)
        };
        if !was_evading && decision.state == NavState::Evade {
            report.evades += 1;
        }

        let command = generator.generate(&decision, &telemetry);
        if rc_tx.try_send(command).is_err() {
            warn!("rc channel saturated, command dropped");
        }
        emitter.emit(DebugRecord::build(
            decision.state,
            &features,
            &telemetry,
            &params,
        ));

        report.ticks += 1;
    };

    // A hold command is the last thing on the wire, normal exit or fault.
    if rc_tx.try_send(RcCommand::hold()).is_err() {
        warn!("rc channel closed before hold command");
    }

    report.end = end;
    info!(
        "free fly session ended ({}): {} ticks, {} evades, {} stale",
        end.as_str(),
        report.ticks,
        report.evades,
        report.stale_ticks
    );
    if emitter.dropped() > 0 {
        warn!("{} debug records were dropped", emitter.dropped());
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario;

    struct Channels {
        frame_tx: watch::Sender<Option<Frame>>,
        telemetry_tx: watch::Sender<TelemetrySample>,
        mode_tx: watch::Sender<bool>,
        rc_rx: mpsc::Receiver<RcCommand>,
        debug_rx: mpsc::Receiver<DebugRecord>,
    }

    fn wire(config: &Config) -> (Channels, impl std::future::Future<Output = Result<SessionReport>>) {
        let (frame_tx, frame_rx) = watch::channel(None);
        let (telemetry_tx, telemetry_rx) = watch::channel(TelemetrySample {
            tof_cm: Some(300.0),
            ..TelemetrySample::default()
        });
        let (mode_tx, mode_rx) = watch::channel(true);
        let (rc_tx, rc_rx) = mpsc::channel(config.output.channel_capacity);
        let (debug_tx, debug_rx) = mpsc::channel(config.output.channel_capacity);

        let config = config.clone();
        let fut = async move {
            run(&config, frame_rx, telemetry_rx, mode_rx, rc_tx, debug_tx).await
        };
        (
            Channels {
                frame_tx,
                telemetry_tx,
                mode_tx,
                rc_rx,
                debug_rx,
            },
            fut,
        )
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.video.width = 64;
        config.video.height = 64;
        config.video.stall_timeout_ms = 200;
        config
    }

    #[tokio::test]
    async fn video_stall_ends_session_with_hold() {
        let config = test_config();
        let (mut ch, fut) = wire(&config);
        let report = fut.await.unwrap();
        assert_eq!(report.end, SessionEnd::VideoStall);
        assert_eq!(report.ticks, 0);
        // The fault path still parks the drone.
        assert_eq!(ch.rc_rx.recv().await, Some(RcCommand::hold()));
        drop(ch.frame_tx);
        drop(ch.telemetry_tx);
        drop(ch.mode_tx);
    }

    #[tokio::test]
    async fn mode_exit_ends_session() {
        let config = test_config();
        let (ch, fut) = wire(&config);
        let handle = tokio::spawn(fut);
        ch.mode_tx.send(false).unwrap();
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.end, SessionEnd::ModeExit);
        assert!(!report.end.is_fault());
    }

    #[tokio::test]
    async fn each_frame_produces_one_command_and_one_record() {
        let config = test_config();
        let (mut ch, fut) = wire(&config);
        let handle = tokio::spawn(fut);

        for tick in scenario::clear_corridor(64, 64, 30, 6) {
            ch.telemetry_tx.send(tick.telemetry).unwrap();
            ch.frame_tx.send(tick.frame).unwrap();
            let cmd = ch.rc_rx.recv().await.unwrap();
            assert!((-100..=100).contains(&cmd.forward_back));
            let record = ch.debug_rx.recv().await.unwrap();
            assert!(record.tof_cm.is_some());
        }

        ch.mode_tx.send(false).unwrap();
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.ticks, 6);
        assert_eq!(report.end, SessionEnd::ModeExit);
    }

    #[tokio::test]
    async fn critical_battery_ends_session() {
        let config = test_config();
        let (mut ch, fut) = wire(&config);
        let handle = tokio::spawn(fut);

        ch.telemetry_tx
            .send(TelemetrySample {
                tof_cm: Some(300.0),
                battery: 10,
                ..TelemetrySample::default()
            })
            .unwrap();
        ch.frame_tx
            .send(Some(scenario::flat_frame(64, 64, 0.0)))
            .unwrap();

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.end, SessionEnd::CriticalBattery);
        assert_eq!(ch.rc_rx.recv().await, Some(RcCommand::hold()));
    }

    #[tokio::test]
    async fn prolonged_dropout_forces_evade_until_sensing_resumes() {
        let config = test_config();
        let (mut ch, fut) = wire(&config);
        let handle = tokio::spawn(fut);

        let mut modes = Vec::new();
        for tick in scenario::sensor_dropout(64, 64, 30, MAX_STALE_TICKS) {
            ch.telemetry_tx.send(tick.telemetry).unwrap();
            ch.frame_tx.send(tick.frame).unwrap();
            ch.rc_rx.recv().await.unwrap();
            modes.push(ch.debug_rx.recv().await.unwrap().mode);
        }

        ch.mode_tx.send(false).unwrap();
        let report = handle.await.unwrap().unwrap();

        // Six clean ticks precede the gap; short dropouts ride out the
        // Move grace period, but the last gap tick crosses the
        // degraded-sensing bound and is forced into an evade posture.
        let last_gap = 6 + MAX_STALE_TICKS as usize - 1;
        assert_eq!(modes[last_gap - 1], "move");
        assert_eq!(modes[last_gap], "evade");
        // The first analyzable frame after the gap resolves the evade.
        assert_eq!(modes[last_gap + 1], "scan");
        assert_eq!(report.stale_ticks, MAX_STALE_TICKS as u64);
    }

    #[tokio::test]
    async fn frame_dropouts_count_as_stale_ticks() {
        let config = test_config();
        let (mut ch, fut) = wire(&config);
        let handle = tokio::spawn(fut);

        ch.frame_tx
            .send(Some(scenario::flat_frame(64, 64, 0.0)))
            .unwrap();
        ch.rc_rx.recv().await.unwrap();

        ch.frame_tx.send(None).unwrap();
        ch.rc_rx.recv().await.unwrap();
        let record = ch.debug_rx.recv().await.unwrap();
        // First record is the clean tick.
        assert_eq!(record.mode, "scan");

        ch.mode_tx.send(false).unwrap();
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.ticks, 2);
        assert_eq!(report.stale_ticks, 1);
    }
}
