// Per-tick debug record for the UI layer. Publishing is fire-and-forget:
// a full channel or a failed file write is logged and dropped, never
// retried, so the control loop can never be back-pressured by observers.

use crate::types::{FrameFeatures, FreeFlyParams, NavState, TelemetrySample};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DebugRecord {
    pub mode: &'static str,
    pub edge_density: f32,
    pub lap_var: f32,
    pub looming: bool,
    pub divergence: f32,
    pub tof_cm: Option<f32>,
}

impl DebugRecord {
    pub fn build(
        state: NavState,
        features: &FrameFeatures,
        telemetry: &TelemetrySample,
        params: &FreeFlyParams,
    ) -> Self {
        Self {
            mode: state.mode_str(),
            edge_density: features.edge_density,
            lap_var: features.texture_score,
            looming: features.flow_looming >= params.flow_looming,
            divergence: features.flow_divergence,
            tof_cm: telemetry.tof_cm,
        }
    }
}

pub struct DebugEmitter {
    tx: mpsc::Sender<DebugRecord>,
    jsonl: Option<File>,
    dropped: u64,
}

impl DebugEmitter {
    pub fn new(tx: mpsc::Sender<DebugRecord>, jsonl_path: Option<&str>) -> Self {
        let jsonl = jsonl_path.and_then(|path| {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!("debug jsonl sink unavailable ({}): {}", path, e);
                    None
                }
            }
        });
        Self {
            tx,
            jsonl,
            dropped: 0,
        }
    }

    /// Publish one record. Never blocks; a saturated consumer loses records.
    pub fn emit(&mut self, record: DebugRecord) {
        if let Some(file) = &mut self.jsonl {
            if let Err(e) = serde_json::to_string(&record)
                .map_err(std::io::Error::other)
                .and_then(|line| writeln!(file, "{}", line))
            {
                warn!("debug jsonl write failed, disabling sink: {}", e);
                self.jsonl = None;
            }
        }

        if self.tx.try_send(record).is_err() {
            self.dropped += 1;
            if self.dropped % 100 == 1 {
                warn!("debug channel saturated, {} records dropped", self.dropped);
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
