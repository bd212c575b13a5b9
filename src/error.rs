use thiserror::Error;

/// Sensing failures inside one loop iteration. None of these abort the
/// session on their own; the session decides how to degrade.
#[derive(Debug, Error)]
pub enum SensingError {
    /// The frame buffer could not be analyzed. The caller reuses the last
    /// feature set with a stale flag.
    #[error("frame analysis failed: {0}")]
    AnalysisFailed(String),
}

/// Why a Free Fly session ended. `ModeExit` is the normal path; everything
/// else is a fault surfaced to the caller after a hold command was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Free Fly mode was switched off externally.
    ModeExit,
    /// No new frame arrived within the stall window.
    VideoStall,
    /// Battery fell to the critical threshold.
    CriticalBattery,
    /// An input channel closed; the decoder or telemetry source is gone.
    InputsClosed,
}

impl SessionEnd {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionEnd::ModeExit => "mode_exit",
            SessionEnd::VideoStall => "video_stall",
            SessionEnd::CriticalBattery => "critical_battery",
            SessionEnd::InputsClosed => "inputs_closed",
        }
    }

    /// True when the session ended on a fault rather than a normal exit.
    pub fn is_fault(&self) -> bool {
        !matches!(self, SessionEnd::ModeExit)
    }
}
