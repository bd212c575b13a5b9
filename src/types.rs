use serde::{Deserialize, Serialize};

// ============================================================================
// FREE FLY TUNING PARAMETERS (per-session defaults)
// ============================================================================
pub const EDGE_LOW: f32 = 28.0;
pub const EDGE_HIGH: f32 = 42.0;
pub const EDGE_BLOCK: f32 = 55.0;
pub const FLOW_LOOMING: f32 = 2.2;
pub const FLOW_DIVERGENCE: f32 = 0.30;
pub const MOVE_FB: i32 = 14;
pub const MOVE_UD: i32 = 18;
pub const MOVE_YW: i32 = 28;
pub const NUDGE_T_S: f64 = 0.45;
pub const FORWARD_CLEAR_FRAMES: u32 = 4;
pub const TEXTURE_MIN: f32 = 25.0;

// ============================================================================
// SENSOR CUTOFFS
// ============================================================================
/// ToF readings below this force Block before vision gets a vote.
pub const TOF_BLOCK_CM: f32 = 40.0;

// ============================================================================
// RC CONTROL LIMITS
// ============================================================================
pub const RC_MIN: i32 = -100;
pub const RC_MAX: i32 = 100;

// ============================================================================
// AUTONOMOUS FLIGHT ENVELOPE
// ============================================================================
pub const ALTITUDE_MIN_CM: f32 = 60.0;
pub const ALTITUDE_MAX_CM: f32 = 120.0;
pub const BATTERY_CRITICAL: i32 = 15;

// ============================================================================
// VIDEO PACING
// ============================================================================
pub const VIDEO_FPS: u32 = 30;
pub const VIDEO_WIDTH: usize = 960;
pub const VIDEO_HEIGHT: usize = 720;
pub const VIDEO_STALL_TIMEOUT_MS: u64 = 8000;

// ============================================================================
// STATE MACHINE BEHAVIOR
// ============================================================================
/// Consecutive non-Clear ticks tolerated in Move before falling back to Scan.
pub const MOVE_GRACE_FRAMES: u32 = 10;
/// Consecutive failed analyses before the session escalates to DegradedSensing.
pub const MAX_STALE_TICKS: u32 = 8;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub freefly: FreeFlyParams,
    pub video: VideoConfig,
    pub safety: SafetyConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Free Fly thresholds and command caps. Loaded once at session start,
/// never mutated while a session is running.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FreeFlyParams {
    pub edge_low: f32,
    pub edge_high: f32,
    pub edge_block: f32,
    pub flow_looming: f32,
    pub flow_divergence: f32,
    pub move_fb: i32,
    pub move_ud: i32,
    pub move_yw: i32,
    pub nudge_t_s: f64,
    pub forward_clear_frames: u32,
    pub texture_min: f32,
    pub tof_block_cm: f32,
}

impl Default for FreeFlyParams {
    fn default() -> Self {
        Self {
            edge_low: EDGE_LOW,
            edge_high: EDGE_HIGH,
            edge_block: EDGE_BLOCK,
            flow_looming: FLOW_LOOMING,
            flow_divergence: FLOW_DIVERGENCE,
            move_fb: MOVE_FB,
            move_ud: MOVE_UD,
            move_yw: MOVE_YW,
            nudge_t_s: NUDGE_T_S,
            forward_clear_frames: FORWARD_CLEAR_FRAMES,
            texture_min: TEXTURE_MIN,
            tof_block_cm: TOF_BLOCK_CM,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    pub fps: u32,
    pub width: usize,
    pub height: usize,
    pub stall_timeout_ms: u64,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            fps: VIDEO_FPS,
            width: VIDEO_WIDTH,
            height: VIDEO_HEIGHT,
            stall_timeout_ms: VIDEO_STALL_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    pub altitude_min_cm: f32,
    pub altitude_max_cm: f32,
    pub battery_critical: i32,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            altitude_min_cm: ALTITUDE_MIN_CM,
            altitude_max_cm: ALTITUDE_MAX_CM,
            battery_critical: BATTERY_CRITICAL,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Optional JSONL sink for per-tick debug records.
    pub debug_jsonl: Option<String>,
    /// Capacity of the outbound RC / debug channels.
    pub channel_capacity: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            debug_jsonl: None,
            channel_capacity: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// One decoded video tick: a grayscale luma buffer. Owned by the iteration
/// that analyzes it and discarded afterwards.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp_s: f64,
}

/// Scalar features derived fresh from each frame. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameFeatures {
    /// Fraction of edge pixels over the full frame, in [0, 100].
    pub edge_density: f32,
    /// Variance of the Laplacian response (focus measure).
    pub texture_score: f32,
    /// Mean outward (radial) flow between consecutive frames.
    pub flow_looming: f32,
    /// Mean discrete divergence of the flow field.
    pub flow_divergence: f32,
    /// Left-minus-right edge density, in percentage points. Positive means
    /// the left half of the frame is denser.
    pub edge_balance: f32,
}

/// Latest telemetry snapshot from the drone. `tof_cm` is None when the
/// sensor returned no valid reading, never zero.
#[derive(Debug, Clone, Copy)]
pub struct TelemetrySample {
    pub tof_cm: Option<f32>,
    pub battery: i32,
    pub height_cm: f32,
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

impl Default for TelemetrySample {
    fn default() -> Self {
        Self {
            tof_cm: None,
            battery: 100,
            height_cm: 80.0,
            pitch: 0.0,
            roll: 0.0,
            yaw: 0.0,
        }
    }
}

/// Discrete hazard assessment for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hazard {
    Clear,
    Caution,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDir {
    Forward,
}

/// Navigation state. Exactly one value is active per session; transitions
/// only happen inside the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Scan,
    Move(MoveDir),
    Evade,
}

impl NavState {
    pub fn mode_str(&self) -> &'static str {
        match self {
            NavState::Scan => "scan",
            NavState::Move(_) => "move",
            NavState::Evade => "evade",
        }
    }
}

/// Bounded RC deltas sent to the flight-command transport once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RcCommand {
    pub left_right: i32,
    pub forward_back: i32,
    pub up_down: i32,
    pub yaw: i32,
}

impl RcCommand {
    /// Zero on every axis: hover in place.
    pub fn hold() -> Self {
        Self {
            left_right: 0,
            forward_back: 0,
            up_down: 0,
            yaw: 0,
        }
    }
}
