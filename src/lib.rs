pub mod classifier;
pub mod command;
pub mod config;
pub mod debug;
pub mod error;
pub mod frame_analysis;
pub mod navigation;
pub mod scenario;
pub mod session;
pub mod types;

pub use debug::DebugRecord;
pub use error::{SensingError, SessionEnd};
pub use session::SessionReport;
pub use types::{Config, Frame, FrameFeatures, Hazard, NavState, RcCommand, TelemetrySample};
