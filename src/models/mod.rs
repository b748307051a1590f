pub mod frame;
pub mod landmarks;
pub mod session;
pub mod warning;

pub use frame::Frame;
pub use landmarks::{EyeContour, EyeSide, LandmarkRole, LandmarkSet};
pub use session::{Session, SessionStatus, SessionSummary};
pub use warning::{Warning, WarningReason};
