pub mod cascade;
pub mod controller;
pub mod events;
mod loop_worker;
pub mod strategy;
pub mod throttle;

pub use cascade::{CascadeState, StrategyCascade};
pub use controller::{SessionBinding, TrackingController, TrackingStatus};
pub use events::{AwayEvent, WarningSink};
pub use strategy::{ActiveStrategy, StrategyKind};
pub use throttle::WarningThrottler;
