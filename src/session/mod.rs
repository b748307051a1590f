pub mod artifacts;
pub mod controller;
pub mod lifecycle;
pub mod sink;
pub mod state;

pub use artifacts::{ArtifactSink, FsArtifactSink};
pub use controller::{SessionController, SessionStart};
pub use lifecycle::SessionLifecycle;
pub use sink::SessionWarningSink;
pub use state::SessionEvent;
