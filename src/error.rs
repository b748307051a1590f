//! Typed errors surfaced to callers.
//!
//! Plumbing (database worker, settings, adapters) stays on `anyhow`; these
//! enums are for the outcomes a caller is expected to branch on.

use thiserror::Error;

use crate::tracking::StrategyKind;

/// Errors from session lifecycle operations. The session record is left
/// unchanged whenever one of these is returned.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("subject {subject_id} already has an active session ({session_id})")]
    Conflict {
        subject_id: String,
        session_id: String,
    },

    #[error("session {0} not found")]
    NotFound(String),

    #[error("session {session_id} is {status}, expected Active")]
    InvalidState { session_id: String, status: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("session storage failed: {0:#}")]
    Storage(anyhow::Error),
}

impl From<anyhow::Error> for SessionError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<SessionError>() {
            Ok(domain) => domain,
            Err(other) => SessionError::Storage(other),
        }
    }
}

/// A strategy could not be brought up. Never fatal on its own: the cascade
/// moves on to the next strategy.
#[derive(Error, Debug)]
pub enum StrategyInitError {
    #[error("{0} provider is not available")]
    Unavailable(StrategyKind),

    #[error("no frame source available")]
    NoFrameSource,

    #[error("{strategy} provider not ready after {waited_ms}ms")]
    NotReady { strategy: StrategyKind, waited_ms: u64 },

    #[error("{strategy} initialization failed: {source:#}")]
    Failed {
        strategy: StrategyKind,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("tracking already active")]
    AlreadyTracking,

    #[error("no detection strategy could be initialized")]
    CascadeExhausted,

    #[error("frame source failed to start: {0:#}")]
    FrameSource(anyhow::Error),
}
