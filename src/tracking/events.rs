use anyhow::Result;
use serde::Serialize;

use crate::models::WarningReason;
use crate::vision::{AwayCandidate, GazeSample};

use super::StrategyKind;

/// A warning that passed the session gate and the throttler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwayEvent {
    pub session_id: String,
    pub offset_ms: u64,
    pub confidence: f32,
    pub cause: WarningReason,
    pub gaze: Option<GazeSample>,
    pub strategy: StrategyKind,
}

impl AwayEvent {
    pub fn new(
        session_id: &str,
        offset_ms: u64,
        candidate: AwayCandidate,
        strategy: StrategyKind,
    ) -> Self {
        Self {
            session_id: session_id.to_string(),
            offset_ms,
            confidence: candidate.confidence,
            cause: candidate.cause,
            gaze: candidate.gaze,
            strategy,
        }
    }
}

/// Receives every emitted warning. Called from the frame loop, so
/// implementations must return without waiting on I/O; failures are logged
/// and not retried.
pub trait WarningSink: Send + Sync {
    fn accept(&self, session_id: &str, offset_ms: u64, reason: WarningReason) -> Result<()>;
}
