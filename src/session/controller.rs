use std::sync::Arc;

use anyhow::Context;
use log::{error, info, warn};
use serde::Serialize;

use crate::error::SessionError;
use crate::models::{Session, SessionStatus, SessionSummary};
use crate::settings::TrackingSettings;
use crate::tracking::{SessionBinding, StrategyKind, TrackingController};
use crate::vision::Capabilities;

use super::{ArtifactSink, SessionLifecycle, SessionWarningSink};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStart {
    pub session: Session,
    /// `None` when no strategy could be bound; the session still runs.
    pub strategy: StrategyKind,
}

/// Drives one subject's session: the stored session record and the tracking
/// loop that feeds it warnings.
pub struct SessionController {
    lifecycle: SessionLifecycle,
    tracking: TrackingController,
    sink: Arc<SessionWarningSink>,
    artifacts: Arc<dyn ArtifactSink>,
    tracked: Option<Tracked>,
}

/// The session whose tracking loop is running, with its owner.
struct Tracked {
    subject_id: String,
    session_id: String,
}

impl SessionController {
    /// Must be called from inside a tokio runtime.
    pub fn new(
        lifecycle: SessionLifecycle,
        capabilities: Capabilities,
        settings: TrackingSettings,
        artifacts: Arc<dyn ArtifactSink>,
    ) -> Self {
        let sink = Arc::new(SessionWarningSink::spawn(lifecycle.clone()));
        let tracking = TrackingController::new(capabilities, settings, sink.clone());

        Self {
            lifecycle,
            tracking,
            sink,
            artifacts,
            tracked: None,
        }
    }

    pub fn lifecycle(&self) -> &SessionLifecycle {
        &self.lifecycle
    }

    pub fn tracking(&self) -> &TrackingController {
        &self.tracking
    }

    /// Starts a session and its tracking loop. A tracking failure is logged
    /// and leaves the session active with no strategy.
    pub async fn begin(&mut self, subject_id: &str) -> Result<SessionStart, SessionError> {
        if let Some(tracked) = &self.tracked {
            return Err(SessionError::Conflict {
                subject_id: tracked.subject_id.clone(),
                session_id: tracked.session_id.clone(),
            });
        }

        let session = self.lifecycle.start(subject_id).await?;

        let binding = SessionBinding {
            session_id: session.id.clone(),
            started_at: session.started_at,
        };
        let strategy = match self.tracking.start_tracking(binding).await {
            Ok(kind) => {
                self.tracked = Some(Tracked {
                    subject_id: session.subject_id.clone(),
                    session_id: session.id.clone(),
                });
                kind
            }
            Err(err) => {
                warn!("session {} running without tracking: {err}", session.id);
                StrategyKind::None
            }
        };

        Ok(SessionStart { session, strategy })
    }

    pub async fn end(&mut self, session_id: &str) -> Result<SessionSummary, SessionError> {
        self.release(session_id).await;
        self.lifecycle.end(session_id).await
    }

    pub async fn cancel(&mut self, session_id: &str) -> Result<SessionSummary, SessionError> {
        self.release(session_id).await;
        self.lifecycle.cancel(session_id).await
    }

    /// Stores a finished recording and attaches it, completing the session
    /// if it is still active.
    pub async fn deliver_artifact(
        &mut self,
        session_id: &str,
        bytes: Vec<u8>,
        extension: &str,
    ) -> Result<Session, SessionError> {
        let session = self.lifecycle.get(session_id).await?;
        if session.status == SessionStatus::Cancelled {
            return Err(SessionError::InvalidState {
                session_id: session.id,
                status: session.status.to_string(),
            });
        }

        self.release(session_id).await;

        let sink = Arc::clone(&self.artifacts);
        let id = session_id.to_string();
        let extension = extension.to_string();
        let url = tokio::task::spawn_blocking(move || sink.store(&id, &bytes, &extension))
            .await
            .context("artifact writer join failed")?
            .map_err(|err| {
                error!("artifact upload failed for session {session_id}: {err:#}");
                SessionError::Storage(err)
            })?;

        info!("artifact for session {session_id} stored at {url}");
        self.lifecycle.attach_artifact(session_id, &url).await
    }

    /// Stops tracking if `session_id` is the tracked session and waits for
    /// its queued warnings to be written.
    async fn release(&mut self, session_id: &str) {
        if self.tracked.as_ref().map(|t| t.session_id.as_str()) != Some(session_id) {
            return;
        }

        self.tracking.close_session_gate();
        self.tracking.stop_tracking();
        self.tracked = None;

        if let Err(err) = self.sink.flush().await {
            error!("failed to flush warnings for session {session_id}: {err:#}");
        }
    }
}
