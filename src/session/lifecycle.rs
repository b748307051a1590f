use chrono::Utc;
use log::info;
use uuid::Uuid;

use crate::db::Database;
use crate::error::SessionError;
use crate::models::{Session, SessionStatus, SessionSummary, Warning, WarningReason};

use super::state::SessionEvent;

/// Session state machine backed by the database. Every mutation is checked
/// and applied inside one transaction on the database thread.
#[derive(Clone)]
pub struct SessionLifecycle {
    db: Database,
}

impl SessionLifecycle {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn start(&self, subject_id: &str) -> Result<Session, SessionError> {
        let subject_id = subject_id.trim();
        if subject_id.is_empty() {
            return Err(SessionError::InvalidArgument("subject id must not be empty".into()));
        }

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            subject_id: subject_id.to_string(),
            started_at: now,
            ended_at: None,
            status: SessionStatus::Active,
            warnings: Vec::new(),
            artifact_url: None,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_active_session(&session).await?;
        info!("session {} started for subject {}", session.id, session.subject_id);
        Ok(session)
    }

    /// Appends a warning to an active session. Returns the new warning count.
    pub async fn record_warning(
        &self,
        session_id: &str,
        offset_ms: u64,
        reason: WarningReason,
    ) -> Result<usize, SessionError> {
        let count = self
            .db
            .append_warning(session_id, Warning { offset_ms, reason })
            .await?;
        Ok(count)
    }

    pub async fn end(&self, session_id: &str) -> Result<SessionSummary, SessionError> {
        let session = self
            .db
            .close_session(session_id, SessionEvent::End, Utc::now())
            .await?;
        let summary = SessionSummary::from(session);
        info!(
            "session {} completed after {}ms with {} warnings",
            summary.id,
            summary.duration_ms.unwrap_or(0),
            summary.warning_count
        );
        Ok(summary)
    }

    pub async fn cancel(&self, session_id: &str) -> Result<SessionSummary, SessionError> {
        let session = self
            .db
            .close_session(session_id, SessionEvent::Cancel, Utc::now())
            .await?;
        info!("session {} cancelled", session.id);
        Ok(session.into())
    }

    /// Stores the recorded-media reference. An active session is completed
    /// by this; a completed one just gains the reference.
    pub async fn attach_artifact(
        &self,
        session_id: &str,
        artifact_url: &str,
    ) -> Result<Session, SessionError> {
        if artifact_url.trim().is_empty() {
            return Err(SessionError::InvalidArgument("artifact url must not be empty".into()));
        }
        let session = self
            .db
            .attach_artifact(session_id, artifact_url, Utc::now())
            .await?;
        info!("artifact attached to session {}", session.id);
        Ok(session)
    }

    pub async fn get(&self, session_id: &str) -> Result<Session, SessionError> {
        self.db
            .get_session(session_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    pub async fn list_for_subject(&self, subject_id: &str) -> Result<Vec<SessionSummary>, SessionError> {
        let sessions = self.db.list_sessions_for_subject(subject_id).await?;
        Ok(sessions.into_iter().map(SessionSummary::from).collect())
    }

    /// Cancels sessions left active by a previous process. Run once at
    /// startup, before any new session can begin.
    pub async fn recover_abandoned(&self) -> Result<Vec<String>, SessionError> {
        let cancelled = self.db.cancel_active_sessions(Utc::now()).await?;
        for id in &cancelled {
            info!("cancelled abandoned session {id}");
        }
        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lifecycle() -> (TempDir, SessionLifecycle) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("sessions.db")).unwrap();
        (dir, SessionLifecycle::new(db))
    }

    #[tokio::test]
    async fn second_start_for_same_subject_conflicts_until_ended() {
        let (_dir, sessions) = lifecycle();
        let first = sessions.start("alice").await.unwrap();

        let err = sessions.start("alice").await.unwrap_err();
        assert!(matches!(err, SessionError::Conflict { ref session_id, .. } if *session_id == first.id));

        // Other subjects are independent.
        sessions.start("bob").await.unwrap();

        sessions.end(&first.id).await.unwrap();
        let second = sessions.start("alice").await.unwrap();
        assert_ne!(second.id, first.id);
    }

    #[tokio::test]
    async fn end_reports_duration_and_warning_count() {
        let (_dir, sessions) = lifecycle();
        let session = sessions.start("alice").await.unwrap();

        assert_eq!(
            sessions.record_warning(&session.id, 1_200, WarningReason::NoFace).await.unwrap(),
            1
        );
        assert_eq!(
            sessions.record_warning(&session.id, 4_500, WarningReason::LookingAway).await.unwrap(),
            2
        );

        let summary = sessions.end(&session.id).await.unwrap();
        assert_eq!(summary.status, SessionStatus::Completed);
        assert_eq!(summary.warning_count, 2);
        assert!(summary.duration_ms.is_some());

        let stored = sessions.get(&session.id).await.unwrap();
        assert_eq!(
            stored.warnings,
            vec![
                Warning { offset_ms: 1_200, reason: WarningReason::NoFace },
                Warning { offset_ms: 4_500, reason: WarningReason::LookingAway },
            ]
        );
    }

    #[tokio::test]
    async fn completed_sessions_reject_warnings_and_second_end() {
        let (_dir, sessions) = lifecycle();
        let session = sessions.start("alice").await.unwrap();
        sessions.record_warning(&session.id, 10, WarningReason::NoFace).await.unwrap();
        sessions.end(&session.id).await.unwrap();

        let err = sessions
            .record_warning(&session.id, 20, WarningReason::NoFace)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidState { .. }));
        assert!(matches!(
            sessions.end(&session.id).await.unwrap_err(),
            SessionError::InvalidState { .. }
        ));
        assert!(matches!(
            sessions.cancel(&session.id).await.unwrap_err(),
            SessionError::InvalidState { .. }
        ));

        assert_eq!(sessions.get(&session.id).await.unwrap().warnings.len(), 1);
    }

    #[tokio::test]
    async fn unknown_sessions_are_not_found() {
        let (_dir, sessions) = lifecycle();
        assert!(matches!(
            sessions.end("missing").await.unwrap_err(),
            SessionError::NotFound(_)
        ));
        assert!(matches!(
            sessions.record_warning("missing", 0, WarningReason::NoFace).await.unwrap_err(),
            SessionError::NotFound(_)
        ));
        assert!(matches!(sessions.get("missing").await.unwrap_err(), SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn artifact_completes_active_session_but_not_cancelled_one() {
        let (_dir, sessions) = lifecycle();
        let session = sessions.start("alice").await.unwrap();

        let updated = sessions.attach_artifact(&session.id, "/uploads/a.webm").await.unwrap();
        assert_eq!(updated.status, SessionStatus::Completed);
        assert!(updated.ended_at.is_some());
        assert_eq!(updated.artifact_url.as_deref(), Some("/uploads/a.webm"));

        // Upload after end is fine.
        let ended = sessions.start("alice").await.unwrap();
        sessions.end(&ended.id).await.unwrap();
        sessions.attach_artifact(&ended.id, "/uploads/b.webm").await.unwrap();

        let cancelled = sessions.start("alice").await.unwrap();
        sessions.cancel(&cancelled.id).await.unwrap();
        assert!(matches!(
            sessions.attach_artifact(&cancelled.id, "/uploads/c.webm").await.unwrap_err(),
            SessionError::InvalidState { .. }
        ));
    }

    #[tokio::test]
    async fn abandoned_sessions_are_cancelled_on_recovery() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");
        let abandoned = {
            let sessions = SessionLifecycle::new(Database::new(path.clone()).unwrap());
            sessions.start("alice").await.unwrap()
        };

        let sessions = SessionLifecycle::new(Database::new(path).unwrap());
        assert_eq!(sessions.recover_abandoned().await.unwrap(), vec![abandoned.id.clone()]);
        assert_eq!(
            sessions.get(&abandoned.id).await.unwrap().status,
            SessionStatus::Cancelled
        );
        sessions.start("alice").await.unwrap();
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let (_dir, sessions) = lifecycle();
        let first = sessions.start("alice").await.unwrap();
        sessions.end(&first.id).await.unwrap();
        let second = sessions.start("alice").await.unwrap();

        let listed = sessions.list_for_subject("alice").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert!(sessions.list_for_subject("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_subject_is_rejected() {
        let (_dir, sessions) = lifecycle();
        assert!(matches!(
            sessions.start("  ").await.unwrap_err(),
            SessionError::InvalidArgument(_)
        ));
    }
}
