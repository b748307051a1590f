use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime, parse_status},
};
use crate::error::SessionError;
use crate::models::{Session, SessionStatus};
use crate::session::state::{transition, SessionEvent};

use super::warnings::load_warnings;

const SESSION_COLUMNS: &str =
    "id, subject_id, started_at, ended_at, status, artifact_url, created_at, updated_at";

fn row_to_session(row: &Row) -> Result<Session> {
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let status: String = row.get("status")?;

    Ok(Session {
        id: row.get("id")?,
        subject_id: row.get("subject_id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_optional_datetime(ended_at, "ended_at")?,
        status: parse_status(&status)?,
        warnings: Vec::new(),
        artifact_url: row.get("artifact_url")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn find_session(conn: &Connection, session_id: &str) -> Result<Option<Session>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
    ))?;
    let session = stmt
        .query_row(params![session_id], |row| Ok(row_to_session(row)))
        .optional()?
        .transpose()?;

    match session {
        Some(mut session) => {
            session.warnings = load_warnings(conn, &session.id)?;
            Ok(Some(session))
        }
        None => Ok(None),
    }
}

/// Session with its warnings, or `SessionError::NotFound`.
pub(crate) fn load_session(conn: &Connection, session_id: &str) -> Result<Session> {
    find_session(conn, session_id)?
        .ok_or_else(|| SessionError::NotFound(session_id.to_string()).into())
}

fn active_session_for(conn: &Connection, subject_id: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT id FROM sessions WHERE subject_id = ?1 AND status = 'Active' LIMIT 1",
        params![subject_id],
        |row| row.get(0),
    )
    .optional()
    .context("failed to look up active session")
}

impl Database {
    /// Inserts a new active session unless the subject already has one.
    pub async fn insert_active_session(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            if let Some(existing) = active_session_for(&tx, &record.subject_id)? {
                return Err(SessionError::Conflict {
                    subject_id: record.subject_id,
                    session_id: existing,
                }
                .into());
            }

            tx.execute(
                "INSERT INTO sessions (id, subject_id, started_at, ended_at, status, artifact_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.subject_id,
                    record.started_at.to_rfc3339(),
                    record.ended_at.as_ref().map(|dt| dt.to_rfc3339()),
                    SessionStatus::Active.as_str(),
                    record.artifact_url,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .context("failed to insert session")?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| find_session(conn, &session_id)).await
    }

    /// Newest first.
    pub async fn list_sessions_for_subject(&self, subject_id: &str) -> Result<Vec<Session>> {
        let subject_id = subject_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS}
                 FROM sessions
                 WHERE subject_id = ?1
                 ORDER BY started_at DESC, rowid DESC"
            ))?;

            let mut rows = stmt.query(params![subject_id])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            for session in &mut sessions {
                session.warnings = load_warnings(conn, &session.id)?;
            }
            Ok(sessions)
        })
        .await
    }

    /// Applies an end/cancel transition. The stored record is untouched when
    /// the transition is not allowed.
    pub async fn close_session(
        &self,
        session_id: &str,
        event: SessionEvent,
        at: DateTime<Utc>,
    ) -> Result<Session> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut session = load_session(&tx, &session_id)?;
            let status = transition(&session, event)?;

            tx.execute(
                "UPDATE sessions
                 SET status = ?1,
                     ended_at = ?2,
                     updated_at = ?3
                 WHERE id = ?4",
                params![status.as_str(), at.to_rfc3339(), at.to_rfc3339(), session_id],
            )
            .context("failed to update session status")?;
            tx.commit()?;

            session.status = status;
            session.ended_at = Some(at);
            session.updated_at = at;
            Ok(session)
        })
        .await
    }

    /// Stores the artifact reference, completing the session if it is
    /// still active.
    pub async fn attach_artifact(
        &self,
        session_id: &str,
        artifact_url: &str,
        at: DateTime<Utc>,
    ) -> Result<Session> {
        let session_id = session_id.to_string();
        let artifact_url = artifact_url.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let mut session = load_session(&tx, &session_id)?;
            let status = transition(&session, SessionEvent::AttachArtifact)?;
            let ended_at = session.ended_at.unwrap_or(at);

            tx.execute(
                "UPDATE sessions
                 SET status = ?1,
                     ended_at = ?2,
                     artifact_url = ?3,
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    status.as_str(),
                    ended_at.to_rfc3339(),
                    artifact_url,
                    at.to_rfc3339(),
                    session_id,
                ],
            )
            .context("failed to attach artifact")?;
            tx.commit()?;

            session.status = status;
            session.ended_at = Some(ended_at);
            session.artifact_url = Some(artifact_url);
            session.updated_at = at;
            Ok(session)
        })
        .await
    }

    /// Cancels every session still marked active. Returns their ids.
    pub async fn cancel_active_sessions(&self, at: DateTime<Utc>) -> Result<Vec<String>> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let ids = {
                let mut stmt = tx.prepare("SELECT id FROM sessions WHERE status = 'Active'")?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                ids
            };

            tx.execute(
                "UPDATE sessions
                 SET status = ?1,
                     ended_at = ?2,
                     updated_at = ?2
                 WHERE status = 'Active'",
                params![SessionStatus::Cancelled.as_str(), at.to_rfc3339()],
            )
            .context("failed to cancel active sessions")?;
            tx.commit()?;
            Ok(ids)
        })
        .await
    }
}
