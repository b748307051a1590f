use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::db::{
    connection::Database,
    helpers::{parse_reason, to_i64, to_u64},
};
use crate::models::Warning;
use crate::session::state::{transition, SessionEvent};

use super::sessions::load_session;

pub(crate) fn load_warnings(conn: &Connection, session_id: &str) -> Result<Vec<Warning>> {
    let mut stmt = conn.prepare(
        "SELECT offset_ms, reason
         FROM warnings
         WHERE session_id = ?1
         ORDER BY seq ASC",
    )?;

    let mut rows = stmt.query(params![session_id])?;
    let mut warnings = Vec::new();
    while let Some(row) = rows.next()? {
        let offset_ms: i64 = row.get(0)?;
        let reason: String = row.get(1)?;
        warnings.push(Warning {
            offset_ms: to_u64(offset_ms, "offset_ms")?,
            reason: parse_reason(&reason)?,
        });
    }

    Ok(warnings)
}

impl Database {
    /// Appends a warning if the session exists and is active. Returns the
    /// session's warning count after the append.
    pub async fn append_warning(&self, session_id: &str, warning: Warning) -> Result<usize> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let session = load_session(&tx, &session_id)?;
            transition(&session, SessionEvent::RecordWarning)?;

            tx.execute(
                "INSERT INTO warnings (session_id, seq, offset_ms, reason)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    session_id,
                    to_i64(session.warnings.len() as u64)?,
                    to_i64(warning.offset_ms)?,
                    warning.reason.as_str(),
                ],
            )
            .context("failed to insert warning")?;
            tx.commit()?;

            Ok(session.warnings.len() + 1)
        })
        .await
    }
}
