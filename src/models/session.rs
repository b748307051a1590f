use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Warning;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "Active",
            SessionStatus::Completed => "Completed",
            SessionStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub subject_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub warnings: Vec<Warning>,
    pub artifact_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn duration_ms(&self) -> Option<u64> {
        self.ended_at
            .map(|ended| (ended - self.started_at).num_milliseconds().max(0) as u64)
    }
}

/// What a caller gets back when a session closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub subject_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub duration_ms: Option<u64>,
    pub warning_count: usize,
    pub artifact_url: Option<String>,
}

impl From<Session> for SessionSummary {
    fn from(session: Session) -> Self {
        Self {
            duration_ms: session.duration_ms(),
            warning_count: session.warnings.len(),
            id: session.id,
            subject_id: session.subject_id,
            started_at: session.started_at,
            ended_at: session.ended_at,
            status: session.status,
            artifact_url: session.artifact_url,
        }
    }
}
