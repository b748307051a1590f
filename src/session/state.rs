//! Session transition rules, kept free of storage so they can be checked
//! inside a database transaction and tested on their own.

use crate::error::SessionError;
use crate::models::{Session, SessionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    RecordWarning,
    End,
    Cancel,
    AttachArtifact,
}

/// Status after `event`, or `None` when the event is not allowed from
/// `current`.
pub fn next_status(current: SessionStatus, event: SessionEvent) -> Option<SessionStatus> {
    use SessionEvent::*;
    use SessionStatus::*;

    match (current, event) {
        (Active, RecordWarning) => Some(Active),
        (Active, End) | (Active, AttachArtifact) => Some(Completed),
        (Active, Cancel) => Some(Cancelled),
        // Upload can finish after the session was ended.
        (Completed, AttachArtifact) => Some(Completed),
        (Completed, _) | (Cancelled, _) => None,
    }
}

pub fn transition(session: &Session, event: SessionEvent) -> Result<SessionStatus, SessionError> {
    next_status(session.status, event).ok_or_else(|| SessionError::InvalidState {
        session_id: session.id.clone(),
        status: session.status.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionEvent::*;
    use SessionStatus::*;

    #[test]
    fn active_sessions_accept_everything() {
        assert_eq!(next_status(Active, RecordWarning), Some(Active));
        assert_eq!(next_status(Active, End), Some(Completed));
        assert_eq!(next_status(Active, Cancel), Some(Cancelled));
        assert_eq!(next_status(Active, AttachArtifact), Some(Completed));
    }

    #[test]
    fn terminal_sessions_are_frozen() {
        for event in [RecordWarning, End, Cancel] {
            assert_eq!(next_status(Completed, event), None);
            assert_eq!(next_status(Cancelled, event), None);
        }
        assert_eq!(next_status(Cancelled, AttachArtifact), None);
        assert_eq!(next_status(Completed, AttachArtifact), Some(Completed));
    }
}
