//! Charge session domain entity

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Why a charge session ended (OCPP 1.6 stop reasons)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    DeAuthorized,
    EmergencyStop,
    EVDisconnected,
    HardReset,
    Local,
    Other,
    PowerLoss,
    Reboot,
    Remote,
    SoftReset,
    UnlockCommand,
}

impl std::fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DeAuthorized => "DeAuthorized",
            Self::EmergencyStop => "EmergencyStop",
            Self::EVDisconnected => "EVDisconnected",
            Self::HardReset => "HardReset",
            Self::Local => "Local",
            Self::Other => "Other",
            Self::PowerLoss => "PowerLoss",
            Self::Reboot => "Reboot",
            Self::Remote => "Remote",
            Self::SoftReset => "SoftReset",
            Self::UnlockCommand => "UnlockCommand",
        };
        write!(f, "{}", s)
    }
}

/// One charging transaction on a connector.
///
/// A session is active until its end fields are set; ending is terminal
/// and the record is never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ChargeSession {
    /// Client-generated session id
    pub id: Uuid,
    /// When the session started
    pub created: DateTime<Utc>,
    pub charge_point_id: i64,
    pub connector_id: i32,
    /// Token that authorized the start
    pub auth_token: String,
    /// Storage-assigned protocol transaction id (0 until first save)
    pub transaction_id: i32,
    /// When the session ended
    pub ended: Option<DateTime<Utc>>,
    pub end_reason: Option<SessionEndReason>,
    /// Token presented at session end
    pub end_auth_token: Option<String>,
    /// When the completed session was posted, used for retention
    pub posted: Option<DateTime<Utc>>,
}

impl ChargeSession {
    pub fn new(
        charge_point_id: i64,
        connector_id: i32,
        auth_token: impl Into<String>,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created,
            charge_point_id,
            connector_id,
            auth_token: auth_token.into(),
            transaction_id: 0,
            ended: None,
            end_reason: None,
            end_auth_token: None,
            posted: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.ended.is_none()
    }

    /// Close the session. Sets the posting timestamp used by retention.
    pub fn end(
        &mut self,
        end_auth_token: impl Into<String>,
        reason: SessionEndReason,
        at: DateTime<Utc>,
    ) {
        self.ended = Some(at);
        self.end_reason = Some(reason);
        self.end_auth_token = Some(end_auth_token.into());
        self.posted = Some(Utc::now());
    }

    /// Whole seconds between start and end, while ended.
    pub fn duration_seconds(&self) -> Option<i64> {
        self.ended
            .map(|ended| ended.signed_duration_since(self.created).num_seconds())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_session() -> ChargeSession {
        ChargeSession::new(1, 1, "T1", Utc.timestamp_opt(1_000, 0).unwrap())
    }

    #[test]
    fn new_session_is_active() {
        let session = sample_session();
        assert!(session.is_active());
        assert!(session.ended.is_none());
        assert!(session.posted.is_none());
        assert_eq!(session.transaction_id, 0);
    }

    #[test]
    fn end_is_terminal() {
        let mut session = sample_session();
        let ended_at = Utc.timestamp_opt(1_120, 0).unwrap();
        session.end("T1", SessionEndReason::Local, ended_at);
        assert!(!session.is_active());
        assert_eq!(session.ended, Some(ended_at));
        assert_eq!(session.end_reason, Some(SessionEndReason::Local));
        assert_eq!(session.end_auth_token.as_deref(), Some("T1"));
        assert!(session.posted.is_some());
    }

    #[test]
    fn duration_in_whole_seconds() {
        let mut session = sample_session();
        assert_eq!(session.duration_seconds(), None);
        session.end("T1", SessionEndReason::Remote, Utc.timestamp_opt(1_090, 0).unwrap());
        assert_eq!(session.duration_seconds(), Some(90));
    }
}
