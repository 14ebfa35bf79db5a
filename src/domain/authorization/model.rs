//! Authorization decision for a presented token

use chrono::{DateTime, Utc};

/// Token authorization status (OCPP 1.6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    Accepted,
    Blocked,
    Expired,
    Invalid,
    ConcurrentTx,
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted => write!(f, "Accepted"),
            Self::Blocked => write!(f, "Blocked"),
            Self::Expired => write!(f, "Expired"),
            Self::Invalid => write!(f, "Invalid"),
            Self::ConcurrentTx => write!(f, "ConcurrentTx"),
        }
    }
}

impl AuthorizationStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Outcome of authorizing a token against a charge point identity
#[derive(Debug, Clone)]
pub struct AuthorizationInfo {
    pub status: AuthorizationStatus,
    /// When the authorization lapses, if limited
    pub expiry_date: Option<DateTime<Utc>>,
    /// Parent token for group authorization
    pub parent_id_tag: Option<String>,
}

impl AuthorizationInfo {
    pub fn accepted() -> Self {
        Self::with_status(AuthorizationStatus::Accepted)
    }

    pub fn with_status(status: AuthorizationStatus) -> Self {
        Self {
            status,
            expiry_date: None,
            parent_id_tag: None,
        }
    }
}
