//! Charge Point domain entity

use chrono::{DateTime, Utc};

/// Wire-level identity of a charge point: the identifier it presents on
/// connect, scoped to the owning user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChargePointIdentity {
    pub identifier: String,
    pub user_id: i64,
}

impl ChargePointIdentity {
    pub fn new(identifier: impl Into<String>, user_id: i64) -> Self {
        Self {
            identifier: identifier.into(),
            user_id,
        }
    }
}

impl std::fmt::Display for ChargePointIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user_id, self.identifier)
    }
}

/// Registration status granted to a charge point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl Default for RegistrationStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Accepted => write!(f, "Accepted"),
            Self::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Vendor metadata a charge point reports during registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargePointInfo {
    pub vendor: String,
    pub model: String,
    pub firmware_version: Option<String>,
}

impl ChargePointInfo {
    pub fn new(vendor: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            model: model.into(),
            firmware_version: None,
        }
    }

    pub fn with_firmware_version(mut self, version: impl Into<String>) -> Self {
        self.firmware_version = Some(version.into());
        self
    }
}

/// Charge Point entity
#[derive(Debug, Clone)]
pub struct ChargePoint {
    /// Storage-assigned primary key (0 until first save)
    pub id: i64,
    /// Wire identity (identifier + owner)
    pub identity: ChargePointIdentity,
    /// Monitored asset this charge point reports under
    pub node_id: i64,
    /// Last reported vendor metadata
    pub info: ChargePointInfo,
    /// Registration status
    pub registration_status: RegistrationStatus,
    /// Whether the charge point may interact with the central system
    pub enabled: bool,
    /// Self-reported number of physical connectors
    pub connector_count: i32,
    /// When the charge point was provisioned
    pub created: DateTime<Utc>,
}

impl ChargePoint {
    pub fn new(identity: ChargePointIdentity, node_id: i64, info: ChargePointInfo) -> Self {
        Self {
            id: 0,
            identity,
            node_id,
            info,
            registration_status: RegistrationStatus::default(),
            enabled: true,
            connector_count: 0,
            created: Utc::now(),
        }
    }

    /// Whether the charge point has completed registration and may operate.
    pub fn is_registration_accepted(&self) -> bool {
        self.enabled && self.registration_status == RegistrationStatus::Accepted
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cp() -> ChargePoint {
        ChargePoint::new(
            ChargePointIdentity::new("CP001", 1),
            100,
            ChargePointInfo::new("ACME", "One"),
        )
    }

    #[test]
    fn new_charge_point_is_pending() {
        let cp = sample_cp();
        assert_eq!(cp.registration_status, RegistrationStatus::Pending);
        assert!(cp.enabled);
        assert_eq!(cp.connector_count, 0);
        assert!(!cp.is_registration_accepted());
    }

    #[test]
    fn accepted_and_enabled_is_registered() {
        let mut cp = sample_cp();
        cp.registration_status = RegistrationStatus::Accepted;
        assert!(cp.is_registration_accepted());
        cp.enabled = false;
        assert!(!cp.is_registration_accepted());
    }

    #[test]
    fn identity_display() {
        let identity = ChargePointIdentity::new("CP001", 7);
        assert_eq!(identity.to_string(), "7/CP001");
    }
}
