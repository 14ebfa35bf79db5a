//! Domain errors

use thiserror::Error;

use super::authorization::AuthorizationStatus;

/// Domain-level error types
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// Authorization was refused with the given status.
    #[error("Authorization failed: {0}")]
    Authorization(AuthorizationStatus),

    /// No charge point is provisioned for the presented identity.
    #[error("Unknown charge point: {0}")]
    UnknownChargePoint(String),

    /// An instruction payload could not be decoded for its action.
    #[error("Payload decode failed: {0}")]
    Decode(String),

    /// No live connection exists for the target charge point.
    #[error("Charge point not connected: {0}")]
    ClientUnavailable(String),

    /// A configuration value reported by a charge point was malformed.
    #[error("Configuration parse failed: {0}")]
    ConfigurationParse(String),

    /// An active session already occupies the connector.
    #[error("Active charge session exists on connector {connector_id} of charge point {charge_point_id}")]
    SessionConflict {
        charge_point_id: i64,
        connector_id: i32,
    },

    /// A referential constraint was violated by the backing store.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    /// Storage/database error
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
