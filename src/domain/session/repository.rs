//! Charge session repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::ChargeSession;
use crate::domain::reading::Reading;
use crate::domain::DomainResult;

#[async_trait]
pub trait ChargeSessionRepository: Send + Sync {
    /// Persist a new session. The store assigns the protocol transaction id;
    /// callers re-read the session to observe it. Fails with
    /// [`DomainError::SessionConflict`](crate::domain::DomainError::SessionConflict)
    /// when an active session already occupies the connector, and with
    /// [`DomainError::IntegrityViolation`](crate::domain::DomainError::IntegrityViolation)
    /// when the referenced charge point does not exist. The existence check
    /// and the insert are one atomic operation.
    async fn save(&self, session: ChargeSession) -> DomainResult<()>;
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<ChargeSession>>;
    /// The single active session on a connector, if any.
    async fn find_active(
        &self,
        charge_point_id: i64,
        connector_id: i32,
    ) -> DomainResult<Option<ChargeSession>>;
    async fn find_by_transaction(
        &self,
        charge_point_id: i64,
        transaction_id: i32,
    ) -> DomainResult<Option<ChargeSession>>;
    async fn update(&self, session: ChargeSession) -> DomainResult<()>;
    /// Delete ended sessions posted before the cutoff. Returns the count.
    async fn delete_posted_before(&self, cutoff: DateTime<Utc>) -> DomainResult<usize>;

    /// Append readings in one batch.
    async fn save_readings(&self, readings: Vec<Reading>) -> DomainResult<()>;
    /// Stored readings of a session (`None` addresses session-less readings).
    async fn find_readings(&self, session_id: Option<Uuid>) -> DomainResult<Vec<Reading>>;
}
