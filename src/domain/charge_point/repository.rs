//! Charge Point repository interface

use async_trait::async_trait;

use super::model::{ChargePoint, ChargePointIdentity};
use crate::domain::DomainResult;

#[async_trait]
pub trait ChargePointRepository: Send + Sync {
    /// Persist a new charge point, assigning its id. Returns the stored row.
    async fn save(&self, charge_point: ChargePoint) -> DomainResult<ChargePoint>;
    async fn find_by_id(&self, id: i64) -> DomainResult<Option<ChargePoint>>;
    async fn find_by_identity(
        &self,
        identity: &ChargePointIdentity,
    ) -> DomainResult<Option<ChargePoint>>;
    /// Lookup by identifier string alone, for callers without an owner scope.
    async fn find_by_identifier(&self, identifier: &str) -> DomainResult<Option<ChargePoint>>;
    async fn update(&self, charge_point: ChargePoint) -> DomainResult<()>;
}
