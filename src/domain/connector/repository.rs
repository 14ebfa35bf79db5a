//! Connector repository interface

use async_trait::async_trait;

use super::model::Connector;
use crate::domain::DomainResult;

#[async_trait]
pub trait ConnectorRepository: Send + Sync {
    /// All connectors of a charge point, ordered by connector id.
    async fn find_for_charge_point(&self, charge_point_id: i64) -> DomainResult<Vec<Connector>>;
    /// Insert or overwrite a connector row with its latest status.
    async fn upsert_status(&self, connector: Connector) -> DomainResult<()>;
    /// Apply a topology change as one atomic batch: create the given rows
    /// and delete the given connector ids.
    async fn apply_topology(
        &self,
        charge_point_id: i64,
        create: Vec<Connector>,
        delete: Vec<i32>,
    ) -> DomainResult<()>;
}
