//! Publish settings repository interface

use async_trait::async_trait;

use super::model::PublishSettings;
use crate::domain::DomainResult;

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn find_for_charge_point(
        &self,
        charge_point_id: i64,
    ) -> DomainResult<Option<PublishSettings>>;
    /// Owner-wide default settings, used when a charge point has none.
    async fn find_user_defaults(&self, user_id: i64) -> DomainResult<Option<PublishSettings>>;
}
