//! Identity and settings resolution service
//!
//! Leaf service the other application services consult: maps a wire-level
//! identity to the stored charge point and resolves the effective publish
//! settings for it.

use std::sync::Arc;

use crate::domain::{
    ChargePoint, ChargePointIdentity, ChargePointRepository, DomainError, DomainResult,
    PublishSettings, SettingsRepository,
};

pub struct IdentityService {
    charge_points: Arc<dyn ChargePointRepository>,
    settings: Arc<dyn SettingsRepository>,
}

impl IdentityService {
    pub fn new(
        charge_points: Arc<dyn ChargePointRepository>,
        settings: Arc<dyn SettingsRepository>,
    ) -> Self {
        Self {
            charge_points,
            settings,
        }
    }

    /// Resolve a wire identity to the stored charge point.
    pub async fn resolve_charge_point(
        &self,
        identity: &ChargePointIdentity,
    ) -> DomainResult<ChargePoint> {
        self.charge_points
            .find_by_identity(identity)
            .await?
            .ok_or_else(|| DomainError::UnknownChargePoint(identity.identifier.clone()))
    }

    /// Effective publish settings for a charge point: its own row, falling
    /// back to the owner-wide defaults, falling back to built-in defaults.
    pub async fn resolve_settings(
        &self,
        charge_point: &ChargePoint,
    ) -> DomainResult<PublishSettings> {
        if let Some(settings) = self
            .settings
            .find_for_charge_point(charge_point.id)
            .await?
        {
            return Ok(settings);
        }
        if let Some(settings) = self
            .settings
            .find_user_defaults(charge_point.identity.user_id)
            .await?
        {
            return Ok(settings);
        }
        Ok(PublishSettings::default())
    }
}

pub type SharedIdentityService = Arc<IdentityService>;

pub fn create_identity_service(
    charge_points: Arc<dyn ChargePointRepository>,
    settings: Arc<dyn SettingsRepository>,
) -> SharedIdentityService {
    Arc::new(IdentityService::new(charge_points, settings))
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChargePointInfo, DEFAULT_SOURCE_ID_TEMPLATE};
    use crate::infrastructure::storage::InMemoryStore;

    async fn provisioned() -> (Arc<InMemoryStore>, IdentityService, ChargePoint) {
        let store = Arc::new(InMemoryStore::new());
        let cp = store
            .save(ChargePoint::new(
                ChargePointIdentity::new("CP001", 1),
                100,
                ChargePointInfo::new("ACME", "One"),
            ))
            .await
            .unwrap();
        let service = IdentityService::new(store.clone(), store.clone());
        (store, service, cp)
    }

    #[tokio::test]
    async fn resolves_provisioned_charge_point() {
        let (_store, service, cp) = provisioned().await;
        let resolved = service
            .resolve_charge_point(&ChargePointIdentity::new("CP001", 1))
            .await
            .unwrap();
        assert_eq!(resolved.id, cp.id);
    }

    #[tokio::test]
    async fn unknown_identity_is_an_error() {
        let (_store, service, _cp) = provisioned().await;
        let err = service
            .resolve_charge_point(&ChargePointIdentity::new("GHOST", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::UnknownChargePoint(id) if id == "GHOST"));
    }

    #[tokio::test]
    async fn settings_fall_back_to_owner_then_defaults() {
        let (store, service, cp) = provisioned().await;

        let built_in = service.resolve_settings(&cp).await.unwrap();
        assert_eq!(built_in, PublishSettings::default());
        assert_eq!(built_in.template(), DEFAULT_SOURCE_ID_TEMPLATE);

        let owner = PublishSettings {
            publish_to_stream: true,
            ..PublishSettings::default()
        };
        store.put_user_settings(1, owner.clone());
        assert_eq!(service.resolve_settings(&cp).await.unwrap(), owner);

        let own = PublishSettings {
            publish_to_store: false,
            publish_to_stream: true,
            source_id_template: Some("/custom/{deviceId}/{connectorId}".to_string()),
        };
        store.put_charge_point_settings(cp.id, own.clone());
        assert_eq!(service.resolve_settings(&cp).await.unwrap(), own);
    }
}
