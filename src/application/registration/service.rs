//! Registration handshakes and connector topology reconciliation
//!
//! Registration itself is synchronous; the connector topology refresh runs
//! afterwards on its own task, driven by a GetConfiguration exchange with
//! the charge point.

use std::collections::BTreeSet;
use std::sync::Arc;

use rust_ocpp::v1_6::messages::get_configuration::{
    GetConfigurationRequest, GetConfigurationResponse,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::application::dispatch::{ChargePointAction, SharedActionDispatcher};
use crate::domain::{
    ChargePoint, ChargePointIdentity, ChargePointInfo, ChargePointRepository, Connector,
    ConnectorRepository, ConnectorStatusInfo, DomainError, DomainResult,
};

/// Configuration key a charge point reports its connector count under.
pub const CONNECTOR_COUNT_KEY: &str = "NumberOfConnectors";

/// Connectors created and deleted by one reconciliation pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconciliationOutcome {
    pub created: Vec<i32>,
    pub deleted: Vec<i32>,
}

pub struct RegistrationService {
    charge_points: Arc<dyn ChargePointRepository>,
    connectors: Arc<dyn ConnectorRepository>,
    dispatcher: SharedActionDispatcher,
}

impl RegistrationService {
    pub fn new(
        charge_points: Arc<dyn ChargePointRepository>,
        connectors: Arc<dyn ConnectorRepository>,
        dispatcher: SharedActionDispatcher,
    ) -> Self {
        Self {
            charge_points,
            connectors,
            dispatcher,
        }
    }

    /// Handle a registration handshake.
    ///
    /// Charge points are provisioned out of band; an identity without a
    /// stored row is rejected. Reported vendor metadata overwrites the
    /// stored metadata for enabled charge points, and a connector topology
    /// refresh is started in the background.
    pub async fn register(
        &self,
        identity: &ChargePointIdentity,
        info: ChargePointInfo,
    ) -> DomainResult<ChargePoint> {
        let Some(mut charge_point) = self.charge_points.find_by_identity(identity).await? else {
            return Err(DomainError::UnknownChargePoint(identity.identifier.clone()));
        };

        if charge_point.enabled && charge_point.info != info {
            info!(
                charge_point = %charge_point.identity,
                vendor = info.vendor.as_str(),
                model = info.model.as_str(),
                "Updating reported charge point info"
            );
            charge_point.info = info;
            self.charge_points.update(charge_point.clone()).await?;
        }

        self.spawn_topology_refresh(charge_point.clone());
        Ok(charge_point)
    }

    /// Whether a charge point has completed registration and may operate.
    pub async fn is_registration_accepted(&self, charge_point_id: i64) -> DomainResult<bool> {
        Ok(self
            .charge_points
            .find_by_id(charge_point_id)
            .await?
            .map(|cp| cp.is_registration_accepted())
            .unwrap_or(false))
    }

    /// Persist the latest reported status of a connector.
    pub async fn update_connector_status(
        &self,
        identity: &ChargePointIdentity,
        connector_id: i32,
        status: ConnectorStatusInfo,
    ) -> DomainResult<()> {
        let Some(charge_point) = self.charge_points.find_by_identity(identity).await? else {
            return Err(DomainError::UnknownChargePoint(identity.identifier.clone()));
        };
        let mut connector = Connector::new(charge_point.id, connector_id);
        connector.status = status;
        self.connectors.upsert_status(connector).await
    }

    /// Align stored connectors with a reported connector count: indices
    /// `1..=count` exist afterwards, anything else is removed.
    pub async fn reconcile_connector_count(
        &self,
        charge_point: &ChargePoint,
        count: i32,
    ) -> DomainResult<ReconciliationOutcome> {
        reconcile_connector_count(&self.charge_points, &self.connectors, charge_point, count)
            .await
    }

    /// Query the charge point for its connector count and reconcile once
    /// the response arrives. A malformed response is logged and skipped;
    /// registration is not affected.
    fn spawn_topology_refresh(&self, charge_point: ChargePoint) {
        let request = GetConfigurationRequest {
            key: Some(vec![CONNECTOR_COUNT_KEY.to_string()]),
        };
        let payload = match serde_json::to_value(&request) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(charge_point = %charge_point.identity, error = %e, "GetConfiguration payload failed");
                return;
            }
        };

        let result_rx = self.dispatcher.dispatch(
            charge_point.identity.clone(),
            ChargePointAction::GetConfiguration,
            payload,
        );
        let charge_points = self.charge_points.clone();
        let connectors = self.connectors.clone();

        tokio::spawn(async move {
            let response = match result_rx.await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    warn!(charge_point = %charge_point.identity, error = %e, "GetConfiguration dispatch failed");
                    return;
                }
                Err(_) => return,
            };
            let count = match parse_connector_count(&response) {
                Ok(count) => count,
                Err(e) => {
                    warn!(
                        charge_point = %charge_point.identity,
                        error = %e,
                        "Skipping connector reconciliation"
                    );
                    return;
                }
            };
            if let Err(e) =
                reconcile_connector_count(&charge_points, &connectors, &charge_point, count).await
            {
                warn!(charge_point = %charge_point.identity, error = %e, "Connector reconciliation failed");
            }
        });
    }
}

async fn reconcile_connector_count(
    charge_points: &Arc<dyn ChargePointRepository>,
    connectors: &Arc<dyn ConnectorRepository>,
    charge_point: &ChargePoint,
    count: i32,
) -> DomainResult<ReconciliationOutcome> {
    if charge_point.connector_count != count {
        let mut updated = charge_point.clone();
        updated.connector_count = count;
        charge_points.update(updated).await?;
        info!(
            charge_point = %charge_point.identity,
            connector_count = count,
            "Connector count changed"
        );
    }

    let existing: BTreeSet<i32> = connectors
        .find_for_charge_point(charge_point.id)
        .await?
        .into_iter()
        .map(|c| c.connector_id)
        .collect();

    let created: Vec<i32> = (1..=count).filter(|id| !existing.contains(id)).collect();
    let deleted: Vec<i32> = existing
        .into_iter()
        .filter(|&id| id < 1 || id > count)
        .collect();

    if !created.is_empty() || !deleted.is_empty() {
        let create = created
            .iter()
            .map(|&id| Connector::new(charge_point.id, id))
            .collect();
        connectors
            .apply_topology(charge_point.id, create, deleted.clone())
            .await?;
        info!(
            charge_point = %charge_point.identity,
            created = ?created,
            deleted = ?deleted,
            "Reconciled connector topology"
        );
    }

    Ok(ReconciliationOutcome { created, deleted })
}

/// Extract the connector count from a GetConfiguration response payload.
fn parse_connector_count(response: &Value) -> DomainResult<i32> {
    let response: GetConfigurationResponse = serde_json::from_value(response.clone())
        .map_err(|e| DomainError::ConfigurationParse(format!("Invalid response: {}", e)))?;
    let raw = response
        .configuration_key
        .unwrap_or_default()
        .into_iter()
        .find(|kv| kv.key == CONNECTOR_COUNT_KEY)
        .and_then(|kv| kv.value)
        .ok_or_else(|| {
            DomainError::ConfigurationParse(format!("{} not reported", CONNECTOR_COUNT_KEY))
        })?;
    let count = raw.trim().parse::<i32>().map_err(|_| {
        DomainError::ConfigurationParse(format!("{} value {:?} is not a number", CONNECTOR_COUNT_KEY, raw))
    })?;
    if count < 0 {
        return Err(DomainError::ConfigurationParse(format!(
            "{} value {} is negative",
            CONNECTOR_COUNT_KEY, count
        )));
    }
    Ok(count)
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::application::dispatch::dispatcher::ActionDispatcher;
    use crate::application::dispatch::{ActionMessage, DispatchError};
    use crate::application::ports::{
        ChargePointBroker, ChargePointConnection, ChargePointRouter,
    };
    use crate::infrastructure::storage::InMemoryStore;

    struct ConnectedRouter;

    impl ChargePointRouter for ConnectedRouter {
        fn resolve(&self, identity: &ChargePointIdentity) -> Option<ChargePointConnection> {
            Some(ChargePointConnection {
                identity: identity.clone(),
                connection_id: "conn-1".to_string(),
            })
        }
    }

    /// Answers GetConfiguration with a fixed connector count.
    struct ConfigBroker {
        value: &'static str,
    }

    #[async_trait]
    impl ChargePointBroker for ConfigBroker {
        async fn send(
            &self,
            _connection: ChargePointConnection,
            _message: ActionMessage,
        ) -> Result<Value, DispatchError> {
            Ok(json!({
                "configurationKey": [
                    {"key": CONNECTOR_COUNT_KEY, "readonly": true, "value": self.value}
                ]
            }))
        }
    }

    async fn provision(store: &Arc<InMemoryStore>) -> ChargePoint {
        store
            .save(ChargePoint::new(
                ChargePointIdentity::new("CP001", 1),
                100,
                ChargePointInfo::new("ACME", "One"),
            ))
            .await
            .unwrap()
    }

    fn service(store: Arc<InMemoryStore>, broker: Arc<dyn ChargePointBroker>) -> RegistrationService {
        let dispatcher = Arc::new(ActionDispatcher::new(
            Arc::new(ConnectedRouter),
            broker,
            2,
        ));
        RegistrationService::new(store.clone(), store, dispatcher)
    }

    async fn connector_ids(store: &InMemoryStore, charge_point_id: i64) -> Vec<i32> {
        store
            .find_for_charge_point(charge_point_id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.connector_id)
            .collect()
    }

    #[tokio::test]
    async fn unknown_charge_point_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store, Arc::new(ConfigBroker { value: "2" }));
        let err = service
            .register(
                &ChargePointIdentity::new("GHOST", 1),
                ChargePointInfo::new("ACME", "One"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::UnknownChargePoint(_)));
    }

    #[tokio::test]
    async fn changed_info_is_persisted() {
        let store = Arc::new(InMemoryStore::new());
        let cp = provision(&store).await;
        let service = service(store.clone(), Arc::new(ConfigBroker { value: "2" }));

        let info = ChargePointInfo::new("ACME", "Two").with_firmware_version("1.2.3");
        service.register(&cp.identity, info.clone()).await.unwrap();

        let stored = store.find_by_id(cp.id).await.unwrap().unwrap();
        assert_eq!(stored.info, info);
    }

    #[tokio::test]
    async fn registration_triggers_topology_refresh() {
        let store = Arc::new(InMemoryStore::new());
        let cp = provision(&store).await;
        let service = service(store.clone(), Arc::new(ConfigBroker { value: "2" }));

        service
            .register(&cp.identity, cp.info.clone())
            .await
            .unwrap();

        // The refresh runs on its own task; give it a few polls.
        for _ in 0..100 {
            tokio::task::yield_now().await;
            if !connector_ids(&store, cp.id).await.is_empty() {
                break;
            }
        }
        assert_eq!(connector_ids(&store, cp.id).await, vec![1, 2]);
        assert_eq!(
            store.find_by_id(cp.id).await.unwrap().unwrap().connector_count,
            2
        );
    }

    #[tokio::test]
    async fn malformed_count_skips_reconciliation() {
        let store = Arc::new(InMemoryStore::new());
        let cp = provision(&store).await;
        let service = service(store.clone(), Arc::new(ConfigBroker { value: "two" }));

        service
            .register(&cp.identity, cp.info.clone())
            .await
            .unwrap();
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }
        assert!(connector_ids(&store, cp.id).await.is_empty());
    }

    #[tokio::test]
    async fn reconciliation_converges_to_reported_range() {
        let store = Arc::new(InMemoryStore::new());
        let cp = provision(&store).await;
        for id in [1, 2, 5] {
            store
                .upsert_status(Connector::new(cp.id, id))
                .await
                .unwrap();
        }
        let service = service(store.clone(), Arc::new(ConfigBroker { value: "3" }));

        let outcome = service.reconcile_connector_count(&cp, 3).await.unwrap();
        assert_eq!(outcome.created, vec![3]);
        assert_eq!(outcome.deleted, vec![5]);
        assert_eq!(connector_ids(&store, cp.id).await, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn reconciliation_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let cp = provision(&store).await;
        let service = service(store.clone(), Arc::new(ConfigBroker { value: "2" }));

        service.reconcile_connector_count(&cp, 2).await.unwrap();
        let outcome = service.reconcile_connector_count(&cp, 2).await.unwrap();
        assert_eq!(outcome, ReconciliationOutcome::default());
        assert_eq!(connector_ids(&store, cp.id).await, vec![1, 2]);
    }

    #[tokio::test]
    async fn registration_acceptance_is_enabled_and_accepted() {
        let store = Arc::new(InMemoryStore::new());
        let mut cp = provision(&store).await;
        let service = service(store.clone(), Arc::new(ConfigBroker { value: "2" }));

        assert!(!service.is_registration_accepted(cp.id).await.unwrap());

        cp.registration_status = crate::domain::RegistrationStatus::Accepted;
        store.update(cp.clone()).await.unwrap();
        assert!(service.is_registration_accepted(cp.id).await.unwrap());

        cp.enabled = false;
        store.update(cp.clone()).await.unwrap();
        assert!(!service.is_registration_accepted(cp.id).await.unwrap());
    }

    #[test]
    fn parse_rejects_missing_key_and_garbage() {
        let ok = json!({
            "configurationKey": [
                {"key": CONNECTOR_COUNT_KEY, "readonly": true, "value": " 4 "}
            ]
        });
        assert_eq!(parse_connector_count(&ok).unwrap(), 4);

        let missing = json!({"configurationKey": []});
        assert!(parse_connector_count(&missing).is_err());

        let garbage = json!({
            "configurationKey": [
                {"key": CONNECTOR_COUNT_KEY, "readonly": true, "value": "-2"}
            ]
        });
        assert!(parse_connector_count(&garbage).is_err());
    }
}
