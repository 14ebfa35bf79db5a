//! Action dispatcher — bounded asynchronous outbound sends
//!
//! Every dispatch resolves the target connection through the router and
//! performs the correlated exchange through the broker on a worker task,
//! never on the caller. The outcome arrives through a per-call oneshot
//! channel that is written exactly once.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{oneshot, Semaphore};
use tracing::{info, warn};
use uuid::Uuid;

use super::{ActionMessage, ChargePointAction, DispatchError, DispatchResult};
use crate::application::ports::{ChargePointBroker, ChargePointRouter};
use crate::domain::ChargePointIdentity;

/// Record dispatch outcome and latency to Prometheus.
fn record_dispatch_latency(action: &'static str, start: std::time::Instant) {
    let duration = start.elapsed().as_secs_f64();
    metrics::histogram!("ocpp_dispatch_latency_seconds", "action" => action).record(duration);
    metrics::counter!("ocpp_dispatch_total", "action" => action).increment(1);
}

/// Dispatches action messages to charge points through the external
/// router/broker pair.
pub struct ActionDispatcher {
    router: Arc<dyn ChargePointRouter>,
    broker: Arc<dyn ChargePointBroker>,
    permits: Arc<Semaphore>,
}

impl ActionDispatcher {
    pub fn new(
        router: Arc<dyn ChargePointRouter>,
        broker: Arc<dyn ChargePointBroker>,
        concurrency: usize,
    ) -> Self {
        Self {
            router,
            broker,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Dispatch an action to a charge point.
    ///
    /// Returns a channel that resolves exactly once: with the broker's
    /// decoded response payload, or with an error when no live connection
    /// exists or the exchange fails.
    pub fn dispatch(
        &self,
        identity: ChargePointIdentity,
        action: ChargePointAction,
        payload: Value,
    ) -> oneshot::Receiver<DispatchResult> {
        let (result_tx, result_rx) = oneshot::channel();

        let router = self.router.clone();
        let broker = self.broker.clone();
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let _ = result_tx.send(Err(DispatchError::Shutdown));
                    return;
                }
            };

            let Some(connection) = router.resolve(&identity) else {
                warn!(charge_point = %identity, %action, "No live connection for dispatch");
                metrics::counter!("ocpp_dispatch_unavailable_total").increment(1);
                let _ = result_tx.send(Err(DispatchError::ClientUnavailable(
                    identity.identifier.clone(),
                )));
                return;
            };

            let message = ActionMessage {
                identity: identity.clone(),
                correlation_id: Uuid::new_v4(),
                action,
                payload,
            };

            info!(
                charge_point = %identity,
                %action,
                correlation_id = %message.correlation_id,
                "Dispatching action"
            );

            let start = std::time::Instant::now();
            let result = broker.send(connection, message).await;
            record_dispatch_latency(action.name(), start);

            if let Err(e) = &result {
                warn!(charge_point = %identity, %action, error = %e, "Dispatch failed");
            }
            let _ = result_tx.send(result);
        });

        result_rx
    }

    /// Dispatch and await the result in place.
    pub async fn call(
        &self,
        identity: ChargePointIdentity,
        action: ChargePointAction,
        payload: Value,
    ) -> DispatchResult {
        match self.dispatch(identity, action, payload).await {
            Ok(result) => result,
            // Sender dropped without a result: the dispatcher went away.
            Err(_) => Err(DispatchError::Shutdown),
        }
    }

    /// Stop accepting work. Pending dispatches resolve with `Shutdown`.
    pub fn shutdown(&self) {
        self.permits.close();
    }
}

pub type SharedActionDispatcher = Arc<ActionDispatcher>;

pub fn create_action_dispatcher(
    router: Arc<dyn ChargePointRouter>,
    broker: Arc<dyn ChargePointBroker>,
    concurrency: usize,
) -> SharedActionDispatcher {
    Arc::new(ActionDispatcher::new(router, broker, concurrency))
}

// ── Tests ──────────────────────────────────────────────────────
