//! Instruction bridge — generic automation instructions over OCPP
//!
//! Instructions enter the durable queue through [`will_queue_instruction`]
//! (resolve target, action and payload; mark `Executing`) and are executed
//! after queueing through [`did_queue_instruction`] (dispatch, then fold
//! the result into instruction state with a guarded transition).
//!
//! [`will_queue_instruction`]: InstructionBridge::will_queue_instruction
//! [`did_queue_instruction`]: InstructionBridge::did_queue_instruction

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::dispatcher::SharedActionDispatcher;
use super::ChargePointAction;
use crate::application::ports::InstructionStore;
use crate::domain::{
    ChargePointIdentity, ChargePointRepository, DomainError, DomainResult, Instruction,
    InstructionState,
};

/// Instruction topic handled by this bridge.
pub const INSTRUCTION_TOPIC: &str = "OCPP_v16";

/// Instruction parameter naming the target by storage id.
pub const PARAM_CHARGE_POINT_ID: &str = "deviceId";
/// Instruction parameter naming the target by identifier string.
pub const PARAM_CHARGE_POINT_IDENTIFIER: &str = "deviceIdentifier";
/// Instruction parameter naming the protocol action.
pub const PARAM_ACTION: &str = "action";
/// Instruction parameter carrying a raw JSON payload.
pub const PARAM_PAYLOAD: &str = "payload";
/// Result parameter carrying a decline explanation.
pub const PARAM_ERROR: &str = "error";

/// Decodes instruction parameters into an action payload.
pub trait ActionPayloadDecoder: Send + Sync {
    fn decode(
        &self,
        action: ChargePointAction,
        params: &BTreeMap<String, String>,
    ) -> DomainResult<Value>;
}

/// Default decoder: a `payload` parameter is taken as raw JSON; otherwise
/// the remaining parameters become a JSON object, with values parsed as
/// scalars where possible.
pub struct JsonPayloadDecoder;

impl ActionPayloadDecoder for JsonPayloadDecoder {
    fn decode(
        &self,
        _action: ChargePointAction,
        params: &BTreeMap<String, String>,
    ) -> DomainResult<Value> {
        if let Some(raw) = params.get(PARAM_PAYLOAD) {
            return serde_json::from_str(raw)
                .map_err(|e| DomainError::Decode(format!("Invalid payload JSON: {}", e)));
        }

        let reserved = [
            PARAM_CHARGE_POINT_ID,
            PARAM_CHARGE_POINT_IDENTIFIER,
            PARAM_ACTION,
        ];
        let mut object = serde_json::Map::new();
        for (name, value) in params {
            if reserved.contains(&name.as_str()) {
                continue;
            }
            object.insert(name.clone(), scalar_value(value));
        }
        Ok(Value::Object(object))
    }
}

fn scalar_value(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

/// A resolved instruction ready for dispatch once durably queued.
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub identity: ChargePointIdentity,
    pub action: ChargePointAction,
    pub payload: Value,
}

/// Outcome of intercepting an instruction before it is queued.
#[derive(Debug)]
pub enum BridgeOutcome {
    /// Not for this protocol or no target named; queue unchanged.
    Unhandled(Instruction),
    /// Terminal for this instruction; queue as declined with the message.
    Declined { message: String },
    /// Queue the instruction as executing and dispatch after queueing.
    Execute {
        instruction: Instruction,
        pending: PendingAction,
    },
}

/// Translates automation instructions into action dispatches.
pub struct InstructionBridge {
    charge_points: Arc<dyn ChargePointRepository>,
    instructions: Arc<dyn InstructionStore>,
    dispatcher: SharedActionDispatcher,
    decoder: Arc<dyn ActionPayloadDecoder>,
}

impl InstructionBridge {
    pub fn new(
        charge_points: Arc<dyn ChargePointRepository>,
        instructions: Arc<dyn InstructionStore>,
        dispatcher: SharedActionDispatcher,
    ) -> Self {
        Self {
            charge_points,
            instructions,
            dispatcher,
            decoder: Arc::new(JsonPayloadDecoder),
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn ActionPayloadDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Intercept an instruction before it enters the durable queue.
    pub async fn will_queue_instruction(
        &self,
        mut instruction: Instruction,
    ) -> DomainResult<BridgeOutcome> {
        if instruction.topic != INSTRUCTION_TOPIC {
            return Ok(BridgeOutcome::Unhandled(instruction));
        }

        let charge_point = match self.resolve_target(&instruction).await? {
            TargetResolution::NotNamed => return Ok(BridgeOutcome::Unhandled(instruction)),
            TargetResolution::Missing(message) => {
                return Ok(BridgeOutcome::Declined { message })
            }
            TargetResolution::Found(cp) => cp,
        };

        let Some(action_name) = instruction.param(PARAM_ACTION) else {
            return Ok(BridgeOutcome::Declined {
                message: format!("Missing {} parameter", PARAM_ACTION),
            });
        };
        let Some(action) = ChargePointAction::from_name(action_name) else {
            return Ok(BridgeOutcome::Declined {
                message: format!("Unsupported action {}", action_name),
            });
        };

        let payload = match self.decoder.decode(action, &instruction.params) {
            Ok(payload) => payload,
            Err(e) => {
                return Ok(BridgeOutcome::Declined {
                    message: e.to_string(),
                })
            }
        };

        instruction.state = InstructionState::Executing;
        Ok(BridgeOutcome::Execute {
            instruction,
            pending: PendingAction {
                identity: charge_point.identity.clone(),
                action,
                payload,
            },
        })
    }

    /// Execute a resolved instruction after it was durably queued under
    /// `instruction_id`, folding the dispatch result into its state.
    ///
    /// The state transition is guarded: an instruction that has already
    /// left `Executing` (for example, cancelled externally) is never
    /// overwritten.
    pub async fn did_queue_instruction(&self, instruction_id: i64, pending: PendingAction) {
        let action = pending.action;
        let result = self
            .dispatcher
            .call(pending.identity.clone(), action, pending.payload)
            .await;

        let (next, result_params) = match result {
            Ok(response) => (InstructionState::Completed, response_params(&response)),
            Err(e) => {
                let mut params = BTreeMap::new();
                params.insert(PARAM_ERROR.to_string(), e.to_string());
                (InstructionState::Declined, params)
            }
        };

        match self
            .instructions
            .compare_and_set_state(
                instruction_id,
                InstructionState::Executing,
                next,
                result_params,
            )
            .await
        {
            Ok(true) => {
                info!(instruction_id, %action, state = %next, "Instruction resolved");
            }
            Ok(false) => {
                debug!(
                    instruction_id,
                    %action,
                    "Instruction left Executing before dispatch result, leaving untouched"
                );
            }
            Err(e) => {
                warn!(instruction_id, %action, error = %e, "Instruction state update failed");
            }
        }
    }

    async fn resolve_target(&self, instruction: &Instruction) -> DomainResult<TargetResolution> {
        if let Some(raw_id) = instruction.param(PARAM_CHARGE_POINT_ID) {
            let Ok(id) = raw_id.parse::<i64>() else {
                return Ok(TargetResolution::Missing(format!(
                    "Invalid {} value: {}",
                    PARAM_CHARGE_POINT_ID, raw_id
                )));
            };
            return Ok(match self.charge_points.find_by_id(id).await? {
                Some(cp) => TargetResolution::Found(cp),
                None => {
                    TargetResolution::Missing(format!("Charge point {} not found", id))
                }
            });
        }
        if let Some(identifier) = instruction.param(PARAM_CHARGE_POINT_IDENTIFIER) {
            return Ok(
                match self.charge_points.find_by_identifier(identifier).await? {
                    Some(cp) => TargetResolution::Found(cp),
                    None => TargetResolution::Missing(format!(
                        "Charge point {} not found",
                        identifier
                    )),
                },
            );
        }
        Ok(TargetResolution::NotNamed)
    }
}

enum TargetResolution {
    NotNamed,
    Missing(String),
    Found(crate::domain::ChargePoint),
}

fn response_params(response: &Value) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    if let Some(object) = response.as_object() {
        for (name, value) in object {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            params.insert(name.clone(), rendered);
        }
    }
    params
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    use crate::application::dispatch::{ActionMessage, DispatchError};
    use crate::application::ports::{
        ChargePointBroker, ChargePointConnection, ChargePointRouter,
    };
    use crate::domain::{ChargePoint, ChargePointInfo};
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

    struct AcceptingBroker;

    #[async_trait]
    impl ChargePointBroker for AcceptingBroker {
        async fn send(
            &self,
            _connection: ChargePointConnection,
            _message: ActionMessage,
        ) -> Result<Value, DispatchError> {
            Ok(json!({"status": "Accepted"}))
        }
    }

    struct NoRouter;

    impl ChargePointRouter for NoRouter {
        fn resolve(&self, _identity: &ChargePointIdentity) -> Option<ChargePointConnection> {
            None
        }
    }

    async fn provision(store: &Arc<InMemoryStore>) -> ChargePoint {
        use crate::domain::ChargePointRepository;
        store
            .save(ChargePoint::new(
                ChargePointIdentity::new("CP001", 1),
                100,
                ChargePointInfo::new("ACME", "One"),
            ))
            .await
            .unwrap()
    }

    fn bridge(
        store: Arc<InMemoryStore>,
        router: Arc<dyn ChargePointRouter>,
    ) -> InstructionBridge {
        let dispatcher = Arc::new(super::super::dispatcher::ActionDispatcher::new(
            router,
            Arc::new(AcceptingBroker),
            2,
        ));
        InstructionBridge::new(store.clone(), store, dispatcher)
    }

    fn remote_stop_instruction(target: &str, value: &str) -> Instruction {
        Instruction::new(INSTRUCTION_TOPIC)
            .with_param(target, value)
            .with_param(PARAM_ACTION, "RemoteStopTransaction")
            .with_param("transactionId", "42")
    }

    #[tokio::test]
    async fn foreign_topic_passes_through() {
        let store = Arc::new(InMemoryStore::new());
        let bridge = bridge(store, Arc::new(ConnectedRouter));
        let instruction = Instruction::new("SetControlParameter");
        let outcome = bridge.will_queue_instruction(instruction).await.unwrap();
        assert!(matches!(outcome, BridgeOutcome::Unhandled(i) if i.state == InstructionState::Received));
    }

    #[tokio::test]
    async fn unaddressed_instruction_passes_through() {
        let store = Arc::new(InMemoryStore::new());
        let bridge = bridge(store, Arc::new(ConnectedRouter));
        let instruction = Instruction::new(INSTRUCTION_TOPIC).with_param(PARAM_ACTION, "Reset");
        let outcome = bridge.will_queue_instruction(instruction).await.unwrap();
        assert!(matches!(outcome, BridgeOutcome::Unhandled(_)));
    }

    #[tokio::test]
    async fn unknown_charge_point_declines() {
        let store = Arc::new(InMemoryStore::new());
        let bridge = bridge(store, Arc::new(ConnectedRouter));
        let instruction = remote_stop_instruction(PARAM_CHARGE_POINT_IDENTIFIER, "GHOST");
        let outcome = bridge.will_queue_instruction(instruction).await.unwrap();
        assert!(matches!(outcome, BridgeOutcome::Declined { message } if message.contains("GHOST")));
    }

    #[tokio::test]
    async fn unknown_action_declines() {
        let store = Arc::new(InMemoryStore::new());
        provision(&store).await;
        let bridge = bridge(store, Arc::new(ConnectedRouter));
        let instruction = Instruction::new(INSTRUCTION_TOPIC)
            .with_param(PARAM_CHARGE_POINT_IDENTIFIER, "CP001")
            .with_param(PARAM_ACTION, "UpdateFirmware");
        let outcome = bridge.will_queue_instruction(instruction).await.unwrap();
        assert!(matches!(outcome, BridgeOutcome::Declined { message } if message.contains("UpdateFirmware")));
    }

    #[tokio::test]
    async fn malformed_payload_declines() {
        let store = Arc::new(InMemoryStore::new());
        provision(&store).await;
        let bridge = bridge(store, Arc::new(ConnectedRouter));
        let instruction = Instruction::new(INSTRUCTION_TOPIC)
            .with_param(PARAM_CHARGE_POINT_IDENTIFIER, "CP001")
            .with_param(PARAM_ACTION, "Reset")
            .with_param(PARAM_PAYLOAD, "{not json");
        let outcome = bridge.will_queue_instruction(instruction).await.unwrap();
        assert!(matches!(outcome, BridgeOutcome::Declined { message } if message.contains("Invalid payload JSON")));
    }

    #[tokio::test]
    async fn resolved_instruction_is_marked_executing() {
        let store = Arc::new(InMemoryStore::new());
        let cp = provision(&store).await;
        let bridge = bridge(store, Arc::new(ConnectedRouter));
        let instruction = remote_stop_instruction(PARAM_CHARGE_POINT_ID, &cp.id.to_string());
        let outcome = bridge.will_queue_instruction(instruction).await.unwrap();
        match outcome {
            BridgeOutcome::Execute {
                instruction,
                pending,
            } => {
                assert_eq!(instruction.state, InstructionState::Executing);
                assert_eq!(pending.action, ChargePointAction::RemoteStopTransaction);
                assert_eq!(pending.identity, cp.identity);
                assert_eq!(pending.payload, json!({"transactionId": 42}));
            }
            other => panic!("expected Execute, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn dispatch_success_completes_instruction() {
        let store = Arc::new(InMemoryStore::new());
        let cp = provision(&store).await;
        let bridge = bridge(store.clone(), Arc::new(ConnectedRouter));
        let outcome = bridge
            .will_queue_instruction(remote_stop_instruction(
                PARAM_CHARGE_POINT_ID,
                &cp.id.to_string(),
            ))
            .await
            .unwrap();
        let BridgeOutcome::Execute {
            instruction,
            pending,
        } = outcome
        else {
            panic!("expected Execute");
        };

        let queued = store.add_instruction(instruction);
        let id = queued.id.unwrap();
        bridge.did_queue_instruction(id, pending).await;

        let stored = store.instruction(id).unwrap();
        assert_eq!(stored.state, InstructionState::Completed);
        assert_eq!(stored.result_params.get("status").map(String::as_str), Some("Accepted"));
    }

    #[tokio::test]
    async fn dispatch_failure_declines_instruction() {
        let store = Arc::new(InMemoryStore::new());
        let cp = provision(&store).await;
        let bridge = bridge(store.clone(), Arc::new(NoRouter));
        let outcome = bridge
            .will_queue_instruction(remote_stop_instruction(
                PARAM_CHARGE_POINT_ID,
                &cp.id.to_string(),
            ))
            .await
            .unwrap();
        let BridgeOutcome::Execute {
            instruction,
            pending,
        } = outcome
        else {
            panic!("expected Execute");
        };

        let queued = store.add_instruction(instruction);
        let id = queued.id.unwrap();
        bridge.did_queue_instruction(id, pending).await;

        let stored = store.instruction(id).unwrap();
        assert_eq!(stored.state, InstructionState::Declined);
        assert!(stored.result_params.get(PARAM_ERROR).unwrap().contains("not connected"));
    }

    #[tokio::test]
    async fn late_result_never_overwrites_external_state() {
        let store = Arc::new(InMemoryStore::new());
        let cp = provision(&store).await;
        let bridge = bridge(store.clone(), Arc::new(ConnectedRouter));
        let outcome = bridge
            .will_queue_instruction(remote_stop_instruction(
                PARAM_CHARGE_POINT_ID,
                &cp.id.to_string(),
            ))
            .await
            .unwrap();
        let BridgeOutcome::Execute {
            instruction,
            pending,
        } = outcome
        else {
            panic!("expected Execute");
        };

        let queued = store.add_instruction(instruction);
        let id = queued.id.unwrap();
        // Another actor cancels before the dispatch result lands.
        store.set_instruction_state(id, InstructionState::Declined);
        bridge.did_queue_instruction(id, pending).await;

        let stored = store.instruction(id).unwrap();
        assert_eq!(stored.state, InstructionState::Declined);
        assert!(stored.result_params.is_empty());
    }

    #[test]
    fn scalar_values_keep_their_types() {
        assert_eq!(scalar_value("42"), json!(42));
        assert_eq!(scalar_value("true"), json!(true));
        assert_eq!(scalar_value("1.5"), json!(1.5));
        assert_eq!(scalar_value("Soft"), json!("Soft"));
    }
}
