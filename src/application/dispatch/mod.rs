//! Asynchronous action dispatch to charge points
//!
//! ## Architecture
//!
//! ```text
//! services / instruction queue ──► ActionDispatcher ──► ChargePointRouter (resolve)
//!                                        │                      │
//!                                  bounded tokio task     ChargePointBroker (send)
//!                                        │
//!                            oneshot::Receiver<DispatchResult>
//! ```
//!
//! - [`ActionDispatcher`] — resolves a live connection and hands a
//!   correlated request to the broker on a bounded worker, delivering the
//!   outcome through a per-call result channel written exactly once.
//! - [`InstructionBridge`] — translates generic automation instructions
//!   into action messages and folds dispatch results back into
//!   instruction state.

pub mod bridge;
pub mod dispatcher;

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::ChargePointIdentity;

pub use bridge::{
    ActionPayloadDecoder, BridgeOutcome, InstructionBridge, JsonPayloadDecoder, PendingAction,
    INSTRUCTION_TOPIC,
};
pub use dispatcher::{create_action_dispatcher, ActionDispatcher, SharedActionDispatcher};

/// Actions the central system can send to a charge point.
///
/// Version-agnostic names; the broker serialises the concrete wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChargePointAction {
    ChangeAvailability,
    ChangeConfiguration,
    DataTransfer,
    GetConfiguration,
    RemoteStartTransaction,
    RemoteStopTransaction,
    Reset,
    TriggerMessage,
    UnlockConnector,
}

impl ChargePointAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChangeAvailability => "ChangeAvailability",
            Self::ChangeConfiguration => "ChangeConfiguration",
            Self::DataTransfer => "DataTransfer",
            Self::GetConfiguration => "GetConfiguration",
            Self::RemoteStartTransaction => "RemoteStartTransaction",
            Self::RemoteStopTransaction => "RemoteStopTransaction",
            Self::Reset => "Reset",
            Self::TriggerMessage => "TriggerMessage",
            Self::UnlockConnector => "UnlockConnector",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ChangeAvailability" => Some(Self::ChangeAvailability),
            "ChangeConfiguration" => Some(Self::ChangeConfiguration),
            "DataTransfer" => Some(Self::DataTransfer),
            "GetConfiguration" => Some(Self::GetConfiguration),
            "RemoteStartTransaction" => Some(Self::RemoteStartTransaction),
            "RemoteStopTransaction" => Some(Self::RemoteStopTransaction),
            "Reset" => Some(Self::Reset),
            "TriggerMessage" => Some(Self::TriggerMessage),
            "UnlockConnector" => Some(Self::UnlockConnector),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChargePointAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One correlated outbound request
#[derive(Debug, Clone)]
pub struct ActionMessage {
    pub identity: ChargePointIdentity,
    pub correlation_id: Uuid,
    pub action: ChargePointAction,
    pub payload: Value,
}

/// Failure modes of an action dispatch
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No live connection exists for the target charge point.
    #[error("Charge point not connected: {0}")]
    ClientUnavailable(String),
    /// The charge point answered with a protocol-level error.
    #[error("CallError {code}: {message}")]
    Protocol { code: String, message: String },
    /// The dispatcher was shut down before the result was delivered.
    #[error("Dispatcher shut down")]
    Shutdown,
}

/// Outcome delivered through a dispatch result channel
pub type DispatchResult = Result<Value, DispatchError>;

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_name_round_trip() {
        for action in [
            ChargePointAction::ChangeAvailability,
            ChargePointAction::ChangeConfiguration,
            ChargePointAction::DataTransfer,
            ChargePointAction::GetConfiguration,
            ChargePointAction::RemoteStartTransaction,
            ChargePointAction::RemoteStopTransaction,
            ChargePointAction::Reset,
            ChargePointAction::TriggerMessage,
            ChargePointAction::UnlockConnector,
        ] {
            assert_eq!(ChargePointAction::from_name(action.name()), Some(action));
        }
        assert!(ChargePointAction::from_name("UpdateFirmware").is_none());
    }
}
