//! Outbound ports — capabilities the core consumes from the outside
//!
//! These traits decouple the application services from the concrete
//! transport, authorization backend and time-series sinks. Production
//! implementations live outside this crate; tests use in-process stubs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::application::dispatch::{ActionMessage, DispatchError};
use crate::domain::{
    AuthorizationInfo, ChargePointIdentity, Datum, DomainResult, InstructionState,
};

/// A live connection to a charge point, resolved by the router.
#[derive(Debug, Clone)]
pub struct ChargePointConnection {
    pub identity: ChargePointIdentity,
    /// Transport-assigned connection id
    pub connection_id: String,
}

/// Resolves a charge point identity to a live connection, if one exists.
pub trait ChargePointRouter: Send + Sync {
    fn resolve(&self, identity: &ChargePointIdentity) -> Option<ChargePointConnection>;
}

/// Performs one correlated request/response exchange over a live connection.
///
/// The broker owns response timeouts and payload decoding and resolves
/// exactly once per message, with either the decoded response payload or
/// an error.
#[async_trait]
pub trait ChargePointBroker: Send + Sync {
    async fn send(
        &self,
        connection: ChargePointConnection,
        message: ActionMessage,
    ) -> Result<Value, DispatchError>;
}

/// Authorizes a token against a charge point identity.
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    async fn authorize(
        &self,
        identity: &ChargePointIdentity,
        token: &str,
    ) -> DomainResult<AuthorizationInfo>;
}

/// Primary time-series store for derived datums.
#[async_trait]
pub trait DatumStore: Send + Sync {
    async fn store(&self, datum: Datum) -> DomainResult<()>;
}

/// Streaming publisher for derived datums.
#[async_trait]
pub trait StreamPublisher: Send + Sync {
    async fn publish(&self, datum: Datum) -> DomainResult<()>;
}

/// State transitions on durably queued instructions.
#[async_trait]
pub trait InstructionStore: Send + Sync {
    /// Move an instruction from `expected` to `next`, merging the result
    /// parameters. Returns `false` without touching the instruction when
    /// its state has already left `expected`.
    async fn compare_and_set_state(
        &self,
        instruction_id: i64,
        expected: InstructionState,
        next: InstructionState,
        result_params: BTreeMap<String, String>,
    ) -> DomainResult<bool>;
}
