//! Outbound ports consumed by the application services

pub mod outbound;

pub use outbound::{
    AuthorizationService, ChargePointBroker, ChargePointConnection, ChargePointRouter, DatumStore,
    InstructionStore, StreamPublisher,
};
