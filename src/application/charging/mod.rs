//! Charging session state machine and telemetry ingestion

pub mod service;

pub use service::{ChargingSessionService, EndSessionInfo, StartSessionInfo};
