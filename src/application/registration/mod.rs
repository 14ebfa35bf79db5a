//! Registration and connector topology reconciliation

pub mod service;

pub use service::{RegistrationService, CONNECTOR_COUNT_KEY};
