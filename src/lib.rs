//! # OCPP Central System Core
//!
//! Core services of an OCPP central system for managing EV charging
//! stations: registration handshakes and connector reconciliation, the
//! charging session state machine with idempotent telemetry ingestion,
//! asynchronous action dispatch, and derivation of time-series datums
//! from meter readings.
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **domain**: Core business entities, types and repository traits
//! - **application**: Business logic, use cases and outbound ports
//! - **infrastructure**: Backing store implementations
//!
//! The wire transport, SQL persistence, authorization backend and
//! time-series sinks are external: the application services consume them
//! through the traits in [`application::ports`] and the repository traits
//! in [`domain`].

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::ServiceConfig;
