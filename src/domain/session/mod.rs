//! Charge session entity and repository contract

pub mod model;
pub mod repository;

pub use model::{ChargeSession, SessionEndReason};
pub use repository::ChargeSessionRepository;
