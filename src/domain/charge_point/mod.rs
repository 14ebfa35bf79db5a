//! Charge point entity and repository contract

pub mod model;
pub mod repository;

pub use model::{ChargePoint, ChargePointIdentity, ChargePointInfo, RegistrationStatus};
pub use repository::ChargePointRepository;
