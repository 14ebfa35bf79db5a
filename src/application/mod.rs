//! Application layer: business logic and use cases

pub mod charging;
pub mod datum;
pub mod dispatch;
pub mod identity;
pub mod ports;
pub mod registration;

pub use charging::{ChargingSessionService, EndSessionInfo, StartSessionInfo};
pub use datum::DatumPublisher;
pub use dispatch::{ActionDispatcher, InstructionBridge};
pub use identity::IdentityService;
pub use registration::RegistrationService;
