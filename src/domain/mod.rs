//! Domain layer: core business entities, types and traits

pub mod authorization;
pub mod charge_point;
pub mod connector;
pub mod datum;
pub mod error;
pub mod instruction;
pub mod reading;
pub mod session;
pub mod settings;

// Re-export commonly used types
pub use authorization::{AuthorizationInfo, AuthorizationStatus};
pub use charge_point::{
    ChargePoint, ChargePointIdentity, ChargePointInfo, ChargePointRepository, RegistrationStatus,
};
pub use connector::{Connector, ConnectorRepository, ConnectorStatus, ConnectorStatusInfo};
pub use datum::{Datum, DatumClassification};
pub use error::{DomainError, DomainResult};
pub use instruction::{Instruction, InstructionState};
pub use reading::{Location, Measurand, Phase, Reading, ReadingContext, UnitOfMeasure};
pub use session::{ChargeSession, ChargeSessionRepository, SessionEndReason};
pub use settings::{PublishSettings, SettingsRepository, DEFAULT_SOURCE_ID_TEMPLATE};
