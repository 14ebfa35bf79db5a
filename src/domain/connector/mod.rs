//! Connector entity and repository contract

pub mod model;
pub mod repository;

pub use model::{Connector, ConnectorStatus, ConnectorStatusInfo};
pub use repository::ConnectorRepository;
