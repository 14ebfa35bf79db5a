//! Connector domain entity

use chrono::{DateTime, Utc};

/// Connector status on a charge point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorStatus {
    Available,
    Preparing,
    Charging,
    SuspendedEV,
    SuspendedEVSE,
    Finishing,
    Reserved,
    Unavailable,
    Faulted,
    Unknown,
}

impl Default for ConnectorStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "Available"),
            Self::Preparing => write!(f, "Preparing"),
            Self::Charging => write!(f, "Charging"),
            Self::SuspendedEV => write!(f, "SuspendedEV"),
            Self::SuspendedEVSE => write!(f, "SuspendedEVSE"),
            Self::Finishing => write!(f, "Finishing"),
            Self::Reserved => write!(f, "Reserved"),
            Self::Unavailable => write!(f, "Unavailable"),
            Self::Faulted => write!(f, "Faulted"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Latest reported status of a connector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorStatusInfo {
    pub status: ConnectorStatus,
    pub error_code: Option<String>,
    pub info: Option<String>,
    pub vendor_id: Option<String>,
    pub vendor_error_code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Default for ConnectorStatusInfo {
    fn default() -> Self {
        Self {
            status: ConnectorStatus::default(),
            error_code: None,
            info: None,
            vendor_id: None,
            vendor_error_code: None,
            timestamp: Utc::now(),
        }
    }
}

/// Connector on a charge point, numbered from 1
#[derive(Debug, Clone)]
pub struct Connector {
    pub charge_point_id: i64,
    pub connector_id: i32,
    pub status: ConnectorStatusInfo,
}

impl Connector {
    pub fn new(charge_point_id: i64, connector_id: i32) -> Self {
        Self {
            charge_point_id,
            connector_id,
            status: ConnectorStatusInfo::default(),
        }
    }
}
