//! Sampled meter reading entity
//!
//! Wire spellings follow the OCPP 1.6 `SampledValue` vocabulary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context in which a reading was taken.
///
/// Variant order puts transaction boundaries at their natural position
/// when readings are sorted: begin records first, end records last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReadingContext {
    #[serde(rename = "Transaction.Begin")]
    TransactionBegin,
    #[serde(rename = "Interruption.Begin")]
    InterruptionBegin,
    #[serde(rename = "Sample.Clock")]
    SampleClock,
    #[serde(rename = "Sample.Periodic")]
    SamplePeriodic,
    Trigger,
    Other,
    #[serde(rename = "Interruption.End")]
    InterruptionEnd,
    #[serde(rename = "Transaction.End")]
    TransactionEnd,
}

impl Default for ReadingContext {
    fn default() -> Self {
        Self::SamplePeriodic
    }
}

/// Physical quantity a reading represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Measurand {
    #[serde(rename = "Current.Export")]
    CurrentExport,
    #[serde(rename = "Current.Import")]
    CurrentImport,
    #[serde(rename = "Current.Offered")]
    CurrentOffered,
    #[serde(rename = "Energy.Active.Export.Register")]
    EnergyActiveExportRegister,
    #[serde(rename = "Energy.Active.Import.Register")]
    EnergyActiveImportRegister,
    #[serde(rename = "Energy.Reactive.Export.Register")]
    EnergyReactiveExportRegister,
    #[serde(rename = "Energy.Reactive.Import.Register")]
    EnergyReactiveImportRegister,
    #[serde(rename = "Energy.Active.Export.Interval")]
    EnergyActiveExportInterval,
    #[serde(rename = "Energy.Active.Import.Interval")]
    EnergyActiveImportInterval,
    #[serde(rename = "Energy.Reactive.Export.Interval")]
    EnergyReactiveExportInterval,
    #[serde(rename = "Energy.Reactive.Import.Interval")]
    EnergyReactiveImportInterval,
    Frequency,
    #[serde(rename = "Power.Active.Export")]
    PowerActiveExport,
    #[serde(rename = "Power.Active.Import")]
    PowerActiveImport,
    #[serde(rename = "Power.Factor")]
    PowerFactor,
    #[serde(rename = "Power.Offered")]
    PowerOffered,
    #[serde(rename = "Power.Reactive.Export")]
    PowerReactiveExport,
    #[serde(rename = "Power.Reactive.Import")]
    PowerReactiveImport,
    RPM,
    SoC,
    Temperature,
    Voltage,
}

impl Default for Measurand {
    fn default() -> Self {
        Self::EnergyActiveImportRegister
    }
}

/// Electrical phase a reading was sampled on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    L1,
    L2,
    L3,
    N,
    #[serde(rename = "L1-N")]
    L1N,
    #[serde(rename = "L2-N")]
    L2N,
    #[serde(rename = "L3-N")]
    L3N,
    #[serde(rename = "L1-L2")]
    L1L2,
    #[serde(rename = "L2-L3")]
    L2L3,
    #[serde(rename = "L3-L1")]
    L3L1,
}

/// Where on the charging circuit a reading was sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Location {
    Body,
    Cable,
    EV,
    Inlet,
    Outlet,
}

impl Default for Location {
    fn default() -> Self {
        Self::Outlet
    }
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Body => "Body",
            Self::Cable => "Cable",
            Self::EV => "EV",
            Self::Inlet => "Inlet",
            Self::Outlet => "Outlet",
        }
    }
}

/// Unit a raw reading value is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitOfMeasure {
    Wh,
    #[serde(rename = "kWh")]
    KWh,
    #[serde(rename = "varh")]
    Varh,
    #[serde(rename = "kvarh")]
    Kvarh,
    W,
    #[serde(rename = "kW")]
    KW,
    VA,
    #[serde(rename = "kVA")]
    KVA,
    #[serde(rename = "var")]
    Var,
    #[serde(rename = "kvar")]
    Kvar,
    A,
    V,
    Celsius,
    Fahrenheit,
    K,
    Percent,
}

impl Default for UnitOfMeasure {
    fn default() -> Self {
        Self::Wh
    }
}

/// One timestamped telemetry sample.
///
/// Field order drives the derived ordering: readings sort by timestamp,
/// then context, before any other field is considered. Equality is full
/// content equality, which is what reading ingestion dedupes on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub context: ReadingContext,
    pub measurand: Measurand,
    pub phase: Option<Phase>,
    pub location: Option<Location>,
    pub unit: Option<UnitOfMeasure>,
    pub value: Decimal,
    /// Owning charge session, absent for session-less meter values
    pub session_id: Option<Uuid>,
}

impl Reading {
    pub fn new(measurand: Measurand, value: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            context: ReadingContext::default(),
            measurand,
            phase: None,
            location: None,
            unit: None,
            value,
            session_id: None,
        }
    }

    pub fn with_context(mut self, context: ReadingContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_unit(mut self, unit: UnitOfMeasure) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn for_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

// ── Tests ──────────────────────────────────────────────────────
