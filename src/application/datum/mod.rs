//! Datum derivation engine
//!
//! Pure, table-driven mapping from protocol readings to time-series datum
//! properties, plus the settings-gated publish path.

pub mod normalize;
pub mod properties;
pub mod publisher;
pub mod source_id;

pub use normalize::normalized_value;
pub use properties::{measurand_property, property_name, MEASURAND_PROPERTIES};
pub use publisher::DatumPublisher;
pub use source_id::resolve_source_id;
