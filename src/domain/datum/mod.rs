//! Derived time-series datum types

pub mod model;

pub use model::{Datum, DatumClassification};
