//! Sampled meter reading types

pub mod model;

pub use model::{Location, Measurand, Phase, Reading, ReadingContext, UnitOfMeasure};
