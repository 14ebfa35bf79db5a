//! Automation instruction types

pub mod model;

pub use model::{Instruction, InstructionState};
