//! Automation instruction entity

use std::collections::BTreeMap;

/// Lifecycle state of a queued instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionState {
    Received,
    Executing,
    Completed,
    Declined,
}

impl std::fmt::Display for InstructionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => write!(f, "Received"),
            Self::Executing => write!(f, "Executing"),
            Self::Completed => write!(f, "Completed"),
            Self::Declined => write!(f, "Declined"),
        }
    }
}

/// Generic automation instruction bound for a charge point.
///
/// The instruction queue assigns the id when the instruction is durably
/// stored; it is `None` before that.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub id: Option<i64>,
    pub topic: String,
    pub state: InstructionState,
    pub params: BTreeMap<String, String>,
    pub result_params: BTreeMap<String, String>,
}

impl Instruction {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            id: None,
            topic: topic.into(),
            state: InstructionState::Received,
            params: BTreeMap::new(),
            result_params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}
