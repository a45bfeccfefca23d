//! Chat submission state

use serde::{Deserialize, Serialize};

/// Submission lifecycle of one conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatState {
    /// Ready for user input
    #[default]
    Idle,

    /// Completion request in flight
    Submitting,

    /// Reply received, being disclosed one character per tick
    Revealing {
        full_text: String,
        /// Characters already published
        revealed: usize,
    },
}

impl ChatState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ChatState::Idle => "idle",
            ChatState::Submitting => "submitting",
            ChatState::Revealing { .. } => "revealing",
        }
    }

    /// Whether new input may be submitted
    #[must_use]
    pub fn accepts_input(&self) -> bool {
        matches!(self, ChatState::Idle)
    }
}
