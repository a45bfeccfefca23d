//! Events that can occur in a conversation

use crate::runtime::CompletionError;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSubmit { text: String },
    ClearHistory,

    // Completion events, tagged with the request that produced them
    CompletionSucceeded { request: u64, text: String },
    CompletionFailed { request: u64, error: CompletionError },

    // Reveal timer
    RevealTick { generation: u64 },
}

impl Event {
    #[must_use]
    pub fn user_submit(text: impl Into<String>) -> Self {
        Event::UserSubmit { text: text.into() }
    }

    /// Request id carried by completion events
    #[must_use]
    pub fn request_id(&self) -> Option<u64> {
        match self {
            Event::CompletionSucceeded { request, .. } | Event::CompletionFailed { request, .. } => {
                Some(*request)
            }
            _ => None,
        }
    }
}
