//! Effects produced by state transitions

use crate::chat::Message;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append to the transcript (persists)
    AppendMessage { message: Message },

    /// Replace the reply placeholder with the final text (persists)
    FinalizeReply { content: String },

    /// Clear saved history and reseed the bootstrap pair
    ResetTranscript,

    /// Send the full transcript to the completion endpoint
    RequestCompletion,

    /// Discard the result of the in-flight request when it arrives
    AbandonRequest,

    /// Start the reveal timer, replacing any running one
    StartReveal,

    /// Publish the partial reply to the view
    PublishReveal { partial: String },

    /// Cancel the reveal timer
    StopReveal,

    /// Show or clear the inline notice
    SetNotice { notice: Option<String> },

    /// Tell the view the assistant turn is complete
    NotifyReplyDone,
}

impl Effect {
    #[must_use]
    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendMessage {
            message: Message::user(text),
        }
    }

    #[must_use]
    pub fn append_assistant(text: impl Into<String>) -> Self {
        Effect::AppendMessage {
            message: Message::assistant(text),
        }
    }

    #[must_use]
    pub fn clear_notice() -> Self {
        Effect::SetNotice { notice: None }
    }
}
