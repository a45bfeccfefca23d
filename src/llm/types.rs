//! Common types for LLM interactions

use crate::chat::{Message, Role};

/// LLM request
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    /// System prompt sections, joined in order
    pub system: Vec<String>,
    pub messages: Vec<LlmMessage>,
}

impl LlmRequest {
    /// Split a chat transcript into system prompt and conversation turns
    #[must_use]
    pub fn from_transcript(transcript: &[Message]) -> Self {
        let mut request = Self::default();
        for message in transcript {
            match message.role {
                Role::System => request.system.push(message.content.clone()),
                Role::User => request.messages.push(LlmMessage::user(&message.content)),
                Role::Assistant => request
                    .messages
                    .push(LlmMessage::assistant(&message.content)),
            }
        }
        request
    }

    #[must_use]
    pub fn system_text(&self) -> Option<String> {
        if self.system.is_empty() {
            None
        } else {
            Some(self.system.join("\n\n"))
        }
    }
}

/// Message in conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmMessage {
    pub role: MessageRole,
    pub text: String,
}

impl LlmMessage {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

/// LLM response
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    /// First choice text; `None` when the provider returned no content
    pub text: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

/// Usage statistics
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
