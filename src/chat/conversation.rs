//! Per-product conversation store
//!
//! Owns the transcript for one product, restores it from the history store
//! when the product is opened, and writes it back after every change once
//! it has grown past the bootstrap pair. An empty reply placeholder is never
//! written; the transcript is saved again once the reply is filled in.

use super::message::{Message, Role};
use super::GREETING;
use crate::history::HistoryStore;
use std::sync::Arc;
use thiserror::Error;

/// Number of messages seeded for a fresh conversation (system + greeting)
pub const BOOTSTRAP_LEN: usize = 2;

/// Storage key prefix; the product title follows
pub const HISTORY_KEY_PREFIX: &str = "chatHistory_";

/// The product a conversation is about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductContext {
    pub title: String,
    pub description: String,
    /// Opaque product record, folded verbatim into the system prompt
    pub metadata: String,
}

impl ProductContext {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        metadata: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            metadata: metadata.into(),
        }
    }

    /// Storage key for this product's saved transcript
    #[must_use]
    pub fn history_key(&self) -> String {
        format!("{HISTORY_KEY_PREFIX}{}", self.title)
    }

    #[must_use]
    pub fn system_prompt(&self) -> String {
        format!(
            "You are a product assistant. Here is the product information:\n\n\
             **Title:** {}\n\n\
             **Description:** {}\n\n\
             **Data:** {}",
            self.title, self.description, self.metadata
        )
    }

    /// The default system + greeting pair
    #[must_use]
    pub fn bootstrap(&self) -> Vec<Message> {
        vec![
            Message::system(self.system_prompt()),
            Message::assistant(GREETING),
        ]
    }
}

/// Why a saved transcript was not adopted
#[derive(Debug, Error)]
pub enum CorruptHistory {
    #[error("not a JSON message array: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("saved transcript is empty")]
    Empty,
    #[error("first message is not the system context")]
    MissingSystem,
    #[error("extra system message at position {0}")]
    StraySystem(usize),
}

/// Parse and validate a saved transcript
///
/// # Errors
///
/// Returns [`CorruptHistory`] for anything other than a non-empty message
/// list that starts with its only system message.
pub fn parse_transcript(raw: &str) -> Result<Vec<Message>, CorruptHistory> {
    let messages: Vec<Message> = serde_json::from_str(raw)?;
    let Some(first) = messages.first() else {
        return Err(CorruptHistory::Empty);
    };
    if !first.is_system() {
        return Err(CorruptHistory::MissingSystem);
    }
    if let Some(pos) = messages.iter().skip(1).position(Message::is_system) {
        return Err(CorruptHistory::StraySystem(pos + 1));
    }
    Ok(messages)
}

/// Transcript for one product, backed by a history store
pub struct Conversation {
    product: ProductContext,
    messages: Vec<Message>,
    store: Arc<dyn HistoryStore>,
    /// Trailing assistant message is a placeholder awaiting its reply
    awaiting_reply: bool,
}

impl Conversation {
    /// Restore the saved transcript for `product`, or seed the bootstrap pair.
    ///
    /// Never fails: unreadable or malformed history falls back to defaults.
    #[must_use]
    pub fn initialize(product: ProductContext, store: Arc<dyn HistoryStore>) -> Self {
        let key = product.history_key();
        let messages = match store.get(&key) {
            Ok(Some(raw)) => match parse_transcript(&raw) {
                Ok(messages) => {
                    tracing::debug!(key = %key, count = messages.len(), "Restored chat history");
                    messages
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Ignoring malformed chat history");
                    product.bootstrap()
                }
            },
            Ok(None) => product.bootstrap(),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read chat history");
                product.bootstrap()
            }
        };

        Self {
            product,
            messages,
            store,
            awaiting_reply: false,
        }
    }

    #[must_use]
    pub fn product(&self) -> &ProductContext {
        &self.product
    }

    /// Full transcript, system message included
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages shown to the user (everything after the system context)
    #[must_use]
    pub fn visible(&self) -> &[Message] {
        self.messages.get(1..).unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message and persist.
    ///
    /// An empty assistant message marks a pending reply and is held back
    /// from storage until [`Conversation::finalize_reply`].
    pub fn append(&mut self, message: Message) {
        debug_assert!(!message.is_system(), "system context is seeded, never appended");
        self.awaiting_reply = message.role == Role::Assistant && message.content.is_empty();
        self.messages.push(message);
        self.persist();
    }

    /// Fill the trailing empty assistant placeholder with the final reply.
    ///
    /// Without a placeholder the reply is appended instead.
    pub fn finalize_reply(&mut self, content: &str) {
        match self.messages.last_mut() {
            Some(last) if last.role == Role::Assistant && last.content.is_empty() => {
                content.clone_into(&mut last.content);
            }
            _ => {
                tracing::warn!(
                    key = %self.product.history_key(),
                    "No reply placeholder to finalize, appending"
                );
                self.messages.push(Message::assistant(content));
            }
        }
        self.awaiting_reply = false;
        self.persist();
    }

    /// Write the transcript once it holds more than the bootstrap pair.
    ///
    /// Write failures are logged; the in-memory transcript stays authoritative.
    pub fn persist(&self) {
        if self.messages.len() <= BOOTSTRAP_LEN || self.awaiting_reply {
            return;
        }
        let key = self.product.history_key();
        let value = match serde_json::to_string(&self.messages) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Failed to serialize chat history");
                return;
            }
        };
        if let Err(e) = self.store.set(&key, &value) {
            tracing::error!(key = %key, error = %e, "Failed to save chat history");
        }
    }

    /// Drop the saved transcript and reseed the bootstrap pair
    pub fn reset(&mut self) {
        let key = self.product.history_key();
        if let Err(e) = self.store.remove(&key) {
            tracing::error!(key = %key, error = %e, "Failed to clear chat history");
        }
        self.messages = self.product.bootstrap();
        self.awaiting_reply = false;
        tracing::info!(key = %key, "Chat history cleared");
    }
}
