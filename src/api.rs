//! HTTP completion proxy
//!
//! Forwards a chat transcript to the configured LLM and answers with a
//! `{success, message}` payload the chat client understands.

mod handlers;
mod types;

pub use handlers::{create_router, FAILURE_MESSAGE};
pub use types::*;

use crate::llm::LlmService;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// `None` when no provider credentials are configured
    pub llm: Option<Arc<dyn LlmService>>,
}

impl AppState {
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LlmService>>) -> Self {
        Self { llm }
    }
}
