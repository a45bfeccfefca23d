//! Trait abstractions for runtime I/O
//!
//! The runtime talks to the completion endpoint only through
//! [`CompletionClient`], so tests can substitute mocks.

use crate::api::{ChatRequest, ChatResponse};
use crate::chat::{Message, NO_RESPONSE_REPLY, REJECTED_REPLY, TRANSPORT_FAILURE_REPLY};
use crate::llm::{LlmRequest, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;

/// Why a completion request produced no reply
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    /// The endpoint answered but reported failure
    #[error("completion rejected: {0}")]
    Rejected(String),
    /// The request never produced a usable answer
    #[error("completion transport failed: {0}")]
    Transport(String),
}

impl CompletionError {
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        CompletionError::Rejected(message.into())
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        CompletionError::Transport(message.into())
    }

    /// Assistant turn recorded in the transcript for this failure
    #[must_use]
    pub fn user_reply(&self) -> &'static str {
        match self {
            CompletionError::Rejected(_) => REJECTED_REPLY,
            CompletionError::Transport(_) => TRANSPORT_FAILURE_REPLY,
        }
    }
}

/// Client for the chat completion endpoint
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send the full transcript and return the assistant reply text
    ///
    /// # Errors
    ///
    /// [`CompletionError::Rejected`] when the endpoint answers without success,
    /// [`CompletionError::Transport`] when no usable answer arrives.
    async fn complete(&self, transcript: &[Message]) -> Result<String, CompletionError>;
}

#[async_trait]
impl<T: CompletionClient + ?Sized> CompletionClient for Arc<T> {
    async fn complete(&self, transcript: &[Message]) -> Result<String, CompletionError> {
        (**self).complete(transcript).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Talks to a completion proxy over HTTP (`POST <base>/api/chat`)
#[derive(Clone)]
pub struct ProxyCompletionClient {
    client: Client,
    endpoint: String,
}

impl ProxyCompletionClient {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, CompletionError> {
        // No request timeout: the chat waits as long as the proxy does
        let client = Client::builder()
            .build()
            .map_err(|e| CompletionError::transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Map a proxy reply body to the completion outcome.
///
/// The `success` flag decides, whatever the HTTP status was.
pub(crate) fn interpret_proxy_reply(status: u16, body: &str) -> Result<String, CompletionError> {
    let reply: ChatResponse = serde_json::from_str(body).map_err(|e| {
        CompletionError::transport(format!("Unreadable proxy reply (status {status}): {e}"))
    })?;
    if reply.success {
        Ok(reply.message.unwrap_or_default())
    } else {
        Err(CompletionError::rejected(
            reply.error.unwrap_or_else(|| format!("status {status}")),
        ))
    }
}

#[async_trait]
impl CompletionClient for ProxyCompletionClient {
    async fn complete(&self, transcript: &[Message]) -> Result<String, CompletionError> {
        let body = ChatRequest {
            messages: transcript.to_vec(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| CompletionError::transport(format!("Failed to read response: {e}")))?;

        interpret_proxy_reply(status, &text)
    }
}

/// Calls the LLM service in-process, skipping the proxy
#[derive(Clone)]
pub struct DirectCompletionClient {
    service: Arc<dyn LlmService>,
}

impl DirectCompletionClient {
    #[must_use]
    pub fn new(service: Arc<dyn LlmService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl CompletionClient for DirectCompletionClient {
    async fn complete(&self, transcript: &[Message]) -> Result<String, CompletionError> {
        let request = LlmRequest::from_transcript(transcript);
        let response = self
            .service
            .complete(&request)
            .await
            .map_err(|e| CompletionError::transport(e.message))?;
        Ok(response
            .text
            .unwrap_or_else(|| NO_RESPONSE_REPLY.to_string()))
    }
}
