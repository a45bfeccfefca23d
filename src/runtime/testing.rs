//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{ChatHandle, ChatView, ViewEvent};
use crate::chat::{parse_transcript, Message, ProductContext};
use crate::history::{HistoryResult, HistoryStore};
use crate::state_machine::ChatState;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// In-memory History Store
// ============================================================================

/// History store backed by a map, with switchable failures
#[derive(Default)]
pub struct MemoryHistory {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Saved transcript for a key, parsed
    pub fn transcript(&self, key: &str) -> Option<Vec<Message>> {
        let raw = self.entries.lock().unwrap().get(key).cloned()?;
        Some(parse_transcript(&raw).expect("saved transcript must be well-formed"))
    }

    fn unavailable() -> crate::history::HistoryError {
        std::io::Error::other("storage unavailable").into()
    }
}

impl HistoryStore for MemoryHistory {
    fn get(&self, key: &str) -> HistoryResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> HistoryResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> HistoryResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

// ============================================================================
// Mock Completion Clients
// ============================================================================

/// Completion client that returns queued results
#[derive(Default)]
pub struct MockCompletionClient {
    responses: Mutex<VecDeque<Result<String, CompletionError>>>,
    /// Transcripts of all requests made
    pub requests: Mutex<Vec<Vec<Message>>>,
}

impl MockCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_reply(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    pub fn queue_error(&self, error: CompletionError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, transcript: &[Message]) -> Result<String, CompletionError> {
        self.requests.lock().unwrap().push(transcript.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::transport("No queued response")))
    }
}

/// Completion client that waits before answering
pub struct DelayedCompletionClient {
    pub inner: MockCompletionClient,
    delay: Duration,
}

impl DelayedCompletionClient {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockCompletionClient::new(),
            delay,
        }
    }
}

#[async_trait]
impl CompletionClient for DelayedCompletionClient {
    async fn complete(&self, transcript: &[Message]) -> Result<String, CompletionError> {
        self.inner.requests.lock().unwrap().push(transcript.to_vec());
        tokio::time::sleep(self.delay).await;
        self.inner
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::transport("No queued response")))
    }
}

// ============================================================================
// Test Chat Builder
// ============================================================================

pub fn widget() -> ProductContext {
    ProductContext::new("Widget", "A widget", "{}")
}

/// Helper for running a chat against mocks with minimal boilerplate
pub struct TestChat<C: CompletionClient + 'static> {
    pub handle: ChatHandle,
    pub store: Arc<MemoryHistory>,
    pub client: Arc<C>,
    pub view_rx: broadcast::Receiver<ViewEvent>,
    product: ProductContext,
}

pub struct TestChatBuilder {
    product: ProductContext,
    store: Arc<MemoryHistory>,
    cadence: Duration,
}

impl TestChatBuilder {
    pub fn product(mut self, product: ProductContext) -> Self {
        self.product = product;
        self
    }

    pub fn store(mut self, store: Arc<MemoryHistory>) -> Self {
        self.store = store;
        self
    }

    pub fn cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn build<C: CompletionClient + 'static>(self, client: C) -> TestChat<C> {
        let client = Arc::new(client);
        let handle = ChatHandle::spawn(
            self.product.clone(),
            self.store.clone(),
            client.clone(),
            self.cadence,
        );
        let view_rx = handle.subscribe();
        TestChat {
            handle,
            store: self.store,
            client,
            view_rx,
            product: self.product,
        }
    }
}

impl TestChat<MockCompletionClient> {
    pub fn builder() -> TestChatBuilder {
        TestChatBuilder {
            product: widget(),
            store: Arc::new(MemoryHistory::new()),
            cadence: Duration::from_millis(30),
        }
    }
}

impl<C: CompletionClient + 'static> TestChat<C> {
    pub async fn submit(&self, text: &str) {
        self.handle.submit(text).await.expect("Failed to submit");
    }

    pub async fn clear(&self) {
        self.handle.clear_history().await.expect("Failed to clear");
    }

    /// Collect view events until `ReplyDone`; `None` on timeout
    pub async fn collect_until_done(&mut self, timeout: Duration) -> Option<Vec<ViewEvent>> {
        let mut seen = Vec::new();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.view_rx.recv()).await {
                Ok(Ok(ViewEvent::ReplyDone)) => return Some(seen),
                Ok(Ok(event)) => seen.push(event),
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) | Err(_) => return None,
            }
        }
    }

    pub async fn wait_for_done(&mut self, timeout: Duration) -> bool {
        self.collect_until_done(timeout).await.is_some()
    }

    /// Wait until the chat enters a state with the given name
    pub async fn wait_for_state(&self, name: &str, timeout: Duration) -> bool {
        let mut watch = self.handle.watch();
        let wait = watch.wait_for(|view| view.state.name() == name);
        let reached = matches!(tokio::time::timeout(timeout, wait).await, Ok(Ok(_)));
        reached
    }

    pub fn view(&self) -> ChatView {
        self.handle.view()
    }

    pub fn state(&self) -> ChatState {
        self.view().state
    }

    /// Full saved transcript, system context included
    pub fn saved(&self) -> Option<Vec<Message>> {
        self.store.transcript(&self.product.history_key())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{
        EMPTY_INPUT_NOTICE, GREETING, REJECTED_REPLY, TRANSPORT_FAILURE_REPLY,
    };

    const WAIT: Duration = Duration::from_secs(5);

    fn reveals(events: &[ViewEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Reveal { partial } => Some(partial.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_mock_client_pops_in_order() {
        let client = MockCompletionClient::new();
        client.queue_reply("one");
        client.queue_error(CompletionError::rejected("two"));

        let transcript = [Message::user("q")];
        assert_eq!(client.complete(&transcript).await.unwrap(), "one");
        assert!(client.complete(&transcript).await.is_err());
        // Exhausted queue behaves like a dead endpoint
        assert!(matches!(
            client.complete(&transcript).await,
            Err(CompletionError::Transport(_))
        ));
        assert_eq!(client.recorded_requests().len(), 3);
    }

    /// Widget scenario: one question, revealed reply, saved transcript
    #[tokio::test(start_paused = true)]
    async fn test_question_is_answered_and_saved() {
        let client = MockCompletionClient::new();
        client.queue_reply("Yes, it ships free.");

        let mut chat = TestChat::builder().build(client);
        chat.submit("Is shipping free?").await;

        let events = chat.collect_until_done(WAIT).await.expect("reply finished");
        let partials = reveals(&events);
        assert_eq!(partials.len(), "Yes, it ships free.".chars().count());
        assert_eq!(partials.last().map(String::as_str), Some("Yes, it ships free."));

        let saved = chat.saved().expect("transcript saved");
        assert_eq!(
            saved,
            vec![
                Message::system(widget().system_prompt()),
                Message::assistant(GREETING),
                Message::user("Is shipping free?"),
                Message::assistant("Yes, it ships free."),
            ]
        );
        assert_eq!(chat.state(), ChatState::Idle);
        assert!(chat.view().input_enabled());
        assert_eq!(chat.view().messages, saved[1..].to_vec());
    }

    /// The user message is in place before the request goes out
    #[tokio::test(start_paused = true)]
    async fn test_request_carries_full_transcript() {
        let client = MockCompletionClient::new();
        client.queue_reply("ok");

        let mut chat = TestChat::builder().build(client);
        chat.submit("  Is shipping free?  ").await;
        assert!(chat.wait_for_done(WAIT).await);

        let requests = chat.client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].len(), 3);
        assert!(requests[0][0].is_system());
        assert_eq!(requests[0][2], Message::user("Is shipping free?"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_records_error_turn() {
        let client = MockCompletionClient::new();
        client.queue_error(CompletionError::transport("connection refused"));

        let mut chat = TestChat::builder().build(client);
        chat.submit("X").await;

        let events = chat.collect_until_done(WAIT).await.expect("reply finished");
        assert!(reveals(&events).is_empty(), "failures are not revealed");

        let saved = chat.saved().unwrap();
        assert_eq!(
            saved.get(2..).unwrap(),
            [Message::user("X"), Message::assistant(TRANSPORT_FAILURE_REPLY)]
        );
        assert_eq!(chat.state(), ChatState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_reply_records_error_turn() {
        let client = MockCompletionClient::new();
        client.queue_error(CompletionError::rejected("Something went wrong!"));

        let mut chat = TestChat::builder().build(client);
        chat.submit("X").await;
        assert!(chat.wait_for_done(WAIT).await);

        let saved = chat.saved().unwrap();
        assert_eq!(saved.last(), Some(&Message::assistant(REJECTED_REPLY)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_input_shows_notice_only() {
        let client = MockCompletionClient::new();
        client.queue_reply("ok");
        let mut chat = TestChat::builder().build(client);

        chat.submit("   ").await;
        assert!(
            tokio::time::timeout(WAIT, chat.handle.watch().wait_for(|v| v.notice.is_some()))
                .await
                .is_ok()
        );
        assert_eq!(chat.view().notice.as_deref(), Some(EMPTY_INPUT_NOTICE));
        assert_eq!(chat.view().messages.len(), 1);
        assert!(chat.client.recorded_requests().is_empty());
        assert!(chat.saved().is_none());

        // The next valid submission clears the notice
        chat.submit("hello").await;
        let events = chat.collect_until_done(WAIT).await.expect("reply finished");
        assert!(events
            .iter()
            .any(|e| matches!(e, ViewEvent::Notice { text: None })));
        assert_eq!(chat.view().notice, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submissions_ignored_while_busy() {
        let client = DelayedCompletionClient::new(Duration::from_secs(1));
        client.inner.queue_reply("abc");
        client.inner.queue_reply("never used");

        let mut chat = TestChat::builder().build(client);
        chat.submit("first").await;
        assert!(chat.wait_for_state("submitting", WAIT).await);
        chat.submit("while submitting").await;

        assert!(chat.wait_for_state("revealing", WAIT).await);
        chat.submit("while revealing").await;
        assert!(chat.wait_for_done(WAIT).await);

        assert_eq!(chat.client.inner.recorded_requests().len(), 1);
        let saved = chat.saved().unwrap();
        assert_eq!(
            saved.get(2..).unwrap(),
            [Message::user("first"), Message::assistant("abc")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_reply_commits_without_reveal() {
        let client = MockCompletionClient::new();
        client.queue_reply("");

        let mut chat = TestChat::builder().build(client);
        chat.submit("q").await;

        let events = chat.collect_until_done(WAIT).await.expect("reply finished");
        assert!(reveals(&events).is_empty());
        assert_eq!(chat.saved().unwrap().last(), Some(&Message::assistant("")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_mid_request_discards_late_reply() {
        let client = DelayedCompletionClient::new(Duration::from_secs(1));
        client.inner.queue_reply("stale answer");
        client.inner.queue_reply("fresh answer");

        let mut chat = TestChat::builder().build(client);
        chat.submit("first").await;
        assert!(chat.wait_for_state("submitting", WAIT).await);

        chat.clear().await;
        assert!(chat.wait_for_state("idle", WAIT).await);
        assert!(chat.saved().is_none());

        // Let the abandoned request finish
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(chat.view().messages, vec![Message::assistant(GREETING)]);
        assert_eq!(chat.state(), ChatState::Idle);

        // The chat is usable again
        chat.submit("second").await;
        assert!(chat.wait_for_done(WAIT).await);
        let saved = chat.saved().unwrap();
        assert_eq!(
            saved.get(2..).unwrap(),
            [Message::user("second"), Message::assistant("fresh answer")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_mid_reveal_stops_typing() {
        let client = MockCompletionClient::new();
        client.queue_reply("a fairly long answer that takes a while");

        let mut chat = TestChat::builder().build(client);
        chat.submit("q").await;
        assert!(chat.wait_for_state("revealing", WAIT).await);

        chat.clear().await;
        assert!(chat.wait_for_state("idle", WAIT).await);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(chat.view().messages, vec![Message::assistant(GREETING)]);
        assert!(chat.saved().is_none());

        // No reveal output after the clear
        let mut late = Vec::new();
        while let Ok(event) = chat.view_rx.try_recv() {
            late.push(event);
        }
        let after_clear = late
            .iter()
            .rposition(|e| matches!(e, ViewEvent::Transcript { .. }))
            .map_or(&late[..], |pos| late.get(pos + 1..).unwrap_or_default());
        assert!(reveals(after_clear).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_restored_on_reopen() {
        let store = Arc::new(MemoryHistory::new());
        let client = MockCompletionClient::new();
        client.queue_reply("Yes.");

        let mut chat = TestChat::builder().store(store.clone()).build(client);
        chat.submit("Is shipping free?").await;
        assert!(chat.wait_for_done(WAIT).await);
        let before = chat.view().messages;
        chat.handle.shutdown().await;

        let reopened = TestChat::builder()
            .store(store)
            .build(MockCompletionClient::new());
        assert_eq!(reopened.view().messages, before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_mid_request_is_quiet() {
        let client = DelayedCompletionClient::new(Duration::from_secs(1));
        client.inner.queue_reply("too late");

        let chat = TestChat::builder().build(client);
        chat.submit("q").await;
        assert!(chat.wait_for_state("submitting", WAIT).await);

        let store = chat.store.clone();
        let key = widget().history_key();
        chat.handle.shutdown().await;

        // The late reply has nowhere to go and changes nothing
        tokio::time::sleep(Duration::from_secs(2)).await;
        let saved = store.transcript(&key).unwrap();
        assert_eq!(saved.last(), Some(&Message::user("q")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_mid_reveal_reopens_without_empty_turn() {
        let store = Arc::new(MemoryHistory::new());
        let client = MockCompletionClient::new();
        client.queue_reply("a reply that is still typing");

        let chat = TestChat::builder()
            .store(store.clone())
            .cadence(Duration::from_secs(1))
            .build(client);
        chat.submit("q").await;
        assert!(chat.wait_for_state("revealing", WAIT).await);
        chat.handle.shutdown().await;

        let reopened = TestChat::builder()
            .store(store)
            .build(MockCompletionClient::new());
        assert_eq!(
            reopened.view().messages,
            vec![Message::assistant(GREETING), Message::user("q")]
        );
    }
}
