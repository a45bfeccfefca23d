//! Runtime for driving one product chat
//!
//! A spawned [`ChatRuntime`] owns the conversation and its state machine.
//! Front-ends talk to it through a [`ChatHandle`]: events go in over an mpsc
//! channel, view updates come out over a broadcast channel, and the latest
//! full view is kept in a watch channel.

mod executor;
mod reveal;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::ChatRuntime;
pub use reveal::{RevealController, DEFAULT_CADENCE};
pub use traits::*;

use crate::chat::{Conversation, Message, ProductContext};
use crate::history::HistoryStore;
use crate::state_machine::{ChatState, Event};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Updates pushed to the view while the chat runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewEvent {
    /// Visible transcript changed (system context excluded)
    Transcript { messages: Vec<Message> },
    /// Partial assistant reply during the typing effect
    Reveal { partial: String },
    /// Inline notice shown or cleared
    Notice { text: Option<String> },
    StateChange { state: ChatState },
    /// The assistant turn is complete; input is enabled again
    ReplyDone,
}

/// Full view of the chat at one point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChatView {
    pub messages: Vec<Message>,
    pub state: ChatState,
    pub notice: Option<String>,
}

impl ChatView {
    /// Whether the input box should accept a submission
    #[must_use]
    pub fn input_enabled(&self) -> bool {
        self.state.accepts_input()
    }
}

/// The runtime has shut down
#[derive(Debug, Error)]
#[error("chat session has ended")]
pub struct ChatClosed;

/// Handle to a running chat. Dropping it tears the chat down.
pub struct ChatHandle {
    event_tx: mpsc::Sender<Event>,
    view_tx: broadcast::Sender<ViewEvent>,
    snapshot_rx: watch::Receiver<ChatView>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ChatHandle {
    /// Open the conversation for `product` and start its runtime
    #[must_use]
    pub fn spawn<C>(
        product: ProductContext,
        store: Arc<dyn HistoryStore>,
        client: C,
        cadence: Duration,
    ) -> Self
    where
        C: CompletionClient + 'static,
    {
        let conversation = Conversation::initialize(product, store);

        let (event_tx, event_rx) = mpsc::channel(32);
        let (view_tx, _) = broadcast::channel(256);
        let (snapshot_tx, snapshot_rx) = watch::channel(ChatView::default());
        let shutdown = CancellationToken::new();

        let runtime = ChatRuntime::new(
            conversation,
            client,
            RevealController::new(cadence),
            event_rx,
            event_tx.clone(),
            view_tx.clone(),
            snapshot_tx,
            shutdown.clone(),
        );
        let task = tokio::spawn(runtime.run());

        Self {
            event_tx,
            view_tx,
            snapshot_rx,
            shutdown,
            task: Some(task),
        }
    }

    /// Submit user input. Empty or busy submissions are handled by the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ChatClosed`] once the chat has shut down.
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), ChatClosed> {
        self.send(Event::user_submit(text)).await
    }

    /// Reset the conversation, abandoning any reply in progress.
    ///
    /// # Errors
    ///
    /// Returns [`ChatClosed`] once the chat has shut down.
    pub async fn clear_history(&self) -> Result<(), ChatClosed> {
        self.send(Event::ClearHistory).await
    }

    async fn send(&self, event: Event) -> Result<(), ChatClosed> {
        if self.shutdown.is_cancelled() {
            return Err(ChatClosed);
        }
        self.event_tx.send(event).await.map_err(|_| ChatClosed)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.view_tx.subscribe()
    }

    /// Latest full view
    #[must_use]
    pub fn view(&self) -> ChatView {
        self.snapshot_rx.borrow().clone()
    }

    /// Watch the full view for changes
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ChatView> {
        self.snapshot_rx.clone()
    }

    /// Stop the runtime and wait for it to finish
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Chat runtime task failed");
            }
        }
    }
}

impl Drop for ChatHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
