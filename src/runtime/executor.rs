//! Chat runtime executor

use super::reveal::RevealController;
use super::traits::CompletionClient;
use super::{ChatView, ViewEvent};

use crate::chat::{Conversation, EMPTY_INPUT_NOTICE};
use crate::state_machine::{transition, ChatState, Effect, Event, TransitionError};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Single-owner runtime for one product conversation.
///
/// Processes events one at a time: pure transition first, then effects.
pub struct ChatRuntime<C>
where
    C: CompletionClient + 'static,
{
    conversation: Conversation,
    state: ChatState,
    notice: Option<String>,
    client: Arc<C>,
    reveal: RevealController,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    view_tx: broadcast::Sender<ViewEvent>,
    snapshot_tx: watch::Sender<ChatView>,
    /// Id of the completion request whose result is still wanted
    pending_request: Option<u64>,
    next_request: u64,
    shutdown: CancellationToken,
}

impl<C> ChatRuntime<C>
where
    C: CompletionClient + 'static,
{
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        conversation: Conversation,
        client: C,
        reveal: RevealController,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::Sender<Event>,
        view_tx: broadcast::Sender<ViewEvent>,
        snapshot_tx: watch::Sender<ChatView>,
        shutdown: CancellationToken,
    ) -> Self {
        let runtime = Self {
            conversation,
            state: ChatState::Idle,
            notice: None,
            client: Arc::new(client),
            reveal,
            event_rx,
            event_tx,
            view_tx,
            snapshot_tx,
            pending_request: None,
            next_request: 0,
            shutdown,
        };
        runtime.refresh_snapshot();
        runtime
    }

    pub async fn run(mut self) {
        let key = self.conversation.product().history_key();
        tracing::info!(key = %key, messages = self.conversation.len(), "Starting chat runtime");

        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                biased;

                () = shutdown.cancelled() => break,

                Some(event) = self.event_rx.recv() => {
                    self.process_event(event);
                }

                else => break,
            }
        }

        // Pending timers are cleared; late completions find the channel closed
        let interrupted = self.reveal.is_active() || self.pending_request.is_some();
        self.reveal.cancel();
        self.pending_request = None;
        tracing::info!(key = %key, interrupted, "Chat runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        if let Event::RevealTick { generation } = &event {
            if !self.reveal.is_current(*generation) {
                tracing::debug!(generation, "Dropping tick from superseded reveal");
                return;
            }
        }

        if let Some(request) = event.request_id() {
            if self.pending_request != Some(request) {
                tracing::debug!(request, "Discarding result of abandoned request");
                return;
            }
            self.pending_request = None;
        }

        let result = match transition(&self.state, event) {
            Ok(r) => r,
            Err(TransitionError::EmptyInput) => {
                self.set_notice(Some(EMPTY_INPUT_NOTICE.to_string()));
                self.refresh_snapshot();
                return;
            }
            Err(e @ TransitionError::Busy) => {
                tracing::debug!(state = self.state.name(), "{e}, ignoring submission");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropping event");
                return;
            }
        };

        let old_state = std::mem::replace(&mut self.state, result.new_state);
        if old_state.name() != self.state.name() {
            tracing::debug!(from = old_state.name(), to = self.state.name(), "State change");
            let _ = self.view_tx.send(ViewEvent::StateChange {
                state: self.state.clone(),
            });
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }

        self.refresh_snapshot();
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendMessage { message } => {
                self.conversation.append(message);
                self.publish_transcript();
            }

            Effect::FinalizeReply { content } => {
                self.conversation.finalize_reply(&content);
                self.publish_transcript();
            }

            Effect::ResetTranscript => {
                self.conversation.reset();
                self.publish_transcript();
            }

            Effect::RequestCompletion => {
                self.next_request += 1;
                let request = self.next_request;
                self.pending_request = Some(request);

                // Snapshot now: the request carries the transcript as submitted
                let transcript = self.conversation.messages().to_vec();
                let client = self.client.clone();
                let event_tx = self.event_tx.clone();

                tokio::spawn(async move {
                    tracing::info!(request, turns = transcript.len(), "Requesting completion");

                    let event = match client.complete(&transcript).await {
                        Ok(text) => Event::CompletionSucceeded { request, text },
                        Err(error) => {
                            tracing::warn!(request, error = %error, "Completion failed");
                            Event::CompletionFailed { request, error }
                        }
                    };

                    if event_tx.send(event).await.is_err() {
                        tracing::debug!(request, "Chat closed before completion arrived");
                    }
                });
            }

            Effect::AbandonRequest => {
                if let Some(request) = self.pending_request.take() {
                    tracing::info!(request, "Abandoning in-flight completion");
                }
            }

            Effect::StartReveal => {
                self.reveal.start(self.event_tx.clone());
            }

            Effect::PublishReveal { partial } => {
                let _ = self.view_tx.send(ViewEvent::Reveal { partial });
            }

            Effect::StopReveal => {
                self.reveal.cancel();
            }

            Effect::SetNotice { notice } => {
                self.set_notice(notice);
            }

            Effect::NotifyReplyDone => {
                let _ = self.view_tx.send(ViewEvent::ReplyDone);
            }
        }
    }

    fn set_notice(&mut self, notice: Option<String>) {
        if self.notice == notice {
            return;
        }
        self.notice.clone_from(&notice);
        let _ = self.view_tx.send(ViewEvent::Notice { text: notice });
    }

    fn publish_transcript(&self) {
        let _ = self.view_tx.send(ViewEvent::Transcript {
            messages: self.conversation.visible().to_vec(),
        });
    }

    fn refresh_snapshot(&self) {
        self.snapshot_tx.send_replace(ChatView {
            messages: self.conversation.visible().to_vec(),
            state: self.state.clone(),
            notice: self.notice.clone(),
        });
    }
}
