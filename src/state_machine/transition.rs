//! Pure state transition function
//!
//! Given the current state and an event, decide the next state and the
//! effects the runtime must carry out. No I/O happens here.

use super::{ChatState, Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    #[must_use]
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Message is empty")]
    EmptyInput,
    #[error("A reply is still in progress")]
    Busy,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// # Errors
///
/// [`TransitionError::EmptyInput`] for blank input, [`TransitionError::Busy`]
/// for input while a reply is pending, and [`TransitionError::InvalidTransition`]
/// for events the current state does not handle.
pub fn transition(state: &ChatState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Submission
        // ============================================================

        // Input is disabled while a reply is pending or being revealed
        (ChatState::Submitting | ChatState::Revealing { .. }, Event::UserSubmit { .. }) => {
            Err(TransitionError::Busy)
        }

        (ChatState::Idle, Event::UserSubmit { text }) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyInput);
            }
            Ok(TransitionResult::new(ChatState::Submitting)
                .with_effect(Effect::clear_notice())
                .with_effect(Effect::append_user(text))
                .with_effect(Effect::RequestCompletion))
        }

        // ============================================================
        // Completion results
        // ============================================================

        (ChatState::Submitting, Event::CompletionSucceeded { text, .. }) => {
            Ok(TransitionResult::new(ChatState::Revealing {
                full_text: text,
                revealed: 0,
            })
            .with_effect(Effect::append_assistant(""))
            .with_effect(Effect::StartReveal))
        }

        // Failures skip the reveal and go straight back to idle
        (ChatState::Submitting, Event::CompletionFailed { error, .. }) => {
            Ok(TransitionResult::new(ChatState::Idle)
                .with_effect(Effect::append_assistant(error.user_reply()))
                .with_effect(Effect::NotifyReplyDone))
        }

        // ============================================================
        // Reveal
        // ============================================================

        (ChatState::Revealing { full_text, revealed }, Event::RevealTick { .. }) => {
            let total = full_text.chars().count();

            // Nothing (left) to show: an empty reply finishes on its first tick
            if *revealed >= total {
                return Ok(finish_reveal(TransitionResult::new(ChatState::Idle), full_text));
            }

            let next = revealed + 1;
            let partial: String = full_text.chars().take(next).collect();

            if next == total {
                let result = TransitionResult::new(ChatState::Idle)
                    .with_effect(Effect::PublishReveal { partial });
                Ok(finish_reveal(result, full_text))
            } else {
                Ok(TransitionResult::new(ChatState::Revealing {
                    full_text: full_text.clone(),
                    revealed: next,
                })
                .with_effect(Effect::PublishReveal { partial }))
            }
        }

        // ============================================================
        // Clear history
        // ============================================================

        (ChatState::Idle, Event::ClearHistory) => Ok(TransitionResult::new(ChatState::Idle)
            .with_effect(Effect::ResetTranscript)
            .with_effect(Effect::clear_notice())),

        (ChatState::Submitting, Event::ClearHistory) => Ok(TransitionResult::new(ChatState::Idle)
            .with_effect(Effect::AbandonRequest)
            .with_effect(Effect::ResetTranscript)
            .with_effect(Effect::clear_notice())),

        (ChatState::Revealing { .. }, Event::ClearHistory) => {
            Ok(TransitionResult::new(ChatState::Idle)
                .with_effect(Effect::StopReveal)
                .with_effect(Effect::ResetTranscript)
                .with_effect(Effect::clear_notice()))
        }

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} with event {event:?}",
            state.name()
        ))),
    }
}

fn finish_reveal(result: TransitionResult, full_text: &str) -> TransitionResult {
    result
        .with_effect(Effect::StopReveal)
        .with_effect(Effect::FinalizeReply {
            content: full_text.to_string(),
        })
        .with_effect(Effect::NotifyReplyDone)
}
