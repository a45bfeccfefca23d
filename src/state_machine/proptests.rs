//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::*;
use crate::runtime::CompletionError;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_reply() -> impl Strategy<Value = String> {
    // Mix of ASCII, accented letters and emoji so char counting is exercised
    "[a-zA-Z0-9 .,!?éü✓🙂]{0,40}"
}

fn arb_completion_error() -> impl Strategy<Value = CompletionError> {
    prop_oneof![
        "[a-z ]{1,20}".prop_map(CompletionError::transport),
        "[a-z ]{1,20}".prop_map(CompletionError::rejected),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        "[a-zA-Z ?]{0,20}".prop_map(Event::user_submit),
        Just(Event::ClearHistory),
        (any::<u64>(), arb_reply())
            .prop_map(|(request, text)| Event::CompletionSucceeded { request, text }),
        (any::<u64>(), arb_completion_error())
            .prop_map(|(request, error)| Event::CompletionFailed { request, error }),
        (0u64..4).prop_map(|generation| Event::RevealTick { generation }),
    ]
}

fn arb_busy_state() -> impl Strategy<Value = ChatState> {
    prop_oneof![
        Just(ChatState::Submitting),
        arb_reply().prop_flat_map(|full_text| {
            let len = full_text.chars().count();
            (Just(full_text), 0..=len)
                .prop_map(|(full_text, revealed)| ChatState::Revealing { full_text, revealed })
        }),
    ]
}

// ============================================================================
// State Validity Checkers
// ============================================================================

fn is_valid_state(state: &ChatState) -> bool {
    match state {
        ChatState::Revealing {
            full_text,
            revealed,
        } => *revealed <= full_text.chars().count(),
        _ => true,
    }
}

fn effects_are_valid(effects: &[Effect], new_state: &ChatState) -> bool {
    let has = |pred: fn(&Effect) -> bool| effects.iter().any(pred);

    // A completion is only requested on the way into Submitting
    if has(|e| matches!(e, Effect::RequestCompletion)) && *new_state != ChatState::Submitting {
        return false;
    }

    // Reveals only start when entering Revealing
    if has(|e| matches!(e, Effect::StartReveal))
        && !matches!(new_state, ChatState::Revealing { revealed: 0, .. })
    {
        return false;
    }

    // Finishing a turn always lands in Idle
    if has(|e| matches!(e, Effect::NotifyReplyDone | Effect::ResetTranscript))
        && *new_state != ChatState::Idle
    {
        return false;
    }

    // System messages are never appended after bootstrap
    !effects
        .iter()
        .any(|e| matches!(e, Effect::AppendMessage { message } if message.is_system()))
}

/// Drive a reveal to completion, collecting published partials and the final text
fn run_reveal(text: &str) -> (Vec<String>, Option<String>, usize) {
    let mut state = ChatState::Revealing {
        full_text: text.to_string(),
        revealed: 0,
    };
    let mut published = Vec::new();
    let mut finalized = None;
    let mut ticks = 0;

    while state != ChatState::Idle {
        let result = transition(&state, Event::RevealTick { generation: 1 })
            .expect("tick during reveal must succeed");
        ticks += 1;
        for effect in result.effects {
            match effect {
                Effect::PublishReveal { partial } => published.push(partial),
                Effect::FinalizeReply { content } => finalized = Some(content),
                _ => {}
            }
        }
        state = result.new_state;
    }

    (published, finalized, ticks)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // Invariant 1: Valid state and effects after any sequence of events
    #[test]
    fn prop_transitions_preserve_validity(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = ChatState::Idle;

        for event in events {
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
                prop_assert!(is_valid_state(&state), "Invalid state: {:?}", state);
                prop_assert!(
                    effects_are_valid(&result.effects, &state),
                    "Invalid effects for state {:?}: {:?}",
                    state,
                    result.effects
                );
            }
        }
    }

    // Invariant 2: A reveal of N chars publishes N growing prefixes, then commits the whole text
    #[test]
    fn prop_reveal_publishes_every_prefix(text in arb_reply()) {
        let (published, finalized, ticks) = run_reveal(&text);
        let chars: Vec<char> = text.chars().collect();

        prop_assert_eq!(published.len(), chars.len());
        for (i, partial) in published.iter().enumerate() {
            let expected: String = chars.iter().take(i + 1).collect();
            prop_assert_eq!(partial, &expected);
        }
        prop_assert_eq!(finalized.as_deref(), Some(text.as_str()));
        prop_assert_eq!(ticks, chars.len().max(1));
    }

    // Invariant 3: Input is rejected while a reply is pending or being revealed
    #[test]
    fn prop_busy_rejects_submit(state in arb_busy_state(), text in "[a-zA-Z ]{0,20}") {
        let result = transition(&state, Event::user_submit(text));
        prop_assert_eq!(result.unwrap_err(), TransitionError::Busy);
    }

    // Invariant 4: Whitespace-only input never starts a request
    #[test]
    fn prop_whitespace_rejected(text in "[ \t\n\r]{0,10}") {
        let result = transition(&ChatState::Idle, Event::user_submit(text));
        prop_assert_eq!(result.unwrap_err(), TransitionError::EmptyInput);
    }

    // Invariant 5: Clear always returns to Idle and resets the transcript
    #[test]
    fn prop_clear_always_idles(events in proptest::collection::vec(arb_event(), 0..15)) {
        let mut state = ChatState::Idle;
        for event in events {
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
            }
        }

        let result = transition(&state, Event::ClearHistory).unwrap();
        prop_assert_eq!(&result.new_state, &ChatState::Idle);
        prop_assert!(result.effects.contains(&Effect::ResetTranscript));
        prop_assert_eq!(
            result.effects.contains(&Effect::AbandonRequest),
            state == ChatState::Submitting
        );
        prop_assert_eq!(
            result.effects.contains(&Effect::StopReveal),
            matches!(state, ChatState::Revealing { .. })
        );
    }

    // Invariant 6: Exactly one user message is appended per accepted submit
    #[test]
    fn prop_submit_appends_trimmed_text(text in "[ ]{0,3}[a-zA-Z?]{1,20}[ ]{0,3}") {
        let result = transition(&ChatState::Idle, Event::user_submit(text.clone())).unwrap();
        let appended: Vec<_> = result
            .effects
            .iter()
            .filter_map(|e| match e {
                Effect::AppendMessage { message } => Some(message.content.clone()),
                _ => None,
            })
            .collect();
        prop_assert_eq!(appended, vec![text.trim().to_string()]);
    }
}
