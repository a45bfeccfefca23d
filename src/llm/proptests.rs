//! Property tests for transcript translation and error classification

use super::openai::OpenAIService;
use super::{LlmError, LlmErrorKind, LlmRequest, MessageRole};
use crate::chat::{Message, Role};
use proptest::prelude::*;

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::System), Just(Role::User), Just(Role::Assistant)]
}

fn arb_transcript() -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec(
        (arb_role(), "[a-zA-Z0-9 ?!]{0,24}").prop_map(|(role, text)| Message::new(role, text)),
        0..12,
    )
}

fn service() -> OpenAIService {
    OpenAIService::new("sk-test".to_string(), "gpt-test", None).unwrap()
}

proptest! {
    #[test]
    fn prop_status_always_classified(status in 100u16..1000, body in "[a-z ]{0,16}") {
        let err = LlmError::from_status(status, &body);
        prop_assert_eq!(err.status, Some(status));
        if (500..600).contains(&status) {
            prop_assert_eq!(err.kind, LlmErrorKind::ServerError);
        }
        if matches!(status, 401 | 403) {
            prop_assert_eq!(err.kind, LlmErrorKind::Auth);
        }
    }

    #[test]
    fn prop_transcript_split_keeps_order(transcript in arb_transcript()) {
        let request = LlmRequest::from_transcript(&transcript);

        let system: Vec<&str> = transcript
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        prop_assert_eq!(request.system.iter().map(String::as_str).collect::<Vec<_>>(), system);

        let turns: Vec<(MessageRole, &str)> = transcript
            .iter()
            .filter_map(|m| match m.role {
                Role::User => Some((MessageRole::User, m.content.as_str())),
                Role::Assistant => Some((MessageRole::Assistant, m.content.as_str())),
                Role::System => None,
            })
            .collect();
        let got: Vec<(MessageRole, &str)> = request
            .messages
            .iter()
            .map(|m| (m.role, m.text.as_str()))
            .collect();
        prop_assert_eq!(got, turns);
    }

    #[test]
    fn prop_wire_request_leads_with_system(transcript in arb_transcript()) {
        let request = LlmRequest::from_transcript(&transcript);
        let wire = service().translate_request(&request);

        let has_system = !request.system.is_empty();
        let offset = usize::from(has_system);
        prop_assert_eq!(wire.messages.len(), request.messages.len() + offset);

        if has_system {
            prop_assert_eq!(wire.messages[0].role.as_str(), "system");
            prop_assert_eq!(wire.messages[0].content.clone(), request.system_text());
        }
        for (wire_msg, msg) in wire.messages.iter().skip(offset).zip(&request.messages) {
            let role = match msg.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            };
            prop_assert_eq!(wire_msg.role.as_str(), role);
            prop_assert_eq!(wire_msg.content.as_deref(), Some(msg.text.as_str()));
        }
    }
}
