//! Product chat domain
//!
//! Messages, the per-product conversation store, and the fixed copy the chat
//! widget shows.

mod conversation;
mod message;

pub use conversation::{
    parse_transcript, Conversation, CorruptHistory, ProductContext, BOOTSTRAP_LEN, HISTORY_KEY_PREFIX,
};
pub use message::{Message, Role};

/// First assistant turn of every fresh conversation
pub const GREETING: &str = "👋 Hi! I'm your product assistant. Ask me anything about this product, or choose from the questions below!";

/// Inline notice for an empty submission
pub const EMPTY_INPUT_NOTICE: &str = "⚠️ Please enter a message before sending.";

/// Assistant turn recorded when the completion request could not be made
pub const TRANSPORT_FAILURE_REPLY: &str = "❗ Failed to get response.";

/// Assistant turn recorded when the completion endpoint answered without success
pub const REJECTED_REPLY: &str = "⚠️ Error fetching response!";

/// Canned questions offered next to the input box
pub const PREDEFINED_QUESTIONS: [&str; 4] = [
    "What are the key features?",
    "Is there a discount available?",
    "Can you tell me about the product warranty?",
    "What’s the shipping information?",
];

/// Reply used when the model returns no text
pub const NO_RESPONSE_REPLY: &str = "No response found.";
