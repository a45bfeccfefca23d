//! shopchat - product Q&A chat core
//!
//! A per-product conversation with a typing-effect reveal, the completion
//! proxy it talks to, and a catalog client for product context.

pub mod api;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod history;
pub mod llm;
pub mod runtime;
pub mod state_machine;
