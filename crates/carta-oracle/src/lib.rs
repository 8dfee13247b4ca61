//! Optional LLM post-pass over an indexed graph.
//!
//! Invoked only when a chat-client handle is present:
//! - [`client`] — The [`ChatClient`](client::ChatClient) contract and a
//!   blocking OpenAI-style HTTP implementation
//! - [`json`] — Balanced-array extraction from prose-wrapped output
//! - [`prompt`] — Prompt construction for both passes
//! - [`resolver`] — Unresolved-API-call matching and event-edge pairing

pub mod client;
pub mod json;
pub mod prompt;
pub mod resolver;

pub use client::{ChatClient, HttpChatClient, OracleError};
pub use resolver::{resolve, OracleReport};
