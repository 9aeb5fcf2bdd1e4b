//! Docs Portal chat client
//!
//! Streaming conversation engine for the engineering documentation Q&A
//! backend: questions go out over `POST /api/chat/stream`, answers come back
//! token by token with source citations, and a single store owns every
//! conversation the presentation layer renders.

pub mod chat;
pub mod config;
pub mod health;
pub mod store;
pub mod stream;

#[cfg(test)]
mod testing;

pub use chat::{Conversation, ConversationId, Message, MessageId, Role, Source};
pub use config::ClientConfig;
pub use health::{HealthMonitor, HealthProbe, HttpHealthProbe};
pub use store::{ConversationStore, StoreHandle, StoreSnapshot};
pub use stream::{EventSource, HttpEventSource, StreamEvent};

/// Starter questions offered on the welcome screen
pub const SAMPLE_QUERIES: [&str; 5] = [
    "How do I set up my local dev environment?",
    "What's the rate limit on the payments API?",
    "What should I do if payments service is down?",
    "How does our auth system work?",
    "What do I need to do before deploying?",
];
