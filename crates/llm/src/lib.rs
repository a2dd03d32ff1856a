//! Concrete [`SessionClient`] implementations: an HTTP-backed client
//! adapted from a one-shot
//! chat-completion call into the event-emitting `Session` shape the core
//! expects, plus an in-memory test double scripted by model id and used
//! across the workspace's integration tests.

mod http;
mod in_memory;

pub use http::HttpSessionClient;
pub use in_memory::{InMemorySessionClient, ScriptedTurn};
