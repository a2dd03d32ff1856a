//! Executes one agent against one review target: retry/backoff, circuit
//! breaking, the local-vs-remote message flow, and the multi-pass loop the
//! merger later consolidates.

mod events;
mod message_flow;
mod message_sender;
mod runner;
mod session_config;
mod target_resolver;

pub use events::{bind_events, EventSubscriptions};
pub use message_flow::{is_satisfying, FollowUpPrompts, PromptSender, ReviewMessageFlow};
pub use message_sender::ReviewSessionMessageSender;
pub use runner::ReviewAgentRunner;
pub use session_config::ReviewSessionConfigFactory;
pub use target_resolver::{ResolvedTarget, ReviewTargetInstructionResolver};
