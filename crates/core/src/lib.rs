//! Shared data model, session-transport trait, and error taxonomy for the
//! review-orchestration core. Every other `quorum-*` crate except
//! `quorum-collector` depends on this one.

mod error;
mod model;
mod session;

pub use error::ReviewError;
pub use model::{
    AccumulationTuning, AgentConfig, FileCollector, LocalFileConfig, ReviewContext, ReviewResult,
    ReviewTarget, SkillDescriptor,
};
pub use session::{
    EventData, EventHandler, EventKind, Session, SessionClient, SessionConfig, SystemPromptMode,
    Subscription,
};
