use thiserror::Error;

use quorum_collector::CollectorError;

/// Error taxonomy shared by the library-boundary crates (`core`, `collector`,
/// `resilience`, `runner`). Orchestration-level code (`orchestrator`, `cli`)
/// wraps these in `anyhow::Result` with `.context(...)`, matching the split
/// the rest of the workspace uses between library and binary error handling.
#[derive(Debug, Error, Clone)]
pub enum ReviewError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("session emitted an error event: {0}")]
    SessionEvent(String),

    #[error("idle timeout: no activity for {elapsed_ms}ms (limit {idle_limit_ms}ms)")]
    IdleTimeout { elapsed_ms: i64, idle_limit_ms: i64 },

    #[error("hard timeout exceeded with no accumulated content")]
    HardTimeout,

    #[error("circuit breaker open for the {0} call path")]
    BreakerOpen(String),

    #[error("empty response from the model (remote tools were configured; it may have timed out during tool calls)")]
    EmptyResponseWithTools,

    #[error("empty response from the model")]
    EmptyResponseWithoutTools,
}

impl From<CollectorError> for ReviewError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::SessionEvent(msg) => ReviewError::SessionEvent(msg),
            CollectorError::IdleTimeout { elapsed_ms, idle_limit_ms } => {
                ReviewError::IdleTimeout { elapsed_ms, idle_limit_ms }
            }
        }
    }
}
