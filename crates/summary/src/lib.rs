//! Produces the executive-summary artifact: an AI-generated
//! narrative guarded by a circuit breaker and retries, falling back to a
//! deterministic template, assembled alongside the priority-grouped
//! findings roll-up into the final report.

mod fallback;
mod generator;
mod prompt;
mod report;
mod sanitize;

pub use fallback::FallbackSummary;
pub use generator::{SummaryGenerator, SummaryGeneratorConfig};
pub use prompt::SummaryPromptBuilder;
pub use report::ExecutiveReport;
pub use sanitize::sanitize_agent_name;
