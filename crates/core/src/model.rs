use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;

use quorum_collector::{Clock, SharedScheduler, SystemClock};

use crate::session::SessionClient;

/// A named, ordered skill descriptor attached to an agent. Parsing skill
/// definition files is explicitly out of scope for the core; this is
/// just the shape the core carries through.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SkillDescriptor {
    pub name: String,
    pub description: String,
}

/// Immutable descriptor of one review agent. Created once at load time and
/// never mutated; [`AgentConfig::with_model`] returns a new instance rather
/// than mutating in place.
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    pub name: String,
    pub display_name: String,
    pub model: String,
    pub system_prompt: String,
    pub instruction_template: String,
    pub output_format: String,
    pub focus_areas: Vec<String>,
    pub skills: Vec<SkillDescriptor>,
}

impl AgentConfig {
    /// `name`, `system_prompt`, and `instruction_template` must all be
    /// non-blank for a config to be usable by the runner.
    pub fn is_usable(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.system_prompt.trim().is_empty()
            && !self.instruction_template.trim().is_empty()
    }

    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    /// `${displayName}` falls back to `${name}` when the display name is
    /// blank.
    pub fn effective_display_name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

/// The thing being reviewed: either a local checkout or a remote repository
/// identifier (`owner/repo`-shaped, but the core treats it as an opaque
/// string).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewTarget {
    Local { directory: PathBuf },
    Remote { repository_id: String },
}

impl ReviewTarget {
    pub fn display_name(&self) -> String {
        match self {
            ReviewTarget::Local { directory } => directory
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| directory.display().to_string()),
            ReviewTarget::Remote { repository_id } => repository_id.clone(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ReviewTarget::Local { .. })
    }
}

/// Immutable result of one agent pass (or the merge of several). Exactly one
/// of `content` / `error_message` is meaningful, keyed off `success`.
#[derive(Debug, Clone)]
pub struct ReviewResult {
    pub agent_config: AgentConfig,
    pub repository: String,
    pub content: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub error_message: Option<String>,
}

impl ReviewResult {
    pub fn success(agent_config: AgentConfig, repository: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            agent_config,
            repository: repository.into(),
            content: Some(content.into()),
            timestamp: Utc::now(),
            success: true,
            error_message: None,
        }
    }

    pub fn failure(agent_config: AgentConfig, repository: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            agent_config,
            repository: repository.into(),
            content: None,
            timestamp: Utc::now(),
            success: false,
            error_message: Some(error_message.into()),
        }
    }
}

/// External collaborator that turns a local directory into the single
/// source-content payload handed to the model. Parsing/filtering policy is
/// explicitly out of scope; the core only consumes this trait.
pub trait FileCollector: Send + Sync {
    fn collect(&self, directory: &Path) -> anyhow::Result<String>;
}

/// Tuning knobs for `LocalFileConfig` consumed by the `FileCollector`
/// implementation; the core treats the fields as opaque and just threads the
/// struct through to the collaborator.
#[derive(Debug, Clone)]
pub struct LocalFileConfig {
    pub max_file_bytes: usize,
    pub max_total_bytes: usize,
    pub ignore_globs: Vec<String>,
}

impl Default for LocalFileConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 256 * 1024,
            max_total_bytes: 4 * 1024 * 1024,
            ignore_globs: vec![
                ".git/**".to_string(),
                "target/**".to_string(),
                "node_modules/**".to_string(),
            ],
        }
    }
}

/// Tuning parameters forwarded to every `ContentCollector` the runner
/// creates.
#[derive(Debug, Clone, Copy)]
pub struct AccumulationTuning {
    pub max_accumulated_size: usize,
    pub initial_accumulated_capacity: usize,
}

impl Default for AccumulationTuning {
    fn default() -> Self {
        Self {
            max_accumulated_size: 2 * 1024 * 1024,
            initial_accumulated_capacity: 4 * 1024,
        }
    }
}

/// Immutable bundle shared by reference across every agent runner in one
/// orchestration. `cached_source_content` is the one field with internal
/// mutability: it is populated lazily, at most once, via `OnceCell` so the
/// first local-target resolver pays the file-collection cost and every
/// other agent awaits the same in-flight computation.
pub struct ReviewContext {
    pub session_client: Arc<dyn SessionClient>,
    pub timeout_minutes: u64,
    pub idle_timeout_minutes: u64,
    pub max_retries: u32,
    pub reasoning_effort: Option<String>,
    pub custom_instructions: Vec<String>,
    pub output_constraints: Option<String>,
    pub cached_mcp_servers: Option<serde_json::Value>,
    /// The clock every `ContentCollector` a pass creates is built against.
    /// Defaults to [`SystemClock`]; tests that need to drive idle-timeout
    /// behavior without waiting out real minutes override it with a
    /// `FakeClock` after construction, the same way `reasoning_effort` and
    /// the other per-run fields are set by the orchestrator.
    pub clock: Arc<dyn Clock>,
    pub cached_source_content: OnceCell<String>,
    pub file_collector: Arc<dyn FileCollector>,
    pub local_file_config: LocalFileConfig,
    pub shared_scheduler: Arc<SharedScheduler>,
    pub tuning: AccumulationTuning,
}

impl ReviewContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_client: Arc<dyn SessionClient>,
        timeout_minutes: u64,
        idle_timeout_minutes: u64,
        max_retries: u32,
        file_collector: Arc<dyn FileCollector>,
        shared_scheduler: Arc<SharedScheduler>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(timeout_minutes > 0, "timeout_minutes must be > 0");
        anyhow::ensure!(idle_timeout_minutes > 0, "idle_timeout_minutes must be > 0");
        Ok(Self {
            session_client,
            timeout_minutes,
            idle_timeout_minutes,
            max_retries,
            reasoning_effort: None,
            custom_instructions: Vec::new(),
            output_constraints: None,
            cached_mcp_servers: None,
            clock: Arc::new(SystemClock),
            cached_source_content: OnceCell::new(),
            file_collector,
            local_file_config: LocalFileConfig::default(),
            shared_scheduler,
            tuning: AccumulationTuning::default(),
        })
    }

    pub fn hard_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_minutes * 60)
    }

    pub fn idle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.idle_timeout_minutes * 60)
    }
}
