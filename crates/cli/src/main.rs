mod agent_loader;
mod local_files;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quorum_config::AppConfig;
use quorum_core::{AccumulationTuning, LocalFileConfig, ReviewTarget};
use quorum_llm::HttpSessionClient;
use quorum_orchestrator::{Orchestrator, ReviewOutcome, ReviewRequest};
use quorum_resilience::CircuitBreakerConfig;
use quorum_summary::SummaryGeneratorConfig;

use local_files::LocalFileCollector;

#[derive(Debug, Parser)]
#[command(name = "quorum", version, about = "Multi-agent code review orchestration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a multi-agent review against a local directory or a remote repository id.
    Review {
        /// `owner/repo` for a remote target, or a filesystem path for a local one.
        #[arg(long)]
        target: String,

        /// Directory of `*.md` agent definition files (front-matter + `##` sections).
        #[arg(long)]
        agents_dir: PathBuf,

        /// Sequential passes each agent makes over the target.
        #[arg(long)]
        passes: Option<u32>,

        /// Maximum number of agents running concurrently.
        #[arg(long)]
        parallelism: Option<usize>,

        /// Output rendering: "markdown" (default) or "json".
        #[arg(long, default_value = "markdown")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let log_dir = std::env::var("QUORUM_LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    let file_appender = tracing_appender::rolling::daily(&log_dir, "quorum.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Commands::Review { target, agents_dir, passes, parallelism, format } => {
            run_review(config, target, agents_dir, passes, parallelism, format).await
        }
    }
}

async fn run_review(
    config: AppConfig,
    target: String,
    agents_dir: PathBuf,
    passes: Option<u32>,
    parallelism: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let agents = agent_loader::load_agents_from_dir(&agents_dir)?;
    let agents: Vec<_> = agents.into_iter().filter(|agent| agent.is_usable()).collect();
    if agents.is_empty() {
        bail!("no usable agent definitions found in {}", agents_dir.display());
    }

    let review_target = resolve_target(&target);

    let base_url = std::env::var("QUORUM_LLM_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    // Bound the reqwest layer at the same duration as the pass's own hard
    // timeout, so a stalled remote server can't hang `send()` past it.
    let request_timeout = std::time::Duration::from_secs(config.orchestration.timeout_minutes * 60);
    let mut http_client = HttpSessionClient::with_request_timeout(base_url, request_timeout);
    if let Ok(token) = std::env::var("QUORUM_LLM_API_KEY") {
        http_client = http_client.with_token(token);
    }
    let session_client = Arc::new(http_client);
    let file_collector = Arc::new(LocalFileCollector::new(LocalFileConfig::default()));

    let circuit_breaker_config = CircuitBreakerConfig {
        failure_threshold: config.circuit_breaker.failure_threshold,
        reset_timeout_ms: config.circuit_breaker.reset_timeout_ms,
    };
    let tuning = AccumulationTuning {
        max_accumulated_size: config.accumulation.max_accumulated_size,
        initial_accumulated_capacity: config.accumulation.initial_accumulated_capacity,
    };
    let summary_config = SummaryGeneratorConfig {
        model: config.summary.model.clone(),
        max_attempts: config.summary.max_attempts,
        max_content_per_agent: config.summary.max_content_per_agent,
        max_total_prompt_content: config.summary.max_total_prompt_content,
        summary_timeout: std::time::Duration::from_secs(config.summary.summary_timeout_minutes * 60),
        ..SummaryGeneratorConfig::default()
    };

    let orchestrator = Orchestrator::new(
        session_client,
        file_collector,
        config.orchestration.timeout_minutes,
        config.orchestration.idle_timeout_minutes,
        config.retry.max_retries,
        circuit_breaker_config,
        tuning,
        summary_config,
    );

    let request = ReviewRequest {
        agents,
        target: review_target,
        parallelism: parallelism.unwrap_or(config.orchestration.parallelism),
        passes: passes.unwrap_or(config.orchestration.passes),
        reasoning_effort: None,
        custom_instructions: Vec::new(),
        output_constraints: None,
        mcp_servers: None,
    };

    let outcome = orchestrator.run(request).await?;
    render(&outcome, format);
    Ok(())
}

/// A target that resolves to an existing path on disk is local; anything
/// else is treated as a `owner/repo`-shaped remote identifier, mirroring
/// `ReviewTarget`'s own distinction.
fn resolve_target(target: &str) -> ReviewTarget {
    let path = PathBuf::from(target);
    if path.exists() {
        ReviewTarget::Local { directory: path }
    } else {
        ReviewTarget::Remote { repository_id: target.to_string() }
    }
}

fn render(outcome: &ReviewOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Markdown => {
            for result in &outcome.results {
                println!("## {}\n", result.agent_config.effective_display_name());
                match &result.content {
                    Some(content) => println!("{content}\n"),
                    None => println!("_failed: {}_\n", result.error_message.as_deref().unwrap_or("unknown error")),
                }
            }
            println!("{}", outcome.executive_summary_markdown);
        }
        OutputFormat::Json => {
            let results: Vec<_> = outcome
                .results
                .iter()
                .map(|result| {
                    serde_json::json!({
                        "agent": result.agent_config.name,
                        "success": result.success,
                        "content": result.content,
                        "error": result.error_message,
                    })
                })
                .collect();
            let payload = serde_json::json!({
                "results": results,
                "findings_summary": outcome.findings_summary,
                "executive_summary_markdown": outcome.executive_summary_markdown,
                "executive_summary_filename": outcome.executive_summary_filename,
            });
            println!("{}", serde_json::to_string_pretty(&payload).unwrap_or_default());
        }
    }
}
