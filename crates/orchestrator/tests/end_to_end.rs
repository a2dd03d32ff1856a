use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use quorum_collector::FakeClock;
use quorum_core::{AccumulationTuning, AgentConfig, FileCollector, ReviewTarget};
use quorum_llm::{InMemorySessionClient, ScriptedTurn};
use quorum_orchestrator::{Orchestrator, ReviewRequest};
use quorum_resilience::CircuitBreakerConfig;
use quorum_summary::SummaryGeneratorConfig;

struct NoopFileCollector;
impl FileCollector for NoopFileCollector {
    fn collect(&self, _directory: &Path) -> anyhow::Result<String> {
        Ok(String::new())
    }
}

fn agent(name: &str) -> AgentConfig {
    AgentConfig {
        name: name.to_string(),
        display_name: name.to_string(),
        model: name.to_string(),
        system_prompt: "You are a reviewer.".to_string(),
        instruction_template: "Review ${repository}".to_string(),
        output_format: "Return findings.".to_string(),
        ..Default::default()
    }
}

fn orchestrator(client: Arc<InMemorySessionClient>) -> Orchestrator {
    Orchestrator::new(
        client,
        Arc::new(NoopFileCollector),
        10,
        5,
        0,
        CircuitBreakerConfig::default(),
        AccumulationTuning::default(),
        SummaryGeneratorConfig::default(),
    )
}

fn request(agents: Vec<AgentConfig>, target: ReviewTarget, passes: u32) -> ReviewRequest {
    ReviewRequest {
        agents,
        target,
        parallelism: 4,
        passes,
        reasoning_effort: None,
        custom_instructions: Vec::new(),
        output_constraints: None,
        mcp_servers: None,
    }
}

/// Scenario 1 (spec ): single agent, single pass, remote, successful.
#[tokio::test]
async fn single_agent_single_pass_remote_success() {
    let client = Arc::new(InMemorySessionClient::new());
    client.script("sec", vec![ScriptedTurn::Reply("# Findings\n\n### 1. A\n".to_string())]);
    client.script("gpt-5", vec![ScriptedTurn::Reply("The review found one finding.".to_string())]);

    let outcome = orchestrator(client)
        .run(request(vec![agent("sec")], ReviewTarget::Remote { repository_id: "o/r".to_string() }, 1))
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.results[0].success);
    assert_eq!(outcome.results[0].content.as_deref(), Some("# Findings\n\n### 1. A\n"));
    assert_eq!(outcome.results[0].repository, "o/r");
}

/// Scenario 2: empty primary response, follow-up succeeds.
#[tokio::test]
async fn empty_primary_follow_up_succeeds() {
    let client = Arc::new(InMemorySessionClient::new());
    client.script("sec", vec![ScriptedTurn::Empty, ScriptedTurn::Reply("OK".to_string())]);
    client.script("gpt-5", vec![ScriptedTurn::Reply("The review found one finding.".to_string())]);

    let outcome = orchestrator(client)
        .run(request(vec![agent("sec")], ReviewTarget::Remote { repository_id: "o/r".to_string() }, 1))
        .await
        .unwrap();

    assert!(outcome.results[0].success);
    assert_eq!(outcome.results[0].content.as_deref(), Some("OK"));
}

/// Scenario 3: the model streams two message fragments and then goes
/// quiet without ever signaling idle. The idle-timeout scheduler (not the
/// session) ends the call, and the joined fragments are reported as a
/// successful, non-empty result.
#[tokio::test(start_paused = true)]
async fn idle_timeout_reports_accumulated_partial_as_success() {
    let client = Arc::new(InMemorySessionClient::new());
    client.script("sec", vec![ScriptedTurn::PartialMessages(vec!["part1".to_string(), "part2".to_string()])]);
    client.script("gpt-5", vec![ScriptedTurn::Reply("One agent's session went idle mid-stream.".to_string())]);

    let clock = Arc::new(FakeClock::new(0));
    let orchestrator = Orchestrator::new(
        client,
        Arc::new(NoopFileCollector),
        10,
        1,
        0,
        CircuitBreakerConfig::default(),
        AccumulationTuning::default(),
        SummaryGeneratorConfig::default(),
    )
    .with_clock(clock.clone());

    let run = tokio::spawn(async move {
        orchestrator.run(request(vec![agent("sec")], ReviewTarget::Remote { repository_id: "o/r".to_string() }, 1)).await
    });

    // Let the agent's session open and register its idle check before
    // fast-forwarding the clock past the one-minute idle budget. A few
    // yields drain the spawned task tree (orchestrator -> agent -> idle
    // check) down to its first genuine suspension point.
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    clock.advance(70_000);
    tokio::time::advance(Duration::from_secs(75)).await;
    tokio::task::yield_now().await;

    let outcome = run.await.unwrap().unwrap();

    assert!(outcome.results[0].success);
    assert_eq!(outcome.results[0].content.as_deref(), Some("part1part2"));
}

/// Scenario 4: the merger consolidates two passes' paraphrased findings for
/// the same agent into one aggregated finding spanning both pass numbers.
#[tokio::test]
async fn multi_pass_merges_paraphrased_findings() {
    let client = Arc::new(InMemorySessionClient::new());
    client.script(
        "sec",
        vec![ScriptedTurn::Reply(
            "### 1. SQL Injection in login\n\n\
             | Item | Value |\n\
             |------|-------|\n\
             | **Priority** | High |\n\
             | **指摘の概要** | user input reaches the query unsanitized |\n\
             | **該当箇所** | src/login.x L42 |\n"
                .to_string(),
        )],
    );
    client.script(
        "sec",
        vec![ScriptedTurn::Reply(
            "### 1. SQLi in login handler\n\n\
             | Item | Value |\n\
             |------|-------|\n\
             | **Priority** | High |\n\
             | **指摘の概要** | unsanitized input flows into the SQL query |\n\
             | **該当箇所** | src/login.x L42-50 |\n"
                .to_string(),
        )],
    );
    client.script("gpt-5", vec![ScriptedTurn::Reply("One SQL injection finding across both passes.".to_string())]);

    let outcome = orchestrator(client)
        .run(request(vec![agent("sec")], ReviewTarget::Remote { repository_id: "o/r".to_string() }, 2))
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    let content = outcome.results[0].content.as_ref().unwrap();
    assert_eq!(content.matches("###").count(), 1, "expected exactly one merged finding, got: {content}");
    assert!(content.contains("detected in passes: 1, 2"));
}

/// Scenario 5: findings roll-up groups headings in fixed priority order
/// regardless of submission order.
#[tokio::test]
async fn findings_rollup_orders_headings_by_fixed_priority() {
    let client = Arc::new(InMemorySessionClient::new());
    client.script("low", vec![ScriptedTurn::Reply("### 1. Minor nit\n\n| **Priority** | Low |\n".to_string())]);
    client.script("crit", vec![ScriptedTurn::Reply("### 1. RCE\n\n| **Priority** | Critical |\n".to_string())]);
    client.script("med", vec![ScriptedTurn::Reply("### 1. Leaky log\n\n| **Priority** | Medium |\n".to_string())]);
    client.script("gpt-5", vec![ScriptedTurn::Reply("Three findings across three agents.".to_string())]);

    let agents = vec![agent("low"), agent("crit"), agent("med")];
    let outcome = orchestrator(client)
        .run(request(agents, ReviewTarget::Remote { repository_id: "o/r".to_string() }, 1))
        .await
        .unwrap();

    let critical_pos = outcome.findings_summary.find("#### Critical").unwrap();
    let medium_pos = outcome.findings_summary.find("#### Medium").unwrap();
    let low_pos = outcome.findings_summary.find("#### Low").unwrap();
    assert!(critical_pos < medium_pos && medium_pos < low_pos);
}

/// Results preserve the original agent submission order even though the
/// underlying tasks run concurrently across a bounded worker pool.
#[tokio::test]
async fn results_preserve_submission_order_despite_concurrent_execution() {
    let client = Arc::new(InMemorySessionClient::new());
    client.script("a", vec![ScriptedTurn::Reply("### 1. A finding".to_string())]);
    client.script("b", vec![ScriptedTurn::Reply("### 1. B finding".to_string())]);
    client.script("c", vec![ScriptedTurn::Reply("### 1. C finding".to_string())]);
    client.script("gpt-5", vec![ScriptedTurn::Reply("Three agents reviewed.".to_string())]);

    let agents = vec![agent("a"), agent("b"), agent("c")];
    let outcome = orchestrator(client)
        .run(request(agents, ReviewTarget::Remote { repository_id: "o/r".to_string() }, 1))
        .await
        .unwrap();

    let names: Vec<&str> = outcome.results.iter().map(|r| r.agent_config.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

/// Scenario 6: two consecutive transport failures trip the review circuit
/// breaker; by the time the retry executor's own backoff sleep has elapsed
/// past the breaker's reset timeout, the breaker has half-opened and lets
/// the next attempt through, which succeeds and closes it again.
#[tokio::test]
async fn circuit_breaker_trips_then_half_opens_and_recovers() {
    let client = Arc::new(InMemorySessionClient::new());
    client.script("sec", vec![ScriptedTurn::Error("transport unavailable".to_string())]);
    client.script("sec", vec![ScriptedTurn::Error("transport unavailable".to_string())]);
    client.script("sec", vec![ScriptedTurn::Reply("### 1. Recovered finding\n".to_string())]);
    client.script("gpt-5", vec![ScriptedTurn::Reply("The breaker recovered after two failures.".to_string())]);

    let orchestrator = Orchestrator::new(
        client,
        Arc::new(NoopFileCollector),
        10,
        5,
        2,
        CircuitBreakerConfig { failure_threshold: 2, reset_timeout_ms: 500 },
        AccumulationTuning::default(),
        SummaryGeneratorConfig::default(),
    );

    let outcome = orchestrator
        .run(request(vec![agent("sec")], ReviewTarget::Remote { repository_id: "o/r".to_string() }, 1))
        .await
        .unwrap();

    assert!(outcome.results[0].success, "expected the third attempt (after the breaker half-opens) to succeed");
    assert_eq!(outcome.results[0].content.as_deref(), Some("### 1. Recovered finding\n"));
}

/// The executive-summary artifact falls back to the deterministic template
/// when every agent fails (transport never scripted for this model).
#[tokio::test(start_paused = true)]
async fn executive_summary_falls_back_when_every_agent_fails() {
    let client = Arc::new(InMemorySessionClient::new());
    // No script registered for "sec" nor for the summarizer's own model
    // ("gpt-5"), so both the review pass and the summary attempt see idle
    // responses with no content and fail.

    let outcome = orchestrator(client)
        .run(request(vec![agent("sec")], ReviewTarget::Remote { repository_id: "o/r".to_string() }, 1))
        .await
        .unwrap();

    assert!(!outcome.results[0].success);
    assert!(outcome.executive_summary_markdown.contains("# Executive Summary"));
    assert!(outcome.executive_summary_filename.starts_with("executive_summary_"));
}
