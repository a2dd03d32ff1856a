use tracing::{debug, warn};

use quorum_core::{AgentConfig, ReviewContext, ReviewError, ReviewResult, ReviewTarget};
use quorum_prompt::AgentPromptBuilder;
use quorum_resilience::{CircuitBreakers, ReviewRetryExecutor};

use crate::message_flow::{is_satisfying, FollowUpPrompts, PromptSender, ReviewMessageFlow};
use crate::message_sender::ReviewSessionMessageSender;
use crate::session_config::ReviewSessionConfigFactory;
use crate::target_resolver::ReviewTargetInstructionResolver;

/// Executes one logical review — potentially multi-pass — for one agent
/// against one target. Each pass is independently retried; the
/// caller (`quorum-orchestrator`) hands the resulting per-pass
/// [`ReviewResult`]s to the merger.
pub struct ReviewAgentRunner;

impl ReviewAgentRunner {
    /// Runs `passes.max(1)` sequential passes over `agent` against `target`,
    /// returning one `ReviewResult` per pass. For local targets, only pass 1
    /// carries the source payload — later passes rely on the model
    /// retaining context from the earlier turns of the same agent
    /// definition (not the same session: each pass opens its own).
    pub async fn run(
        agent: &AgentConfig,
        target: &ReviewTarget,
        ctx: &ReviewContext,
        breakers: &CircuitBreakers,
        passes: u32,
    ) -> Vec<ReviewResult> {
        let mut results = Vec::new();
        for pass_number in 1..=passes.max(1) {
            let carry_source = pass_number == 1;
            results.push(Self::run_pass(agent, target, ctx, breakers, carry_source).await);
        }
        results
    }

    async fn run_pass(
        agent: &AgentConfig,
        target: &ReviewTarget,
        ctx: &ReviewContext,
        breakers: &CircuitBreakers,
        carry_source: bool,
    ) -> ReviewResult {
        let repository = target.display_name();
        let executor = ReviewRetryExecutor::new(ctx.max_retries);

        executor
            .execute(
                |_attempt_number| Self::single_attempt(agent, target, ctx, breakers, carry_source),
                |err| ReviewResult::failure(agent.clone(), repository.clone(), err.to_string()),
            )
            .await
    }

    async fn single_attempt(
        agent: &AgentConfig,
        target: &ReviewTarget,
        ctx: &ReviewContext,
        breakers: &CircuitBreakers,
        carry_source: bool,
    ) -> anyhow::Result<ReviewResult> {
        let repository = target.display_name();

        if !agent.is_usable() {
            return Ok(ReviewResult::failure(
                agent.clone(),
                repository,
                format!("agent '{}' is not usable: name, system prompt, and instruction template must all be non-blank", agent.name),
            ));
        }

        let resolved = match ReviewTargetInstructionResolver::resolve(target, agent, ctx).await {
            Ok(resolved) => resolved,
            Err(err) => return Ok(ReviewResult::failure(agent.clone(), repository, err.to_string())),
        };

        if !breakers.review.allow_request() {
            return Ok(ReviewResult::failure(
                agent.clone(),
                repository,
                ReviewError::BreakerOpen("review".to_string()).to_string(),
            ));
        }

        let system_prompt = AgentPromptBuilder::build_system_prompt(agent);
        let system_prompt = AgentPromptBuilder::append_project_instructions(
            system_prompt,
            ctx.output_constraints.as_deref(),
            &ctx.custom_instructions,
        );

        let session_config = ReviewSessionConfigFactory::create(
            agent,
            system_prompt,
            resolved.mcp_servers.clone(),
            ctx.reasoning_effort.as_deref(),
        );

        let session = match ctx.session_client.create_session(session_config).await {
            Ok(session) => session,
            Err(err) => {
                breakers.review.on_failure();
                anyhow::bail!(err);
            }
        };

        let source_for_this_pass = if carry_source { resolved.local_source_content.as_deref() } else { None };
        let prompts = FollowUpPrompts::default();

        let session_ref = session.as_ref();
        let sender_closure = |prompt: String| {
            Box::pin(async move {
                ReviewSessionMessageSender::send_with_activity_timeout(
                    session_ref,
                    &prompt,
                    ctx.idle_timeout(),
                    ctx.hard_timeout(),
                    &ctx.shared_scheduler,
                    ctx.tuning.max_accumulated_size,
                    ctx.clock.clone(),
                )
                .await
            }) as std::pin::Pin<Box<dyn std::future::Future<Output = Result<Option<String>, ReviewError>> + Send + '_>>
        };
        let sender: PromptSender<'_> = &sender_closure;

        let flow_result = if target.is_local() {
            ReviewMessageFlow::execute_local(sender, &resolved.instruction, source_for_this_pass, &prompts, is_satisfying).await
        } else {
            ReviewMessageFlow::execute_remote(sender, &resolved.instruction, &prompts, is_satisfying).await
        };

        if let Err(err) = session.close().await {
            debug!(%err, "session close failed, ignoring");
        }

        match flow_result {
            Ok(Some(content)) if !content.trim().is_empty() => {
                breakers.review.on_success();
                Ok(ReviewResult::success(agent.clone(), repository, content))
            }
            Ok(_) => {
                let hint = if resolved.mcp_servers.is_some() {
                    ReviewError::EmptyResponseWithTools
                } else {
                    ReviewError::EmptyResponseWithoutTools
                };
                warn!(agent = %agent.name, "agent returned an empty response");
                Ok(ReviewResult::failure(agent.clone(), repository, hint.to_string()))
            }
            Err(err) => {
                breakers.review.on_failure();
                anyhow::bail!(err);
            }
        }
    }
}
