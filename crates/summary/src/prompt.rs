use tracing::debug;

use quorum_core::ReviewResult;

/// Builds the `{{repository}}` / `{{results}}` user prompt for the
/// executive-summary AI path. Each success entry is clipped to
/// `min(max_content_per_agent, max_total_prompt_content - used_so_far)`; once
/// the running total hits `max_total_prompt_content` the loop stops and the
/// remaining agents contribute nothing. That truncation is always logged —
/// never silent.
pub struct SummaryPromptBuilder;

impl SummaryPromptBuilder {
    pub fn build_user_prompt(
        repository: &str,
        results: &[ReviewResult],
        max_content_per_agent: usize,
        max_total_prompt_content: usize,
    ) -> String {
        let mut used = 0usize;
        let mut entries = Vec::new();

        for (index, result) in results.iter().enumerate() {
            if used >= max_total_prompt_content {
                debug!(
                    skipped = results.len() - index,
                    "summary prompt budget exhausted; remaining agents contribute nothing"
                );
                break;
            }

            if result.success {
                let content = result.content.clone().unwrap_or_default();
                let remaining_budget = max_total_prompt_content - used;
                let limit = max_content_per_agent.min(remaining_budget);
                let (clipped, was_clipped) = Self::clip(&content, limit);
                used += clipped.len();
                let suffix = if was_clipped { "... (truncated for summary)" } else { "" };
                entries.push(format!(
                    "### {}\n\n{clipped}{suffix}",
                    result.agent_config.effective_display_name()
                ));
            } else {
                entries.push(format!(
                    "### {} — FAILED\n\n{}",
                    result.agent_config.effective_display_name(),
                    result.error_message.as_deref().unwrap_or("unknown error")
                ));
            }
        }

        format!("Repository: {repository}\n\n{}", entries.join("\n\n"))
    }

    fn clip(content: &str, limit: usize) -> (String, bool) {
        if content.len() <= limit {
            return (content.to_string(), false);
        }
        let mut end = limit.min(content.len());
        while end > 0 && !content.is_char_boundary(end) {
            end -= 1;
        }
        (content[..end].to_string(), true)
    }
}
