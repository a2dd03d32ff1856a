use quorum_core::ReviewResult;

const MAX_EXCERPT_CHARS: usize = 240;

/// Deterministic template rendering used whenever the AI narrative path
/// fails or is circuit-broken. No network calls, no randomness:
/// same results in, same string out.
pub struct FallbackSummary;

impl FallbackSummary {
    pub fn render(results: &[ReviewResult]) -> String {
        let mut table = String::from("| Agent | Status | Excerpt |\n|---|---|---|\n");
        for result in results {
            table.push_str(&format!(
                "| {} | {} | {} |\n",
                result.agent_config.effective_display_name(),
                if result.success { "success" } else { "failed" },
                Self::excerpt(result),
            ));
        }

        let blocks: Vec<String> = results
            .iter()
            .map(|result| {
                if result.success {
                    format!("**{}**\n\n{}", result.agent_config.effective_display_name(), Self::excerpt(result))
                } else {
                    format!(
                        "**{}** — failed: {}",
                        result.agent_config.effective_display_name(),
                        result.error_message.as_deref().unwrap_or("unknown error")
                    )
                }
            })
            .collect();

        format!("{table}\n{}", blocks.join("\n\n"))
    }

    fn excerpt(result: &ReviewResult) -> String {
        let raw = if result.success {
            result.content.clone().unwrap_or_default()
        } else {
            result.error_message.clone().unwrap_or_default()
        };
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.chars().count() > MAX_EXCERPT_CHARS {
            let truncated: String = collapsed.chars().take(MAX_EXCERPT_CHARS).collect();
            format!("{truncated}...")
        } else {
            collapsed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_core::AgentConfig;

    fn agent(name: &str) -> AgentConfig {
        AgentConfig {
            name: name.to_string(),
            display_name: name.to_string(),
            system_prompt: "p".into(),
            instruction_template: "i".into(),
            ..Default::default()
        }
    }

    #[test]
    fn renders_a_row_per_agent_and_collapses_whitespace() {
        let results = vec![
            ReviewResult::success(agent("sec"), "org/repo", "line one\n\n  line two  "),
            ReviewResult::failure(agent("perf"), "org/repo", "timed out"),
        ];
        let rendered = FallbackSummary::render(&results);
        assert!(rendered.contains("| sec | success |"));
        assert!(rendered.contains("| perf | failed |"));
        assert!(rendered.contains("line one line two"));
        assert!(rendered.contains("**perf** — failed: timed out"));
    }

    #[test]
    fn excerpt_is_bounded() {
        let long_content = "x ".repeat(500);
        let results = vec![ReviewResult::success(agent("sec"), "org/repo", long_content)];
        let rendered = FallbackSummary::render(&results);
        assert!(rendered.contains("..."));
    }
}
