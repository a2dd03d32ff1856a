use chrono::{DateTime, Utc};

use quorum_core::ReviewResult;

use crate::sanitize::sanitize_agent_name;

/// Assembles the final executive-summary artifact: the Markdown
/// body plus the `executive_summary_<timestamp>.md` filename, timestamp
/// pattern `yyyy-MM-dd-HH-mm-ss`.
pub struct ExecutiveReport;

impl ExecutiveReport {
    pub fn assemble(
        repository: &str,
        results: &[ReviewResult],
        summary_content: &str,
        findings_summary: &str,
        timestamp: DateTime<Utc>,
    ) -> (String, String) {
        let agent_count = results.len();
        let success_count = results.iter().filter(|r| r.success).count();
        let failure_count = agent_count - success_count;

        let report_links = results
            .iter()
            .map(|result| {
                format!(
                    "- [{}](reports/{}.md)",
                    result.agent_config.effective_display_name(),
                    sanitize_agent_name(&result.agent_config.name)
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let markdown = format!(
            "# Executive Summary\n\n\
             **Date:** {date}\n\
             **Repository:** {repository}\n\
             **Agents:** {agent_count} ({success_count} succeeded, {failure_count} failed)\n\n\
             ## Summary\n\n{summary_content}\n\n\
             ## Findings by Priority\n\n{findings}\n\n\
             ## Per-Agent Reports\n\n{report_links}\n",
            date = timestamp.format("%Y-%m-%d"),
            findings = if findings_summary.trim().is_empty() { "指摘事項なし" } else { findings_summary },
        );

        let filename = format!("executive_summary_{}.md", timestamp.format("%Y-%m-%d-%H-%M-%S"));

        (markdown, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
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
    fn filename_uses_the_fixed_timestamp_pattern() {
        let timestamp = Utc.with_ymd_and_hms(2026, 3, 5, 14, 30, 9).unwrap();
        let results = vec![ReviewResult::success(agent("sec"), "org/repo", "ok")];
        let (_, filename) = ExecutiveReport::assemble("org/repo", &results, "narrative", "", timestamp);
        assert_eq!(filename, "executive_summary_2026-03-05-14-30-09.md");
    }

    #[test]
    fn report_links_use_sanitized_agent_names() {
        let timestamp = Utc.with_ymd_and_hms(2026, 3, 5, 14, 30, 9).unwrap();
        let results = vec![ReviewResult::success(agent("sec reviewer"), "org/repo", "ok")];
        let (markdown, _) = ExecutiveReport::assemble("org/repo", &results, "narrative", "", timestamp);
        assert!(markdown.contains("reports/sec_reviewer.md"));
    }

    #[test]
    fn counts_successes_and_failures() {
        let timestamp = Utc.with_ymd_and_hms(2026, 3, 5, 14, 30, 9).unwrap();
        let results = vec![
            ReviewResult::success(agent("sec"), "org/repo", "ok"),
            ReviewResult::failure(agent("perf"), "org/repo", "boom"),
        ];
        let (markdown, _) = ExecutiveReport::assemble("org/repo", &results, "narrative", "", timestamp);
        assert!(markdown.contains("**Agents:** 2 (1 succeeded, 1 failed)"));
    }
}
