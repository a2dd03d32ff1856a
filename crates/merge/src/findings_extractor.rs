use std::sync::OnceLock;

use regex::Regex;

use quorum_core::ReviewResult;

use crate::parser::content_has_no_findings;

/// Fixed rendering order for priority groups. Anything that does not
/// match one of the first four (case-insensitively) falls into `Unknown`.
const PRIORITY_ORDER: &[&str] = &["Critical", "High", "Medium", "Low", "Unknown"];

fn title_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^###\s*\[?(\d+)\]?\.\s*(.+?)\s*$").unwrap())
}

fn priority_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?mi)^\|\s*\*{0,2}priority\*{0,2}\s*\|\s*(critical|high|medium|low)\s*\|\s*$").unwrap())
}

struct ExtractedFinding {
    title: String,
    priority: String,
    agent_display_name: String,
}

/// Produces the deterministic, priority-grouped Markdown roll-up. Input is
/// expected to already be the merged, successful result set; failed results
/// and the "no findings" sentinel contribute nothing.
pub struct FindingsExtractor;

impl FindingsExtractor {
    pub fn extract(results: &[ReviewResult]) -> String {
        let mut findings = Vec::new();
        for result in results {
            if !result.success {
                continue;
            }
            let Some(content) = result.content.as_deref() else {
                continue;
            };
            if content_has_no_findings(content) {
                continue;
            }
            findings.extend(Self::extract_one(content, result.agent_config.effective_display_name()));
        }
        Self::render(&findings)
    }

    fn extract_one(content: &str, agent_display_name: &str) -> Vec<ExtractedFinding> {
        let titles: Vec<String> = title_regex()
            .captures_iter(content)
            .map(|caps| caps.get(2).unwrap().as_str().to_string())
            .collect();
        let priorities: Vec<String> = priority_regex()
            .captures_iter(content)
            .map(|caps| Self::canonicalize(caps.get(1).unwrap().as_str()))
            .collect();

        let count = titles.len().max(priorities.len());
        (0..count)
            .map(|i| {
                let title = titles
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("Finding {}", i + 1));
                let priority = priorities.get(i).cloned().unwrap_or_else(|| "Unknown".to_string());
                ExtractedFinding {
                    title,
                    priority,
                    agent_display_name: agent_display_name.to_string(),
                }
            })
            .collect()
    }

    fn canonicalize(raw: &str) -> String {
        let lower = raw.to_lowercase();
        PRIORITY_ORDER
            .iter()
            .find(|p| p.to_lowercase() == lower)
            .map(|p| p.to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn render(findings: &[ExtractedFinding]) -> String {
        let mut sections = Vec::new();
        for priority in PRIORITY_ORDER {
            let group: Vec<&ExtractedFinding> = findings.iter().filter(|f| f.priority == *priority).collect();
            if group.is_empty() {
                continue;
            }
            let mut section = format!("#### {priority} ({})", group.len());
            for finding in &group {
                section.push_str(&format!("\n- **{}** — {}", finding.title, finding.agent_display_name));
            }
            sections.push(section);
        }
        sections.join("\n\n").trim_end().to_string()
    }
}
