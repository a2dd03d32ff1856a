use std::collections::HashMap;

use quorum_core::ReviewResult;
use tracing::debug;

use crate::finding::{is_near_duplicate, AggregatedFinding};
use crate::normalize::normalize_text;
use crate::parser::{content_has_no_findings, parse_blocks, FindingBlock};

/// Collapses multiple passes for the same agent into one result.
pub struct ReviewResultMerger;

impl ReviewResultMerger {
    /// Groups `results` by `agent_config.name`, preserving first-seen order,
    /// and merges each group. Idempotent: re-applying to an already-merged
    /// list (every group now size 1) is a no-op pass-through.
    pub fn merge_by_agent(results: Vec<ReviewResult>) -> Vec<ReviewResult> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<ReviewResult>> = HashMap::new();

        for result in results {
            let key = result.agent_config.name.clone();
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(result);
        }

        order
            .into_iter()
            .map(|key| {
                let group = groups.remove(&key).expect("key was just inserted above");
                Self::merge_group(group)
            })
            .collect()
    }

    fn merge_group(group: Vec<ReviewResult>) -> ReviewResult {
        if group.len() == 1 {
            return group.into_iter().next().expect("length checked above");
        }

        let failed_count = group.iter().filter(|r| !r.success).count();
        let last_failure = group.iter().rev().find(|r| !r.success).cloned();

        let successes: Vec<(usize, ReviewResult)> = group
            .into_iter()
            .enumerate()
            .filter(|(_, r)| r.success)
            .map(|(i, r)| (i + 1, r))
            .collect();

        if successes.is_empty() {
            debug!("all passes failed for this agent; returning the last failure");
            return last_failure.expect("group must contain at least one result since len > 1");
        }

        let agent_config = successes[0].1.agent_config.clone();
        let repository = successes[0].1.repository.clone();

        let mut findings: Vec<AggregatedFinding> = Vec::new();
        let mut keyed: HashMap<String, usize> = HashMap::new();

        for (pass_number, result) in &successes {
            let content = result.content.clone().unwrap_or_default();
            if content_has_no_findings(&content) {
                continue;
            }
            for block in parse_blocks(&content) {
                Self::ingest_block(&mut findings, &mut keyed, block, *pass_number);
            }
        }

        ReviewResult {
            agent_config,
            repository,
            content: Some(Self::render(&findings, failed_count)),
            timestamp: chrono::Utc::now(),
            success: true,
            error_message: None,
        }
    }

    fn ingest_block(
        findings: &mut Vec<AggregatedFinding>,
        keyed: &mut HashMap<String, usize>,
        block: FindingBlock,
        pass_number: usize,
    ) {
        let is_fallback = block.is_fallback() && block.title == "Additional Notes";
        let key = if is_fallback {
            format!("fallback|{}", normalize_text(&block.body))
        } else {
            normalize_text(&block.title)
        };

        if let Some(&idx) = keyed.get(&key) {
            findings[idx].add_pass(pass_number);
            return;
        }

        if !is_fallback {
            if let Some(idx) = findings.iter().position(|existing| {
                is_near_duplicate(
                    &block.title,
                    block.summary.as_deref(),
                    block.location.as_deref(),
                    block.priority.as_deref(),
                    existing,
                )
            }) {
                findings[idx].add_pass(pass_number);
                keyed.insert(key, idx);
                return;
            }
        }

        let index = findings.len();
        findings.push(AggregatedFinding::new(
            block.title,
            block.body,
            pass_number,
            block.priority.as_deref(),
            block.summary.as_deref(),
            block.location.as_deref(),
        ));
        keyed.insert(key, index);
    }

    fn render(findings: &[AggregatedFinding], failed_count: usize) -> String {
        let mut merged = if findings.is_empty() {
            "指摘事項なし".to_string()
        } else {
            findings
                .iter()
                .enumerate()
                .map(|(i, finding)| {
                    let mut piece = format!("### {}. {}", i + 1, finding.title);
                    if finding.pass_numbers.len() > 1 {
                        let passes = finding
                            .pass_numbers
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ");
                        piece.push_str(&format!("\n\n_detected in passes: {passes}_"));
                    }
                    if !finding.body.is_empty() {
                        piece.push_str(&format!("\n\n{}", finding.body));
                    }
                    piece
                })
                .collect::<Vec<_>>()
                .join("\n\n---\n\n")
        };

        if failed_count > 0 {
            merged.push_str(&format!(
                "\n\n> Note: {failed_count} pass(es) failed and were excluded from this merge."
            ));
        }
        merged
    }
}
