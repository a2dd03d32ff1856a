use std::sync::OnceLock;

use regex::Regex;

fn heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^###\s*\[?(\d+)\]?\.\s*(.+?)\s*$").unwrap())
}

fn cell_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\|\s*\*{0,2}([^|*]+?)\*{0,2}\s*\|\s*(.+?)\s*\|\s*$").unwrap())
}

/// One `### N. Title` section parsed out of a pass's raw content, plus the
/// structured cells pulled from its findings table when present.
#[derive(Debug, Clone)]
pub struct FindingBlock {
    pub title: String,
    pub body: String,
    pub priority: Option<String>,
    pub summary: Option<String>,
    pub location: Option<String>,
}

impl FindingBlock {
    pub fn is_fallback(&self) -> bool {
        self.priority.is_none() && self.summary.is_none() && self.location.is_none()
    }
}

/// Splits a pass's content into finding blocks by scanning for `### [N].
/// Title` / `### N. Title` headings. Content with no such heading collapses
/// to a single fallback block carrying the whole trimmed body.
pub fn parse_blocks(content: &str) -> Vec<FindingBlock> {
    let heading = heading_regex();
    let matches: Vec<(usize, usize, String)> = heading
        .captures_iter(content)
        .map(|caps| {
            let whole = caps.get(0).unwrap();
            (whole.start(), whole.end(), caps.get(2).unwrap().as_str().to_string())
        })
        .collect();

    if matches.is_empty() {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        return vec![FindingBlock {
            title: "Additional Notes".to_string(),
            body: trimmed.to_string(),
            priority: None,
            summary: None,
            location: None,
        }];
    }

    let mut blocks = Vec::with_capacity(matches.len());
    for (i, (_, end, title)) in matches.iter().enumerate() {
        let body_end = matches.get(i + 1).map(|(s, _, _)| *s).unwrap_or(content.len());
        let body = content[*end..body_end].trim().to_string();
        let (priority, summary, location) = extract_cells(&body);
        blocks.push(FindingBlock {
            title: title.clone(),
            body,
            priority,
            summary,
            location,
        });
    }
    blocks
}

fn extract_cells(body: &str) -> (Option<String>, Option<String>, Option<String>) {
    let mut priority = None;
    let mut summary = None;
    let mut location = None;
    for caps in cell_regex().captures_iter(body) {
        let key = caps.get(1).unwrap().as_str().trim().to_lowercase();
        let value = caps.get(2).unwrap().as_str().trim().to_string();
        if key.contains("priority") {
            priority = Some(value);
        } else if key.contains("概要") || key.contains("summary") {
            summary = Some(value);
        } else if key.contains("該当箇所") || key.contains("location") {
            location = Some(value);
        }
    }
    (priority, summary, location)
}

/// Whether a result's content is the "no findings" sentinel — the literal
/// marker "指摘事項なし", or its English fallback for agents configured to
/// respond in English.
pub fn content_has_no_findings(content: &str) -> bool {
    let trimmed = content.trim();
    trimmed == "指摘事項なし" || trimmed.to_lowercase().contains("no findings")
}
