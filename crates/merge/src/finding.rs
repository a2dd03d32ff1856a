use std::collections::HashSet;

use crate::normalize::{bigrams, jaccard, normalize_text, shares_keyword, BIGRAM_JACCARD_THRESHOLD};

/// One merged finding, deduplicated across passes. `pass_numbers` is ordered
/// by first-seen.
#[derive(Debug, Clone)]
pub struct AggregatedFinding {
    pub title: String,
    pub body: String,
    pub pass_numbers: Vec<usize>,
    pub normalized_title: String,
    pub normalized_priority: String,
    pub normalized_summary: String,
    pub normalized_location: String,
    pub title_bigrams: HashSet<String>,
    pub summary_bigrams: HashSet<String>,
    pub location_bigrams: HashSet<String>,
}

impl AggregatedFinding {
    pub fn new(
        title: String,
        body: String,
        first_pass: usize,
        priority: Option<&str>,
        summary: Option<&str>,
        location: Option<&str>,
    ) -> Self {
        let normalized_title = normalize_text(&title);
        let normalized_priority = priority.map(normalize_text).unwrap_or_default();
        let normalized_summary = summary.map(normalize_text).unwrap_or_default();
        let normalized_location = location.map(normalize_text).unwrap_or_default();
        let title_bigrams = bigrams(&normalized_title);
        let summary_bigrams = bigrams(&normalized_summary);
        let location_bigrams = bigrams(&normalized_location);
        Self {
            title,
            body,
            pass_numbers: vec![first_pass],
            normalized_title,
            normalized_priority,
            normalized_summary,
            normalized_location,
            title_bigrams,
            summary_bigrams,
            location_bigrams,
        }
    }

    pub fn add_pass(&mut self, pass_number: usize) {
        if !self.pass_numbers.contains(&pass_number) {
            self.pass_numbers.push(pass_number);
        }
    }
}

/// Multi-signal near-duplicate test. `existing` is the
/// already-aggregated finding being probed against; the other arguments
/// describe the incoming block.
pub fn is_near_duplicate(
    title: &str,
    summary: Option<&str>,
    location: Option<&str>,
    priority: Option<&str>,
    existing: &AggregatedFinding,
) -> bool {
    let norm_title = normalize_text(title);
    let norm_summary = summary.map(normalize_text).unwrap_or_default();
    let norm_location = location.map(normalize_text).unwrap_or_default();
    let norm_priority = priority.map(normalize_text).unwrap_or_default();

    if !norm_priority.is_empty()
        && !existing.normalized_priority.is_empty()
        && norm_priority != existing.normalized_priority
    {
        return false;
    }

    let title_bigrams = bigrams(&norm_title);
    let summary_bigrams = bigrams(&norm_summary);
    let location_bigrams = bigrams(&norm_location);

    let title_similar = jaccard(&title_bigrams, &existing.title_bigrams) >= BIGRAM_JACCARD_THRESHOLD;
    let summary_similar = !norm_summary.is_empty()
        && !existing.normalized_summary.is_empty()
        && jaccard(&summary_bigrams, &existing.summary_bigrams) >= BIGRAM_JACCARD_THRESHOLD;
    let shared_keyword = shares_keyword(&norm_title, &existing.normalized_title);

    if !norm_location.is_empty() && !existing.normalized_location.is_empty() {
        let location_similar =
            jaccard(&location_bigrams, &existing.location_bigrams) >= BIGRAM_JACCARD_THRESHOLD;
        return location_similar && (summary_similar || title_similar || shared_keyword);
    }

    summary_similar && title_similar
}
