use std::collections::HashSet;

/// Frozen for this release (DESIGN.md Open Question resolution): bigram
/// Jaccard similarity strictly at or above this value counts as "similar".
pub const BIGRAM_JACCARD_THRESHOLD: f64 = 0.5;

const STOPWORDS: &[&str] = &["with", "from", "that", "this", "into", "have", "about"];

/// Lowercases, strips punctuation, and collapses whitespace to single
/// spaces. Idempotent: re-normalizing already-normalized text is a no-op,
/// since the output alphabet contains only lowercase alphanumerics and
/// single interior spaces.
pub fn normalize_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_space = false;
    for c in input.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_was_space = false;
        } else if !last_was_space && !out.is_empty() {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Character bigrams of an already-normalized string. A single-character (or
/// empty) input degenerates to at most one "bigram" equal to the whole
/// string so short titles still participate in similarity comparisons.
pub fn bigrams(normalized: &str) -> HashSet<String> {
    let chars: Vec<char> = normalized.chars().collect();
    if chars.len() < 2 {
        return if normalized.is_empty() {
            HashSet::new()
        } else {
            HashSet::from([normalized.to_string()])
        };
    }
    chars.windows(2).map(|pair| pair.iter().collect()).collect()
}

pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 { 0.0 } else { intersection / union }
}

/// True if the two normalized strings share at least one token of length
/// >= 4 outside the stopword list.
pub fn shares_keyword(a_normalized: &str, b_normalized: &str) -> bool {
    let is_candidate = |t: &&str| t.len() >= 4 && !STOPWORDS.contains(t);
    let a_tokens: HashSet<&str> = a_normalized.split_whitespace().filter(is_candidate).collect();
    if a_tokens.is_empty() {
        return false;
    }
    b_normalized
        .split_whitespace()
        .filter(is_candidate)
        .any(|t| a_tokens.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "SQL Injection in login!",
            "  already   normalized  ",
            "UPPER-CASE_Mixed.Punct",
            "",
        ];
        for s in samples {
            let once = normalize_text(s);
            let twice = normalize_text(&once);
            assert_eq!(once, twice, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn shares_keyword_ignores_short_tokens_and_stopwords() {
        assert!(!shares_keyword("from this", "from that"));
        assert!(shares_keyword("sql injection in login", "sqli in login handler"));
    }

    #[test]
    fn jaccard_of_empty_sets_is_one() {
        let empty = HashSet::new();
        assert_eq!(jaccard(&empty, &empty), 1.0);
    }
}
