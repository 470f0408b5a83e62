#![forbid(unsafe_code)]

use std::collections::BTreeSet;

const SUMMARY_MAX_CHARS: usize = 100;
const MIN_TOKEN_CHARS: usize = 3;

/// First non-empty line, capped at `SUMMARY_MAX_CHARS` characters.
pub(super) fn summarize(content: &str) -> String {
    let line = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    if line.chars().count() <= SUMMARY_MAX_CHARS {
        return line.to_string();
    }
    let mut out: String = line.chars().take(SUMMARY_MAX_CHARS - 3).collect();
    out.push_str("...");
    out
}

/// Blank-line separated blocks, trimmed, empties dropped.
pub(super) fn paragraphs(data: &str) -> Vec<&str> {
    data.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Lowercased alphanumeric words of at least `MIN_TOKEN_CHARS` characters.
pub(super) fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|word| word.chars().count() >= MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
        .collect()
}

/// Share of `query` tokens present in `candidate`.
pub(super) fn coverage(query: &BTreeSet<String>, candidate: &BTreeSet<String>) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let hits = query.iter().filter(|t| candidate.contains(*t)).count();
    hits as f64 / query.len() as f64
}

pub(super) fn jaccard(a: &[String], b: &[String]) -> f64 {
    let a: BTreeSet<&str> = a.iter().map(String::as_str).collect();
    let b: BTreeSet<&str> = b.iter().map(String::as_str).collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

pub(super) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
