// gatekeeper/text.rs
// Tokenizing, suffix-stripping stemmer, overlap ratio, and the
// response-time estimate used by the pacing check.

use crate::domain::QuestionType;
use std::collections::BTreeSet;

/// Lowercased alphanumeric words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Simple suffix stripping: enough to match "photosynthesis" against
/// "photosynthesizing" without a real stemmer.
pub fn stem(word: &str) -> String {
    let mut w = word.to_lowercase();
    for suffix in ["izing", "ising", "ized", "ised", "ing", "tion", "es", "ed", "s"] {
        if w.len() > suffix.len() + 2 && w.ends_with(suffix) {
            w.truncate(w.len() - suffix.len());
            break;
        }
    }
    w
}

/// True when any topic token survives in the prompt after stemming.
pub fn contains_any_keyword(prompt: &str, keywords: &[String]) -> bool {
    let prompt_stems: BTreeSet<String> = tokenize(prompt).iter().map(|w| stem(w)).collect();
    keywords.iter().any(|k| {
        let ks = stem(k);
        prompt_stems
            .iter()
            .any(|p| p == &ks || p.starts_with(&ks) || ks.starts_with(p.as_str()))
    })
}

/// Overlap of significant words (length > 4) between two prompts,
/// relative to the smaller set.
pub fn word_overlap_ratio(a: &str, b: &str) -> f64 {
    let set_a: BTreeSet<String> = tokenize(a).into_iter().filter(|w| w.len() > 4).collect();
    let set_b: BTreeSet<String> = tokenize(b).into_iter().filter(|w| w.len() > 4).collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / set_a.len().min(set_b.len()) as f64
}

/// Seconds a student plausibly needs for an item: a per-type base plus
/// reading time proportional to the prompt length.
pub fn estimate_response_seconds(question_type: QuestionType, prompt: &str) -> f64 {
    let base = question_type.pacing_minutes() * 60.0 * 0.8;
    let words = tokenize(prompt).len() as f64;
    base + 0.4 * words
}
