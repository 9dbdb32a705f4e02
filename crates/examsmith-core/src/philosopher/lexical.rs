// philosopher/lexical.rs
// Grade-appropriate lexical checks: sentence length, long words, and
// abstract vocabulary density.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LexicalMetrics {
    pub average_sentence_length: f64,
    pub long_word_ratio: f64,
    pub abstract_word_density: f64,
}

/// Ceilings for a grade band: (sentence length, long-word ratio,
/// abstract density).
pub fn thresholds_for_grade(grade: u8) -> (f64, f64, f64) {
    match grade {
        0..=5 => (12.0, 0.20, 0.08),
        6..=8 => (16.0, 0.30, 0.12),
        _ => (22.0, 0.40, 0.18),
    }
}

const ABSTRACT_SUFFIXES: [&str; 6] = ["tion", "ism", "ity", "ness", "ence", "ance"];

/// Words longer than this count as "long" for readability purposes.
const LONG_WORD_LEN: usize = 7;

pub fn measure(prompts: &[&str]) -> LexicalMetrics {
    let mut sentence_count = 0usize;
    let mut word_count = 0usize;
    let mut long_words = 0usize;
    let mut abstract_words = 0usize;

    for prompt in prompts {
        for sentence in prompt
            .split(['.', '?', '!'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sentence_count += 1;
            for word in sentence
                .split_whitespace()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
                .filter(|w| !w.is_empty())
            {
                word_count += 1;
                if word.len() > LONG_WORD_LEN {
                    long_words += 1;
                }
                let folded = word.to_lowercase();
                if ABSTRACT_SUFFIXES.iter().any(|s| folded.ends_with(s)) {
                    abstract_words += 1;
                }
            }
        }
    }

    if word_count == 0 {
        return LexicalMetrics::default();
    }
    LexicalMetrics {
        average_sentence_length: word_count as f64 / sentence_count.max(1) as f64,
        long_word_ratio: long_words as f64 / word_count as f64,
        abstract_word_density: abstract_words as f64 / word_count as f64,
    }
}

/// Which ceilings the measured text breaks for the grade, as readable
/// notes.
pub fn breaches(metrics: &LexicalMetrics, grade: u8) -> Vec<String> {
    let (max_sentence, max_long, max_abstract) = thresholds_for_grade(grade);
    let mut notes = Vec::new();
    if metrics.average_sentence_length > max_sentence {
        notes.push(format!(
            "sentences average {:.1} words against a grade-{} ceiling of {:.0}",
            metrics.average_sentence_length, grade, max_sentence
        ));
    }
    if metrics.long_word_ratio > max_long {
        notes.push(format!(
            "{:.0}% of words are long against a grade-{} ceiling of {:.0}%",
            metrics.long_word_ratio * 100.0,
            grade,
            max_long * 100.0
        ));
    }
    if metrics.abstract_word_density > max_abstract {
        notes.push(format!(
            "abstract vocabulary density {:.2} exceeds the grade-{} ceiling of {:.2}",
            metrics.abstract_word_density, grade, max_abstract
        ));
    }
    notes
}
