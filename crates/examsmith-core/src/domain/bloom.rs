// domain/bloom.rs
// Bloom taxonomy vocabulary: the ordered cognitive-demand scale and the
// verb dictionary used for prompt classification.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cognitive demand level, ordered from shallowest to deepest.
///
/// Every depth comparison in the pipeline goes through this ordering:
/// a detected level "meets" an intended level when its index is greater
/// than or equal to the intended index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum BloomLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

impl BloomLevel {
    /// All levels in ascending order of cognitive demand.
    pub const ALL: [BloomLevel; 6] = [
        BloomLevel::Remember,
        BloomLevel::Understand,
        BloomLevel::Apply,
        BloomLevel::Analyze,
        BloomLevel::Evaluate,
        BloomLevel::Create,
    ];

    /// Zero-based position on the demand scale.
    pub fn index(&self) -> usize {
        match self {
            BloomLevel::Remember => 0,
            BloomLevel::Understand => 1,
            BloomLevel::Apply => 2,
            BloomLevel::Analyze => 3,
            BloomLevel::Evaluate => 4,
            BloomLevel::Create => 5,
        }
    }

    /// Level at a given index, clamped to the scale.
    pub fn from_index(index: usize) -> BloomLevel {
        Self::ALL[index.min(Self::ALL.len() - 1)]
    }

    /// One step shallower, saturating at `Remember`.
    pub fn step_down(&self) -> BloomLevel {
        Self::from_index(self.index().saturating_sub(1))
    }

    /// One step deeper, saturating at `Create`.
    pub fn step_up(&self) -> BloomLevel {
        Self::from_index(self.index() + 1)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BloomLevel::Remember => "remember",
            BloomLevel::Understand => "understand",
            BloomLevel::Apply => "apply",
            BloomLevel::Analyze => "analyze",
            BloomLevel::Evaluate => "evaluate",
            BloomLevel::Create => "create",
        }
    }

    pub fn parse(s: &str) -> Option<BloomLevel> {
        match s.trim().to_lowercase().as_str() {
            "remember" => Some(BloomLevel::Remember),
            "understand" => Some(BloomLevel::Understand),
            "apply" => Some(BloomLevel::Apply),
            "analyze" => Some(BloomLevel::Analyze),
            "evaluate" => Some(BloomLevel::Evaluate),
            "create" => Some(BloomLevel::Create),
            _ => None,
        }
    }
}

impl fmt::Display for BloomLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `detected` satisfies `intended` when it is at least as deep.
pub fn bloom_meets(detected: BloomLevel, intended: BloomLevel) -> bool {
    detected.index() >= intended.index()
}

// ============================================================================
// Verb dictionary
// ============================================================================

/// Verb and phrase cues per level. This table is the single source of
/// truth for prompt classification: the Gatekeeper's alignment checks
/// and SCRIBE's drift analysis both read it, so they can never disagree
/// about what a prompt demands.
pub static VERB_DICTIONARY: Lazy<Vec<(BloomLevel, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (
            BloomLevel::Remember,
            vec![
                "define", "list", "identify", "recall", "name", "state", "label", "recognize",
                "match", "select", "memorize", "repeat",
            ],
        ),
        (
            BloomLevel::Understand,
            vec![
                "explain", "describe", "summarize", "paraphrase", "interpret", "classify",
                "discuss", "restate", "translate", "illustrate", "give an example",
            ],
        ),
        (
            BloomLevel::Apply,
            vec![
                "apply", "solve", "use", "demonstrate", "calculate", "compute", "implement",
                "complete", "show", "model", "predict",
            ],
        ),
        (
            BloomLevel::Analyze,
            vec![
                "analyze", "compare", "contrast", "categorize", "differentiate", "distinguish",
                "examine", "organize", "break down", "relate", "infer",
            ],
        ),
        (
            BloomLevel::Evaluate,
            vec![
                "evaluate", "judge", "justify", "critique", "defend", "assess", "argue",
                "recommend", "prioritize", "weigh",
            ],
        ),
        (
            BloomLevel::Create,
            vec![
                "create", "design", "compose", "construct", "develop", "formulate", "invent",
                "propose", "devise", "plan",
            ],
        ),
    ]
});

/// Highest level whose verbs appear in the text, if any.
///
/// Matching is case-folded and word-boundary aware for single-word
/// cues; multi-word cues match as substrings of the folded text.
pub fn classify_bloom_level(text: &str) -> Option<BloomLevel> {
    classify_bloom_level_range(text).into_iter().max()
}

/// Every level with at least one matching verb, ascending.
pub fn classify_bloom_level_range(text: &str) -> Vec<BloomLevel> {
    let folded = text.to_lowercase();
    let words: Vec<&str> = folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    VERB_DICTIONARY
        .iter()
        .filter(|(_, verbs)| {
            verbs.iter().any(|verb| {
                if verb.contains(' ') {
                    folded.contains(verb)
                } else {
                    words.iter().any(|w| w == verb)
                }
            })
        })
        .map(|(level, _)| *level)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_the_scale() {
        assert!(BloomLevel::Remember < BloomLevel::Understand);
        assert!(BloomLevel::Evaluate < BloomLevel::Create);
        assert_eq!(BloomLevel::Analyze.index(), 3);
        assert_eq!(BloomLevel::from_index(4), BloomLevel::Evaluate);
    }

    #[test]
    fn meets_is_at_least_as_deep() {
        assert!(bloom_meets(BloomLevel::Analyze, BloomLevel::Apply));
        assert!(bloom_meets(BloomLevel::Apply, BloomLevel::Apply));
        assert!(!bloom_meets(BloomLevel::Remember, BloomLevel::Apply));
    }

    #[test]
    fn classifies_highest_matching_level() {
        assert_eq!(
            classify_bloom_level("List the planets of the solar system."),
            Some(BloomLevel::Remember)
        );
        assert_eq!(
            classify_bloom_level("Compare and contrast mitosis and meiosis."),
            Some(BloomLevel::Analyze)
        );
        // "List" and "justify" both present: the deeper verb wins
        assert_eq!(
            classify_bloom_level("List three reasons and justify your choice."),
            Some(BloomLevel::Evaluate)
        );
        assert_eq!(classify_bloom_level("Photosynthesis occurs in leaves."), None);
    }

    #[test]
    fn multi_word_cues_match_as_phrases() {
        assert_eq!(
            classify_bloom_level("Give an example of a chemical change."),
            Some(BloomLevel::Understand)
        );
        assert_eq!(
            classify_bloom_level("Break down the argument into premises."),
            Some(BloomLevel::Analyze)
        );
    }

    #[test]
    fn single_word_cues_respect_word_boundaries() {
        // "classify" contains "class" nowhere relevant; "userify" must not match "use"
        assert_eq!(classify_bloom_level("The userify function is fast."), None);
    }

    #[test]
    fn parse_round_trips_display() {
        for level in BloomLevel::ALL {
            assert_eq!(BloomLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(BloomLevel::parse("nonsense"), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn verb_subset() -> impl Strategy<Value = Vec<&'static str>> {
            let all: Vec<&'static str> = VERB_DICTIONARY
                .iter()
                .flat_map(|(_, verbs)| verbs.iter().copied())
                .collect();
            proptest::sample::subsequence(all, 0..8)
        }

        proptest! {
            // Adding verbs to a text can only deepen its classification.
            #[test]
            fn classification_is_monotone_under_verb_superset(
                base in verb_subset(),
                extra in verb_subset(),
            ) {
                let text_small = base.join(" the material ");
                let mut grown = base.clone();
                grown.extend(extra);
                let text_large = grown.join(" the material ");
                let small = classify_bloom_level(&text_small);
                let large = classify_bloom_level(&text_large);
                prop_assert!(large >= small);
            }

            #[test]
            fn meets_agrees_with_index_order(a in 0usize..6, b in 0usize..6) {
                let detected = BloomLevel::from_index(a);
                let intended = BloomLevel::from_index(b);
                prop_assert_eq!(bloom_meets(detected, intended), a >= b);
            }
        }
    }
}
