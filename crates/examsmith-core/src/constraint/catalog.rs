// constraint/catalog.rs
// Phrase catalog the classifier scans teacher free-text against.

use crate::domain::{BloomLevel, ConstraintType, Polarity};
use once_cell::sync::Lazy;

/// A cue that classifies a whole sentence.
pub struct CuePattern {
    pub phrases: &'static [&'static str],
    pub constraint_type: ConstraintType,
    pub polarity: Polarity,
    /// Pinned level for bloom-cap / bloom-raise cues.
    pub level: Option<BloomLevel>,
}

/// A cue whose trailing text names the content it applies to
/// ("avoid …", "must address the misconception that …").
pub struct SubjectCue {
    pub prefixes: &'static [&'static str],
    pub constraint_type: ConstraintType,
    pub polarity: Polarity,
}

pub static CUE_PATTERNS: Lazy<Vec<CuePattern>> = Lazy::new(|| {
    vec![
        CuePattern {
            phrases: &[
                "keep it simple",
                "keep things simple",
                "nothing too hard",
                "basic questions only",
                "recall only",
                "stick to the basics",
            ],
            constraint_type: ConstraintType::BloomCap,
            polarity: Polarity::Require,
            level: Some(BloomLevel::Understand),
        },
        CuePattern {
            phrases: &["no analysis questions", "no deep analysis"],
            constraint_type: ConstraintType::BloomCap,
            polarity: Polarity::Require,
            level: Some(BloomLevel::Apply),
        },
        CuePattern {
            phrases: &[
                "push their thinking",
                "challenge them",
                "higher order thinking",
                "make them think critically",
                "stretch the students",
            ],
            constraint_type: ConstraintType::BloomRaise,
            polarity: Polarity::Require,
            level: Some(BloomLevel::Evaluate),
        },
        CuePattern {
            phrases: &[
                "focus only on",
                "only cover",
                "just cover",
                "stay on one concept",
                "keep the scope narrow",
            ],
            constraint_type: ConstraintType::ScopeNarrow,
            polarity: Polarity::Require,
            level: None,
        },
        CuePattern {
            phrases: &[
                "cover everything",
                "comprehensive review",
                "touch on all the topics",
                "cover the whole unit",
            ],
            constraint_type: ConstraintType::ScopeBroad,
            polarity: Polarity::Require,
            level: None,
        },
        CuePattern {
            phrases: &[
                "strict timing",
                "keep the timing tight",
                "they only have exactly",
                "no time to spare",
            ],
            constraint_type: ConstraintType::PacingStrict,
            polarity: Polarity::Require,
            level: None,
        },
        CuePattern {
            phrases: &["multiple choice only", "all multiple choice"],
            constraint_type: ConstraintType::FormatPreference,
            polarity: Polarity::Require,
            level: None,
        },
        CuePattern {
            phrases: &["no multiple choice", "avoid multiple choice"],
            constraint_type: ConstraintType::FormatPreference,
            polarity: Polarity::Forbid,
            level: None,
        },
    ]
});

pub static SUBJECT_CUES: Lazy<Vec<SubjectCue>> = Lazy::new(|| {
    vec![
        SubjectCue {
            prefixes: &[
                "avoid ",
                "do not include ",
                "don't include ",
                "no questions about ",
                "nothing about ",
                "exclude ",
                "stay away from ",
            ],
            constraint_type: ConstraintType::ForbiddenContent,
            polarity: Polarity::Forbid,
        },
        SubjectCue {
            prefixes: &[
                "address the misconception that ",
                "target the misconception that ",
                "students often think ",
                "common mistake is ",
                "include a question about the misconception that ",
            ],
            constraint_type: ConstraintType::RequiredMisconception,
            polarity: Polarity::Require,
        },
    ]
});
