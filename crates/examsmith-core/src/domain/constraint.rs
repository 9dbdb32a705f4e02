// domain/constraint.rs
// Typed constraints derived from teacher free-text directives.

use super::bloom::BloomLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of directive categories the classifier can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintType {
    BloomCap,
    BloomRaise,
    ForbiddenContent,
    RequiredMisconception,
    ScopeNarrow,
    ScopeBroad,
    PacingStrict,
    FormatPreference,
}

impl ConstraintType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintType::BloomCap => "bloom-cap",
            ConstraintType::BloomRaise => "bloom-raise",
            ConstraintType::ForbiddenContent => "forbidden-content",
            ConstraintType::RequiredMisconception => "required-misconception",
            ConstraintType::ScopeNarrow => "scope-narrow",
            ConstraintType::ScopeBroad => "scope-broad",
            ConstraintType::PacingStrict => "pacing-strict",
            ConstraintType::FormatPreference => "format-preference",
        }
    }

    /// Two types conflict when they pull the same knob opposite ways.
    pub fn conflicts_with(&self, other: ConstraintType) -> bool {
        matches!(
            (self, other),
            (ConstraintType::BloomCap, ConstraintType::BloomRaise)
                | (ConstraintType::BloomRaise, ConstraintType::BloomCap)
                | (ConstraintType::ScopeNarrow, ConstraintType::ScopeBroad)
                | (ConstraintType::ScopeBroad, ConstraintType::ScopeNarrow)
        )
    }
}

impl fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Polarity {
    Require,
    Forbid,
}

/// Teacher-explicit phrases outrank heuristic inferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Priority {
    Heuristic,
    Explicit,
}

/// One classified directive, traceable back to the phrase that fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedConstraint {
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    pub polarity: Polarity,
    pub priority: Priority,
    pub source_text: String,
    /// Pinned level for bloom-cap / bloom-raise constraints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<BloomLevel>,
    /// Content phrase for forbidden-content / required-misconception.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

/// How wide the concept coverage should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ScopeWidth {
    Narrow,
    #[default]
    Standard,
    Broad,
}

impl ScopeWidth {
    /// Allowed band of distinct concept tags for a given item count.
    pub fn concept_band(&self, question_count: usize) -> (usize, usize) {
        match self {
            ScopeWidth::Narrow => (1, 2.max(question_count / 4)),
            ScopeWidth::Standard => (1, 3.max(question_count / 2)),
            ScopeWidth::Broad => (2.min(question_count), question_count),
        }
    }
}

/// Structural knobs derived from the resolved constraint set. Absent
/// fields mean "no override".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedStructural {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap_bloom_at: Option<BloomLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raise_bloom_ceiling: Option<BloomLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_width: Option<ScopeWidth>,
    /// Fraction of total time tolerated as pacing slack.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pacing_tolerance: Option<f64>,
}

/// Output of the constraint engine: what was seen, what survived
/// arbitration, and the structural knobs derived from the survivors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConstraints {
    pub classified: Vec<ClassifiedConstraint>,
    pub resolved: Vec<ClassifiedConstraint>,
    pub derived: DerivedStructural,
    pub warnings: Vec<String>,
}

impl ResolvedConstraints {
    /// Content phrases the Gatekeeper must not see in any prompt.
    pub fn forbidden_phrases(&self) -> Vec<&str> {
        self.resolved
            .iter()
            .filter(|c| {
                c.constraint_type == ConstraintType::ForbiddenContent
                    && c.polarity == Polarity::Forbid
            })
            .filter_map(|c| c.subject.as_deref())
            .collect()
    }

    /// Misconceptions at least one item must target.
    pub fn required_misconceptions(&self) -> Vec<&str> {
        self.resolved
            .iter()
            .filter(|c| c.constraint_type == ConstraintType::RequiredMisconception)
            .filter_map(|c| c.subject.as_deref())
            .collect()
    }
}
