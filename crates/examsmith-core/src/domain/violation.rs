// domain/violation.rs
// Gatekeeper violation catalog shared with SCRIBE and the guardrail engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every rule-engine finding carries one of these types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationType {
    MissingField,
    InvalidJson,
    McqOptionsInvalid,
    McqAnswerMismatch,
    CognitiveDemandMismatch,
    DifficultyMismatch,
    TopicMismatch,
    DomainMismatch,
    ForbiddenContent,
    MissingMisconceptionAlignment,
    PacingViolation,
    ScopeWidthViolation,
    OrderingViolation,
    FormatViolation,
}

impl ViolationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationType::MissingField => "missing-field",
            ViolationType::InvalidJson => "invalid-json",
            ViolationType::McqOptionsInvalid => "mcq-options-invalid",
            ViolationType::McqAnswerMismatch => "mcq-answer-mismatch",
            ViolationType::CognitiveDemandMismatch => "cognitive-demand-mismatch",
            ViolationType::DifficultyMismatch => "difficulty-mismatch",
            ViolationType::TopicMismatch => "topic-mismatch",
            ViolationType::DomainMismatch => "domain-mismatch",
            ViolationType::ForbiddenContent => "forbidden-content",
            ViolationType::MissingMisconceptionAlignment => "missing-misconception-alignment",
            ViolationType::PacingViolation => "pacing-violation",
            ViolationType::ScopeWidthViolation => "scope-width-violation",
            ViolationType::OrderingViolation => "ordering-violation",
            ViolationType::FormatViolation => "format-violation",
        }
    }
}

impl fmt::Display for ViolationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Which agent's output caused the finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Culprit {
    Writer,
    Architect,
}

/// A single typed finding from the rule engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_id: Option<usize>,
    #[serde(rename = "type")]
    pub violation_type: ViolationType,
    pub message: String,
    pub severity: Severity,
    pub culprit: Culprit,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl Violation {
    pub fn new(
        slot_id: Option<usize>,
        violation_type: ViolationType,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            slot_id,
            violation_type,
            message: message.into(),
            severity,
            culprit: Culprit::Writer,
            field: None,
        }
    }

    pub fn with_culprit(mut self, culprit: Culprit) -> Self {
        self.culprit = culprit;
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Aggregate result of a gatekeeper pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatekeeperReport {
    pub violations: Vec<Violation>,
    pub checked_items: usize,
    /// Informational near-duplicate slot pairs; never blocking.
    #[serde(default)]
    pub redundancy_pairs: Vec<(usize, usize)>,
}

impl GatekeeperReport {
    pub fn highest_severity(&self) -> Option<Severity> {
        self.violations.iter().map(|v| v.severity).max()
    }

    pub fn count_of(&self, violation_type: ViolationType) -> usize {
        self.violations
            .iter()
            .filter(|v| v.violation_type == violation_type)
            .count()
    }
}

/// Drift direction for one slot's Bloom alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DriftDirection {
    Over,
    Under,
}

/// Per-slot record comparing what the Writer was asked to produce with
/// what the Gatekeeper detected. Feeds SCRIBE's drift recalibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloomAlignmentEntry {
    pub slot_id: usize,
    pub writer_bloom: super::bloom::BloomLevel,
    pub gatekeeper_bloom: Option<super::bloom::BloomLevel>,
    pub aligned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<DriftDirection>,
}
