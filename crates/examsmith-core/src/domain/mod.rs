// domain/mod.rs
// Shared vocabulary and value objects for the pipeline.

pub mod bloom;
pub mod blueprint;
pub mod constraint;
pub mod dossier;
pub mod error;
pub mod guardrail;
pub mod intent;
pub mod item;
pub mod rigor;
pub mod violation;

pub use bloom::{
    bloom_meets, classify_bloom_level, classify_bloom_level_range, BloomLevel, VERB_DICTIONARY,
};
pub use blueprint::{
    Blueprint, DifficultyModifier, DifficultyProfile, OrderingStrategy, Plan, Slot,
    MAX_CONSECUTIVE_SAME_LEVEL,
};
pub use constraint::{
    ClassifiedConstraint, ConstraintType, DerivedStructural, Polarity, Priority,
    ResolvedConstraints, ScopeWidth,
};
pub use dossier::{AgentPrefix, CompensationProfile, Dossier, DomainMastery, Prescriptions};
pub use error::{PipelineError, UserFacingError};
pub use guardrail::{GuardrailRule, GuardrailSet};
pub use intent::{
    AssessmentType, MathFormat, QuestionType, SourceDocument, StudentLevel, TeacherIntent,
};
pub use item::{AssessmentItem, AssessmentMetadata, FinalAssessment, GeneratedItem};
pub use rigor::{resolve_rigor_profile, RigorProfile};
pub use violation::{
    BloomAlignmentEntry, Culprit, DriftDirection, GatekeeperReport, Severity, Violation,
    ViolationType,
};
