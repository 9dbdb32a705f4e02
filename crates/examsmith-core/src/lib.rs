pub mod architect;
pub mod builder;
pub mod cancel;
pub mod config;
pub mod constraint;
pub mod domain;
pub mod gatekeeper;
pub mod philosopher;
pub mod pipeline;
pub mod ports;
pub mod scribe;
pub mod writer;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use config::PipelineConfig;
pub use domain::{
    bloom_meets,
    classify_bloom_level,
    classify_bloom_level_range,
    resolve_rigor_profile,
    AgentPrefix,
    AssessmentItem,
    AssessmentType,
    BloomAlignmentEntry,
    BloomLevel,
    Blueprint,
    ClassifiedConstraint,
    CompensationProfile,
    ConstraintType,
    Culprit,
    DerivedStructural,
    DifficultyModifier,
    DifficultyProfile,
    Dossier,
    DriftDirection,
    FinalAssessment,
    GatekeeperReport,
    GeneratedItem,
    GuardrailRule,
    GuardrailSet,
    MathFormat,
    OrderingStrategy,
    PipelineError,
    Plan,
    Polarity,
    Priority,
    QuestionType,
    ResolvedConstraints,
    RigorProfile,
    ScopeWidth,
    Severity,
    Slot,
    SourceDocument,
    StudentLevel,
    TeacherIntent,
    UserFacingError,
    Violation,
    ViolationType,
};

pub use constraint::resolve_constraints;
pub use pipeline::{Pipeline, PipelineOutcome, PipelineTrace, TraceStep};
pub use ports::{
    ChunkSink, GenerationRequest, LlmProvider, StorageAdapter, StoredRow, Table, ITEM_SENTINEL,
};
pub use scribe::{AgentRunOutcome, FinalizeInput, Scribe};
pub use writer::{parse_chunk, ParsedChunk, Writer, WriterOutcome, WriterTelemetry};

pub use philosopher::{
    compare_drafts, playtest_summary, review_draft, CompareReport, PlaytestReport, QualityReport,
    ReportStatus,
};
