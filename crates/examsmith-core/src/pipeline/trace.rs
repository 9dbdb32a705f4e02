// pipeline/trace.rs
// Per-run telemetry: which agent ran, when, and what it produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStep {
    pub agent: String,
    pub summary: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default)]
    pub violations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTrace {
    pub run_id: String,
    pub steps: Vec<TraceStep>,
    #[serde(default)]
    pub cancelled: bool,
    /// A fatal error terminated the run before the Builder finished.
    #[serde(default)]
    pub failed: bool,
}

impl PipelineTrace {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            steps: Vec::new(),
            cancelled: false,
            failed: false,
        }
    }

    pub fn record(
        &mut self,
        agent: &str,
        summary: impl Into<String>,
        started_at: DateTime<Utc>,
        errors: Vec<String>,
        violations: usize,
    ) {
        self.steps.push(TraceStep {
            agent: agent.to_string(),
            summary: summary.into(),
            started_at,
            finished_at: Utc::now(),
            errors,
            violations,
        });
    }
}
