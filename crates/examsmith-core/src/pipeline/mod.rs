// pipeline/mod.rs
// The orchestrator: usage cap, defaults merge, then Architect, Writer,
// final Gatekeeper pass, Philosopher, Builder, and a SCRIBE finalize
// that runs on every termination so trust reflects what happened.

mod trace;

pub use trace::{PipelineTrace, TraceStep};

use crate::architect;
use crate::builder;
use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::domain::{
    AgentPrefix, Blueprint, Culprit, FinalAssessment, GatekeeperReport, PipelineError,
    TeacherIntent, Violation,
};
use crate::gatekeeper::{check_batch, GatekeeperContext};
use crate::philosopher::{self, QualityReport, ReportStatus};
use crate::ports::{LlmProvider, StorageAdapter, Table};
use crate::scribe::{AgentRunOutcome, FinalizeInput, Scribe};
use crate::writer::{Writer, WriterTelemetry};
use chrono::{TimeZone, Utc};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// A completed run: the artifact plus everything the caller may want
/// to show or log.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub assessment: FinalAssessment,
    pub quality: QualityReport,
    pub writer_telemetry: WriterTelemetry,
    pub trace: PipelineTrace,
}

pub struct Pipeline {
    llm: Arc<dyn LlmProvider>,
    storage: Arc<dyn StorageAdapter>,
    config: PipelineConfig,
    rng: Mutex<StdRng>,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        storage: Arc<dyn StorageAdapter>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            llm,
            storage,
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seeded variant: with a scripted LLM, every run is fully
    /// deterministic.
    pub fn with_seed(
        llm: Arc<dyn LlmProvider>,
        storage: Arc<dyn StorageAdapter>,
        config: PipelineConfig,
        seed: u64,
    ) -> Self {
        Self {
            llm,
            storage,
            config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// The one operation this system exposes.
    pub async fn generate_assessment(
        &self,
        intent: &TeacherIntent,
        cancel: &CancelToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        intent.validate().map_err(PipelineError::InvalidIntent)?;

        // Usage cap reads fail closed: no count, no run.
        self.enforce_usage_cap(&intent.user_id).await?;

        let run_id = {
            let mut rng = self.rng.lock().expect("rng lock");
            format!("run_{}_{:04x}", Utc::now().timestamp_millis(), rng.gen::<u16>())
        };
        let mut trace = PipelineTrace::new(run_id);
        let deadline = Instant::now() + Duration::from_millis(self.config.pipeline_deadline_ms);
        let domain = intent.domain();

        let merged_intent = self.merge_predictive_defaults(intent.clone()).await;

        let result = self
            .run_stages(&merged_intent, &domain, cancel, deadline, &mut trace)
            .await;

        // SCRIBE sees every termination: success, cancellation, or
        // failure. Only the finished stages have anything to report.
        match result {
            Ok(outcome) => Ok(PipelineOutcome {
                trace: outcome.trace,
                assessment: outcome.assessment,
                quality: outcome.quality,
                writer_telemetry: outcome.telemetry,
            }),
            Err((error, blueprint, telemetry)) => {
                trace.cancelled = matches!(error, PipelineError::Cancelled);
                trace.failed = !trace.cancelled;
                // Every run that reached the stages ran the Architect,
                // so SCRIBE hears about every termination: the dossiers
                // count the run even when planning itself failed.
                let scribe = Scribe::new(self.storage.as_ref(), &self.config);
                let telemetry = telemetry.unwrap_or_default();
                let runs = if blueprint.is_some() {
                    agent_runs(&telemetry, &GatekeeperReport::default())
                } else {
                    vec![AgentRunOutcome {
                        agent: AgentPrefix::Architect,
                        violations: Vec::new(),
                        rewrite_count: 0,
                        final_problem_count: 0,
                    }]
                };
                scribe
                    .finalize(FinalizeInput {
                        user_id: &merged_intent.user_id,
                        domain: &domain,
                        intent: &merged_intent,
                        agent_runs: &runs,
                        alignment_log: &telemetry.bloom_alignment_log,
                        trace: &trace,
                        assessment: None,
                        quality_score: None,
                    })
                    .await;
                Err(error)
            }
        }
    }

    async fn run_stages(
        &self,
        intent: &TeacherIntent,
        domain: &str,
        cancel: &CancelToken,
        deadline: Instant,
        trace: &mut PipelineTrace,
    ) -> Result<StageOutput, (PipelineError, Option<Blueprint>, Option<WriterTelemetry>)> {
        let scribe = Scribe::new(self.storage.as_ref(), &self.config);

        // Governance reads are suspension points too.
        let compensation = scribe.select_agents(&intent.user_id, domain).await;
        let guardrails = scribe.active_guardrails(&intent.user_id, domain).await;
        info!(
            hints = compensation.hints.len(),
            guardrails = guardrails.len(),
            "compensation loaded"
        );

        // Architect.
        let started = Utc::now();
        let blueprint = {
            let mut rng = self.rng.lock().expect("rng lock");
            architect::plan(intent, &mut rng)
        }
        .map_err(|e| (e, None, None))?;
        trace.record(
            AgentPrefix::Architect.as_str(),
            format!(
                "{} slots, {}..{}",
                blueprint.plan.question_count, blueprint.plan.depth_floor, blueprint.plan.depth_ceiling
            ),
            started,
            vec![],
            0,
        );

        // Writer.
        let started = Utc::now();
        let writer = Writer::new(self.llm.as_ref(), &self.config);
        let outcome = writer
            .write(&blueprint, &compensation, &guardrails, cancel, deadline)
            .await
            .map_err(|e| (e, Some(blueprint.clone()), None))?;
        trace.record(
            AgentPrefix::Writer.as_str(),
            format!(
                "{} items, {} rewrites, {} truncations",
                outcome.telemetry.final_problem_count,
                outcome.telemetry.rewrite_count,
                outcome.telemetry.truncation_events
            ),
            started,
            vec![],
            outcome.telemetry.gatekeeper_violations as usize,
        );

        self.checkpoint(cancel, deadline)
            .map_err(|e| (e, Some(blueprint.clone()), Some(outcome.telemetry.clone())))?;

        // Final batch Gatekeeper pass.
        let started = Utc::now();
        let ctx = GatekeeperContext::new(&blueprint, self.config.gatekeeper_redundancy_ratio);
        let batch_report = check_batch(&outcome.items, &ctx);
        trace.record(
            "gatekeeper",
            format!("{} findings", batch_report.violations.len()),
            started,
            vec![],
            batch_report.violations.len(),
        );

        // Philosopher.
        let started = Utc::now();
        let quality = philosopher::review_draft(&outcome.items, &blueprint, &batch_report);
        trace.record(
            "philosopher",
            format!("quality {:.1}", quality.quality_score),
            started,
            vec![],
            0,
        );
        if quality.status == ReportStatus::Restart {
            return Err((
                PipelineError::WriterIncomplete {
                    expected: blueprint.plan.question_count,
                    produced: 0,
                },
                Some(blueprint),
                Some(outcome.telemetry),
            ));
        }

        // Builder.
        let started = Utc::now();
        let assessment = {
            let mut rng = self.rng.lock().expect("rng lock");
            builder::build(&outcome.items, &blueprint, &mut rng, Utc::now())
        };
        trace.record(
            "builder",
            format!("assessment {}", assessment.id),
            started,
            vec![],
            0,
        );

        // SCRIBE finalize on the happy path.
        let runs = agent_runs(&outcome.telemetry, &batch_report);
        scribe
            .finalize(FinalizeInput {
                user_id: &intent.user_id,
                domain,
                intent,
                agent_runs: &runs,
                alignment_log: &outcome.telemetry.bloom_alignment_log,
                trace,
                assessment: Some(&assessment),
                quality_score: Some(quality.quality_score),
            })
            .await;

        Ok(StageOutput {
            assessment,
            quality,
            telemetry: outcome.telemetry,
            trace: trace.clone(),
        })
    }

    /// Counts today's runs; any read failure blocks the run.
    async fn enforce_usage_cap(&self, user_id: &str) -> Result<(), PipelineError> {
        let now = Utc::now();
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .unwrap_or(now);

        let used = self
            .storage
            .count_since(Table::UsageLog, user_id, midnight)
            .await
            .map_err(|e| PipelineError::UsageCapRead(e.to_string()))?;

        if used >= self.config.daily_free_limit {
            return Err(PipelineError::QuotaExceeded {
                used,
                limit: self.config.daily_free_limit,
            });
        }

        if let Err(err) = self
            .storage
            .append(
                Table::UsageLog,
                user_id,
                "runs",
                serde_json::json!({"at": now}),
            )
            .await
        {
            warn!(error = %err, "usage log append failed");
        }
        Ok(())
    }

    /// Fills blanks the teacher left from their stored modal
    /// preferences.
    async fn merge_predictive_defaults(&self, mut intent: TeacherIntent) -> TeacherIntent {
        if intent.question_count.is_some() {
            return intent;
        }
        match self
            .storage
            .read_one(Table::PredictiveDefaults, &intent.user_id)
            .await
        {
            Ok(Some(row)) => {
                if let Some(count) = row.data["modal"]["questionCount"].as_u64() {
                    info!(count, "question count filled from predictive defaults");
                    intent.question_count = Some(count as usize);
                }
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "predictive defaults read failed"),
        }
        intent
    }

    fn checkpoint(&self, cancel: &CancelToken, deadline: Instant) -> Result<(), PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        if Instant::now() >= deadline {
            return Err(PipelineError::PipelineDeadline);
        }
        Ok(())
    }
}

struct StageOutput {
    assessment: FinalAssessment,
    quality: QualityReport,
    telemetry: WriterTelemetry,
    trace: PipelineTrace,
}

/// Splits a run's findings into per-agent outcomes by culprit.
fn agent_runs(telemetry: &WriterTelemetry, batch: &GatekeeperReport) -> Vec<AgentRunOutcome> {
    let mut writer_violations: Vec<Violation> = telemetry.violations.clone();
    let mut architect_violations: Vec<Violation> = Vec::new();
    for violation in &batch.violations {
        match violation.culprit {
            Culprit::Writer => writer_violations.push(violation.clone()),
            Culprit::Architect => architect_violations.push(violation.clone()),
        }
    }

    vec![
        AgentRunOutcome {
            agent: AgentPrefix::Writer,
            violations: writer_violations,
            rewrite_count: telemetry.rewrite_count,
            final_problem_count: telemetry.final_problem_count,
        },
        AgentRunOutcome {
            agent: AgentPrefix::Architect,
            violations: architect_violations,
            rewrite_count: 0,
            final_problem_count: telemetry.final_problem_count,
        },
    ]
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod pipeline_tests;
