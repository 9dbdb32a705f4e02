// writer/mod.rs
// Adaptive chunked generation: stream sentinel-framed items against the
// blueprint, validate each candidate, rewrite rejects, and halve the
// chunk size whenever output truncates.

mod parser;

pub use parser::{parse_chunk, ParsedChunk};

use crate::architect::{compose_rewrite_prompt, compose_writer_prompt};
use crate::cancel::CancelToken;
use crate::config::PipelineConfig;
use crate::domain::{
    Blueprint, BloomAlignmentEntry, CompensationProfile, GeneratedItem, GuardrailRule, MathFormat,
    PipelineError, Severity, Slot, Violation,
};
use crate::gatekeeper::{bloom_alignment, check_item, GatekeeperContext};
use crate::ports::{GenerationRequest, LlmProvider};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Extra generation calls allowed beyond the minimum needed to fill
/// every slot once.
const RETRY_ALLOWANCE: usize = 3;
/// Pause before the single transport-error retry.
const LLM_RETRY_BACKOFF_MS: u64 = 250;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterTelemetry {
    pub truncation_events: u32,
    pub rewrite_count: u32,
    pub rewrite_reasons: Vec<String>,
    pub gatekeeper_violations: u32,
    pub chunk_sizes: Vec<usize>,
    pub final_problem_count: usize,
    pub bloom_alignment_log: Vec<BloomAlignmentEntry>,
    /// Every per-item finding, kept for SCRIBE's weakness tallies.
    pub violations: Vec<Violation>,
}

#[derive(Debug)]
pub struct WriterOutcome {
    pub items: Vec<GeneratedItem>,
    pub telemetry: WriterTelemetry,
}

/// One LLM call outcome: text, or a deadline treated as truncation.
enum CallResult {
    Text(String),
    DeadlineAsTruncation,
}

pub struct Writer<'a> {
    llm: &'a dyn LlmProvider,
    config: &'a PipelineConfig,
}

impl<'a> Writer<'a> {
    pub fn new(llm: &'a dyn LlmProvider, config: &'a PipelineConfig) -> Self {
        Self { llm, config }
    }

    /// Fills every blueprint slot or fails with `WriterIncomplete`.
    /// Single-threaded per request: at most one LLM call in flight.
    pub async fn write(
        &self,
        blueprint: &Blueprint,
        compensation: &CompensationProfile,
        guardrails: &[GuardrailRule],
        cancel: &CancelToken,
        deadline: Instant,
    ) -> Result<WriterOutcome, PipelineError> {
        let plan = &blueprint.plan;
        let question_count = plan.question_count;
        let math_format = blueprint.uar.math_format.unwrap_or_default();
        let ctx = GatekeeperContext::new(blueprint, self.config.gatekeeper_redundancy_ratio);
        let rewrite_budget = if compensation.rewrite_budget == 0 {
            self.config.writer_rewrite_budget_default
        } else {
            compensation.rewrite_budget
        };

        let mut chunk_size = question_count
            .min(self.config.writer_chunk_size_max)
            .max(1);
        let attempt_budget = question_count.div_ceil(chunk_size) + RETRY_ALLOWANCE;

        let mut committed: BTreeMap<usize, GeneratedItem> = BTreeMap::new();
        let mut telemetry = WriterTelemetry::default();
        let mut attempts = 0usize;

        while committed.len() < question_count && attempts < attempt_budget {
            self.checkpoint(cancel, deadline)?;
            attempts += 1;

            let pending: Vec<&Slot> = plan
                .slots
                .iter()
                .filter(|s| !committed.contains_key(&s.index))
                .take(chunk_size)
                .collect();
            telemetry.chunk_sizes.push(pending.len());

            let pending_owned: Vec<Slot> = pending.iter().map(|s| (*s).clone()).collect();
            let prompt = compose_writer_prompt(
                blueprint,
                &pending_owned,
                compensation,
                guardrails,
                math_format,
            );

            let raw = match self.call_llm(prompt, deadline, cancel).await? {
                CallResult::Text(raw) => raw,
                CallResult::DeadlineAsTruncation => {
                    telemetry.truncation_events += 1;
                    chunk_size = (chunk_size / 2).max(1);
                    warn!(chunk_size, "generation deadline hit, halving chunk");
                    continue;
                }
            };

            // Parse boundary: honor cancellation before committing work.
            self.checkpoint(cancel, deadline)?;

            let parsed = parse_chunk(&raw);
            let received = parsed.items.len();
            debug!(
                received,
                failed = parsed.failed_blocks.len(),
                truncated = parsed.truncated,
                "chunk parsed"
            );

            for item in parsed.items {
                let Some(slot) = pending_owned.iter().find(|s| s.index == item.slot_id) else {
                    continue;
                };
                if committed.contains_key(&slot.index) {
                    continue;
                }
                if let Some(accepted) = self
                    .refine(
                        item,
                        slot,
                        &ctx,
                        blueprint,
                        compensation,
                        math_format,
                        rewrite_budget,
                        &mut telemetry,
                        cancel,
                        deadline,
                    )
                    .await?
                {
                    telemetry
                        .bloom_alignment_log
                        .push(bloom_alignment(&accepted, slot));
                    committed.insert(slot.index, accepted);
                }
            }

            if parsed.truncated {
                telemetry.truncation_events += 1;
            }
            if parsed.truncated || received < pending_owned.len() {
                chunk_size = (chunk_size / 2).max(1);
            }
        }

        telemetry.final_problem_count = committed.len();
        if committed.len() < question_count {
            return Err(PipelineError::WriterIncomplete {
                expected: question_count,
                produced: committed.len(),
            });
        }

        Ok(WriterOutcome {
            items: committed.into_values().collect(),
            telemetry,
        })
    }

    /// Validate a candidate, rewriting until it passes or the budget
    /// runs out. `None` means the slot stays unfilled.
    #[allow(clippy::too_many_arguments)]
    async fn refine(
        &self,
        mut item: GeneratedItem,
        slot: &Slot,
        ctx: &GatekeeperContext<'_>,
        blueprint: &Blueprint,
        compensation: &CompensationProfile,
        math_format: MathFormat,
        rewrite_budget: u32,
        telemetry: &mut WriterTelemetry,
        cancel: &CancelToken,
        deadline: Instant,
    ) -> Result<Option<GeneratedItem>, PipelineError> {
        let mut rewrites = 0u32;
        loop {
            let violations = check_item(&item, slot, ctx);
            telemetry.gatekeeper_violations += violations.len() as u32;
            telemetry.violations.extend(violations.iter().cloned());
            let highest = violations.iter().map(|v| v.severity).max();

            match highest {
                None | Some(Severity::Low) => return Ok(Some(item)),
                Some(severity) => {
                    if rewrites >= rewrite_budget {
                        // Medium findings are tolerable once the budget
                        // is spent; high findings leave the slot open.
                        return if severity == Severity::High {
                            warn!(slot = slot.index, "rewrite budget exhausted, slot unfilled");
                            Ok(None)
                        } else {
                            Ok(Some(item))
                        };
                    }
                    rewrites += 1;
                    telemetry.rewrite_count += 1;
                    let reasons: Vec<String> =
                        violations.iter().map(|v| v.message.clone()).collect();
                    telemetry.rewrite_reasons.extend(reasons.clone());

                    let prompt = compose_rewrite_prompt(
                        blueprint,
                        slot,
                        &item.prompt,
                        &reasons,
                        compensation,
                        math_format,
                    );
                    let raw = match self.call_llm(prompt, deadline, cancel).await? {
                        CallResult::Text(raw) => raw,
                        CallResult::DeadlineAsTruncation => continue,
                    };
                    self.checkpoint(cancel, deadline)?;

                    match parse_chunk(&raw).items.into_iter().next() {
                        Some(mut rewritten) => {
                            rewritten.slot_id = slot.index;
                            item = rewritten;
                        }
                        // A burned rewrite that produced nothing.
                        None => continue,
                    }
                }
            }
        }
    }

    /// One in-flight LLM call with the per-call deadline and the single
    /// backoff retry the transport contract allows.
    async fn call_llm(
        &self,
        prompt: String,
        deadline: Instant,
        cancel: &CancelToken,
    ) -> Result<CallResult, PipelineError> {
        self.checkpoint(cancel, deadline)?;

        let per_call = Duration::from_millis(self.config.llm_deadline_ms);
        let remaining = deadline.saturating_duration_since(Instant::now());
        let budget = per_call.min(remaining);
        if budget.is_zero() {
            return Err(PipelineError::PipelineDeadline);
        }

        let request = GenerationRequest {
            model: self.config.llm_model.clone(),
            prompt,
            temperature: self.config.llm_temperature,
            max_output_tokens: self.config.llm_max_tokens,
        };

        match tokio::time::timeout(budget, self.llm.generate(&request)).await {
            Ok(Ok(text)) => Ok(CallResult::Text(text)),
            Ok(Err(first)) => {
                warn!(error = %first, "generation failed, retrying once");
                tokio::time::sleep(Duration::from_millis(LLM_RETRY_BACKOFF_MS)).await;
                self.checkpoint(cancel, deadline)?;
                match tokio::time::timeout(budget, self.llm.generate(&request)).await {
                    Ok(Ok(text)) => Ok(CallResult::Text(text)),
                    Ok(Err(second)) => Err(PipelineError::LlmUnavailable(second.to_string())),
                    Err(_) => Ok(CallResult::DeadlineAsTruncation),
                }
            }
            Err(_) => Ok(CallResult::DeadlineAsTruncation),
        }
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
