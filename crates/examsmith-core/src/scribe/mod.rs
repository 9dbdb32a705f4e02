// scribe/mod.rs
// SCRIBE: governance and memory. Reads dossiers to compensate the next
// run, recalibrates from Bloom drift, and writes every terminated run
// back into trust, guardrails, history, and predictive defaults.
//
// Storage failures here are never fatal to the pipeline; everything is
// best-effort behind compare-and-swap.

pub mod guardrails;
mod update;

pub use update::{
    apply_run_outcome, assess_bloom_drift, drift_prescriptions, drift_reminder, friction_tier,
    DriftAssessment, DriftTier, FrictionTier,
};

use crate::config::PipelineConfig;
use crate::domain::{
    AgentPrefix, BloomAlignmentEntry, CompensationProfile, Dossier, FinalAssessment,
    GuardrailRule, GuardrailSet, TeacherIntent, Violation,
};
use crate::pipeline::PipelineTrace;
use crate::ports::{StorageAdapter, StoredRow, Table};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};

/// One agent's outcome inside a finished run.
#[derive(Debug, Clone)]
pub struct AgentRunOutcome {
    pub agent: AgentPrefix,
    pub violations: Vec<Violation>,
    pub rewrite_count: u32,
    pub final_problem_count: usize,
}

/// Everything `finalize` needs from the orchestrator.
pub struct FinalizeInput<'a> {
    pub user_id: &'a str,
    pub domain: &'a str,
    pub intent: &'a TeacherIntent,
    pub agent_runs: &'a [AgentRunOutcome],
    pub alignment_log: &'a [BloomAlignmentEntry],
    pub trace: &'a PipelineTrace,
    pub assessment: Option<&'a FinalAssessment>,
    pub quality_score: Option<f64>,
}

pub struct Scribe<'a> {
    storage: &'a dyn StorageAdapter,
    config: &'a PipelineConfig,
}

impl<'a> Scribe<'a> {
    pub fn new(storage: &'a dyn StorageAdapter, config: &'a PipelineConfig) -> Self {
        Self { storage, config }
    }

    // ========================================================================
    // Compensation (pre-run)
    // ========================================================================

    /// Loads or lazily creates the writer dossier and derives the
    /// prompt-level compensation for the coming run.
    pub async fn select_agents(&self, user_id: &str, domain: &str) -> CompensationProfile {
        let dossier = match self.load_dossier(user_id, AgentPrefix::Writer, domain).await {
            Ok((dossier, _)) => dossier,
            Err(err) => {
                warn!(error = %err, "dossier read failed, compensating from defaults");
                Dossier::new(user_id, AgentPrefix::Writer, domain)
            }
        };

        let mut hints = Vec::new();
        if dossier.weakness_count("pacing-violation") > 3 {
            hints.push("Keep prompts concise and consistent.".to_string());
        }
        if dossier.weakness_count("mcq-options-invalid") > 2 {
            hints.push(
                "Emit exactly 4 unique options; the answer must match one verbatim.".to_string(),
            );
        }
        let mastery = &dossier.domain_mastery;
        if mastery.runs >= 5 && mastery.clean_rate() < 0.5 {
            hints.push(format!(
                "Past {} sets have been inconsistent; check every item against its slot before moving on.",
                domain
            ));
        }
        if dossier.trust_score <= 3.0 {
            hints.push("Follow the blueprint precisely; no embellishments.".to_string());
        }
        if mastery.runs >= 3 && mastery.clean_rate() >= 0.8 {
            hints.push(format!(
                "Recent {} sets have been clean; keep the same approach.",
                domain
            ));
        }

        CompensationProfile {
            hints,
            prescriptions: dossier.prescriptions.clone(),
            rewrite_budget: dossier.rewrite_budget(),
            trust_score: dossier.trust_score,
        }
    }

    /// Guardrails worth inlining into the next prompt, strongest first.
    pub async fn active_guardrails(&self, user_id: &str, domain: &str) -> Vec<GuardrailRule> {
        let key = GuardrailSet::storage_key(user_id, AgentPrefix::Writer.as_str(), domain);
        let set = match self.storage.read_one(Table::Guardrails, &key).await {
            Ok(Some(row)) => serde_json::from_value::<GuardrailSet>(row.data).unwrap_or_default(),
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(error = %err, "guardrail read failed, injecting none");
                return Vec::new();
            }
        };
        let (trust, stability) = match self.load_dossier(user_id, AgentPrefix::Writer, domain).await
        {
            Ok((dossier, _)) => (dossier.trust_score, dossier.stability_score),
            Err(_) => (Dossier::TRUST_START, Dossier::TRUST_START),
        };
        guardrails::injectable(
            &set.rules,
            set.run_count,
            trust,
            stability,
            self.config.guardrail_max_injected,
        )
    }

    // ========================================================================
    // Finalize (post-run, always attempted)
    // ========================================================================

    /// Writes the run's outcomes back. Called on every termination,
    /// successful or not, so trust reflects reality.
    pub async fn finalize(&self, input: FinalizeInput<'_>) {
        for run in input.agent_runs {
            self.update_dossier(&input, run).await;
            if run.agent == AgentPrefix::Writer {
                self.update_guardrails(&input, run).await;
            }
        }
        self.append_history(&input).await;
        self.update_predictive_defaults(&input).await;
    }

    async fn update_dossier(&self, input: &FinalizeInput<'_>, run: &AgentRunOutcome) {
        for attempt in 0..2 {
            let (mut dossier, existing_version) = match self
                .load_dossier(input.user_id, run.agent, input.domain)
                .await
            {
                Ok(loaded) => loaded,
                Err(err) => {
                    warn!(error = %err, agent = %run.agent, "dossier load failed, skipping update");
                    return;
                }
            };

            let aborted = input.trace.cancelled || input.trace.failed;
            if aborted && run.final_problem_count == 0 && run.violations.is_empty() {
                // Nothing observable happened before the run aborted;
                // count it without moving trust. A run that died with
                // zero findings is not a clean run.
                dossier.domain_mastery.runs += 1;
                dossier.updated_at = Utc::now();
            } else {
                apply_run_outcome(&mut dossier, &run.violations, run.final_problem_count);
            }

            if run.agent == AgentPrefix::Writer {
                match friction_tier(run.rewrite_count, run.final_problem_count) {
                    FrictionTier::Systemic => {
                        dossier
                            .prescriptions
                            .push_required("Follow each slot descriptor exactly as written.");
                        dossier
                            .prescriptions
                            .push_forbidden("Free-form items that ignore the requested format.");
                    }
                    FrictionTier::Mild => {
                        info!("mild rewrite friction; a reminder will ride the next prompt");
                    }
                    FrictionTier::None => {}
                }

                let drift = assess_bloom_drift(input.alignment_log);
                match (drift.tier, drift.dominant) {
                    (DriftTier::Systemic, Some(direction)) => {
                        let extra = drift_prescriptions(direction);
                        for rule in extra.required {
                            dossier.prescriptions.push_required(rule);
                        }
                        for rule in extra.forbidden {
                            dossier.prescriptions.push_forbidden(rule);
                        }
                    }
                    (DriftTier::Mild, Some(direction)) => {
                        info!(reminder = drift_reminder(direction), "mild bloom drift");
                    }
                    _ => {}
                }
            }

            let key = Dossier::storage_key(input.user_id, run.agent, input.domain);
            let written = match existing_version {
                None => {
                    dossier.version = 1;
                    let data = match serde_json::to_value(&dossier) {
                        Ok(data) => data,
                        Err(err) => {
                            warn!(error = %err, "dossier serialization failed");
                            return;
                        }
                    };
                    self.storage
                        .upsert(
                            Table::Dossiers,
                            StoredRow {
                                key: key.clone(),
                                version: 1,
                                data,
                            },
                        )
                        .await
                        .map(|_| true)
                }
                Some(version) => {
                    dossier.version = version + 1;
                    match serde_json::to_value(&dossier) {
                        Ok(data) => {
                            self.storage
                                .update_if_version(Table::Dossiers, &key, data, version)
                                .await
                        }
                        Err(err) => {
                            warn!(error = %err, "dossier serialization failed");
                            return;
                        }
                    }
                }
            };

            match written {
                Ok(true) => {
                    debug!(agent = %run.agent, "dossier updated");
                    return;
                }
                Ok(false) if attempt == 0 => {
                    debug!("dossier version moved underneath us, retrying once");
                    continue;
                }
                Ok(false) => {
                    warn!(agent = %run.agent, "dossier update lost the version race twice, skipping");
                    return;
                }
                Err(err) => {
                    warn!(error = %err, "dossier write failed, skipping");
                    return;
                }
            }
        }
    }

    async fn update_guardrails(&self, input: &FinalizeInput<'_>, run: &AgentRunOutcome) {
        let key = GuardrailSet::storage_key(input.user_id, run.agent.as_str(), input.domain);
        let (trust, stability) = match self
            .load_dossier(input.user_id, run.agent, input.domain)
            .await
        {
            Ok((dossier, _)) => (dossier.trust_score, dossier.stability_score),
            Err(_) => (Dossier::TRUST_START, Dossier::TRUST_START),
        };

        for attempt in 0..2 {
            let (mut set, existing_version) =
                match self.storage.read_one(Table::Guardrails, &key).await {
                    Ok(Some(row)) => {
                        let version = row.version;
                        (
                            serde_json::from_value::<GuardrailSet>(row.data).unwrap_or_default(),
                            Some(version),
                        )
                    }
                    Ok(None) => (GuardrailSet::default(), None),
                    Err(err) => {
                        warn!(error = %err, "guardrail load failed, skipping update");
                        return;
                    }
                };

            set.run_count += 1;
            let current_run = set.run_count;
            let candidates = guardrails::synthesize(&run.violations, input.domain, current_run);
            guardrails::merge(&mut set.rules, candidates, current_run);
            guardrails::decay(
                &mut set.rules,
                current_run,
                trust,
                stability,
                self.config.guardrail_expiry_weight,
            );
            set.updated_at = Some(Utc::now());

            let written = match existing_version {
                None => {
                    set.version = 1;
                    match serde_json::to_value(&set) {
                        Ok(data) => self
                            .storage
                            .upsert(
                                Table::Guardrails,
                                StoredRow {
                                    key: key.clone(),
                                    version: 1,
                                    data,
                                },
                            )
                            .await
                            .map(|_| true),
                        Err(err) => {
                            warn!(error = %err, "guardrail serialization failed");
                            return;
                        }
                    }
                }
                Some(version) => {
                    set.version = version + 1;
                    match serde_json::to_value(&set) {
                        Ok(data) => {
                            self.storage
                                .update_if_version(Table::Guardrails, &key, data, version)
                                .await
                        }
                        Err(err) => {
                            warn!(error = %err, "guardrail serialization failed");
                            return;
                        }
                    }
                }
            };

            match written {
                Ok(true) => return,
                Ok(false) if attempt == 0 => continue,
                Ok(false) => {
                    warn!("guardrail update lost the version race twice, skipping");
                    return;
                }
                Err(err) => {
                    warn!(error = %err, "guardrail write failed, skipping");
                    return;
                }
            }
        }
    }

    async fn append_history(&self, input: &FinalizeInput<'_>) {
        let total_violations: usize = input.agent_runs.iter().map(|r| r.violations.len()).sum();
        let summary = json!({
            "runId": input.trace.run_id,
            "generatedAt": Utc::now(),
            "assessmentType": input.intent.assessment_type,
            "domain": input.domain,
            "questionCount": input.assessment.map(|a| a.total_items),
            "qualityScore": input.quality_score,
            "violationCount": total_violations,
            "cancelled": input.trace.cancelled,
        });
        if let Err(err) = self
            .storage
            .append(Table::AssessmentHistory, input.user_id, "runs", summary)
            .await
        {
            warn!(error = %err, "history append failed");
        }
    }

    /// Modal preferences for pre-filling the next request's blanks.
    async fn update_predictive_defaults(&self, input: &FinalizeInput<'_>) {
        let Some(assessment) = input.assessment else {
            return;
        };

        let existing = match self
            .storage
            .read_one(Table::PredictiveDefaults, input.user_id)
            .await
        {
            Ok(row) => row,
            Err(err) => {
                warn!(error = %err, "predictive defaults read failed");
                return;
            }
        };
        let version = existing.as_ref().map(|r| r.version).unwrap_or(0);
        let mut data = existing
            .map(|r| r.data)
            .unwrap_or_else(|| json!({"assessmentTypes": {}, "questionCounts": [], "difficulties": {}}));

        let type_key = input.intent.assessment_type.as_str();
        let types = &mut data["assessmentTypes"];
        types[type_key] = json!(types[type_key].as_u64().unwrap_or(0) + 1);

        if let Some(counts) = data["questionCounts"].as_array_mut() {
            counts.push(json!(assessment.total_items));
            if counts.len() > 20 {
                let excess = counts.len() - 20;
                counts.drain(..excess);
            }
        }

        let difficulty_key = assessment.metadata.difficulty_profile.as_str();
        let difficulties = &mut data["difficulties"];
        difficulties[difficulty_key] = json!(difficulties[difficulty_key].as_u64().unwrap_or(0) + 1);

        let median_count = data["questionCounts"].as_array().and_then(|a| median(a));
        data["modal"] = json!({
            "assessmentType": modal_key(&data["assessmentTypes"]),
            "questionCount": median_count,
            "difficulty": modal_key(&data["difficulties"]),
        });

        if let Err(err) = self
            .storage
            .upsert(
                Table::PredictiveDefaults,
                StoredRow {
                    key: input.user_id.to_string(),
                    version: version + 1,
                    data,
                },
            )
            .await
        {
            warn!(error = %err, "predictive defaults write failed");
        }
    }

    async fn load_dossier(
        &self,
        user_id: &str,
        agent: AgentPrefix,
        domain: &str,
    ) -> anyhow::Result<(Dossier, Option<i64>)> {
        let key = Dossier::storage_key(user_id, agent, domain);
        match self.storage.read_one(Table::Dossiers, &key).await? {
            Some(row) => {
                let version = row.version;
                let dossier = serde_json::from_value::<Dossier>(row.data)
                    .unwrap_or_else(|_| Dossier::new(user_id, agent, domain));
                Ok((dossier, Some(version)))
            }
            None => Ok((Dossier::new(user_id, agent, domain), None)),
        }
    }
}

/// Key with the highest count in a JSON object of counters.
fn modal_key(counters: &serde_json::Value) -> Option<String> {
    counters.as_object().and_then(|map| {
        map.iter()
            .max_by_key(|(_, v)| v.as_u64().unwrap_or(0))
            .map(|(k, _)| k.clone())
    })
}

/// Median of a JSON array of integers.
fn median(values: &[serde_json::Value]) -> Option<u64> {
    let mut numbers: Vec<u64> = values.iter().filter_map(|v| v.as_u64()).collect();
    if numbers.is_empty() {
        return None;
    }
    numbers.sort_unstable();
    Some(numbers[numbers.len() / 2])
}
