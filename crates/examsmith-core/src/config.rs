// config.rs
// Closed configuration set for the pipeline, read from the environment
// with documented defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    pub llm_model: String,
    pub llm_temperature: f64,
    pub llm_max_tokens: u32,
    pub writer_chunk_size_max: usize,
    pub writer_rewrite_budget_default: u32,
    pub gatekeeper_redundancy_ratio: f64,
    pub guardrail_expiry_weight: f64,
    pub guardrail_max_injected: usize,
    pub daily_free_limit: i64,
    pub pipeline_deadline_ms: u64,
    pub llm_deadline_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            llm_model: "default".to_string(),
            llm_temperature: 0.2,
            llm_max_tokens: 4096,
            writer_chunk_size_max: 5,
            writer_rewrite_budget_default: 3,
            gatekeeper_redundancy_ratio: 0.7,
            guardrail_expiry_weight: 0.3,
            guardrail_max_injected: 8,
            daily_free_limit: 5,
            pipeline_deadline_ms: 300_000,
            llm_deadline_ms: 60_000,
        }
    }
}

impl PipelineConfig {
    /// Reads the closed env-var set; unset or unparsable vars keep
    /// their defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(model) = std::env::var("LLM_MODEL") {
            if !model.trim().is_empty() {
                config.llm_model = model;
            }
        }
        read_env("LLM_TEMPERATURE", &mut config.llm_temperature);
        read_env("LLM_MAX_TOKENS", &mut config.llm_max_tokens);
        read_env("WRITER_CHUNK_SIZE_MAX", &mut config.writer_chunk_size_max);
        read_env(
            "WRITER_REWRITE_BUDGET_DEFAULT",
            &mut config.writer_rewrite_budget_default,
        );
        read_env(
            "GATEKEEPER_REDUNDANCY_RATIO",
            &mut config.gatekeeper_redundancy_ratio,
        );
        read_env("GUARDRAIL_EXPIRY_WEIGHT", &mut config.guardrail_expiry_weight);
        read_env("GUARDRAIL_MAX_INJECTED", &mut config.guardrail_max_injected);
        read_env("DAILY_FREE_LIMIT", &mut config.daily_free_limit);
        read_env("PIPELINE_DEADLINE_MS", &mut config.pipeline_deadline_ms);
        read_env("LLM_DEADLINE_MS", &mut config.llm_deadline_ms);
        config
    }
}

fn read_env<T: std::str::FromStr>(name: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(name) {
        if let Ok(value) = raw.trim().parse() {
            *target = value;
        }
    }
}
