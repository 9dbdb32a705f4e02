// domain/guardrail.rs
// Reinforced, decaying prompt-level rules persisted per
// (user, agent, domain).

use super::constraint::Polarity;
use super::violation::ViolationType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One guardrail rule. Born at weight 0.5, reinforced on repeat
/// violations, decayed while inactive, dropped below the expiry weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailRule {
    pub id: String,
    pub category: ViolationType,
    pub polarity: Polarity,
    pub message: String,
    pub domain: String,
    pub created_at_run: u64,
    pub last_triggered_run: u64,
    pub trigger_count: u32,
    /// Effective strength in [0, 1].
    pub weight: f64,
}

impl GuardrailRule {
    pub const INITIAL_WEIGHT: f64 = 0.5;
    pub const REINFORCE_STEP: f64 = 0.15;

    pub fn new(
        category: ViolationType,
        polarity: Polarity,
        message: impl Into<String>,
        domain: impl Into<String>,
        created_at_run: u64,
    ) -> Self {
        let domain = domain.into();
        Self {
            id: format!("{}:{}:{}", domain, category, created_at_run),
            category,
            polarity,
            message: message.into(),
            domain,
            created_at_run,
            last_triggered_run: created_at_run,
            trigger_count: 1,
            weight: Self::INITIAL_WEIGHT,
        }
    }

    /// Same rule identity for merge purposes.
    pub fn matches(&self, other: &GuardrailRule) -> bool {
        self.category == other.category
            && self.polarity == other.polarity
            && self.domain == other.domain
    }
}

/// Persisted rule set for one (user, agent, domain), with the run
/// counter that drives decay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailSet {
    #[serde(default)]
    pub rules: Vec<GuardrailRule>,
    pub version: i64,
    pub run_count: u64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl GuardrailSet {
    pub fn storage_key(user_id: &str, agent: &str, domain: &str) -> String {
        format!("{}:{}:{}", user_id, agent, domain)
    }
}
