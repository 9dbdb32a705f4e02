// domain/dossier.rs
// Per (user, agent, domain) governance record: trust, stability,
// weaknesses, and the prescriptions SCRIBE injects into future prompts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Agents that accumulate a dossier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentPrefix {
    Writer,
    Architect,
    Astronomer,
}

impl AgentPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentPrefix::Writer => "writer",
            AgentPrefix::Architect => "architect",
            AgentPrefix::Astronomer => "astronomer",
        }
    }
}

impl fmt::Display for AgentPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run tally for one subject domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainMastery {
    pub runs: u32,
    pub clean_runs: u32,
}

impl DomainMastery {
    pub fn clean_rate(&self) -> f64 {
        if self.runs == 0 {
            return 0.0;
        }
        self.clean_runs as f64 / self.runs as f64
    }
}

/// Required / forbidden behaviors injected into the Writer prompt.
/// Each list keeps at most [`Prescriptions::MAX_PER_CATEGORY`] entries,
/// most recent last.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescriptions {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub forbidden: Vec<String>,
}

impl Prescriptions {
    pub const MAX_PER_CATEGORY: usize = 5;

    pub fn push_required(&mut self, behavior: impl Into<String>) {
        Self::push_capped(&mut self.required, behavior.into());
    }

    pub fn push_forbidden(&mut self, behavior: impl Into<String>) {
        Self::push_capped(&mut self.forbidden, behavior.into());
    }

    fn push_capped(list: &mut Vec<String>, behavior: String) {
        list.retain(|b| b != &behavior);
        list.push(behavior);
        if list.len() > Self::MAX_PER_CATEGORY {
            let excess = list.len() - Self::MAX_PER_CATEGORY;
            list.drain(..excess);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.forbidden.is_empty()
    }
}

/// Governance record for one (user, agent, domain) triple. Versioned;
/// all writes go through compare-and-swap on `version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dossier {
    pub user_id: String,
    pub agent: AgentPrefix,
    pub domain: String,
    /// 0 to 10. Governs rewrite budgets and guardrail decay.
    pub trust_score: f64,
    /// 0 to 10. High stability accelerates guardrail decay.
    pub stability_score: f64,
    /// Violation-type slug to cumulative count.
    #[serde(default)]
    pub weaknesses: BTreeMap<String, u32>,
    /// Domain slug to clean-run count.
    #[serde(default)]
    pub strengths: BTreeMap<String, u32>,
    #[serde(default)]
    pub domain_mastery: DomainMastery,
    #[serde(default)]
    pub prescriptions: Prescriptions,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl Dossier {
    pub const TRUST_MAX: f64 = 10.0;
    pub const TRUST_START: f64 = 5.0;

    /// Fresh dossier, created lazily on an agent's first run.
    pub fn new(user_id: impl Into<String>, agent: AgentPrefix, domain: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            agent,
            domain: domain.into(),
            trust_score: Self::TRUST_START,
            stability_score: Self::TRUST_START,
            weaknesses: BTreeMap::new(),
            strengths: BTreeMap::new(),
            domain_mastery: DomainMastery::default(),
            prescriptions: Prescriptions::default(),
            version: 0,
            updated_at: Utc::now(),
        }
    }

    /// Storage key for the one-row-per-(user, agent, domain) layout.
    pub fn storage_key(user_id: &str, agent: AgentPrefix, domain: &str) -> String {
        format!("{}:{}:{}", user_id, agent, domain)
    }

    pub fn weakness_count(&self, slug: &str) -> u32 {
        self.weaknesses.get(slug).copied().unwrap_or(0)
    }

    /// Writer rewrite budget derived from trust: low-trust writers get
    /// more chances, clamped to [1, 5].
    pub fn rewrite_budget(&self) -> u32 {
        let budget = 5 - (self.trust_score / 3.0).floor() as i64;
        budget.clamp(1, 5) as u32
    }
}

/// SCRIBE's output for a run: prompt-level hints and the prescriptions
/// currently standing against the writer, plus the rewrite budget the
/// Writer loop enforces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationProfile {
    pub hints: Vec<String>,
    pub prescriptions: Prescriptions,
    pub rewrite_budget: u32,
    pub trust_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_budget_shrinks_with_trust() {
        let mut dossier = Dossier::new("u", AgentPrefix::Writer, "biology");
        dossier.trust_score = 0.0;
        assert_eq!(dossier.rewrite_budget(), 5);
        dossier.trust_score = 5.0;
        assert_eq!(dossier.rewrite_budget(), 4);
        dossier.trust_score = 9.0;
        assert_eq!(dossier.rewrite_budget(), 2);
        dossier.trust_score = 10.0;
        assert_eq!(dossier.rewrite_budget(), 2);
    }

    #[test]
    fn prescriptions_keep_most_recent_five() {
        let mut p = Prescriptions::default();
        for i in 0..7 {
            p.push_required(format!("rule {}", i));
        }
        assert_eq!(p.required.len(), Prescriptions::MAX_PER_CATEGORY);
        assert_eq!(p.required.first().unwrap(), "rule 2");
        assert_eq!(p.required.last().unwrap(), "rule 6");
    }

    #[test]
    fn prescriptions_dedupe_re_added_behavior() {
        let mut p = Prescriptions::default();
        p.push_forbidden("no recall verbs");
        p.push_forbidden("no filler");
        p.push_forbidden("no recall verbs");
        assert_eq!(p.forbidden, vec!["no filler", "no recall verbs"]);
    }

    #[test]
    fn clean_rate_handles_zero_runs() {
        let mastery = DomainMastery::default();
        assert_eq!(mastery.clean_rate(), 0.0);
    }

    #[test]
    fn storage_key_is_colon_joined() {
        assert_eq!(
            Dossier::storage_key("t1", AgentPrefix::Writer, "biology"),
            "t1:writer:biology"
        );
    }
}
