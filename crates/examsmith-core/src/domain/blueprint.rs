// domain/blueprint.rs
// The Blueprint: the Architect's contract with the Writer.

use super::bloom::BloomLevel;
use super::constraint::{ResolvedConstraints, ScopeWidth};
use super::intent::{QuestionType, TeacherIntent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default limit on consecutive slots sharing a cognitive process.
pub const MAX_CONSECUTIVE_SAME_LEVEL: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DifficultyProfile {
    Easy,
    #[default]
    OnLevel,
    Challenge,
}

impl DifficultyProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyProfile::Easy => "easy",
            DifficultyProfile::OnLevel => "onLevel",
            DifficultyProfile::Challenge => "challenge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum OrderingStrategy {
    #[default]
    Progressive,
    Mixed,
    Backloaded,
}

impl OrderingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderingStrategy::Progressive => "progressive",
            OrderingStrategy::Mixed => "mixed",
            OrderingStrategy::Backloaded => "backloaded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DifficultyModifier {
    Low,
    #[default]
    Medium,
    High,
}

/// One planned position in the assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    /// 1-based position.
    pub index: usize,
    pub cognitive_process: BloomLevel,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub difficulty_modifier: DifficultyModifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept_tag: Option<String>,
    pub estimated_time_seconds: u32,
}

/// The constrained plan the Writer generates against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Overall demand pressure in [0, 1], from level and difficulty.
    pub intensity: f64,
    pub scope_width: ScopeWidth,
    pub depth_floor: BloomLevel,
    pub depth_ceiling: BloomLevel,
    pub difficulty_profile: DifficultyProfile,
    pub question_count: usize,
    pub cognitive_distribution: BTreeMap<BloomLevel, usize>,
    pub ordering_strategy: OrderingStrategy,
    pub pacing_seconds_per_item: u32,
    pub pacing_tolerance_seconds: u32,
    pub total_estimated_time_seconds: u32,
    pub realistic_total_minutes: f64,
    pub slots: Vec<Slot>,
}

/// Blueprint: normalized intent echo, plan, resolved constraints, and
/// non-blocking plausibility warnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub uar: TeacherIntent,
    pub plan: Plan,
    pub constraints: ResolvedConstraints,
    pub warnings: Vec<String>,
}

impl Blueprint {
    /// Checks the structural invariants the Writer relies on. Returns
    /// every broken invariant so the Architect's repair pass can fix
    /// them all at once.
    pub fn check_invariants(&self, max_consecutive: usize) -> Vec<String> {
        let mut problems = Vec::new();
        let plan = &self.plan;

        let dist_total: usize = plan.cognitive_distribution.values().sum();
        if dist_total != plan.question_count {
            problems.push(format!(
                "cognitive distribution sums to {} but question count is {}",
                dist_total, plan.question_count
            ));
        }
        if plan.slots.len() != plan.question_count {
            problems.push(format!(
                "{} slots allocated for {} questions",
                plan.slots.len(),
                plan.question_count
            ));
        }
        if plan.depth_floor > plan.depth_ceiling {
            problems.push(format!(
                "depth floor {} exceeds ceiling {}",
                plan.depth_floor, plan.depth_ceiling
            ));
        }

        for slot in &plan.slots {
            if slot.cognitive_process < plan.depth_floor
                || slot.cognitive_process > plan.depth_ceiling
            {
                problems.push(format!(
                    "slot {} at {} lies outside the {}..{} band",
                    slot.index, slot.cognitive_process, plan.depth_floor, plan.depth_ceiling
                ));
            }
        }

        for (i, slot) in plan.slots.iter().enumerate() {
            if slot.index != i + 1 {
                problems.push(format!(
                    "slot at position {} carries index {}",
                    i + 1,
                    slot.index
                ));
            }
        }

        let slot_total: i64 = plan
            .slots
            .iter()
            .map(|s| s.estimated_time_seconds as i64)
            .sum();
        let drift = (slot_total - plan.total_estimated_time_seconds as i64).abs();
        if drift > plan.pacing_tolerance_seconds as i64 {
            problems.push(format!(
                "slot times sum to {}s, {}s away from the planned {}s total",
                slot_total, drift, plan.total_estimated_time_seconds
            ));
        }

        if plan.ordering_strategy == OrderingStrategy::Progressive {
            let mut max_seen = 0usize;
            for slot in &plan.slots {
                let idx = slot.cognitive_process.index();
                if max_seen > 0 && idx + 1 < max_seen {
                    problems.push(format!(
                        "slot {} regresses more than one step below the running maximum",
                        slot.index
                    ));
                }
                max_seen = max_seen.max(idx);
            }
        }

        // The consecutive-repeat cap only binds when the distribution
        // can actually be broken up: a dominant level may force long
        // runs no ordering can avoid.
        let max_count = plan.cognitive_distribution.values().copied().max().unwrap_or(0);
        let others = plan.question_count.saturating_sub(max_count);
        if max_count <= (others + 1) * max_consecutive {
            let mut run_len = 0usize;
            let mut run_level: Option<BloomLevel> = None;
            for slot in &plan.slots {
                if run_level == Some(slot.cognitive_process) {
                    run_len += 1;
                } else {
                    run_level = Some(slot.cognitive_process);
                    run_len = 1;
                }
                if run_len > max_consecutive {
                    problems.push(format!(
                        "more than {} consecutive slots at {}",
                        max_consecutive, slot.cognitive_process
                    ));
                    break;
                }
            }
        }

        problems
    }

    /// Observed distribution of slot levels, for batch validation.
    pub fn slot_distribution(&self) -> BTreeMap<BloomLevel, usize> {
        let mut dist = BTreeMap::new();
        for slot in &self.plan.slots {
            *dist.entry(slot.cognitive_process).or_insert(0) += 1;
        }
        dist
    }
}
