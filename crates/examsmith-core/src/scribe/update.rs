// scribe/update.rs
// Pure governance rules: dossier trust/stability updates, friction
// tiering, and Bloom-drift assessment.

use crate::domain::{
    BloomAlignmentEntry, Dossier, DriftDirection, Prescriptions, Violation,
};
use chrono::Utc;

/// How much rewriting a run needed, as a governance signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrictionTier {
    Systemic,
    Mild,
    None,
}

pub fn friction_tier(rewrite_count: u32, final_problem_count: usize) -> FrictionTier {
    let ratio = rewrite_count as f64 / final_problem_count.max(1) as f64;
    if ratio > 0.75 || rewrite_count > 10 {
        FrictionTier::Systemic
    } else if ratio >= 0.40 {
        FrictionTier::Mild
    } else {
        FrictionTier::None
    }
}

/// Applies one run's outcome to a dossier: weakness tallies, trust and
/// stability movement, and mastery counters. Scores clamp to [0, 10].
pub fn apply_run_outcome(dossier: &mut Dossier, violations: &[Violation], item_count: usize) {
    for violation in violations {
        *dossier
            .weaknesses
            .entry(violation.violation_type.as_str().to_string())
            .or_insert(0) += 1;
    }

    let count = violations.len();
    if count == 0 {
        dossier.trust_score += 1.0;
        dossier.stability_score += 1.0;
        dossier.domain_mastery.clean_runs += 1;
        *dossier
            .strengths
            .entry(dossier.domain.clone())
            .or_insert(0) += 1;
    } else if count <= 2 {
        dossier.stability_score += 1.0;
    } else {
        dossier.trust_score -= if count >= 5 { 2.0 } else { 1.0 };
        let density = count as f64 / item_count.max(1) as f64;
        dossier.stability_score -= if density >= 0.5 { 2.0 } else { 1.0 };
    }

    dossier.trust_score = dossier.trust_score.clamp(0.0, Dossier::TRUST_MAX);
    dossier.stability_score = dossier.stability_score.clamp(0.0, Dossier::TRUST_MAX);
    dossier.domain_mastery.runs += 1;
    dossier.updated_at = Utc::now();
}

/// Drift tiers over a run's alignment log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftTier {
    Systemic,
    Mild,
    None,
}

#[derive(Debug, Clone)]
pub struct DriftAssessment {
    pub mismatch_rate: f64,
    pub dominant: Option<DriftDirection>,
    pub tier: DriftTier,
}

/// Mismatch rate and dominant direction from the per-slot log. The log
/// comes from the same classifier the Gatekeeper used, so `aligned`
/// here and `cognitive-demand-mismatch` there always agree.
pub fn assess_bloom_drift(log: &[BloomAlignmentEntry]) -> DriftAssessment {
    if log.is_empty() {
        return DriftAssessment {
            mismatch_rate: 0.0,
            dominant: None,
            tier: DriftTier::None,
        };
    }

    let misses = log.iter().filter(|e| !e.aligned).count();
    let rate = misses as f64 / log.len() as f64;

    let under = log
        .iter()
        .filter(|e| e.direction == Some(DriftDirection::Under))
        .count();
    let over = log
        .iter()
        .filter(|e| e.direction == Some(DriftDirection::Over))
        .count();
    let dominant = if under == 0 && over == 0 {
        None
    } else if under >= over {
        Some(DriftDirection::Under)
    } else {
        Some(DriftDirection::Over)
    };

    let tier = if rate > 0.5 {
        DriftTier::Systemic
    } else if rate > 0.25 {
        DriftTier::Mild
    } else {
        DriftTier::None
    };

    DriftAssessment {
        mismatch_rate: rate,
        dominant,
        tier,
    }
}

/// Prescriptions for systemic drift, by direction.
pub fn drift_prescriptions(direction: DriftDirection) -> Prescriptions {
    let mut prescriptions = Prescriptions::default();
    match direction {
        DriftDirection::Under => {
            prescriptions.push_required(
                "Open each deep slot with an explicit verb at its demanded level, \
                 such as analyze, evaluate, or justify.",
            );
            prescriptions.push_forbidden(
                "Recall stems like list, name, or define on analysis and evaluation slots.",
            );
        }
        DriftDirection::Over => {
            prescriptions.push_required(
                "Keep shallow slots at direct recall or comprehension stems.",
            );
            prescriptions.push_forbidden(
                "Escalated verbs like evaluate or design on remember and understand slots.",
            );
        }
    }
    prescriptions
}

/// Soft reminder for mild drift; prompt-level only, never persisted.
pub fn drift_reminder(direction: DriftDirection) -> &'static str {
    match direction {
        DriftDirection::Under => {
            "Several prompts read shallower than their slots; match the demanded depth."
        }
        DriftDirection::Over => {
            "Several prompts overshoot their slots; keep shallow slots shallow."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentPrefix, BloomLevel, Severity, ViolationType};

    fn dossier() -> Dossier {
        Dossier::new("t1", AgentPrefix::Writer, "biology")
    }

    fn violation(t: ViolationType) -> Violation {
        Violation::new(Some(1), t, Severity::Medium, "test")
    }

    fn entry(slot_id: usize, aligned: bool, direction: Option<DriftDirection>) -> BloomAlignmentEntry {
        BloomAlignmentEntry {
            slot_id,
            writer_bloom: BloomLevel::Analyze,
            gatekeeper_bloom: Some(BloomLevel::Remember),
            aligned,
            direction,
        }
    }

    #[test]
    fn clean_run_raises_trust_and_stability() {
        let mut d = dossier();
        apply_run_outcome(&mut d, &[], 10);
        assert_eq!(d.trust_score, 6.0);
        assert_eq!(d.stability_score, 6.0);
        assert_eq!(d.domain_mastery.clean_runs, 1);
        assert_eq!(d.domain_mastery.runs, 1);
        assert_eq!(d.strengths.get("biology"), Some(&1));
    }

    #[test]
    fn trust_never_drops_after_a_clean_run() {
        let mut d = dossier();
        let before = d.trust_score;
        apply_run_outcome(&mut d, &[], 10);
        assert!(d.trust_score >= before);
    }

    #[test]
    fn two_violations_still_build_stability() {
        let mut d = dossier();
        apply_run_outcome(
            &mut d,
            &[
                violation(ViolationType::PacingViolation),
                violation(ViolationType::TopicMismatch),
            ],
            10,
        );
        assert_eq!(d.trust_score, 5.0);
        assert_eq!(d.stability_score, 6.0);
        assert_eq!(d.domain_mastery.clean_runs, 0);
        assert_eq!(d.weaknesses.get("pacing-violation"), Some(&1));
    }

    #[test]
    fn five_violations_cost_double_trust() {
        let mut d = dossier();
        let violations: Vec<Violation> = (0..5)
            .map(|_| violation(ViolationType::McqOptionsInvalid))
            .collect();
        apply_run_outcome(&mut d, &violations, 10);
        assert_eq!(d.trust_score, 3.0);
        assert_eq!(d.weaknesses.get("mcq-options-invalid"), Some(&5));
    }

    #[test]
    fn dense_violations_cost_double_stability() {
        let mut d = dossier();
        let violations: Vec<Violation> = (0..3)
            .map(|_| violation(ViolationType::TopicMismatch))
            .collect();
        // 3 violations over 4 items: density 0.75.
        apply_run_outcome(&mut d, &violations, 4);
        assert_eq!(d.stability_score, 3.0);
        assert_eq!(d.trust_score, 4.0);
    }

    #[test]
    fn scores_clamp_at_the_bounds() {
        let mut d = dossier();
        d.trust_score = 0.5;
        d.stability_score = 0.0;
        let violations: Vec<Violation> = (0..6)
            .map(|_| violation(ViolationType::InvalidJson))
            .collect();
        apply_run_outcome(&mut d, &violations, 6);
        assert_eq!(d.trust_score, 0.0);
        assert_eq!(d.stability_score, 0.0);

        let mut d = dossier();
        d.trust_score = 10.0;
        apply_run_outcome(&mut d, &[], 5);
        assert_eq!(d.trust_score, 10.0);
    }

    #[test]
    fn friction_tiers_follow_the_ratio() {
        assert_eq!(friction_tier(0, 10), FrictionTier::None);
        assert_eq!(friction_tier(4, 10), FrictionTier::Mild);
        assert_eq!(friction_tier(8, 10), FrictionTier::Systemic);
        assert_eq!(friction_tier(11, 100), FrictionTier::Systemic);
        // Zero committed items: the ratio runs against a floor of one.
        assert_eq!(friction_tier(3, 0), FrictionTier::Systemic);
    }

    #[test]
    fn drift_over_half_is_systemic_under() {
        let log = vec![
            entry(1, false, Some(DriftDirection::Under)),
            entry(2, false, Some(DriftDirection::Under)),
            entry(3, true, None),
        ];
        let assessment = assess_bloom_drift(&log);
        assert!((assessment.mismatch_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(assessment.tier, DriftTier::Systemic);
        assert_eq!(assessment.dominant, Some(DriftDirection::Under));
    }

    #[test]
    fn mild_drift_band_is_exclusive_of_bounds() {
        let log = vec![
            entry(1, false, Some(DriftDirection::Over)),
            entry(2, true, None),
            entry(3, true, None),
        ];
        let assessment = assess_bloom_drift(&log);
        assert_eq!(assessment.tier, DriftTier::Mild);
        assert_eq!(assessment.dominant, Some(DriftDirection::Over));

        let quarter = vec![
            entry(1, false, Some(DriftDirection::Under)),
            entry(2, true, None),
            entry(3, true, None),
            entry(4, true, None),
        ];
        assert_eq!(assess_bloom_drift(&quarter).tier, DriftTier::None);
    }

    #[test]
    fn empty_log_assesses_clean() {
        let assessment = assess_bloom_drift(&[]);
        assert_eq!(assessment.tier, DriftTier::None);
        assert_eq!(assessment.mismatch_rate, 0.0);
    }

    #[test]
    fn under_drift_prescriptions_demand_explicit_verbs() {
        let p = drift_prescriptions(DriftDirection::Under);
        assert!(!p.required.is_empty());
        assert!(p.forbidden[0].contains("Recall stems"));
    }
}
