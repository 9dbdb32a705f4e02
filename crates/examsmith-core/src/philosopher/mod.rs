// philosopher/mod.rs
// Heuristic quality audit. Three modes: a pre-Builder draft review, an
// informational playtest summary, and a rewrite comparison.

mod lexical;

pub use lexical::{breaches, measure, thresholds_for_grade, LexicalMetrics};

use crate::architect::realistic_total_minutes;
use crate::domain::{
    classify_bloom_level, BloomLevel, Blueprint, GatekeeperReport, GeneratedItem, Severity,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Restart signal severity when the Writer produced nothing.
pub const RESTART_SEVERITY: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportStatus {
    Complete,
    Restart,
}

/// The `write`-mode audit of a finished draft.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub status: ReportStatus,
    pub severity: u8,
    pub quality_score: f64,
    pub notes: Vec<String>,
    pub bloom_distribution: BTreeMap<BloomLevel, usize>,
    pub redundancy_hotspots: Vec<(usize, usize)>,
    pub missing_slot_count: usize,
    pub lexical: LexicalMetrics,
    pub realistic_total_minutes: f64,
}

/// Post-Gatekeeper, pre-Builder review. Always `Complete` unless the
/// Writer produced zero items.
pub fn review_draft(
    items: &[GeneratedItem],
    blueprint: &Blueprint,
    report: &GatekeeperReport,
) -> QualityReport {
    if items.is_empty() {
        return QualityReport {
            status: ReportStatus::Restart,
            severity: RESTART_SEVERITY,
            quality_score: 0.0,
            notes: vec!["the writer committed no items; the pipeline must restart".to_string()],
            bloom_distribution: BTreeMap::new(),
            redundancy_hotspots: Vec::new(),
            missing_slot_count: blueprint.plan.question_count,
            lexical: LexicalMetrics::default(),
            realistic_total_minutes: 0.0,
        };
    }

    let mut notes = Vec::new();
    let mut deductions = 0.0;

    // Violation summary by severity.
    let highs = report
        .violations
        .iter()
        .filter(|v| v.severity == Severity::High)
        .count();
    let mediums = report
        .violations
        .iter()
        .filter(|v| v.severity == Severity::Medium)
        .count();
    let lows = report
        .violations
        .iter()
        .filter(|v| v.severity == Severity::Low)
        .count();
    if highs + mediums + lows > 0 {
        notes.push(format!(
            "gatekeeper findings: {} high, {} medium, {} low",
            highs, mediums, lows
        ));
    }
    deductions += highs as f64 * 1.5 + mediums as f64 * 0.75 + lows as f64 * 0.25;

    // Observed depth distribution.
    let mut bloom_distribution: BTreeMap<BloomLevel, usize> = BTreeMap::new();
    for item in items {
        if let Some(level) = classify_bloom_level(&item.prompt) {
            *bloom_distribution.entry(level).or_insert(0) += 1;
        }
    }

    // Redundancy hotspots carried over from the batch pass.
    if !report.redundancy_pairs.is_empty() {
        notes.push(format!(
            "{} near-duplicate prompt pair(s)",
            report.redundancy_pairs.len()
        ));
        deductions += report.redundancy_pairs.len() as f64 * 0.5;
    }

    // Unfilled slots.
    let missing_slot_count = blueprint
        .plan
        .question_count
        .saturating_sub(items.len());
    if missing_slot_count > 0 {
        notes.push(format!("{} slot(s) never filled", missing_slot_count));
        deductions += missing_slot_count as f64 * 2.0;
    }

    // Grade-appropriate language.
    let prompts: Vec<&str> = items.iter().map(|i| i.prompt.as_str()).collect();
    let lexical = measure(&prompts);
    let lexical_notes = breaches(&lexical, blueprint.uar.grade);
    deductions += lexical_notes.len() as f64;
    notes.extend(lexical_notes);

    // Pacing realism against the teacher's budget.
    let realistic = realistic_total_minutes(&blueprint.plan.slots);
    if realistic > blueprint.uar.time_minutes as f64 * 1.15 {
        notes.push(format!(
            "realistic completion near {:.0} minutes against a {} minute budget",
            realistic.ceil(),
            blueprint.uar.time_minutes
        ));
        deductions += 0.5;
    }

    // Architect plausibility warnings ride along.
    for warning in &blueprint.warnings {
        notes.push(format!("planning note: {}", warning));
    }

    QualityReport {
        status: ReportStatus::Complete,
        severity: 0,
        quality_score: (10.0 - deductions).max(0.0),
        notes,
        bloom_distribution,
        redundancy_hotspots: report.redundancy_pairs.clone(),
        missing_slot_count,
        lexical,
        realistic_total_minutes: realistic,
    }
}

/// Informational post-simulation summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaytestReport {
    pub predicted_completion_rate: f64,
    pub engagement_note: String,
    pub confusion_hotspots: Vec<usize>,
}

pub fn playtest_summary(items: &[GeneratedItem], blueprint: &Blueprint) -> PlaytestReport {
    let budget = blueprint.uar.time_minutes as f64;
    let realistic = realistic_total_minutes(&blueprint.plan.slots).max(0.01);
    let predicted_completion_rate = (budget / realistic).clamp(0.0, 1.0);

    let distinct_types: std::collections::BTreeSet<_> =
        items.iter().map(|i| i.question_type).collect();
    let engagement_note = if distinct_types.len() > 1 {
        format!("{} question formats keep the set varied", distinct_types.len())
    } else {
        "a single question format throughout; consider mixing".to_string()
    };

    // Long prompts on deep slots are where students stall.
    let confusion_hotspots = items
        .iter()
        .filter(|i| {
            i.prompt.split_whitespace().count() > 40
                || classify_bloom_level(&i.prompt)
                    .map(|l| l >= BloomLevel::Evaluate)
                    .unwrap_or(false)
        })
        .map(|i| i.slot_id)
        .collect();

    PlaytestReport {
        predicted_completion_rate,
        engagement_note,
        confusion_hotspots,
    }
}

/// Post-rewrite diff between two drafts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareReport {
    pub question_count_delta: i64,
    pub average_prompt_words_delta: f64,
    pub bloom_distribution_before: BTreeMap<BloomLevel, usize>,
    pub bloom_distribution_after: BTreeMap<BloomLevel, usize>,
}

pub fn compare_drafts(original: &[GeneratedItem], revised: &[GeneratedItem]) -> CompareReport {
    let distribution = |items: &[GeneratedItem]| {
        let mut d: BTreeMap<BloomLevel, usize> = BTreeMap::new();
        for item in items {
            if let Some(level) = classify_bloom_level(&item.prompt) {
                *d.entry(level).or_insert(0) += 1;
            }
        }
        d
    };
    let avg_words = |items: &[GeneratedItem]| {
        if items.is_empty() {
            return 0.0;
        }
        items
            .iter()
            .map(|i| i.prompt.split_whitespace().count())
            .sum::<usize>() as f64
            / items.len() as f64
    };

    CompareReport {
        question_count_delta: revised.len() as i64 - original.len() as i64,
        average_prompt_words_delta: avg_words(revised) - avg_words(original),
        bloom_distribution_before: distribution(original),
        bloom_distribution_after: distribution(revised),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architect;
    use crate::domain::QuestionType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap as Map;

    fn blueprint() -> Blueprint {
        architect::plan(
            &crate::testing::biology_quiz_intent(),
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap()
    }

    fn item(slot_id: usize, prompt: &str) -> GeneratedItem {
        GeneratedItem {
            slot_id,
            question_type: QuestionType::ShortAnswer,
            prompt: prompt.to_string(),
            options: None,
            answer: Some("answer".to_string()),
            metadata: Map::new(),
        }
    }

    #[test]
    fn zero_items_demand_a_restart() {
        let bp = blueprint();
        let report = review_draft(&[], &bp, &GatekeeperReport::default());
        assert_eq!(report.status, ReportStatus::Restart);
        assert_eq!(report.severity, RESTART_SEVERITY);
        assert_eq!(report.quality_score, 0.0);
    }

    #[test]
    fn clean_draft_scores_high() {
        let bp = blueprint();
        let items = vec![
            item(1, "Explain how photosynthesis stores energy."),
            item(2, "Describe the inputs of photosynthesis."),
            item(3, "Solve a photosynthesis rate problem."),
        ];
        let report = review_draft(&items, &bp, &GatekeeperReport::default());
        assert_eq!(report.status, ReportStatus::Complete);
        assert!(report.quality_score >= 9.0, "score {}", report.quality_score);
        assert!(report.bloom_distribution.len() >= 2);
    }

    #[test]
    fn findings_and_redundancy_deduct() {
        let bp = blueprint();
        let items = vec![item(1, "Explain photosynthesis in plant leaf structures today.")];
        let mut gk = GatekeeperReport::default();
        gk.violations.push(crate::domain::Violation::new(
            Some(1),
            crate::domain::ViolationType::TopicMismatch,
            Severity::High,
            "off topic",
        ));
        gk.redundancy_pairs.push((1, 2));
        let clean_score = review_draft(&items, &bp, &GatekeeperReport::default()).quality_score;
        let dinged_score = review_draft(&items, &bp, &gk).quality_score;
        assert!(dinged_score < clean_score);
    }

    #[test]
    fn playtest_predicts_full_completion_for_sane_budgets() {
        let bp = blueprint();
        let items = vec![item(1, "Explain photosynthesis.")];
        let playtest = playtest_summary(&items, &bp);
        assert!(playtest.predicted_completion_rate > 0.9);
    }

    #[test]
    fn compare_reports_count_and_length_movement() {
        let original = vec![item(1, "Explain photosynthesis.")];
        let revised = vec![
            item(1, "Explain how photosynthesis stores light energy as sugar."),
            item(2, "Describe the chloroplast."),
        ];
        let diff = compare_drafts(&original, &revised);
        assert_eq!(diff.question_count_delta, 1);
        assert!(diff.average_prompt_words_delta > 0.0);
    }
}
