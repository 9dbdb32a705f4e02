// gatekeeper/mod.rs
// Rule-based validator. Per-item checks run inside the Writer loop;
// batch checks run once over the finished set.

pub mod text;

use crate::domain::{
    bloom_meets, classify_bloom_level, BloomAlignmentEntry, BloomLevel, Blueprint, Culprit,
    DriftDirection, GatekeeperReport, GeneratedItem, OrderingStrategy, QuestionType, Severity,
    Slot, Violation, ViolationType,
};
use text::{contains_any_keyword, estimate_response_seconds, word_overlap_ratio};

pub const MCQ_OPTION_COUNT: usize = 4;

/// Everything the rule engine needs besides the item under test.
pub struct GatekeeperContext<'a> {
    pub blueprint: &'a Blueprint,
    pub redundancy_ratio: f64,
}

impl<'a> GatekeeperContext<'a> {
    pub fn new(blueprint: &'a Blueprint, redundancy_ratio: f64) -> Self {
        Self {
            blueprint,
            redundancy_ratio,
        }
    }

    /// Topic tokens the prompt must touch: topic, lesson, and unit.
    fn topic_keywords(&self) -> Vec<String> {
        let intent = &self.blueprint.uar;
        let mut keywords = Vec::new();
        for source in [
            intent.topic.as_deref(),
            intent.lesson_name.as_deref(),
            Some(intent.unit.as_str()),
        ]
        .into_iter()
        .flatten()
        {
            for token in text::tokenize(source) {
                if token.len() > 3 && !keywords.contains(&token) {
                    keywords.push(token);
                }
            }
        }
        keywords
    }
}

// ============================================================================
// Per-item checks
// ============================================================================

/// Runs every per-item rule against one candidate. The Writer commits
/// the item only when nothing high-severity comes back.
pub fn check_item(
    item: &GeneratedItem,
    slot: &Slot,
    ctx: &GatekeeperContext<'_>,
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let slot_id = Some(slot.index);

    // Structural checks first: nothing else is meaningful on a
    // malformed item.
    if item.prompt.trim().is_empty() {
        violations.push(
            Violation::new(
                slot_id,
                ViolationType::MissingField,
                Severity::High,
                "item has an empty prompt",
            )
            .with_field("prompt"),
        );
        return violations;
    }

    if item.question_type != slot.question_type {
        violations.push(Violation::new(
            slot_id,
            ViolationType::FormatViolation,
            Severity::Medium,
            format!(
                "slot {} asked for {} but received {}",
                slot.index, slot.question_type, item.question_type
            ),
        ));
    }

    match item.question_type {
        QuestionType::MultipleChoice => {
            let options = item.trimmed_options();
            let mut unique = options.clone();
            unique.sort();
            unique.dedup();
            if options.len() != MCQ_OPTION_COUNT || unique.len() != options.len() {
                violations.push(
                    Violation::new(
                        slot_id,
                        ViolationType::McqOptionsInvalid,
                        Severity::High,
                        format!(
                            "multiple choice items need exactly {} unique options, got {}",
                            MCQ_OPTION_COUNT,
                            options.len()
                        ),
                    )
                    .with_field("options"),
                );
            }
            match item.answer.as_deref().map(str::trim) {
                None | Some("") => {
                    violations.push(
                        Violation::new(
                            slot_id,
                            ViolationType::MissingField,
                            Severity::High,
                            "multiple choice item has no answer",
                        )
                        .with_field("answer"),
                    );
                }
                Some(answer) => {
                    if !options.iter().any(|o| o == answer) {
                        violations.push(
                            Violation::new(
                                slot_id,
                                ViolationType::McqAnswerMismatch,
                                Severity::High,
                                "answer does not match any option verbatim",
                            )
                            .with_field("answer"),
                        );
                    }
                }
            }
        }
        QuestionType::TrueFalse => {
            let answer = item.answer.as_deref().unwrap_or("").trim().to_lowercase();
            if answer != "true" && answer != "false" {
                violations.push(
                    Violation::new(
                        slot_id,
                        ViolationType::MissingField,
                        Severity::High,
                        "true/false item needs a true or false answer",
                    )
                    .with_field("answer"),
                );
            }
        }
        QuestionType::ShortAnswer
        | QuestionType::ConstructedResponse
        | QuestionType::FillInBlank => {
            if item
                .answer
                .as_deref()
                .map(|a| a.trim().is_empty())
                .unwrap_or(true)
            {
                violations.push(
                    Violation::new(
                        slot_id,
                        ViolationType::MissingField,
                        Severity::High,
                        "open response item has no model answer",
                    )
                    .with_field("answer"),
                );
            }
        }
    }

    // Bloom alignment against the slot's demanded level.
    if let Some(detected) = classify_bloom_level(&item.prompt) {
        if !bloom_meets(detected, slot.cognitive_process) {
            violations.push(Violation::new(
                slot_id,
                ViolationType::CognitiveDemandMismatch,
                Severity::Medium,
                format!(
                    "prompt reads at the {} level but slot {} demands {}",
                    detected, slot.index, slot.cognitive_process
                ),
            ));
        }
    }

    // Topic drift.
    let keywords = ctx.topic_keywords();
    if !keywords.is_empty() && !contains_any_keyword(&item.prompt, &keywords) {
        violations.push(Violation::new(
            slot_id,
            ViolationType::TopicMismatch,
            Severity::High,
            format!(
                "prompt never touches the topic \"{}\"",
                ctx.blueprint.uar.effective_topic()
            ),
        ));
    }

    // Forbidden content from resolved constraints.
    let folded_prompt = item.prompt.to_lowercase();
    for phrase in ctx.blueprint.constraints.forbidden_phrases() {
        if folded_prompt.contains(&phrase.to_lowercase()) {
            violations.push(Violation::new(
                slot_id,
                ViolationType::ForbiddenContent,
                Severity::High,
                format!("prompt mentions forbidden content \"{}\"", phrase),
            ));
        }
    }

    // Pacing plausibility. The per-item share of the plan tolerance is
    // tiny on short assessments, so the window also scales with the
    // slot's own estimate.
    let estimate = estimate_response_seconds(item.question_type, &item.prompt);
    let slot_count = ctx.blueprint.plan.slots.len().max(1);
    let tolerance =
        ctx.blueprint.plan.pacing_tolerance_seconds as f64 / slot_count as f64;
    let target = slot.estimated_time_seconds as f64;
    if (estimate - target).abs() > tolerance.max(target / 2.0).max(15.0) {
        violations.push(Violation::new(
            slot_id,
            ViolationType::PacingViolation,
            Severity::Low,
            format!(
                "item looks like {:.0}s of work against a {:.0}s slot",
                estimate, target
            ),
        ));
    }

    violations
}

/// Records how the item's detected level compares with the slot's
/// demand. Uses the same classifier as the validation above, so the
/// two can never disagree.
pub fn bloom_alignment(item: &GeneratedItem, slot: &Slot) -> BloomAlignmentEntry {
    let detected = classify_bloom_level(&item.prompt);
    let intended = slot.cognitive_process;
    let aligned = detected.map(|d| bloom_meets(d, intended)).unwrap_or(false);
    let direction = detected.and_then(|d| {
        if d < intended {
            Some(DriftDirection::Under)
        } else if d > intended {
            Some(DriftDirection::Over)
        } else {
            None
        }
    });
    BloomAlignmentEntry {
        slot_id: slot.index,
        writer_bloom: intended,
        gatekeeper_bloom: detected,
        aligned,
        direction,
    }
}

// ============================================================================
// Batch checks
// ============================================================================

/// Final pass over the committed set: distribution, ordering, scope
/// width, misconception coverage, and redundancy.
pub fn check_batch(items: &[GeneratedItem], ctx: &GatekeeperContext<'_>) -> GatekeeperReport {
    let plan = &ctx.blueprint.plan;
    let mut violations = Vec::new();
    let mut redundancy_pairs = Vec::new();

    let slot_for = |slot_id: usize| plan.slots.iter().find(|s| s.index == slot_id);

    // Observed Bloom distribution versus the plan. Undetectable prompts
    // count for their slot's demand.
    let mut observed: std::collections::BTreeMap<BloomLevel, usize> = Default::default();
    let mut detected_levels: Vec<(usize, Option<BloomLevel>, BloomLevel)> = Vec::new();
    for item in items {
        let Some(slot) = slot_for(item.slot_id) else {
            continue;
        };
        let detected = classify_bloom_level(&item.prompt);
        *observed
            .entry(detected.unwrap_or(slot.cognitive_process))
            .or_insert(0) += 1;
        detected_levels.push((item.slot_id, detected, slot.cognitive_process));
    }
    if observed != plan.cognitive_distribution {
        for (slot_id, detected, intended) in &detected_levels {
            if let Some(d) = detected {
                if d != intended {
                    violations.push(Violation::new(
                        Some(*slot_id),
                        ViolationType::CognitiveDemandMismatch,
                        Severity::Medium,
                        format!(
                            "slot {} planned for {} but the item reads at {}",
                            slot_id, intended, d
                        ),
                    ));
                }
            }
        }
    }

    // Ordering over detected levels, per strategy.
    let mut sorted: Vec<&GeneratedItem> = items.iter().collect();
    sorted.sort_by_key(|i| i.slot_id);
    let levels: Vec<BloomLevel> = sorted
        .iter()
        .filter_map(|i| {
            classify_bloom_level(&i.prompt)
                .or_else(|| slot_for(i.slot_id).map(|s| s.cognitive_process))
        })
        .collect();
    match plan.ordering_strategy {
        OrderingStrategy::Progressive => {
            let mut max_seen = 0usize;
            for (pos, level) in levels.iter().enumerate() {
                if max_seen > 0 && level.index() + 1 < max_seen {
                    violations.push(
                        Violation::new(
                            Some(pos + 1),
                            ViolationType::OrderingViolation,
                            Severity::Low,
                            "difficulty regresses more than one step in a progressive set",
                        )
                        .with_culprit(Culprit::Architect),
                    );
                }
                max_seen = max_seen.max(level.index());
            }
        }
        OrderingStrategy::Backloaded => {
            if let Some(deepest) = levels.iter().max() {
                let tail_start = levels.len().saturating_sub(levels.len().div_ceil(3));
                if !levels[tail_start..].iter().any(|l| l == deepest) {
                    violations.push(
                        Violation::new(
                            None,
                            ViolationType::OrderingViolation,
                            Severity::Low,
                            "backloaded set has no peak-demand item in its final third",
                        )
                        .with_culprit(Culprit::Architect),
                    );
                }
            }
        }
        OrderingStrategy::Mixed => {}
    }

    // Consecutive-repeat limit applies to every strategy.
    let mut run = 0usize;
    let mut prev: Option<BloomLevel> = None;
    for (pos, level) in levels.iter().enumerate() {
        run = if prev == Some(*level) { run + 1 } else { 1 };
        prev = Some(*level);
        if run > crate::domain::MAX_CONSECUTIVE_SAME_LEVEL {
            violations.push(
                Violation::new(
                    Some(pos + 1),
                    ViolationType::OrderingViolation,
                    Severity::Low,
                    "too many consecutive items at the same demand level",
                )
                .with_culprit(Culprit::Architect),
            );
            break;
        }
    }

    // Scope width over distinct concept tags.
    let tags: std::collections::BTreeSet<&str> = plan
        .slots
        .iter()
        .filter_map(|s| s.concept_tag.as_deref())
        .collect();
    if !tags.is_empty() {
        let (min_tags, max_tags) = plan.scope_width.concept_band(plan.question_count);
        if tags.len() < min_tags || tags.len() > max_tags {
            violations.push(
                Violation::new(
                    None,
                    ViolationType::ScopeWidthViolation,
                    Severity::Low,
                    format!(
                        "{} distinct concepts against an expected {}..{}",
                        tags.len(),
                        min_tags,
                        max_tags
                    ),
                )
                .with_culprit(Culprit::Architect),
            );
        }
    }

    // Required misconceptions must surface in at least one prompt.
    for misconception in ctx.blueprint.constraints.required_misconceptions() {
        let folded = misconception.to_lowercase();
        let covered = items.iter().any(|i| {
            i.prompt.to_lowercase().contains(&folded)
                || word_overlap_ratio(&i.prompt, misconception) > 0.5
        });
        if !covered {
            violations.push(Violation::new(
                None,
                ViolationType::MissingMisconceptionAlignment,
                Severity::Medium,
                format!("no item targets the misconception that {}", misconception),
            ));
        }
    }

    // Redundancy: informational only.
    for i in 0..sorted.len() {
        for j in i + 1..sorted.len() {
            if word_overlap_ratio(&sorted[i].prompt, &sorted[j].prompt) > ctx.redundancy_ratio {
                redundancy_pairs.push((sorted[i].slot_id, sorted[j].slot_id));
            }
        }
    }

    GatekeeperReport {
        violations,
        checked_items: items.len(),
        redundancy_pairs,
    }
}
