// architect/mod.rs
// The Architect: turns a teacher intent into a validated Blueprint.

mod distribution;
mod pacing;
mod prompt;
mod slots;

pub use pacing::{infer_question_count, realistic_total_minutes, weighted_pacing_minutes};
pub use prompt::{compose_rewrite_prompt, compose_writer_prompt};

use crate::constraint::resolve_constraints;
use crate::domain::{
    resolve_rigor_profile, AssessmentType, Blueprint, DifficultyProfile, OrderingStrategy,
    PipelineError, Plan, ResolvedConstraints, ScopeWidth, StudentLevel, TeacherIntent,
    MAX_CONSECUTIVE_SAME_LEVEL,
};
use distribution::build_distribution;
use rand::rngs::StdRng;
use slots::allocate_slots;
use tracing::{debug, warn};

/// Plausibility threshold: warn when the realistic total exceeds the
/// budget by more than this fraction.
const OVERRUN_WARNING_FRACTION: f64 = 0.15;

/// Produces the Blueprint for an intent. One repair pass is attempted
/// when the first plan breaks an invariant; a second failure is
/// `BlueprintInvalid`.
pub fn plan(intent: &TeacherIntent, rng: &mut StdRng) -> Result<Blueprint, PipelineError> {
    intent
        .validate()
        .map_err(PipelineError::InvalidIntent)?;

    let normalized = normalize(intent);
    let constraints = resolve_constraints(&normalized);

    let blueprint = assemble(&normalized, &constraints, None, rng);
    let problems = blueprint.check_invariants(MAX_CONSECUTIVE_SAME_LEVEL);
    if problems.is_empty() {
        return Ok(blueprint);
    }

    warn!(
        problems = problems.len(),
        "blueprint failed validation, attempting repair"
    );
    let repaired = assemble(
        &normalized,
        &constraints,
        Some(OrderingStrategy::Mixed),
        rng,
    );
    let remaining = repaired.check_invariants(MAX_CONSECUTIVE_SAME_LEVEL);
    if remaining.is_empty() {
        Ok(repaired)
    } else {
        Err(PipelineError::BlueprintInvalid(remaining.join("; ")))
    }
}

/// Coerces the raw intent into the normalized form every later stage
/// consumes: grade clamped to K-12, question types defaulted by
/// assessment type, question count inferred from pacing when omitted.
fn normalize(intent: &TeacherIntent) -> TeacherIntent {
    let mut normalized = intent.clone();
    normalized.grade = normalized.grade.clamp(1, 12);

    if normalized
        .question_types
        .as_ref()
        .map(|t| t.is_empty())
        .unwrap_or(true)
    {
        normalized.question_types = Some(intent.assessment_type.default_question_types());
    }

    let types = normalized.question_types.as_deref().unwrap_or_default();
    let count = match normalized.question_count {
        Some(count) => count.max(1),
        None => infer_question_count(normalized.time_minutes, types),
    };
    normalized.question_count = Some(count);
    normalized
}

fn difficulty_profile(student_level: StudentLevel) -> DifficultyProfile {
    match student_level {
        StudentLevel::Remedial => DifficultyProfile::Easy,
        StudentLevel::Standard => DifficultyProfile::OnLevel,
        StudentLevel::Honors | StudentLevel::Ap => DifficultyProfile::Challenge,
    }
}

fn ordering_strategy(
    assessment_type: AssessmentType,
    difficulty: DifficultyProfile,
) -> OrderingStrategy {
    if difficulty == DifficultyProfile::Challenge {
        OrderingStrategy::Backloaded
    } else if matches!(
        assessment_type,
        AssessmentType::Worksheet | AssessmentType::TestReview
    ) {
        OrderingStrategy::Mixed
    } else {
        OrderingStrategy::Progressive
    }
}

/// Concept tags cycled across slots, sized to the resolved scope width.
fn concept_tags(intent: &TeacherIntent, scope: ScopeWidth) -> Vec<String> {
    let mut pool: Vec<String> = Vec::new();
    for candidate in [
        intent.topic.as_deref(),
        intent.lesson_name.as_deref(),
        Some(intent.unit.as_str()),
        Some(intent.course.as_str()),
    ]
    .into_iter()
    .flatten()
    {
        let tag = candidate.trim().to_lowercase();
        if !tag.is_empty() && !pool.contains(&tag) {
            pool.push(tag);
        }
    }
    let width = match scope {
        ScopeWidth::Narrow => 1,
        ScopeWidth::Standard => 2,
        ScopeWidth::Broad => pool.len().max(1),
    };
    pool.truncate(width);
    pool
}

fn assemble(
    intent: &TeacherIntent,
    constraints: &ResolvedConstraints,
    ordering_override: Option<OrderingStrategy>,
    rng: &mut StdRng,
) -> Blueprint {
    let question_count = intent.question_count.unwrap_or(1);
    let question_types = intent.question_types.clone().unwrap_or_default();

    let rigor = resolve_rigor_profile(
        intent.student_level,
        intent.assessment_type,
        intent.time_minutes,
        &constraints.derived,
    );
    debug!(
        floor = %rigor.depth_floor,
        ceiling = %rigor.depth_ceiling,
        "rigor profile resolved"
    );

    let difficulty = difficulty_profile(intent.student_level);
    let ordering = ordering_override
        .unwrap_or_else(|| ordering_strategy(intent.assessment_type, difficulty));
    let scope = constraints.derived.scope_width.unwrap_or_default();

    let cognitive_distribution = build_distribution(
        intent.assessment_type,
        intent.student_level,
        &rigor,
        question_count,
    );

    let tags = concept_tags(intent, scope);
    let mut slot_list = allocate_slots(
        &cognitive_distribution,
        ordering,
        &question_types,
        difficulty,
        &tags,
        rng,
        MAX_CONSECUTIVE_SAME_LEVEL,
    );

    let (pacing_per_item, total_seconds, tolerance) = pacing::apply_pacing(
        &mut slot_list,
        intent.time_minutes,
        constraints.derived.pacing_tolerance,
    );
    let realistic = realistic_total_minutes(&slot_list);

    let mut warnings = constraints.warnings.clone();
    if realistic > intent.time_minutes as f64 * (1.0 + OVERRUN_WARNING_FRACTION) {
        warnings.push(format!(
            "planned items realistically need {:.0} minutes against a {} minute budget",
            realistic.ceil(),
            intent.time_minutes
        ));
    }

    let intensity = {
        let band_mid = (rigor.depth_floor.index() + rigor.depth_ceiling.index()) as f64 / 2.0;
        let profile_factor = match difficulty {
            DifficultyProfile::Easy => 0.85,
            DifficultyProfile::OnLevel => 1.0,
            DifficultyProfile::Challenge => 1.15,
        };
        (band_mid / 5.0 * profile_factor).clamp(0.0, 1.0)
    };

    let plan = Plan {
        intensity,
        scope_width: scope,
        depth_floor: rigor.depth_floor,
        depth_ceiling: rigor.depth_ceiling,
        difficulty_profile: difficulty,
        question_count,
        cognitive_distribution,
        ordering_strategy: ordering,
        pacing_seconds_per_item: pacing_per_item,
        pacing_tolerance_seconds: tolerance,
        total_estimated_time_seconds: total_seconds,
        realistic_total_minutes: realistic,
        slots: slot_list,
    };

    Blueprint {
        uar: intent.clone(),
        plan,
        constraints: constraints.clone(),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BloomLevel, QuestionType};
    use rand::SeedableRng;

    fn intent() -> TeacherIntent {
        TeacherIntent {
            user_id: "t1".to_string(),
            grade: 8,
            course: "Biology".to_string(),
            unit: "Cells".to_string(),
            assessment_type: AssessmentType::Quiz,
            student_level: StudentLevel::Standard,
            time_minutes: 20,
            topic: Some("photosynthesis".to_string()),
            lesson_name: None,
            question_types: None,
            question_count: Some(8),
            math_format: None,
            additional_details: None,
            source_documents: vec![],
            example_assessment: None,
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn plan_satisfies_blueprint_invariants() {
        let blueprint = plan(&intent(), &mut rng()).unwrap();
        assert!(blueprint
            .check_invariants(MAX_CONSECUTIVE_SAME_LEVEL)
            .is_empty());
        assert_eq!(blueprint.plan.question_count, 8);
        assert_eq!(blueprint.plan.slots.len(), 8);
    }

    #[test]
    fn question_count_inferred_from_time_and_types() {
        let mut i = intent();
        i.question_count = None;
        i.question_types = Some(vec![QuestionType::MultipleChoice]);
        let blueprint = plan(&i, &mut rng()).unwrap();
        assert_eq!(blueprint.plan.question_count, 20);
    }

    #[test]
    fn defaults_question_types_by_assessment_type() {
        let mut i = intent();
        i.assessment_type = AssessmentType::Test;
        i.time_minutes = 50;
        let blueprint = plan(&i, &mut rng()).unwrap();
        assert_eq!(
            blueprint.uar.question_types.as_deref().unwrap(),
            AssessmentType::Test.default_question_types().as_slice()
        );
    }

    #[test]
    fn slots_respect_the_rigor_band() {
        let mut i = intent();
        i.assessment_type = AssessmentType::BellRinger;
        i.student_level = StudentLevel::Ap;
        i.time_minutes = 5;
        i.question_count = Some(3);
        let blueprint = plan(&i, &mut rng()).unwrap();
        for slot in &blueprint.plan.slots {
            assert!(slot.cognitive_process <= BloomLevel::Understand);
        }
    }

    #[test]
    fn warns_when_budget_is_implausible() {
        let mut i = intent();
        i.question_types = Some(vec![QuestionType::ConstructedResponse]);
        i.question_count = Some(10);
        i.time_minutes = 10;
        let blueprint = plan(&i, &mut rng()).unwrap();
        assert!(blueprint
            .warnings
            .iter()
            .any(|w| w.contains("realistically")));
    }

    #[test]
    fn invalid_intent_is_rejected() {
        let mut i = intent();
        i.time_minutes = 0;
        assert!(matches!(
            plan(&i, &mut rng()),
            Err(PipelineError::InvalidIntent(_))
        ));
    }

    #[test]
    fn deterministic_under_a_fixed_seed() {
        let a = plan(&intent(), &mut rng()).unwrap();
        let b = plan(&intent(), &mut rng()).unwrap();
        let sa = serde_json::to_string(&a.plan).unwrap();
        let sb = serde_json::to_string(&b.plan).unwrap();
        assert_eq!(sa, sb);
    }

    #[test]
    fn challenge_cohorts_get_backloaded_ordering() {
        let mut i = intent();
        i.student_level = StudentLevel::Honors;
        i.time_minutes = 45;
        let blueprint = plan(&i, &mut rng()).unwrap();
        assert_eq!(
            blueprint.plan.ordering_strategy,
            OrderingStrategy::Backloaded
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn any_intent() -> impl Strategy<Value = TeacherIntent> {
            (
                1u8..=12,
                0usize..6,
                0usize..4,
                5u32..=90,
                proptest::option::of(1usize..=25),
            )
                .prop_map(|(grade, at, sl, minutes, count)| {
                    let mut intent = intent();
                    intent.grade = grade;
                    intent.assessment_type = [
                        AssessmentType::BellRinger,
                        AssessmentType::ExitTicket,
                        AssessmentType::Quiz,
                        AssessmentType::Test,
                        AssessmentType::Worksheet,
                        AssessmentType::TestReview,
                    ][at];
                    intent.student_level = [
                        StudentLevel::Remedial,
                        StudentLevel::Standard,
                        StudentLevel::Honors,
                        StudentLevel::Ap,
                    ][sl];
                    intent.time_minutes = minutes;
                    intent.question_count = count;
                    intent.question_types = None;
                    intent
                })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            // The blueprint invariants hold for any planable intent.
            #[test]
            fn every_plan_satisfies_its_invariants(intent in any_intent(), seed in 0u64..1000) {
                let blueprint = plan(&intent, &mut StdRng::seed_from_u64(seed)).unwrap();
                let problems = blueprint.check_invariants(MAX_CONSECUTIVE_SAME_LEVEL);
                prop_assert!(problems.is_empty(), "{:?}", problems);

                let plan = &blueprint.plan;
                let dist_total: usize = plan.cognitive_distribution.values().sum();
                prop_assert_eq!(dist_total, plan.question_count);
                prop_assert_eq!(plan.slots.len(), plan.question_count);
                prop_assert!(plan.depth_floor <= plan.depth_ceiling);
                for slot in &plan.slots {
                    prop_assert!(slot.cognitive_process >= plan.depth_floor);
                    prop_assert!(slot.cognitive_process <= plan.depth_ceiling);
                }
            }
        }
    }

    #[test]
    fn writer_prompt_carries_sentinel_and_slots() {
        let blueprint = plan(&intent(), &mut rng()).unwrap();
        let prompt = compose_writer_prompt(
            &blueprint,
            &blueprint.plan.slots[..2],
            &Default::default(),
            &[],
            Default::default(),
        );
        assert!(prompt.contains("<END_OF_PROBLEM>"));
        assert!(prompt.contains("slot 1"));
        assert!(prompt.contains("slot 2"));
        assert!(prompt.contains("photosynthesis"));
    }
}
