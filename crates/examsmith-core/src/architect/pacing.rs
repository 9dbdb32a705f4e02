// architect/pacing.rs
// Pacing math: per-item seconds, per-slot scaling, tolerance, and the
// realistic-time plausibility estimate.

use crate::domain::{DifficultyModifier, QuestionType, Slot};

/// Default pacing slack as a fraction of total time.
pub const DEFAULT_TOLERANCE_FRACTION: f64 = 0.15;
/// Minimum slack regardless of assessment length.
pub const MIN_TOLERANCE_SECONDS: u32 = 30;

/// Average answering minutes across a requested type mix.
pub fn weighted_pacing_minutes(question_types: &[QuestionType]) -> f64 {
    if question_types.is_empty() {
        return QuestionType::MultipleChoice.pacing_minutes();
    }
    let total: f64 = question_types.iter().map(|t| t.pacing_minutes()).sum();
    total / question_types.len() as f64
}

/// Infers a question count from the time budget and the type mix,
/// clamped to at least one item.
pub fn infer_question_count(time_minutes: u32, question_types: &[QuestionType]) -> usize {
    let per_item = weighted_pacing_minutes(question_types);
    ((time_minutes as f64 / per_item).round() as usize).max(1)
}

/// Relative answering effort for a slot: deeper and harder items take
/// longer.
fn slot_weight(slot: &Slot) -> f64 {
    let bloom_factor = 1.0 + 0.1 * slot.cognitive_process.index() as f64;
    let difficulty_factor = match slot.difficulty_modifier {
        DifficultyModifier::Low => 0.85,
        DifficultyModifier::Medium => 1.0,
        DifficultyModifier::High => 1.2,
    };
    bloom_factor * difficulty_factor
}

/// Distributes the time budget over the slots in place, returning
/// `(pacing_seconds_per_item, total_estimated_time_seconds,
/// pacing_tolerance_seconds)`. The last slot absorbs rounding drift so
/// the slot times sum exactly to the total.
pub fn apply_pacing(
    slots: &mut [Slot],
    time_minutes: u32,
    tolerance_fraction: Option<f64>,
) -> (u32, u32, u32) {
    let total_seconds = time_minutes * 60;
    let count = slots.len().max(1) as u32;
    let per_item = (total_seconds as f64 / count as f64).round() as u32;

    let weight_sum: f64 = slots.iter().map(slot_weight).sum();
    let mut assigned = 0u32;
    let n = slots.len();
    for (i, slot) in slots.iter_mut().enumerate() {
        if i + 1 == n {
            slot.estimated_time_seconds = total_seconds.saturating_sub(assigned).max(1);
        } else {
            let share = slot_weight(slot) / weight_sum * total_seconds as f64;
            slot.estimated_time_seconds = share.round().max(1.0) as u32;
            assigned += slot.estimated_time_seconds;
        }
    }

    let fraction = tolerance_fraction.unwrap_or(DEFAULT_TOLERANCE_FRACTION);
    let tolerance =
        ((total_seconds as f64 * fraction).round() as u32).max(MIN_TOLERANCE_SECONDS);

    (per_item, total_seconds, tolerance)
}

/// Minutes the assessment realistically takes, weighting each slot's
/// question type by its depth. Compared against the teacher's budget
/// for the plausibility warning.
pub fn realistic_total_minutes(slots: &[Slot]) -> f64 {
    slots
        .iter()
        .map(|s| {
            s.question_type.pacing_minutes() * (1.0 + 0.08 * s.cognitive_process.index() as f64)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BloomLevel;

    fn slot(level: BloomLevel, question_type: QuestionType) -> Slot {
        Slot {
            index: 0,
            cognitive_process: level,
            question_type,
            difficulty_modifier: DifficultyModifier::Medium,
            concept_tag: None,
            estimated_time_seconds: 0,
        }
    }

    #[test]
    fn inferred_count_scales_with_time() {
        let types = [QuestionType::MultipleChoice];
        assert_eq!(infer_question_count(10, &types), 10);
        let mixed = [QuestionType::MultipleChoice, QuestionType::ConstructedResponse];
        // 3.5 min per item on average
        assert_eq!(infer_question_count(21, &mixed), 6);
        assert_eq!(infer_question_count(1, &mixed), 1);
    }

    #[test]
    fn slot_times_sum_to_the_budget() {
        let mut slots = vec![
            slot(BloomLevel::Remember, QuestionType::MultipleChoice),
            slot(BloomLevel::Apply, QuestionType::ShortAnswer),
            slot(BloomLevel::Analyze, QuestionType::ShortAnswer),
        ];
        let (per_item, total, _tolerance) = apply_pacing(&mut slots, 15, None);
        assert_eq!(total, 900);
        assert_eq!(per_item, 300);
        let sum: u32 = slots.iter().map(|s| s.estimated_time_seconds).sum();
        assert_eq!(sum, 900);
    }

    #[test]
    fn deeper_slots_get_more_time() {
        let mut slots = vec![
            slot(BloomLevel::Remember, QuestionType::MultipleChoice),
            slot(BloomLevel::Evaluate, QuestionType::MultipleChoice),
            slot(BloomLevel::Remember, QuestionType::MultipleChoice),
        ];
        apply_pacing(&mut slots, 10, None);
        assert!(slots[1].estimated_time_seconds > slots[0].estimated_time_seconds);
    }

    #[test]
    fn tolerance_has_a_floor() {
        let mut slots = vec![slot(BloomLevel::Remember, QuestionType::MultipleChoice)];
        let (_, _, tolerance) = apply_pacing(&mut slots, 2, None);
        assert_eq!(tolerance, MIN_TOLERANCE_SECONDS);
        let mut slots = vec![slot(BloomLevel::Remember, QuestionType::MultipleChoice)];
        let (_, _, tolerance) = apply_pacing(&mut slots, 60, None);
        assert_eq!(tolerance, 540);
    }

    #[test]
    fn strict_tolerance_fraction_narrows_slack() {
        let mut slots = vec![slot(BloomLevel::Apply, QuestionType::ShortAnswer)];
        let (_, _, tolerance) = apply_pacing(&mut slots, 60, Some(0.08));
        assert_eq!(tolerance, 288);
    }

    #[test]
    fn realistic_total_reflects_type_mix() {
        let slots = vec![
            slot(BloomLevel::Remember, QuestionType::MultipleChoice),
            slot(BloomLevel::Remember, QuestionType::ConstructedResponse),
        ];
        let realistic = realistic_total_minutes(&slots);
        assert!((realistic - 7.0).abs() < 0.01);
    }
}
