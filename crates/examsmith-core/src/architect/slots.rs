// architect/slots.rs
// Slot allocation: ordering strategies, question-type assignment, and
// difficulty modifiers.

use crate::domain::{
    BloomLevel, DifficultyModifier, DifficultyProfile, OrderingStrategy, QuestionType, Slot,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

/// Lays the distribution out into ordered slots. Estimated times are
/// filled in by the pacing pass.
pub fn allocate_slots(
    distribution: &BTreeMap<BloomLevel, usize>,
    ordering: OrderingStrategy,
    question_types: &[QuestionType],
    difficulty: DifficultyProfile,
    concept_tags: &[String],
    rng: &mut StdRng,
    max_consecutive: usize,
) -> Vec<Slot> {
    let mut levels: Vec<BloomLevel> = Vec::new();
    for (&level, &count) in distribution {
        levels.extend(std::iter::repeat(level).take(count));
    }

    let sequence = match ordering {
        OrderingStrategy::Progressive => break_runs(levels, max_consecutive),
        OrderingStrategy::Mixed => {
            levels.shuffle(rng);
            break_runs(levels, max_consecutive)
        }
        OrderingStrategy::Backloaded => {
            // Deepest third closes the assessment; the front interleaves.
            let n = levels.len();
            let tail_len = n.div_ceil(3);
            let tail = levels.split_off(n - tail_len);
            levels.shuffle(rng);
            let mut front = break_runs(levels, max_consecutive);
            front.extend(tail);
            break_runs(front, max_consecutive)
        }
    };

    let types = assign_types(&sequence, question_types);
    let modifiers = assign_difficulty(&sequence, difficulty);

    sequence
        .into_iter()
        .enumerate()
        .map(|(i, level)| Slot {
            index: i + 1,
            cognitive_process: level,
            question_type: types[i],
            difficulty_modifier: modifiers[i],
            concept_tag: if concept_tags.is_empty() {
                None
            } else {
                Some(concept_tags[i % concept_tags.len()].clone())
            },
            estimated_time_seconds: 0,
        })
        .collect()
}

/// Caps consecutive repeats by pulling the next different level forward.
/// For ascending input the pulled level is deeper, so the progressive
/// dip rule (never more than one step below the running maximum) holds.
/// A run at the very end instead pulls the nearest earlier different
/// level back into it.
fn break_runs(mut levels: Vec<BloomLevel>, max_consecutive: usize) -> Vec<BloomLevel> {
    let mut fixes = 0usize;
    let mut i = 0;
    let mut run_len = 0usize;
    while i < levels.len() {
        if i > 0 && levels[i] == levels[i - 1] {
            run_len += 1;
        } else {
            run_len = 1;
        }
        if run_len > max_consecutive && fixes <= levels.len() {
            fixes += 1;
            if let Some(j) = (i + 1..levels.len()).find(|&j| levels[j] != levels[i]) {
                levels.swap(i, j);
                run_len = 1;
            } else if let Some(k) = (0..i).rev().find(|&k| levels[k] != levels[i]) {
                // Terminal run: slide the nearest different level into
                // it, just before the element that tripped the cap.
                let moved = levels.remove(k);
                levels.insert(i - 1, moved);
                i = 0;
                run_len = 0;
                continue;
            }
        }
        i += 1;
    }
    levels
}

/// Openness rank: deeper slots prefer open response formats.
fn openness(question_type: QuestionType) -> usize {
    match question_type {
        QuestionType::ConstructedResponse => 4,
        QuestionType::ShortAnswer => 3,
        QuestionType::FillInBlank => 2,
        QuestionType::MultipleChoice => 1,
        QuestionType::TrueFalse => 0,
    }
}

/// Splits the requested mix evenly across slots, handing the most open
/// types to the deepest slots.
fn assign_types(sequence: &[BloomLevel], question_types: &[QuestionType]) -> Vec<QuestionType> {
    let n = sequence.len();
    let mut types: Vec<QuestionType> = question_types.to_vec();
    if types.is_empty() {
        types.push(QuestionType::MultipleChoice);
    }
    types.sort_by_key(|t| std::cmp::Reverse(openness(*t)));

    // Even quotas, earlier (more open) types take the remainder.
    let base = n / types.len();
    let extra = n % types.len();
    let mut pool: Vec<QuestionType> = Vec::with_capacity(n);
    for (i, t) in types.iter().enumerate() {
        let quota = base + usize::from(i < extra);
        pool.extend(std::iter::repeat(*t).take(quota));
    }

    // Deepest slots first pull from the open end of the pool.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| (std::cmp::Reverse(sequence[i].index()), i));

    let mut assigned = vec![QuestionType::MultipleChoice; n];
    for (slot_idx, t) in order.into_iter().zip(pool.into_iter()) {
        assigned[slot_idx] = t;
    }
    assigned
}

/// Difficulty modifier counts per profile, deepest slots taking the
/// high modifiers.
fn assign_difficulty(
    sequence: &[BloomLevel],
    difficulty: DifficultyProfile,
) -> Vec<DifficultyModifier> {
    let n = sequence.len();
    let (low_frac, high_frac) = match difficulty {
        DifficultyProfile::Easy => (0.5, 0.1),
        DifficultyProfile::OnLevel => (0.2, 0.2),
        DifficultyProfile::Challenge => (0.1, 0.5),
    };
    let low_count = (n as f64 * low_frac).round() as usize;
    let high_count = ((n as f64 * high_frac).round() as usize).min(n - low_count);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&i| (sequence[i].index(), i));

    let mut modifiers = vec![DifficultyModifier::Medium; n];
    for &i in order.iter().take(low_count) {
        modifiers[i] = DifficultyModifier::Low;
    }
    for &i in order.iter().rev().take(high_count) {
        modifiers[i] = DifficultyModifier::High;
    }
    modifiers
}
