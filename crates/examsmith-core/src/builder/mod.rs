// builder/mod.rs
// The Builder: committed writer items become the printable artifact.
// Cleaning first, math into canonical form, then the requested display
// format, then grade calibration, then assembly.

mod lexical;
mod math;
mod text;

pub use lexical::calibrate;
pub use math::{format_math, normalize_math};
pub use text::clean_text;

use crate::domain::{
    AssessmentItem, AssessmentMetadata, Blueprint, FinalAssessment, GeneratedItem, MathFormat,
};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::Rng;

const ID_SUFFIX_LEN: usize = 6;
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Runs the full display pipeline over one field.
fn present(raw: &str, math_format: MathFormat, grade: u8) -> String {
    let cleaned = clean_text(raw);
    let canonical = normalize_math(&cleaned);
    let formatted = format_math(&canonical, math_format);
    calibrate(&formatted, grade)
}

/// Assembles the final assessment from committed items, ordered by
/// slot, numbered from one, with plan metadata carried along.
pub fn build(
    items: &[GeneratedItem],
    blueprint: &Blueprint,
    rng: &mut StdRng,
    now: DateTime<Utc>,
) -> FinalAssessment {
    let intent = &blueprint.uar;
    let math_format = intent.math_format.unwrap_or_default();
    let grade = intent.grade;

    let mut ordered: Vec<&GeneratedItem> = items.iter().collect();
    ordered.sort_by_key(|i| i.slot_id);

    let assessment_items: Vec<AssessmentItem> = ordered
        .iter()
        .enumerate()
        .map(|(position, item)| {
            let slot = blueprint
                .plan
                .slots
                .iter()
                .find(|s| s.index == item.slot_id);
            AssessmentItem {
                question_number: position + 1,
                slot_id: item.slot_id,
                question_type: item.question_type,
                bloom_level: slot
                    .map(|s| s.cognitive_process)
                    .unwrap_or(blueprint.plan.depth_floor),
                prompt: present(&item.prompt, math_format, grade),
                options: item.options.as_ref().map(|options| {
                    options
                        .iter()
                        .map(|o| present(o, math_format, grade))
                        .collect()
                }),
                answer: item
                    .answer
                    .as_ref()
                    .map(|a| present(a, math_format, grade)),
                estimated_time_seconds: slot.map(|s| s.estimated_time_seconds).unwrap_or(0),
            }
        })
        .collect();

    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();

    FinalAssessment {
        id: format!("assessment_{}_{}", now.timestamp_millis(), suffix),
        generated_at: now,
        total_items: assessment_items.len(),
        items: assessment_items,
        metadata: AssessmentMetadata {
            difficulty_profile: blueprint.plan.difficulty_profile,
            ordering_strategy: blueprint.plan.ordering_strategy,
            pacing_seconds_per_item: blueprint.plan.pacing_seconds_per_item,
            total_estimated_time_seconds: blueprint.plan.total_estimated_time_seconds,
            math_format,
            course: intent.course.clone(),
            topic: intent.effective_topic(),
            grade,
        },
    }
}
