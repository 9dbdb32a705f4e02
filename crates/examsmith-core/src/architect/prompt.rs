// architect/prompt.rs
// Writer prompt composition: blueprint slots, compensation hints,
// guardrails, and the math-format directive, framed by the sentinel
// protocol.

use crate::domain::{
    Blueprint, CompensationProfile, GuardrailRule, MathFormat, Slot,
};
use crate::ports::ITEM_SENTINEL;
use std::fmt::Write;

/// Builds the generation prompt for one chunk of unfilled slots.
pub fn compose_writer_prompt(
    blueprint: &Blueprint,
    slots: &[Slot],
    compensation: &CompensationProfile,
    guardrails: &[GuardrailRule],
    math_format: MathFormat,
) -> String {
    let intent = &blueprint.uar;
    let mut prompt = String::new();

    writeln!(
        prompt,
        "You are writing items for a grade {} {} {} on \"{}\".",
        intent.grade,
        intent.course,
        intent.assessment_type,
        intent.effective_topic()
    )
    .ok();
    writeln!(
        prompt,
        "Student level: {}. Unit: {}.",
        intent.student_level.as_str(),
        intent.unit
    )
    .ok();

    prompt.push_str(
        "\nEmit each item as a single JSON object with fields \
         slotId, questionType, prompt, options (multiple choice only), answer. \
         Multiple choice items need exactly 4 unique options, one of which is the answer verbatim.\n",
    );
    writeln!(
        prompt,
        "After every item, on its own line, emit the marker {} and nothing else. \
         Do not wrap items in an array.",
        ITEM_SENTINEL
    )
    .ok();

    prompt.push_str("\nSlots to fill now:\n");
    for slot in slots {
        writeln!(
            prompt,
            "- slot {}: {} question at the {} level, {} difficulty{}, about {} seconds of work",
            slot.index,
            slot.question_type,
            slot.cognitive_process,
            match slot.difficulty_modifier {
                crate::domain::DifficultyModifier::Low => "low",
                crate::domain::DifficultyModifier::Medium => "medium",
                crate::domain::DifficultyModifier::High => "high",
            },
            slot.concept_tag
                .as_deref()
                .map(|t| format!(", concept: {}", t))
                .unwrap_or_default(),
            slot.estimated_time_seconds
        )
        .ok();
    }

    match math_format {
        MathFormat::Latex => {
            prompt.push_str("\nWrite mathematical expressions in LaTeX notation.\n")
        }
        MathFormat::Unicode => prompt.push_str(
            "\nWrite mathematical expressions with plain Unicode (superscripts, radical signs).\n",
        ),
        MathFormat::Plain => prompt.push_str(
            "\nWrite mathematical expressions in plain ASCII (x^2, sqrt(x), a/b).\n",
        ),
    }

    if !compensation.hints.is_empty() {
        prompt.push_str("\nWorking notes from previous sessions:\n");
        for hint in &compensation.hints {
            writeln!(prompt, "- {}", hint).ok();
        }
    }
    if !compensation.prescriptions.required.is_empty() {
        prompt.push_str("\nYou must:\n");
        for rule in &compensation.prescriptions.required {
            writeln!(prompt, "- {}", rule).ok();
        }
    }
    if !compensation.prescriptions.forbidden.is_empty() {
        prompt.push_str("\nYou must not:\n");
        for rule in &compensation.prescriptions.forbidden {
            writeln!(prompt, "- {}", rule).ok();
        }
    }

    if !guardrails.is_empty() {
        prompt.push_str("\nStanding rules for this class:\n");
        for rule in guardrails {
            writeln!(prompt, "- {}", rule.message).ok();
        }
    }

    for phrase in blueprint.constraints.forbidden_phrases() {
        writeln!(prompt, "\nDo not write about: {}", phrase).ok();
    }
    for misconception in blueprint.constraints.required_misconceptions() {
        writeln!(
            prompt,
            "At least one item must target the misconception that {}.",
            misconception
        )
        .ok();
    }

    if !intent.source_documents.is_empty() {
        prompt.push_str("\nGround the items in these materials:\n");
        for doc in &intent.source_documents {
            let excerpt: String = doc.content.chars().take(1500).collect();
            writeln!(prompt, "--- {} ---\n{}", doc.name, excerpt).ok();
        }
    }
    if let Some(example) = &intent.example_assessment {
        let excerpt: String = example.chars().take(1000).collect();
        writeln!(prompt, "\nMatch the style of this example:\n{}", excerpt).ok();
    }

    prompt
}

/// Builds a targeted rewrite prompt for a single rejected item.
pub fn compose_rewrite_prompt(
    blueprint: &Blueprint,
    slot: &Slot,
    rejected_prompt: &str,
    reasons: &[String],
    compensation: &CompensationProfile,
    math_format: MathFormat,
) -> String {
    let mut prompt = compose_writer_prompt(
        blueprint,
        std::slice::from_ref(slot),
        compensation,
        &[],
        math_format,
    );
    prompt.push_str("\nYour previous attempt for this slot was rejected:\n");
    writeln!(prompt, "  \"{}\"", rejected_prompt).ok();
    prompt.push_str("Problems to fix:\n");
    for reason in reasons {
        writeln!(prompt, "- {}", reason).ok();
    }
    prompt.push_str("Rewrite the item, fixing every problem, and finish with the marker.\n");
    prompt
}
