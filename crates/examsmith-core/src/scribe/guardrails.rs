// scribe/guardrails.rs
// Guardrail engine: synthesize rules from violations, reinforce on
// repeats, decay while inactive, inject the strongest into prompts.
//
// A rule's stored weight is its strength as of the last reinforcement;
// the effective weight applies inactivity decay at evaluation time, so
// decay never compounds run over run.

use crate::domain::{GuardrailRule, Polarity, Violation, ViolationType};

/// Base decay per inactive run, adjusted by trust and stability and
/// floored so a rule never becomes immortal.
pub fn decay_rate(trust: f64, stability: f64) -> f64 {
    let mut rate: f64 = 0.05;
    if trust >= 8.0 {
        rate += 0.03;
    }
    if trust >= 9.0 {
        rate += 0.05;
    }
    if stability <= 4.0 {
        rate -= 0.02;
    }
    if stability <= 2.0 {
        rate -= 0.03;
    }
    rate.max(0.01)
}

/// Weight after inactivity decay.
pub fn effective_weight(rule: &GuardrailRule, current_run: u64, rate: f64) -> f64 {
    let inactive = current_run.saturating_sub(rule.last_triggered_run) as f64;
    rule.weight * (1.0 - inactive * rate).max(0.0)
}

/// Turns a violation into a candidate rule phrased as a requirement.
fn candidate_message(violation_type: ViolationType) -> String {
    match violation_type {
        ViolationType::McqOptionsInvalid => {
            "Every multiple choice item needs exactly 4 unique options.".to_string()
        }
        ViolationType::McqAnswerMismatch => {
            "The answer must repeat one option verbatim.".to_string()
        }
        ViolationType::CognitiveDemandMismatch => {
            "Match each prompt's verb to the slot's demanded depth.".to_string()
        }
        ViolationType::TopicMismatch => {
            "Every prompt must stay on the requested topic.".to_string()
        }
        ViolationType::ForbiddenContent => {
            "Respect the teacher's excluded content list.".to_string()
        }
        ViolationType::PacingViolation => {
            "Size each item to its allotted time.".to_string()
        }
        other => format!("Avoid {} findings.", other),
    }
}

/// One candidate per distinct violation type in the report.
pub fn synthesize(violations: &[Violation], domain: &str, current_run: u64) -> Vec<GuardrailRule> {
    let mut types: Vec<ViolationType> = violations.iter().map(|v| v.violation_type).collect();
    types.sort_unstable();
    types.dedup();
    types
        .into_iter()
        .map(|t| {
            GuardrailRule::new(
                t,
                Polarity::Require,
                candidate_message(t),
                domain,
                current_run,
            )
        })
        .collect()
}

/// Folds incoming candidates into the existing set: matching rules are
/// reinforced, new ones appended.
pub fn merge(existing: &mut Vec<GuardrailRule>, incoming: Vec<GuardrailRule>, current_run: u64) {
    for candidate in incoming {
        match existing.iter_mut().find(|r| r.matches(&candidate)) {
            Some(rule) => {
                rule.weight = (rule.weight + GuardrailRule::REINFORCE_STEP).min(1.0);
                rule.trigger_count += 1;
                rule.last_triggered_run = current_run;
            }
            None => existing.push(candidate),
        }
    }
}

/// Drops rules whose effective weight fell below the expiry threshold.
pub fn decay(
    rules: &mut Vec<GuardrailRule>,
    current_run: u64,
    trust: f64,
    stability: f64,
    expiry_weight: f64,
) {
    let rate = decay_rate(trust, stability);
    rules.retain(|rule| effective_weight(rule, current_run, rate) >= expiry_weight);
}

/// Top rules worth inlining into the next prompt: strongest first,
/// capped, and nothing below half strength.
pub fn injectable(
    rules: &[GuardrailRule],
    current_run: u64,
    trust: f64,
    stability: f64,
    max_injected: usize,
) -> Vec<GuardrailRule> {
    let rate = decay_rate(trust, stability);
    let mut scored: Vec<(f64, &GuardrailRule)> = rules
        .iter()
        .map(|r| (effective_weight(r, current_run, rate), r))
        .filter(|(w, _)| *w >= 0.5)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
    scored
        .into_iter()
        .take(max_injected)
        .map(|(_, r)| r.clone())
        .collect()
}
