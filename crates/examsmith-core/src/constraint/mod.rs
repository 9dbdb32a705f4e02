// constraint/mod.rs
// Constraint engine: free-text directives become typed constraints,
// contradictions are arbitrated, and structural knobs are derived.

mod catalog;

use crate::domain::{
    BloomLevel, ClassifiedConstraint, ConstraintType, DerivedStructural, Polarity, Priority,
    ResolvedConstraints, ScopeWidth, StudentLevel, TeacherIntent,
};
use catalog::{CUE_PATTERNS, SUBJECT_CUES};
use std::collections::BTreeMap;

/// Pacing slack fraction applied when a pacing-strict constraint holds.
const STRICT_PACING_TOLERANCE: f64 = 0.08;

/// Classifies the intent's free-text details plus canonical fields into
/// typed constraints, resolves contradictions, and derives the
/// structural overrides the Architect consumes.
pub fn resolve_constraints(intent: &TeacherIntent) -> ResolvedConstraints {
    let classified = classify(intent);
    let (resolved, warnings) = arbitrate(&classified);
    let derived = derive(&resolved);
    ResolvedConstraints {
        classified,
        resolved,
        derived,
        warnings,
    }
}

/// Scans case-folded sentences against the phrase catalog. Cue matches
/// from teacher text are explicit; inferences from canonical fields are
/// heuristic.
fn classify(intent: &TeacherIntent) -> Vec<ClassifiedConstraint> {
    let mut constraints = Vec::new();

    if let Some(details) = &intent.additional_details {
        for sentence in split_sentences(details) {
            let folded = sentence.to_lowercase();

            for pattern in CUE_PATTERNS.iter() {
                if pattern.phrases.iter().any(|p| folded.contains(p)) {
                    constraints.push(ClassifiedConstraint {
                        constraint_type: pattern.constraint_type,
                        polarity: pattern.polarity,
                        priority: Priority::Explicit,
                        source_text: sentence.clone(),
                        level: pattern.level,
                        subject: None,
                    });
                }
            }

            for cue in SUBJECT_CUES.iter() {
                for prefix in cue.prefixes {
                    if let Some(pos) = folded.find(prefix) {
                        let subject = folded[pos + prefix.len()..]
                            .trim()
                            .trim_end_matches(['.', '!', ','])
                            .to_string();
                        if !subject.is_empty() {
                            constraints.push(ClassifiedConstraint {
                                constraint_type: cue.constraint_type,
                                polarity: cue.polarity,
                                priority: Priority::Explicit,
                                source_text: sentence.clone(),
                                level: None,
                                subject: Some(subject),
                            });
                        }
                    }
                }
            }
        }
    }

    // Heuristic inferences from canonical fields.
    if intent.student_level == StudentLevel::Remedial {
        constraints.push(ClassifiedConstraint {
            constraint_type: ConstraintType::BloomCap,
            polarity: Polarity::Require,
            priority: Priority::Heuristic,
            source_text: "studentLevel=remedial".to_string(),
            level: Some(BloomLevel::Apply),
            subject: None,
        });
    }
    if intent.assessment_type.is_shallow_format() && intent.time_minutes <= 5 {
        constraints.push(ClassifiedConstraint {
            constraint_type: ConstraintType::PacingStrict,
            polarity: Polarity::Require,
            priority: Priority::Heuristic,
            source_text: format!(
                "{} in {} minutes",
                intent.assessment_type, intent.time_minutes
            ),
            level: None,
            subject: None,
        });
    }

    constraints
}

/// Within each type, drops members that contradict a higher-priority
/// polarity; equal-priority contradictions keep the most recently
/// added. Emits one warning per dropped constraint.
fn arbitrate(classified: &[ClassifiedConstraint]) -> (Vec<ClassifiedConstraint>, Vec<String>) {
    let mut groups: BTreeMap<&str, Vec<(usize, &ClassifiedConstraint)>> = BTreeMap::new();
    for (i, c) in classified.iter().enumerate() {
        groups
            .entry(c.constraint_type.as_str())
            .or_default()
            .push((i, c));
    }

    let mut keep_indices = Vec::new();
    let mut warnings = Vec::new();

    for members in groups.values() {
        // The winning polarity: highest priority, then most recent.
        let winner = members
            .iter()
            .max_by_key(|(i, c)| (c.priority, *i))
            .map(|(_, c)| c.polarity);
        let Some(winner) = winner else { continue };

        for (i, c) in members {
            if c.polarity == winner {
                keep_indices.push(*i);
            } else {
                warnings.push(format!(
                    "dropped contradictory {} directive from \"{}\"",
                    c.constraint_type,
                    c.source_text.trim()
                ));
            }
        }
    }

    keep_indices.sort_unstable();
    let resolved = keep_indices
        .into_iter()
        .map(|i| classified[i].clone())
        .collect();
    (resolved, warnings)
}

/// Maps surviving constraints to structural overrides. Absent keys mean
/// "no override"; a cap always wins over a raise.
fn derive(resolved: &[ClassifiedConstraint]) -> DerivedStructural {
    let mut derived = DerivedStructural::default();

    // Strongest cap: prefer explicit over heuristic, then the lowest
    // pinned level.
    let mut caps: Vec<(Priority, BloomLevel)> = resolved
        .iter()
        .filter(|c| c.constraint_type == ConstraintType::BloomCap)
        .filter_map(|c| c.level.map(|l| (c.priority, l)))
        .collect();
    caps.sort_by_key(|(priority, level)| (std::cmp::Reverse(*priority), *level));
    derived.cap_bloom_at = caps.first().map(|(_, level)| *level);

    if derived.cap_bloom_at.is_none() {
        let raise = resolved
            .iter()
            .filter(|c| c.constraint_type == ConstraintType::BloomRaise)
            .filter_map(|c| c.level)
            .max();
        derived.raise_bloom_ceiling = raise;
    }

    let narrow = resolved
        .iter()
        .any(|c| c.constraint_type == ConstraintType::ScopeNarrow);
    let broad = resolved
        .iter()
        .any(|c| c.constraint_type == ConstraintType::ScopeBroad);
    derived.scope_width = match (narrow, broad) {
        (true, false) => Some(ScopeWidth::Narrow),
        (false, true) => Some(ScopeWidth::Broad),
        // Both retained means both were require-polarity; prefer the
        // most recent directive.
        (true, true) => resolved
            .iter()
            .rev()
            .find(|c| {
                matches!(
                    c.constraint_type,
                    ConstraintType::ScopeNarrow | ConstraintType::ScopeBroad
                )
            })
            .map(|c| {
                if c.constraint_type == ConstraintType::ScopeNarrow {
                    ScopeWidth::Narrow
                } else {
                    ScopeWidth::Broad
                }
            }),
        (false, false) => None,
    };

    if resolved
        .iter()
        .any(|c| c.constraint_type == ConstraintType::PacingStrict)
    {
        derived.pacing_tolerance = Some(STRICT_PACING_TOLERANCE);
    }

    derived
}

fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', ';', '\n', '!'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AssessmentType;

    fn intent_with_details(details: &str) -> TeacherIntent {
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
            question_count: None,
            math_format: None,
            additional_details: Some(details.to_string()),
            source_documents: vec![],
            example_assessment: None,
        }
    }

    #[test]
    fn classifies_bloom_cap_from_phrase() {
        let result = resolve_constraints(&intent_with_details("Keep it simple this week."));
        assert!(result
            .resolved
            .iter()
            .any(|c| c.constraint_type == ConstraintType::BloomCap
                && c.priority == Priority::Explicit));
        assert_eq!(result.derived.cap_bloom_at, Some(BloomLevel::Understand));
    }

    #[test]
    fn extracts_forbidden_content_subject() {
        let result =
            resolve_constraints(&intent_with_details("Avoid cellular respiration for now."));
        let phrases = result.forbidden_phrases();
        assert_eq!(phrases, vec!["cellular respiration for now"]);
    }

    #[test]
    fn extracts_required_misconception() {
        let result = resolve_constraints(&intent_with_details(
            "Students often think plants eat soil.",
        ));
        assert_eq!(result.required_misconceptions(), vec!["plants eat soil"]);
    }

    #[test]
    fn cap_wins_over_raise_in_derivation() {
        let result = resolve_constraints(&intent_with_details(
            "Keep it simple. Also push their thinking.",
        ));
        assert_eq!(result.derived.cap_bloom_at, Some(BloomLevel::Understand));
        assert_eq!(result.derived.raise_bloom_ceiling, None);
    }

    #[test]
    fn contradictory_format_preferences_keep_most_recent() {
        let result = resolve_constraints(&intent_with_details(
            "Multiple choice only. Actually, no multiple choice.",
        ));
        let formats: Vec<_> = result
            .resolved
            .iter()
            .filter(|c| c.constraint_type == ConstraintType::FormatPreference)
            .collect();
        assert_eq!(formats.len(), 1);
        assert_eq!(formats[0].polarity, Polarity::Forbid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn no_retained_contradictions_within_a_type() {
        let result = resolve_constraints(&intent_with_details(
            "All multiple choice. Avoid multiple choice. Multiple choice only.",
        ));
        let mut seen: BTreeMap<&str, Polarity> = BTreeMap::new();
        for c in &result.resolved {
            if let Some(prev) = seen.insert(c.constraint_type.as_str(), c.polarity) {
                assert_eq!(prev, c.polarity);
            }
        }
    }

    #[test]
    fn remedial_level_infers_heuristic_cap() {
        let mut intent = intent_with_details("");
        intent.additional_details = None;
        intent.student_level = StudentLevel::Remedial;
        let result = resolve_constraints(&intent);
        assert!(result
            .resolved
            .iter()
            .any(|c| c.constraint_type == ConstraintType::BloomCap
                && c.priority == Priority::Heuristic));
    }

    #[test]
    fn explicit_cap_outranks_heuristic_raise_conflict() {
        // An explicit raise against a heuristic cap: both survive
        // arbitration (same polarity), but derivation lets the cap win.
        let mut intent = intent_with_details("Push their thinking.");
        intent.student_level = StudentLevel::Remedial;
        let result = resolve_constraints(&intent);
        assert_eq!(result.derived.cap_bloom_at, Some(BloomLevel::Apply));
        assert_eq!(result.derived.raise_bloom_ceiling, None);
    }

    #[test]
    fn silent_when_nothing_fires() {
        let mut intent = intent_with_details("");
        intent.additional_details = Some("Thanks so much!".to_string());
        let result = resolve_constraints(&intent);
        assert!(result.derived.cap_bloom_at.is_none());
        assert!(result.derived.scope_width.is_none());
        assert!(result.derived.pacing_tolerance.is_none());
    }
}
