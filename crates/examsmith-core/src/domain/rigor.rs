// domain/rigor.rs
// Rigor profile: the allowed Bloom band for a run, resolved from
// student level, assessment type, time budget, and constraints.

use super::bloom::BloomLevel;
use super::constraint::DerivedStructural;
use super::intent::{AssessmentType, StudentLevel};
use serde::{Deserialize, Serialize};

/// Allowed depth band plus a human-readable trace of which rules fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RigorProfile {
    pub depth_floor: BloomLevel,
    pub depth_ceiling: BloomLevel,
    pub trace: Vec<String>,
}

impl RigorProfile {
    pub fn contains(&self, level: BloomLevel) -> bool {
        level >= self.depth_floor && level <= self.depth_ceiling
    }
}

/// Applies the rigor rules in fixed order: base band, shallow-type cap,
/// time caps, constraint cap, constraint raise, floor/ceiling clamp.
/// Same input always yields the same profile.
pub fn resolve_rigor_profile(
    student_level: StudentLevel,
    assessment_type: AssessmentType,
    time_minutes: u32,
    derived: &DerivedStructural,
) -> RigorProfile {
    let (mut floor, mut ceiling) = student_level.base_band();
    let mut trace = vec![format!(
        "base band for {} students: {}..{}",
        student_level.as_str(),
        floor,
        ceiling
    )];

    if assessment_type.is_shallow_format() && ceiling > BloomLevel::Apply {
        ceiling = BloomLevel::Apply;
        trace.push(format!(
            "{} format caps ceiling at {}",
            assessment_type, ceiling
        ));
    }

    if time_minutes < 10 && ceiling > BloomLevel::Understand {
        ceiling = BloomLevel::Understand;
        trace.push(format!(
            "{} minute budget caps ceiling at {}",
            time_minutes, ceiling
        ));
    } else if time_minutes < 20 && ceiling > BloomLevel::Apply {
        ceiling = BloomLevel::Apply;
        trace.push(format!(
            "{} minute budget caps ceiling at {}",
            time_minutes, ceiling
        ));
    }

    if let Some(cap) = derived.cap_bloom_at {
        if ceiling > cap {
            ceiling = cap;
            trace.push(format!("teacher constraint caps ceiling at {}", cap));
        }
    }

    // A raise only lifts the ceiling, and never past an explicit cap.
    if let Some(raise) = derived.raise_bloom_ceiling {
        if derived.cap_bloom_at.is_none() && raise > ceiling {
            ceiling = raise;
            trace.push(format!("teacher constraint raises ceiling to {}", raise));
        }
    }

    if floor > ceiling {
        floor = ceiling.step_down();
        trace.push(format!(
            "floor lowered to {} to stay under the capped ceiling",
            floor
        ));
    }

    RigorProfile {
        depth_floor: floor,
        depth_ceiling: ceiling,
        trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_overrides() -> DerivedStructural {
        DerivedStructural::default()
    }

    #[test]
    fn shallow_type_then_time_cap_for_ap_bell_ringer() {
        let profile = resolve_rigor_profile(
            StudentLevel::Ap,
            AssessmentType::BellRinger,
            5,
            &no_overrides(),
        );
        assert_eq!(profile.depth_floor, BloomLevel::Remember);
        assert_eq!(profile.depth_ceiling, BloomLevel::Understand);
    }

    #[test]
    fn standard_quiz_keeps_base_band() {
        let profile = resolve_rigor_profile(
            StudentLevel::Standard,
            AssessmentType::Quiz,
            30,
            &no_overrides(),
        );
        assert_eq!(profile.depth_floor, BloomLevel::Understand);
        assert_eq!(profile.depth_ceiling, BloomLevel::Analyze);
    }

    #[test]
    fn mid_length_test_caps_at_apply() {
        let profile = resolve_rigor_profile(
            StudentLevel::Honors,
            AssessmentType::Test,
            15,
            &no_overrides(),
        );
        assert_eq!(profile.depth_ceiling, BloomLevel::Apply);
        assert_eq!(profile.depth_floor, BloomLevel::Apply);
    }

    #[test]
    fn constraint_cap_beats_constraint_raise() {
        let derived = DerivedStructural {
            cap_bloom_at: Some(BloomLevel::Understand),
            raise_bloom_ceiling: Some(BloomLevel::Create),
            ..Default::default()
        };
        let profile =
            resolve_rigor_profile(StudentLevel::Honors, AssessmentType::Test, 45, &derived);
        assert_eq!(profile.depth_ceiling, BloomLevel::Understand);
    }

    #[test]
    fn raise_lifts_ceiling_without_cap() {
        let derived = DerivedStructural {
            raise_bloom_ceiling: Some(BloomLevel::Create),
            ..Default::default()
        };
        let profile =
            resolve_rigor_profile(StudentLevel::Standard, AssessmentType::Test, 45, &derived);
        assert_eq!(profile.depth_ceiling, BloomLevel::Create);
    }

    #[test]
    fn trace_names_every_fired_rule() {
        let profile = resolve_rigor_profile(
            StudentLevel::Ap,
            AssessmentType::BellRinger,
            5,
            &no_overrides(),
        );
        // base band, type cap, time cap, floor clamp
        assert_eq!(profile.trace.len(), 4);
    }

    #[test]
    fn deterministic_for_same_input() {
        let a = resolve_rigor_profile(
            StudentLevel::Honors,
            AssessmentType::Quiz,
            25,
            &no_overrides(),
        );
        let b = resolve_rigor_profile(
            StudentLevel::Honors,
            AssessmentType::Quiz,
            25,
            &no_overrides(),
        );
        assert_eq!(a.depth_floor, b.depth_floor);
        assert_eq!(a.depth_ceiling, b.depth_ceiling);
        assert_eq!(a.trace, b.trace);
    }
}
