// architect/distribution.rs
// Cognitive distribution: per-assessment-type templates, level shifts
// for advanced students, and in-band redistribution.

use crate::domain::{AssessmentType, BloomLevel, RigorProfile, StudentLevel};
use std::collections::BTreeMap;

/// Percentage template across remember..create for an assessment type.
fn template(assessment_type: AssessmentType) -> [f64; 6] {
    match assessment_type {
        AssessmentType::BellRinger => [50.0, 30.0, 20.0, 0.0, 0.0, 0.0],
        AssessmentType::ExitTicket => [40.0, 30.0, 30.0, 0.0, 0.0, 0.0],
        AssessmentType::Quiz => [40.0, 30.0, 20.0, 10.0, 0.0, 0.0],
        AssessmentType::Test => [25.0, 25.0, 25.0, 15.0, 10.0, 0.0],
        AssessmentType::Worksheet => [35.0, 30.0, 25.0, 10.0, 0.0, 0.0],
        AssessmentType::TestReview => [30.0, 25.0, 25.0, 15.0, 5.0, 0.0],
    }
}

/// Fraction of each level's mass shifted one step deeper for advanced
/// cohorts.
fn ceiling_shift(student_level: StudentLevel) -> f64 {
    match student_level {
        StudentLevel::Remedial => 0.0,
        StudentLevel::Standard => 0.0,
        StudentLevel::Honors => 0.15,
        StudentLevel::Ap => 0.25,
    }
}

/// Builds the per-level question counts: template, shift toward the
/// ceiling, clamp out-of-band mass into the nearest in-band level, then
/// integerize with largest remainders so the counts sum exactly to
/// `question_count`.
pub fn build_distribution(
    assessment_type: AssessmentType,
    student_level: StudentLevel,
    rigor: &RigorProfile,
    question_count: usize,
) -> BTreeMap<BloomLevel, usize> {
    let mut mass = template(assessment_type);

    let shift = ceiling_shift(student_level);
    if shift > 0.0 {
        let mut shifted = [0.0; 6];
        for i in 0..6 {
            let moving = if i < 5 { mass[i] * shift } else { 0.0 };
            shifted[i] += mass[i] - moving;
            if i < 5 {
                shifted[i + 1] += moving;
            }
        }
        mass = shifted;
    }

    // Redistribute out-of-band mass into the nearest in-band level.
    let floor = rigor.depth_floor.index();
    let ceiling = rigor.depth_ceiling.index();
    let mut clamped = [0.0; 6];
    for (i, &m) in mass.iter().enumerate() {
        let target = i.clamp(floor, ceiling);
        clamped[target] += m;
    }

    integerize(&clamped, question_count, floor)
}

/// Largest-remainder apportionment of `question_count` over the mass
/// vector. Guarantees the counts sum exactly to `question_count`; an
/// all-zero mass vector degenerates to everything at the floor.
fn integerize(mass: &[f64; 6], question_count: usize, floor: usize) -> BTreeMap<BloomLevel, usize> {
    let total: f64 = mass.iter().sum();
    let mut counts = [0usize; 6];

    if total <= f64::EPSILON {
        counts[floor] = question_count;
    } else {
        let mut remainders: Vec<(usize, f64)> = Vec::with_capacity(6);
        let mut assigned = 0usize;
        for (i, &m) in mass.iter().enumerate() {
            let exact = m / total * question_count as f64;
            counts[i] = exact.floor() as usize;
            assigned += counts[i];
            remainders.push((i, exact - exact.floor()));
        }
        // Hand out the leftover seats to the largest remainders; ties
        // go to the shallower level for stability.
        remainders.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0)));
        let mut leftover = question_count - assigned;
        for (i, _) in remainders {
            if leftover == 0 {
                break;
            }
            counts[i] += 1;
            leftover -= 1;
        }
    }

    BloomLevel::ALL
        .iter()
        .zip(counts.iter())
        .filter(|(_, &c)| c > 0)
        .map(|(&l, &c)| (l, c))
        .collect()
}
