//! Per-strategy confidence formulas. Every scorer returns a clamped [`Confidence`].

use super::domain::{CatalogCourse, Confidence, LearnerState};

const SEQUENCE_BASE: f64 = 0.70;
const SEQUENCE_ON_PATHWAY_BONUS: f64 = 0.20;
const SEQUENCE_WELL_ABOVE_MARGIN: f64 = 0.5;
const SEQUENCE_WELL_ABOVE_BONUS: f64 = 0.10;
const SEQUENCE_BELOW_FLOOR_PENALTY: f64 = 0.20;

const PREREQUISITE_BASE: f64 = 0.60;
const NO_PREREQUISITE_BONUS: f64 = 0.20;

pub const RELATIONSHIP_CONFIDENCE: f64 = 0.60;
pub const GRADUATION_CONFIDENCE: f64 = 0.90;

/// `progress` is the pathway completion percentage; any nonzero value counts as on-pathway.
/// The GPA adjustment only applies when both the floor and the learner's GPA are known.
pub fn sequence_confidence(
    progress: f64,
    min_gpa_recommended: Option<f64>,
    gpa: Option<f64>,
) -> Confidence {
    let mut score = SEQUENCE_BASE;

    if progress > 0.0 {
        score += SEQUENCE_ON_PATHWAY_BONUS;
    }

    if let (Some(floor), Some(gpa)) = (min_gpa_recommended, gpa) {
        if gpa >= floor + SEQUENCE_WELL_ABOVE_MARGIN {
            score += SEQUENCE_WELL_ABOVE_BONUS;
        } else if gpa < floor {
            score -= SEQUENCE_BELOW_FLOOR_PENALTY;
        }
    }

    Confidence::new(score)
}

/// Bonus contributed by the most recent grade in one prerequisite.
fn prerequisite_grade_bonus(points: f64) -> f64 {
    if points >= 3.5 {
        0.15
    } else if points >= 3.0 {
        0.10
    } else if points >= 2.0 {
        0.05
    } else {
        -0.10
    }
}

/// Prerequisites without a readable grade are left out of the average entirely.
pub fn prerequisite_confidence(course: &CatalogCourse, learner: &LearnerState) -> Confidence {
    if course.prerequisites.is_empty() {
        return Confidence::new(PREREQUISITE_BASE + NO_PREREQUISITE_BONUS);
    }

    let (bonus_total, graded) = course
        .prerequisites
        .iter()
        .filter_map(|prerequisite| learner.most_recent_grade(prerequisite))
        .fold((0.0, 0usize), |(total, count), grade| {
            (total + prerequisite_grade_bonus(grade.points()), count + 1)
        });

    let average_bonus = if graded > 0 {
        bonus_total / graded as f64
    } else {
        0.0
    };

    Confidence::new(PREREQUISITE_BASE + average_bonus)
}

pub fn relationship_confidence() -> Confidence {
    Confidence::new(RELATIONSHIP_CONFIDENCE)
}

pub fn graduation_confidence() -> Confidence {
    Confidence::new(GRADUATION_CONFIDENCE)
}
