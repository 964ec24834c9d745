use std::collections::BTreeSet;

use tracing::debug;

use super::domain::{
    CatalogCourse, CourseId, CourseKind, Eligibility, EligibilityGates, LearnerState,
};

pub const HONORS_MIN_GPA: f64 = 3.0;
pub const AP_MIN_GPA: f64 = 3.25;
pub const IB_MIN_GPA: f64 = 3.5;

/// All prerequisites must be completed; there is no partial credit.
pub fn prerequisites_met(course: &CatalogCourse, completed: &BTreeSet<CourseId>) -> bool {
    for prerequisite in &course.prerequisites {
        if !completed.contains(prerequisite) {
            debug!(
                course = %course.code,
                missing = %prerequisite,
                "learner missing prerequisite"
            );
            return false;
        }
    }
    true
}

/// Two-stage GPA gate.
///
/// An unknown GPA never passes. A course floor (`min_gpa_required`) is checked first and
/// can only reject; the course-kind threshold is then applied on its own, whether or not
/// a floor was set. Regular or unclassified courses pass once the floor is satisfied.
pub fn gpa_requirement_met(course: &CatalogCourse, gpa: Option<f64>) -> bool {
    let Some(gpa) = gpa.filter(|value| value.is_finite()) else {
        return false;
    };

    if let Some(minimum) = course.min_gpa_required {
        if gpa < minimum {
            debug!(course = %course.code, gpa, minimum, "gpa below course minimum");
            return false;
        }
    }

    match course.kind {
        Some(CourseKind::Honors) => gpa >= HONORS_MIN_GPA,
        Some(CourseKind::Ap) => gpa >= AP_MIN_GPA,
        Some(CourseKind::Ib) => gpa >= IB_MIN_GPA,
        Some(CourseKind::Regular) | None => true,
    }
}

/// A schedule is full once active enrollments reach the threshold; no enrollments never conflict.
pub fn has_schedule_conflict(active_enrollments: usize, full_schedule_threshold: usize) -> bool {
    active_enrollments > 0 && active_enrollments >= full_schedule_threshold
}

pub fn gates(course: &CatalogCourse, learner: &LearnerState) -> EligibilityGates {
    EligibilityGates {
        prerequisites_met: prerequisites_met(course, &learner.completed_ids()),
        gpa_requirement_met: gpa_requirement_met(course, learner.gpa),
    }
}

/// Full eligibility snapshot for a (learner, course) pair as of now.
pub fn evaluate(
    course: &CatalogCourse,
    learner: &LearnerState,
    full_schedule_threshold: usize,
) -> Eligibility {
    Eligibility::from_gates(
        gates(course, learner),
        has_schedule_conflict(learner.active_enrollments.len(), full_schedule_threshold),
    )
}
