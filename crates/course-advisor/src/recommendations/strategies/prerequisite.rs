use tracing::warn;

use super::{GenerationContext, Strategy};
use crate::recommendations::domain::{EligibilityGates, Priority, RecommendationCandidate};
use crate::recommendations::eligibility::{gpa_requirement_met, prerequisites_met};
use crate::recommendations::scoring::prerequisite_confidence;

/// Every open catalog course whose prerequisites are complete. Courses that also clear
/// the GPA gate rank above those that do not.
pub(super) fn generate(ctx: &GenerationContext<'_>) -> Vec<RecommendationCandidate> {
    let courses = match ctx.collaborators.catalog.active_courses() {
        Ok(courses) => courses,
        Err(err) => {
            warn!(learner = %ctx.learner.learner_id, %err, "catalog listing failed");
            return Vec::new();
        }
    };

    let mut candidates = Vec::new();
    for course in courses {
        if !ctx.is_open(&course.id) {
            continue;
        }
        if !prerequisites_met(&course, &ctx.completed) {
            continue;
        }

        let meets_gpa = gpa_requirement_met(&course, ctx.learner.gpa);
        let confidence = prerequisite_confidence(&course, ctx.learner);
        let priority = if meets_gpa {
            Priority::MEDIUM
        } else {
            Priority::LOWEST
        };
        let reason = format!("Prerequisites met for {}", course.name);

        let mut candidate =
            ctx.candidate(course, Strategy::Prerequisite, confidence, priority, reason);
        candidate.gates = Some(EligibilityGates {
            prerequisites_met: true,
            gpa_requirement_met: meets_gpa,
        });
        candidates.push(candidate);
    }

    candidates
}
