use std::collections::BTreeSet;

use tracing::warn;

use super::{GenerationContext, Strategy};
use crate::recommendations::domain::{Priority, RecommendationCandidate};
use crate::recommendations::scoring::relationship_confidence;

/// Courses in subject areas strongly related to what the learner has already finished.
pub(super) fn generate(ctx: &GenerationContext<'_>) -> Vec<RecommendationCandidate> {
    let subjects = &ctx.collaborators.subjects;
    let mut candidates = Vec::new();
    // A course reachable through two related areas is emitted once per run.
    let mut emitted = BTreeSet::new();

    for completed_area in ctx.learner.completed_subject_areas() {
        let related = match subjects.strongly_related(&completed_area.id) {
            Ok(related) => related,
            Err(err) => {
                warn!(subject = %completed_area.code, %err, "related subject lookup failed");
                continue;
            }
        };

        for related_area in related {
            let courses = match subjects.courses_for(&related_area.id) {
                Ok(courses) => courses,
                Err(err) => {
                    warn!(subject = %related_area.code, %err, "subject course listing failed");
                    continue;
                }
            };

            for course in courses {
                if !ctx.is_open(&course.id) || !emitted.insert(course.id.clone()) {
                    continue;
                }
                let reason = format!("Related to {} studies", completed_area.name);
                candidates.push(ctx.candidate(
                    course,
                    Strategy::Relationship,
                    relationship_confidence(),
                    Priority::LOW,
                    reason,
                ));
            }
        }
    }

    candidates
}
