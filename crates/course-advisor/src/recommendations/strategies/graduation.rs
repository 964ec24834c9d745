use tracing::{info, warn};

use super::{GenerationContext, Strategy};
use crate::recommendations::domain::{Priority, RecommendationCandidate};
use crate::recommendations::scoring::graduation_confidence;

pub(super) fn generate(ctx: &GenerationContext<'_>) -> Vec<RecommendationCandidate> {
    let candidates = requirement_candidates(ctx);
    complete_with_core_fallback(ctx, candidates)
}

/// Consults the graduation audit. The on-track signal is diagnostic only and never turns
/// into candidates; a failing audit is treated as no signal.
fn requirement_candidates(ctx: &GenerationContext<'_>) -> Vec<RecommendationCandidate> {
    let graduation = &ctx.collaborators.graduation;
    let learner = ctx.learner;

    match graduation.is_on_track(learner) {
        Ok(true) => {}
        Ok(false) => {
            let credits_behind = graduation.credits_behind(learner);
            let standing = graduation.academic_standing(learner);
            match (credits_behind, standing) {
                (Ok(credits_behind), Ok(standing)) => info!(
                    learner = %learner.learner_id,
                    credits_behind,
                    standing = standing.as_deref().unwrap_or("unknown"),
                    "learner is not on track for graduation"
                ),
                (Err(err), _) | (_, Err(err)) => warn!(
                    learner = %learner.learner_id,
                    %err,
                    "graduation audit incomplete, using core subject fallback"
                ),
            }
        }
        Err(err) => {
            warn!(
                learner = %learner.learner_id,
                %err,
                "graduation requirements unavailable, using core subject fallback"
            );
        }
    }

    Vec::new()
}

/// Runs the core-subject fallback only when this strategy has produced nothing so far.
/// Emits at most one course per configured core subject: the first open one listed.
pub(crate) fn complete_with_core_fallback(
    ctx: &GenerationContext<'_>,
    mut candidates: Vec<RecommendationCandidate>,
) -> Vec<RecommendationCandidate> {
    if !candidates.is_empty() {
        return candidates;
    }

    let subjects = &ctx.collaborators.subjects;
    for code in &ctx.config.core_subject_codes {
        let area = match subjects.by_code(code) {
            Ok(Some(area)) => area,
            Ok(None) => continue,
            Err(err) => {
                warn!(subject = %code, %err, "core subject lookup failed");
                continue;
            }
        };

        let courses = match subjects.courses_for(&area.id) {
            Ok(courses) => courses,
            Err(err) => {
                warn!(subject = %code, %err, "core subject course listing failed");
                continue;
            }
        };

        if let Some(course) = courses.into_iter().find(|course| ctx.is_open(&course.id)) {
            candidates.push(ctx.candidate(
                course,
                Strategy::Graduation,
                graduation_confidence(),
                Priority::URGENT,
                "Required for graduation (core subject)".to_string(),
            ));
        }
    }

    candidates
}
