use tracing::warn;

use super::{GenerationContext, Strategy};
use crate::recommendations::domain::{Priority, RecommendationCandidate, SequenceRef};
use crate::recommendations::scoring::sequence_confidence;

/// One candidate per GPA-suitable pathway: its first step the learner has not completed.
pub(super) fn generate(ctx: &GenerationContext<'_>) -> Vec<RecommendationCandidate> {
    let services = ctx.collaborators;
    let sequences = match services.sequences.suitable_for_gpa(ctx.learner.gpa) {
        Ok(sequences) => sequences,
        Err(err) => {
            warn!(learner = %ctx.learner.learner_id, %err, "sequence lookup failed");
            return Vec::new();
        }
    };

    let mut candidates = Vec::new();
    for sequence in &sequences {
        let Some(next_course) = services
            .sequences
            .next_uncompleted_course(sequence, &ctx.completed)
        else {
            continue;
        };
        if ctx.already_recommended.contains(&next_course) {
            continue;
        }

        let course = match services.catalog.course(&next_course) {
            Ok(Some(course)) => course,
            Ok(None) => {
                warn!(
                    sequence = %sequence.id,
                    course = %next_course,
                    "pathway step references unknown course"
                );
                continue;
            }
            Err(err) => {
                warn!(
                    sequence = %sequence.id,
                    course = %next_course,
                    %err,
                    "catalog lookup failed"
                );
                continue;
            }
        };

        let progress = services
            .sequences
            .pathway_progress(sequence, &ctx.completed);
        let confidence =
            sequence_confidence(progress, sequence.min_gpa_recommended, ctx.learner.gpa);
        let step_order = sequence
            .steps
            .iter()
            .find(|step| step.course_id == next_course)
            .map(|step| step.order)
            .unwrap_or_default();

        let mut candidate = ctx.candidate(
            course,
            Strategy::Sequence,
            confidence,
            Priority::HIGH,
            format!("Next course in {} pathway", sequence.name),
        );
        candidate.sequence = Some(SequenceRef {
            sequence_id: sequence.id.clone(),
            step_order,
        });
        candidates.push(candidate);
    }

    candidates
}
