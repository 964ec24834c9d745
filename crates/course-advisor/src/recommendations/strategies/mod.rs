//! Candidate generators. Each reads learner state and collaborator data and emits
//! unmerged candidates; none of them writes anything.

mod graduation;
mod prerequisite;
mod relationship;
mod sequence;

#[cfg(test)]
pub(crate) use graduation::complete_with_core_fallback;

use std::collections::BTreeSet;

use super::collaborators::Collaborators;
use super::domain::{
    CatalogCourse, Confidence, CourseId, LearnerState, Priority, RecommendationCandidate,
    RecommendationSource,
};
use super::engine::EngineConfig;

/// The four generation strategies, in merge tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Sequence,
    Prerequisite,
    Relationship,
    Graduation,
}

impl Strategy {
    /// Candidates are concatenated in this order; merge keeps the first-seen on full ties.
    pub const ORDER: [Strategy; 4] = [
        Strategy::Sequence,
        Strategy::Prerequisite,
        Strategy::Relationship,
        Strategy::Graduation,
    ];

    pub const fn source(self) -> RecommendationSource {
        match self {
            Strategy::Sequence => RecommendationSource::SequenceBased,
            Strategy::Prerequisite => RecommendationSource::PrerequisiteBased,
            Strategy::Relationship => RecommendationSource::RelationshipBased,
            Strategy::Graduation => RecommendationSource::GraduationRequirement,
        }
    }

    pub(crate) fn generate(self, ctx: &GenerationContext<'_>) -> Vec<RecommendationCandidate> {
        match self {
            Strategy::Sequence => sequence::generate(ctx),
            Strategy::Prerequisite => prerequisite::generate(ctx),
            Strategy::Relationship => relationship::generate(ctx),
            Strategy::Graduation => graduation::generate(ctx),
        }
    }
}

/// Read-only inputs shared by all strategies for one learner run.
pub(crate) struct GenerationContext<'a> {
    pub learner: &'a LearnerState,
    pub completed: BTreeSet<CourseId>,
    pub already_recommended: &'a BTreeSet<CourseId>,
    pub collaborators: &'a Collaborators,
    pub config: &'a EngineConfig,
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        learner: &'a LearnerState,
        already_recommended: &'a BTreeSet<CourseId>,
        collaborators: &'a Collaborators,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            learner,
            completed: learner.completed_ids(),
            already_recommended,
            collaborators,
            config,
        }
    }

    /// Not completed and not already carrying an active recommendation.
    pub fn is_open(&self, course_id: &CourseId) -> bool {
        !self.completed.contains(course_id) && !self.already_recommended.contains(course_id)
    }

    pub fn candidate(
        &self,
        course: CatalogCourse,
        strategy: Strategy,
        confidence: Confidence,
        priority: Priority,
        reason: String,
    ) -> RecommendationCandidate {
        RecommendationCandidate {
            learner_id: self.learner.learner_id.clone(),
            course,
            source: strategy.source(),
            confidence,
            priority,
            reason,
            sequence: None,
            gates: None,
        }
    }
}
