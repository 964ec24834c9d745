use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::collaborators::Collaborators;
use super::domain::{
    CatalogCourse, CourseId, Eligibility, LearnerState, RecommendationCandidate,
    RecommendationSource,
};
use super::eligibility;
use super::merge::merge_candidates;
use super::strategies::{GenerationContext, Strategy};

/// Tunables for candidate generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Subject codes tried, in order, by the graduation fallback.
    pub core_subject_codes: Vec<String>,
    pub full_schedule_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            core_subject_codes: ["MATH", "SCI", "ENG", "SS"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            full_schedule_threshold: 8,
        }
    }
}

/// Merged candidates plus how many each strategy proposed before merge.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub candidates: Vec<RecommendationCandidate>,
    pub proposed: BTreeMap<RecommendationSource, usize>,
}

impl GenerationOutcome {
    pub fn proposed_total(&self) -> usize {
        self.proposed.values().sum()
    }
}

/// Stateless pipeline: run every strategy, then merge. Performs no writes.
pub struct RecommendationEngine {
    collaborators: Collaborators,
    config: EngineConfig,
}

impl RecommendationEngine {
    pub fn new(collaborators: Collaborators, config: EngineConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Raw strategy output concatenated in [`Strategy::ORDER`].
    pub fn candidates(
        &self,
        learner: &LearnerState,
        already_recommended: &BTreeSet<CourseId>,
    ) -> Vec<RecommendationCandidate> {
        let ctx = GenerationContext::new(
            learner,
            already_recommended,
            &self.collaborators,
            &self.config,
        );
        Strategy::ORDER
            .iter()
            .flat_map(|strategy| strategy.generate(&ctx))
            .collect()
    }

    pub fn generate(
        &self,
        learner: &LearnerState,
        already_recommended: &BTreeSet<CourseId>,
    ) -> GenerationOutcome {
        let raw = self.candidates(learner, already_recommended);

        let mut proposed = BTreeMap::new();
        for candidate in &raw {
            *proposed.entry(candidate.source).or_insert(0) += 1;
        }
        debug!(
            learner = %learner.learner_id,
            proposed = raw.len(),
            "strategies finished"
        );

        GenerationOutcome {
            candidates: merge_candidates(raw),
            proposed,
        }
    }

    pub fn eligibility(&self, course: &CatalogCourse, learner: &LearnerState) -> Eligibility {
        eligibility::evaluate(course, learner, self.config.full_schedule_threshold)
    }

    /// Eligibility for a merged candidate, reusing the gates a strategy already computed.
    pub fn candidate_eligibility(
        &self,
        candidate: &RecommendationCandidate,
        learner: &LearnerState,
    ) -> Eligibility {
        match candidate.gates {
            Some(gates) => Eligibility::from_gates(
                gates,
                eligibility::has_schedule_conflict(
                    learner.active_enrollments.len(),
                    self.config.full_schedule_threshold,
                ),
            ),
            None => self.eligibility(&candidate.course, learner),
        }
    }
}
