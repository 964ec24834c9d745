use serde::Serialize;

use super::domain::{CourseId, LearnerId, Recommendation, RecommendationId};

/// Storage abstraction so the service module can be exercised in isolation.
///
/// Implementations own the unique-active invariant: `save_all` and `update` must refuse
/// any write that would leave two active recommendations for one (learner, course) pair,
/// and `save_all` is all-or-nothing.
///
/// Ids come from the store. `next_id` must never hand out the same id twice to any caller
/// sharing the store, across service instances and restarts, and `save_all` must refuse a
/// record whose id is already stored.
pub trait RecommendationRepository: Send + Sync {
    fn next_id(&self) -> Result<RecommendationId, RepositoryError>;
    fn has_active(&self, learner: &LearnerId, course: &CourseId) -> Result<bool, RepositoryError>;
    fn save_all(
        &self,
        records: Vec<Recommendation>,
    ) -> Result<Vec<Recommendation>, RepositoryError>;
    fn find_active_for(&self, learner: &LearnerId) -> Result<Vec<Recommendation>, RepositoryError>;
    fn fetch(&self, id: &RecommendationId) -> Result<Option<Recommendation>, RepositoryError>;
    fn update(&self, record: Recommendation) -> Result<(), RepositoryError>;
    fn all(&self) -> Result<Vec<Recommendation>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("active recommendation already exists for learner {learner} and course {course}")]
    Conflict { learner: LearnerId, course: CourseId },
    #[error("recommendation id {0} is already stored")]
    DuplicateId(RecommendationId),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Aggregate counts across every stored recommendation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecommendationStatistics {
    pub total: usize,
    pub active: usize,
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub generated: usize,
}

impl RecommendationStatistics {
    /// `pending`, `accepted` and `rejected` only count active rows; `generated` counts
    /// every engine-produced row.
    pub fn collect<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Recommendation>,
    {
        let mut stats = Self::default();
        for record in records {
            stats.total += 1;
            if record.source.is_generated() {
                stats.generated += 1;
            }
            if !record.active {
                continue;
            }
            stats.active += 1;
            if record.needs_approval() {
                stats.pending += 1;
            }
            if record.fully_approved() {
                stats.accepted += 1;
            }
            if record.any_rejected() {
                stats.rejected += 1;
            }
        }
        stats
    }
}

impl std::fmt::Display for RecommendationStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "recommendations: total={}, active={}, pending={}, accepted={}, rejected={}, \
             generated={}",
            self.total,
            self.active,
            self.pending,
            self.accepted,
            self.rejected,
            self.generated
        )
    }
}
