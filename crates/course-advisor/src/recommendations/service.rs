use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::collaborators::{CollaboratorError, Collaborators};
use super::domain::{
    Actor, ActorResponse, Confidence, CourseId, InvalidPriority, LearnerId, LearnerState,
    Priority, Recommendation, RecommendationCandidate, RecommendationId, RecommendationSource,
};
use super::engine::{EngineConfig, RecommendationEngine};
use super::learner::assemble_learner_state;
use super::lifecycle::{LifecycleAction, LifecycleError};
use super::repository::{RecommendationRepository, RecommendationStatistics, RepositoryError};

/// Service composing the generation engine, collaborators and the recommendation store.
pub struct CourseRecommendationService<R> {
    engine: Arc<RecommendationEngine>,
    repository: Arc<R>,
}

/// Counselor-entered recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualRecommendation {
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub target_period: String,
    pub priority: u8,
    pub confidence: f64,
    pub reason: String,
    #[serde(default)]
    pub counselor_notes: Option<String>,
    #[serde(default)]
    pub alternative_courses: Vec<String>,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationUpdate {
    pub priority: Option<u8>,
    pub confidence: Option<f64>,
    pub reason: Option<String>,
    pub counselor_notes: Option<String>,
    pub alternative_courses: Option<Vec<String>>,
}

impl<R> CourseRecommendationService<R>
where
    R: RecommendationRepository + 'static,
{
    pub fn new(repository: Arc<R>, collaborators: Collaborators, config: EngineConfig) -> Self {
        Self::with_engine(
            Arc::new(RecommendationEngine::new(collaborators, config)),
            repository,
        )
    }

    pub fn with_engine(engine: Arc<RecommendationEngine>, repository: Arc<R>) -> Self {
        Self {
            engine,
            repository,
        }
    }

    pub fn engine(&self) -> &RecommendationEngine {
        &self.engine
    }

    fn collaborators(&self) -> &Collaborators {
        self.engine.collaborators()
    }

    /// Loads and derives learner state. Missing enrollment or grade data degrades to empty.
    pub fn load_learner(
        &self,
        learner_id: &LearnerId,
    ) -> Result<LearnerState, RecommendationServiceError> {
        let directory = &self.collaborators().learners;
        let record = directory
            .learner(learner_id)?
            .ok_or_else(|| RecommendationServiceError::LearnerNotFound(learner_id.clone()))?;

        let enrollments = directory.enrollments(learner_id).unwrap_or_else(|err| {
            warn!(learner = %learner_id, %err, "enrollment history unavailable");
            Vec::new()
        });
        let grades = directory.grade_history(learner_id).unwrap_or_else(|err| {
            warn!(learner = %learner_id, %err, "grade history unavailable");
            Vec::new()
        });

        Ok(assemble_learner_state(
            &record,
            &enrollments,
            &grades,
            self.collaborators().catalog.as_ref(),
        ))
    }

    /// Runs every strategy for the learner, merges, stamps eligibility and persists the
    /// survivors in one write. Courses that already carry an active recommendation are
    /// never proposed again, so repeated runs do not duplicate.
    pub fn generate_recommendations(
        &self,
        learner_id: &LearnerId,
        target_period: &str,
    ) -> Result<Vec<Recommendation>, RecommendationServiceError> {
        let learner = self.load_learner(learner_id)?;
        info!(learner = %learner_id, target_period, "generating course recommendations");

        let already_recommended: BTreeSet<CourseId> = self
            .repository
            .find_active_for(learner_id)?
            .into_iter()
            .map(|record| record.course_id)
            .collect();

        let outcome = self.engine.generate(&learner, &already_recommended);
        let proposed = outcome.proposed_total();

        let records = outcome
            .candidates
            .into_iter()
            .map(|candidate| self.materialize(candidate, &learner, target_period))
            .collect::<Result<Vec<_>, _>>()?;

        let saved = if records.is_empty() {
            Vec::new()
        } else {
            self.repository.save_all(records)?
        };

        info!(
            learner = %learner_id,
            proposed,
            unique = saved.len(),
            "generated unique recommendations"
        );
        Ok(saved)
    }

    fn materialize(
        &self,
        candidate: RecommendationCandidate,
        learner: &LearnerState,
        target_period: &str,
    ) -> Result<Recommendation, RepositoryError> {
        let eligibility = self.engine.candidate_eligibility(&candidate, learner);
        let now = Utc::now();
        Ok(Recommendation {
            id: self.repository.next_id()?,
            learner_id: candidate.learner_id,
            course_id: candidate.course.id,
            course_code: candidate.course.code,
            source: candidate.source,
            sequence: candidate.sequence,
            target_period: target_period.to_string(),
            grade_level: learner.grade_level,
            priority: candidate.priority,
            confidence: candidate.confidence,
            reason: candidate.reason,
            prerequisites_met: eligibility.prerequisites_met,
            gpa_requirement_met: eligibility.gpa_requirement_met,
            has_schedule_conflict: eligibility.has_schedule_conflict,
            student_response: ActorResponse::default(),
            parent_response: ActorResponse::default(),
            counselor_notes: None,
            alternative_courses: Vec::new(),
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Creates a counselor recommendation after running the eligibility evaluator.
    pub fn create_manual(
        &self,
        request: ManualRecommendation,
    ) -> Result<Recommendation, RecommendationServiceError> {
        let priority = Priority::new(request.priority)?;
        let learner = self.load_learner(&request.learner_id)?;
        let course = self
            .collaborators()
            .catalog
            .course(&request.course_id)?
            .ok_or_else(|| RecommendationServiceError::CourseNotFound(request.course_id.clone()))?;

        if self
            .repository
            .has_active(&request.learner_id, &request.course_id)?
        {
            return Err(RecommendationServiceError::DuplicateActive {
                learner: request.learner_id,
                course: request.course_id,
            });
        }

        info!(
            learner = %request.learner_id,
            course = %course.code,
            "creating manual recommendation"
        );

        let eligibility = self.engine.eligibility(&course, &learner);
        let now = Utc::now();
        let record = Recommendation {
            id: self.repository.next_id()?,
            learner_id: request.learner_id,
            course_id: course.id,
            course_code: course.code,
            source: RecommendationSource::CounselorManual,
            sequence: None,
            target_period: request.target_period,
            grade_level: learner.grade_level,
            priority,
            confidence: Confidence::new(request.confidence),
            reason: request.reason,
            prerequisites_met: eligibility.prerequisites_met,
            gpa_requirement_met: eligibility.gpa_requirement_met,
            has_schedule_conflict: eligibility.has_schedule_conflict,
            student_response: ActorResponse::default(),
            parent_response: ActorResponse::default(),
            counselor_notes: request.counselor_notes,
            alternative_courses: request.alternative_courses,
            active: true,
            created_at: now,
            updated_at: now,
        };

        let mut saved = self.repository.save_all(vec![record])?;
        saved
            .pop()
            .ok_or(RecommendationServiceError::Repository(RepositoryError::NotFound))
    }

    pub fn update(
        &self,
        id: &RecommendationId,
        changes: RecommendationUpdate,
    ) -> Result<Recommendation, RecommendationServiceError> {
        let mut record = self.get(id)?;
        if !record.active {
            return Err(LifecycleError::Inactive(id.clone()).into());
        }
        info!(recommendation = %id, "updating recommendation");

        if let Some(priority) = changes.priority {
            record.priority = Priority::new(priority)?;
        }
        if let Some(confidence) = changes.confidence {
            record.confidence = Confidence::new(confidence);
        }
        if let Some(reason) = changes.reason {
            record.reason = reason;
        }
        if let Some(notes) = changes.counselor_notes {
            record.counselor_notes = Some(notes);
        }
        if let Some(alternatives) = changes.alternative_courses {
            record.alternative_courses = alternatives;
        }
        record.updated_at = Utc::now();

        self.repository.update(record.clone())?;
        Ok(record)
    }

    pub fn accept_by_student(
        &self,
        id: &RecommendationId,
    ) -> Result<Recommendation, RecommendationServiceError> {
        self.transition(id, LifecycleAction::Accept(Actor::Student))
    }

    pub fn accept_by_parent(
        &self,
        id: &RecommendationId,
    ) -> Result<Recommendation, RecommendationServiceError> {
        self.transition(id, LifecycleAction::Accept(Actor::Parent))
    }

    pub fn reject_by_student(
        &self,
        id: &RecommendationId,
    ) -> Result<Recommendation, RecommendationServiceError> {
        self.transition(id, LifecycleAction::Reject(Actor::Student))
    }

    pub fn reject_by_parent(
        &self,
        id: &RecommendationId,
    ) -> Result<Recommendation, RecommendationServiceError> {
        self.transition(id, LifecycleAction::Reject(Actor::Parent))
    }

    /// Soft delete. The record stays readable but takes no further transitions.
    pub fn deactivate(
        &self,
        id: &RecommendationId,
    ) -> Result<Recommendation, RecommendationServiceError> {
        self.transition(id, LifecycleAction::Deactivate)
    }

    pub fn transition(
        &self,
        id: &RecommendationId,
        action: LifecycleAction,
    ) -> Result<Recommendation, RecommendationServiceError> {
        let mut record = self.get(id)?;
        record.apply(action, Utc::now())?;
        self.repository.update(record.clone())?;
        info!(recommendation = %id, ?action, "recommendation transitioned");
        Ok(record)
    }

    pub fn get(&self, id: &RecommendationId) -> Result<Recommendation, RecommendationServiceError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| RecommendationServiceError::RecommendationNotFound(id.clone()))
    }

    pub fn active_for_learner(
        &self,
        learner_id: &LearnerId,
    ) -> Result<Vec<Recommendation>, RecommendationServiceError> {
        self.ensure_learner(learner_id)?;
        Ok(self.repository.find_active_for(learner_id)?)
    }

    pub fn pending_for_learner(
        &self,
        learner_id: &LearnerId,
    ) -> Result<Vec<Recommendation>, RecommendationServiceError> {
        self.filtered_for_learner(learner_id, Recommendation::needs_approval)
    }

    pub fn high_priority_for_learner(
        &self,
        learner_id: &LearnerId,
    ) -> Result<Vec<Recommendation>, RecommendationServiceError> {
        self.filtered_for_learner(learner_id, Recommendation::is_high_priority)
    }

    pub fn meeting_requirements_for_learner(
        &self,
        learner_id: &LearnerId,
    ) -> Result<Vec<Recommendation>, RecommendationServiceError> {
        self.filtered_for_learner(learner_id, Recommendation::meets_all_requirements)
    }

    fn filtered_for_learner(
        &self,
        learner_id: &LearnerId,
        keep: fn(&Recommendation) -> bool,
    ) -> Result<Vec<Recommendation>, RecommendationServiceError> {
        let mut records = self.active_for_learner(learner_id)?;
        records.retain(|record| keep(record));
        Ok(records)
    }

    fn ensure_learner(&self, learner_id: &LearnerId) -> Result<(), RecommendationServiceError> {
        match self.collaborators().learners.learner(learner_id)? {
            Some(_) => Ok(()),
            None => Err(RecommendationServiceError::LearnerNotFound(
                learner_id.clone(),
            )),
        }
    }

    pub fn statistics(&self) -> Result<RecommendationStatistics, RecommendationServiceError> {
        let records = self.repository.all()?;
        Ok(RecommendationStatistics::collect(&records))
    }
}

/// Error raised by the recommendation service.
#[derive(Debug, thiserror::Error)]
pub enum RecommendationServiceError {
    #[error("learner {0} not found")]
    LearnerNotFound(LearnerId),
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("recommendation {0} not found")]
    RecommendationNotFound(RecommendationId),
    #[error("learner {learner} already has an active recommendation for course {course}")]
    DuplicateActive { learner: LearnerId, course: CourseId },
    #[error(transparent)]
    InvalidPriority(#[from] InvalidPriority),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl RecommendationServiceError {
    /// True for the lookup failures a caller should report as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RecommendationServiceError::LearnerNotFound(_)
                | RecommendationServiceError::CourseNotFound(_)
                | RecommendationServiceError::RecommendationNotFound(_)
                | RecommendationServiceError::Repository(RepositoryError::NotFound)
        )
    }
}
