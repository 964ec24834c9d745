//! Contracts for the services the engine reads from.
//!
//! Each collaborator is injected at construction; nothing here keeps process-wide state.
//! Generation treats an `Err` from any read made while producing candidates as an empty
//! answer, so implementations can fail without aborting a learner's run.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::domain::{
    CatalogCourse, CourseId, CourseSequence, Enrollment, GradeEntry, LearnerId, LearnerRecord,
    LearnerState, SubjectArea, SubjectAreaId,
};

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{service} unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },
    #[error("{0} not found")]
    NotFound(String),
}

pub trait CourseCatalog: Send + Sync {
    fn active_courses(&self) -> Result<Vec<CatalogCourse>, CollaboratorError>;
    fn course(&self, id: &CourseId) -> Result<Option<CatalogCourse>, CollaboratorError>;
}

pub trait LearnerDirectory: Send + Sync {
    fn learner(&self, id: &LearnerId) -> Result<Option<LearnerRecord>, CollaboratorError>;
    fn enrollments(&self, id: &LearnerId) -> Result<Vec<Enrollment>, CollaboratorError>;
    fn grade_history(&self, id: &LearnerId) -> Result<Vec<GradeEntry>, CollaboratorError>;
}

/// Pathway data. The provided methods follow the stored step order.
pub trait SequenceService: Send + Sync {
    fn suitable_for_gpa(&self, gpa: Option<f64>) -> Result<Vec<CourseSequence>, CollaboratorError>;

    fn next_uncompleted_course(
        &self,
        sequence: &CourseSequence,
        completed: &BTreeSet<CourseId>,
    ) -> Option<CourseId> {
        sequence
            .next_step(completed)
            .map(|step| step.course_id.clone())
    }

    fn pathway_progress(&self, sequence: &CourseSequence, completed: &BTreeSet<CourseId>) -> f64 {
        sequence.progress_percentage(completed)
    }
}

pub trait SubjectAreaService: Send + Sync {
    fn strongly_related(
        &self,
        subject_area: &SubjectAreaId,
    ) -> Result<Vec<SubjectArea>, CollaboratorError>;
    fn courses_for(
        &self,
        subject_area: &SubjectAreaId,
    ) -> Result<Vec<CatalogCourse>, CollaboratorError>;
    fn by_code(&self, code: &str) -> Result<Option<SubjectArea>, CollaboratorError>;
}

pub trait GraduationRequirementsService: Send + Sync {
    fn is_on_track(&self, learner: &LearnerState) -> Result<bool, CollaboratorError>;
    fn credits_behind(&self, learner: &LearnerState) -> Result<f64, CollaboratorError>;

    fn academic_standing(
        &self,
        _learner: &LearnerState,
    ) -> Result<Option<String>, CollaboratorError> {
        Ok(None)
    }
}

/// Bundle of injected collaborators shared by the engine and the service.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn CourseCatalog>,
    pub learners: Arc<dyn LearnerDirectory>,
    pub sequences: Arc<dyn SequenceService>,
    pub subjects: Arc<dyn SubjectAreaService>,
    pub graduation: Arc<dyn GraduationRequirementsService>,
}

impl Collaborators {
    /// Wires every contract to one backing object, as snapshot or fixture stores do.
    pub fn from_shared<T>(shared: Arc<T>) -> Self
    where
        T: CourseCatalog
            + LearnerDirectory
            + SequenceService
            + SubjectAreaService
            + GraduationRequirementsService
            + 'static,
    {
        Self {
            catalog: shared.clone(),
            learners: shared.clone(),
            sequences: shared.clone(),
            subjects: shared.clone(),
            graduation: shared,
        }
    }
}
