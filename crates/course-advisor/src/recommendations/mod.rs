//! Course recommendation domain.
//!
//! Generation runs four independent strategies over a derived [`LearnerState`], merges
//! their candidates to one per course, stamps eligibility and persists the survivors
//! through a [`RecommendationRepository`]. Persisted recommendations then move through
//! the student/parent response lifecycle in [`lifecycle`].

pub mod batch;
pub mod collaborators;
pub mod domain;
pub mod eligibility;
pub mod engine;
pub mod grading;
pub mod learner;
pub mod lifecycle;
pub mod merge;
pub mod repository;
pub mod scoring;
pub mod service;
pub mod strategies;


pub use batch::{generate_for_learners, BatchReport};
pub use collaborators::{
    CollaboratorError, Collaborators, CourseCatalog, GraduationRequirementsService,
    LearnerDirectory, SequenceService, SubjectAreaService,
};
pub use domain::{
    Actor, ActorResponse, CatalogCourse, CompletedCourse, Confidence, CourseId, CourseKind,
    CourseSequence, Eligibility, EligibilityGates, Enrollment, EnrollmentStatus, GradeEntry,
    InvalidPriority, LearnerId, LearnerRecord, LearnerState, Priority, Recommendation,
    RecommendationCandidate, RecommendationId, RecommendationSource, RecommendationStatus,
    RecommendationView, ResponseDecision, SequenceId, SequenceRef, SequenceStep, SubjectArea,
    SubjectAreaId,
};
pub use engine::{EngineConfig, GenerationOutcome, RecommendationEngine};
pub use grading::LetterGrade;
pub use lifecycle::{LifecycleAction, LifecycleError};
pub use repository::{RecommendationRepository, RecommendationStatistics, RepositoryError};
pub use service::{
    CourseRecommendationService, ManualRecommendation, RecommendationServiceError,
    RecommendationUpdate,
};
pub use strategies::Strategy;
