use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::grading::LetterGrade;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier wrapper for learners.
    LearnerId
);
string_id!(
    /// Identifier wrapper for catalog courses.
    CourseId
);
string_id!(SubjectAreaId);
string_id!(SequenceId);
string_id!(
    /// Identifier assigned to persisted recommendations.
    RecommendationId
);

/// Rigor classification driving GPA eligibility thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseKind {
    Regular,
    Honors,
    Ap,
    Ib,
}

impl CourseKind {
    pub const fn label(self) -> &'static str {
        match self {
            CourseKind::Regular => "regular",
            CourseKind::Honors => "honors",
            CourseKind::Ap => "ap",
            CourseKind::Ib => "ib",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectArea {
    pub id: SubjectAreaId,
    pub code: String,
    pub name: String,
}

/// Catalog entry as seen by the recommendation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCourse {
    pub id: CourseId,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub subject_area: Option<SubjectArea>,
    /// `None` means the catalog never classified the course; it is gated like `Regular`.
    #[serde(default)]
    pub kind: Option<CourseKind>,
    #[serde(default)]
    pub min_gpa_required: Option<f64>,
    #[serde(default)]
    pub prerequisites: BTreeSet<CourseId>,
}

/// One position inside a pathway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub course_id: CourseId,
    pub order: u16,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub alternatives: Vec<CourseId>,
}

fn default_required() -> bool {
    true
}

/// Ordered multi-year pathway through a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSequence {
    pub id: SequenceId,
    pub name: String,
    #[serde(default)]
    pub subject_area: Option<SubjectAreaId>,
    #[serde(default)]
    pub min_gpa_recommended: Option<f64>,
    #[serde(default)]
    pub steps: Vec<SequenceStep>,
}

impl CourseSequence {
    /// Steps sorted by order index; steps sharing an index keep their stored order.
    pub fn ordered_steps(&self) -> Vec<&SequenceStep> {
        let mut steps: Vec<&SequenceStep> = self.steps.iter().collect();
        steps.sort_by_key(|step| step.order);
        steps
    }

    pub fn next_step(&self, completed: &BTreeSet<CourseId>) -> Option<&SequenceStep> {
        self.ordered_steps()
            .into_iter()
            .find(|step| !completed.contains(&step.course_id))
    }

    /// Share of steps already completed, as a percentage in `[0, 100]`.
    pub fn progress_percentage(&self, completed: &BTreeSet<CourseId>) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        let done = self
            .steps
            .iter()
            .filter(|step| completed.contains(&step.course_id))
            .count();
        done as f64 / self.steps.len() as f64 * 100.0
    }

    /// A sequence without a GPA floor suits everyone; otherwise a known GPA must reach it.
    pub fn suits_gpa(&self, gpa: Option<f64>) -> bool {
        match (self.min_gpa_recommended, gpa) {
            (None, _) => true,
            (Some(floor), Some(gpa)) => gpa >= floor,
            (Some(_), None) => false,
        }
    }
}

/// Stored learner attributes before derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerRecord {
    pub id: LearnerId,
    #[serde(default)]
    pub grade_level: Option<String>,
    #[serde(default)]
    pub current_gpa: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub course_id: CourseId,
    pub status: EnrollmentStatus,
}

/// Raw grade-history row; the letter is kept verbatim so malformed values can be skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeEntry {
    pub course_id: CourseId,
    pub letter_grade: String,
    pub graded_on: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedCourse {
    pub course_id: CourseId,
    pub subject_area: Option<SubjectArea>,
    pub grade: Option<LetterGrade>,
}

/// Derived, per-run view of a learner. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerState {
    pub learner_id: LearnerId,
    pub grade_level: Option<u8>,
    pub gpa: Option<f64>,
    pub completed: BTreeMap<CourseId, CompletedCourse>,
    pub active_enrollments: BTreeSet<CourseId>,
    /// Most recent grade per course; `None` when that attempt's letter was unreadable.
    pub recent_grades: BTreeMap<CourseId, Option<LetterGrade>>,
}

impl LearnerState {
    pub fn new(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            grade_level: None,
            gpa: None,
            completed: BTreeMap::new(),
            active_enrollments: BTreeSet::new(),
            recent_grades: BTreeMap::new(),
        }
    }

    pub fn has_completed(&self, course_id: &CourseId) -> bool {
        self.completed.contains_key(course_id)
    }

    pub fn completed_ids(&self) -> BTreeSet<CourseId> {
        self.completed.keys().cloned().collect()
    }

    /// Distinct subject areas among completed courses, ordered by id.
    pub fn completed_subject_areas(&self) -> Vec<SubjectArea> {
        let mut areas = BTreeMap::new();
        for course in self.completed.values() {
            if let Some(area) = &course.subject_area {
                areas.entry(area.id.clone()).or_insert_with(|| area.clone());
            }
        }
        areas.into_values().collect()
    }

    pub fn most_recent_grade(&self, course_id: &CourseId) -> Option<LetterGrade> {
        self.recent_grades.get(course_id).copied().flatten()
    }
}

/// Lower is more urgent. Always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const URGENT: Priority = Priority(1);
    pub const HIGH: Priority = Priority(2);
    pub const MEDIUM: Priority = Priority(3);
    pub const LOW: Priority = Priority(4);
    pub const LOWEST: Priority = Priority(5);

    pub fn new(value: u8) -> Result<Self, InvalidPriority> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidPriority(value))
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub const fn is_high(self) -> bool {
        self.0 <= 3
    }
}

impl TryFrom<u8> for Priority {
    type Error = InvalidPriority;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("priority must be between 1 and 5 (got {0})")]
pub struct InvalidPriority(pub u8);

/// Confidence score clamped into `[0.0, 1.0]` on construction.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(raw: f64) -> Self {
        if raw.is_nan() {
            Self(0.0)
        } else {
            Self(raw.clamp(0.0, 1.0))
        }
    }

    pub const fn value(self) -> f64 {
        self.0
    }

    pub fn is_high(self) -> bool {
        self.0 >= 0.7
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

/// Origin of a recommendation. The first four are the generation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationSource {
    SequenceBased,
    PrerequisiteBased,
    RelationshipBased,
    GraduationRequirement,
    CounselorManual,
}

impl RecommendationSource {
    pub const fn label(self) -> &'static str {
        match self {
            RecommendationSource::SequenceBased => "sequence_based",
            RecommendationSource::PrerequisiteBased => "prerequisite_based",
            RecommendationSource::RelationshipBased => "relationship_based",
            RecommendationSource::GraduationRequirement => "graduation_requirement",
            RecommendationSource::CounselorManual => "counselor_manual",
        }
    }

    pub const fn is_generated(self) -> bool {
        !matches!(self, RecommendationSource::CounselorManual)
    }
}

/// Pathway position a recommendation was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRef {
    pub sequence_id: SequenceId,
    pub step_order: u16,
}

/// The two gates answered by the eligibility evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityGates {
    pub prerequisites_met: bool,
    pub gpa_requirement_met: bool,
}

/// Eligibility metadata stamped onto a recommendation at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub prerequisites_met: bool,
    pub gpa_requirement_met: bool,
    pub has_schedule_conflict: bool,
}

impl Eligibility {
    pub fn from_gates(gates: EligibilityGates, has_schedule_conflict: bool) -> Self {
        Self {
            prerequisites_met: gates.prerequisites_met,
            gpa_requirement_met: gates.gpa_requirement_met,
            has_schedule_conflict,
        }
    }

    pub fn meets_all(&self) -> bool {
        self.prerequisites_met && self.gpa_requirement_met && !self.has_schedule_conflict
    }
}

/// Ephemeral proposal emitted by one strategy before merge.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationCandidate {
    pub learner_id: LearnerId,
    pub course: CatalogCourse,
    pub source: RecommendationSource,
    pub confidence: Confidence,
    pub priority: Priority,
    pub reason: String,
    pub sequence: Option<SequenceRef>,
    pub gates: Option<EligibilityGates>,
}

impl RecommendationCandidate {
    pub fn key(&self) -> (LearnerId, CourseId) {
        (self.learner_id.clone(), self.course.id.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Student,
    Parent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseDecision {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// One actor's answer to a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActorResponse {
    pub decision: ResponseDecision,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationStatus {
    Pending,
    AcceptedByStudent,
    AcceptedByParent,
    RejectedByStudent,
    RejectedByParent,
}

impl RecommendationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RecommendationStatus::Pending => "pending",
            RecommendationStatus::AcceptedByStudent => "accepted_by_student",
            RecommendationStatus::AcceptedByParent => "accepted_by_parent",
            RecommendationStatus::RejectedByStudent => "rejected_by_student",
            RecommendationStatus::RejectedByParent => "rejected_by_parent",
        }
    }
}

/// Persisted recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: RecommendationId,
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub course_code: String,
    pub source: RecommendationSource,
    pub sequence: Option<SequenceRef>,
    pub target_period: String,
    pub grade_level: Option<u8>,
    pub priority: Priority,
    pub confidence: Confidence,
    pub reason: String,
    pub prerequisites_met: bool,
    pub gpa_requirement_met: bool,
    pub has_schedule_conflict: bool,
    pub student_response: ActorResponse,
    pub parent_response: ActorResponse,
    pub counselor_notes: Option<String>,
    pub alternative_courses: Vec<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recommendation {
    pub fn eligibility(&self) -> Eligibility {
        Eligibility {
            prerequisites_met: self.prerequisites_met,
            gpa_requirement_met: self.gpa_requirement_met,
            has_schedule_conflict: self.has_schedule_conflict,
        }
    }

    pub fn meets_all_requirements(&self) -> bool {
        self.eligibility().meets_all()
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority.is_high()
    }

    pub fn is_high_confidence(&self) -> bool {
        self.confidence.is_high()
    }

    pub fn view(&self) -> RecommendationView {
        RecommendationView {
            id: self.id.clone(),
            learner_id: self.learner_id.clone(),
            course_code: self.course_code.clone(),
            source: self.source.label(),
            target_period: self.target_period.clone(),
            priority: self.priority.value(),
            confidence: self.confidence.value(),
            reason: self.reason.clone(),
            statuses: self
                .statuses()
                .into_iter()
                .map(RecommendationStatus::label)
                .collect(),
            meets_all_requirements: self.meets_all_requirements(),
            active: self.active,
        }
    }
}

/// Flattened representation used for CLI output.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationView {
    pub id: RecommendationId,
    pub learner_id: LearnerId,
    pub course_code: String,
    pub source: &'static str,
    pub target_period: String,
    pub priority: u8,
    pub confidence: f64,
    pub reason: String,
    pub statuses: Vec<&'static str>,
    pub meets_all_requirements: bool,
    pub active: bool,
}
