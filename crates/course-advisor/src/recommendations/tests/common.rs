use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};

use crate::recommendations::collaborators::{
    CollaboratorError, Collaborators, CourseCatalog, GraduationRequirementsService,
    LearnerDirectory, SequenceService, SubjectAreaService,
};
use crate::recommendations::domain::{
    ActorResponse, CatalogCourse, CompletedCourse, Confidence, CourseId, CourseKind,
    CourseSequence, Enrollment, EnrollmentStatus, GradeEntry, LearnerId, LearnerRecord,
    LearnerState, Priority, Recommendation, RecommendationId, RecommendationSource, SequenceId,
    SequenceStep, SubjectArea, SubjectAreaId,
};
use crate::recommendations::engine::{EngineConfig, RecommendationEngine};
use crate::recommendations::repository::{RecommendationRepository, RepositoryError};
use crate::recommendations::service::CourseRecommendationService;

pub(super) const GEO_LEARNER: &str = "stu-geo";
pub(super) const NEW_LEARNER: &str = "stu-new";
pub(super) const BUSY_LEARNER: &str = "stu-busy";

pub(super) fn area(code: &str, name: &str) -> SubjectArea {
    SubjectArea {
        id: SubjectAreaId::new(format!("sa-{}", code.to_ascii_lowercase())),
        code: code.to_string(),
        name: name.to_string(),
    }
}

pub(super) fn math() -> SubjectArea {
    area("MATH", "Mathematics")
}

pub(super) fn science() -> SubjectArea {
    area("SCI", "Science")
}

pub(super) fn english() -> SubjectArea {
    area("ENG", "English")
}

pub(super) fn social_studies() -> SubjectArea {
    area("SS", "Social Studies")
}

pub(super) fn computing() -> SubjectArea {
    area("CS", "Computer Science")
}

pub(super) fn course(
    id: &str,
    code: &str,
    name: &str,
    subject: Option<SubjectArea>,
    kind: Option<CourseKind>,
    prerequisites: &[&str],
) -> CatalogCourse {
    CatalogCourse {
        id: CourseId::new(id),
        code: code.to_string(),
        name: name.to_string(),
        subject_area: subject,
        kind,
        min_gpa_required: None,
        prerequisites: prerequisites.iter().map(|id| CourseId::new(*id)).collect(),
    }
}

pub(super) fn catalog() -> Vec<CatalogCourse> {
    let regular = Some(CourseKind::Regular);
    let mut calculus = course(
        "calc",
        "MATH-401",
        "AP Calculus",
        Some(math()),
        Some(CourseKind::Ap),
        &["alg2"],
    );
    calculus.min_gpa_required = Some(3.0);

    vec![
        course("alg1", "MATH-101", "Algebra I", Some(math()), regular, &[]),
        course("geo", "MATH-201", "Geometry", Some(math()), regular, &["alg1"]),
        course(
            "alg2",
            "MATH-301",
            "Algebra II Honors",
            Some(math()),
            Some(CourseKind::Honors),
            &["geo"],
        ),
        calculus,
        course("bio", "SCI-101", "Biology", Some(science()), regular, &[]),
        course("chem", "SCI-201", "Chemistry", Some(science()), regular, &["bio"]),
        course("eng9", "ENG-101", "English 9", Some(english()), regular, &[]),
        course("hist", "SS-101", "World History", Some(social_studies()), None, &[]),
        course(
            "prog",
            "CS-101",
            "Intro to Programming",
            Some(computing()),
            regular,
            &["alg1"],
        ),
    ]
}

pub(super) fn step(course_id: &str, order: u16) -> SequenceStep {
    SequenceStep {
        course_id: CourseId::new(course_id),
        order,
        required: true,
        alternatives: Vec::new(),
    }
}

pub(super) fn math_sequence() -> CourseSequence {
    CourseSequence {
        id: SequenceId::new("seq-math"),
        name: "Mathematics".to_string(),
        subject_area: Some(math().id),
        min_gpa_recommended: Some(3.0),
        steps: vec![step("alg1", 1), step("geo", 2), step("alg2", 3)],
    }
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn enrollment(course_id: &str, status: EnrollmentStatus) -> Enrollment {
    Enrollment {
        course_id: CourseId::new(course_id),
        status,
    }
}

pub(super) fn grade(course_id: &str, letter: &str, graded_on: NaiveDate) -> GradeEntry {
    GradeEntry {
        course_id: CourseId::new(course_id),
        letter_grade: letter.to_string(),
        graded_on,
    }
}

pub(super) fn learner_id(raw: &str) -> LearnerId {
    LearnerId::new(raw)
}

/// Learner state built directly, bypassing the directory.
pub(super) fn learner_state(
    id: &str,
    gpa: Option<f64>,
    completed: &[(&str, Option<SubjectArea>, Option<&str>)],
) -> LearnerState {
    let mut state = LearnerState::new(learner_id(id));
    state.gpa = gpa;
    for (course_id, subject_area, letter) in completed {
        let grade = letter.and_then(|raw| raw.parse().ok());
        state.completed.insert(
            CourseId::new(*course_id),
            CompletedCourse {
                course_id: CourseId::new(*course_id),
                subject_area: subject_area.clone(),
                grade,
            },
        );
        state.recent_grades.insert(CourseId::new(*course_id), grade);
    }
    state
}

/// Stored, unanswered prerequisite-based recommendation.
pub(super) fn sample_recommendation(id: &str, learner: &str, course_id: &str) -> Recommendation {
    let now = Utc::now();
    Recommendation {
        id: RecommendationId::new(id),
        learner_id: learner_id(learner),
        course_id: CourseId::new(course_id),
        course_code: course_id.to_ascii_uppercase(),
        source: RecommendationSource::PrerequisiteBased,
        sequence: None,
        target_period: "2026-FALL".to_string(),
        grade_level: Some(10),
        priority: Priority::MEDIUM,
        confidence: Confidence::new(0.75),
        reason: format!("Prerequisites met for {course_id}"),
        prerequisites_met: true,
        gpa_requirement_met: true,
        has_schedule_conflict: false,
        student_response: ActorResponse::default(),
        parent_response: ActorResponse::default(),
        counselor_notes: None,
        alternative_courses: Vec::new(),
        active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Fixture campus implementing every collaborator contract, with per-service failure toggles.
pub(super) struct FixtureCampus {
    pub(super) courses: Vec<CatalogCourse>,
    pub(super) areas: Vec<SubjectArea>,
    pub(super) related: BTreeMap<SubjectAreaId, Vec<SubjectAreaId>>,
    pub(super) sequences: Vec<CourseSequence>,
    pub(super) learners: BTreeMap<LearnerId, LearnerRecord>,
    pub(super) enrollments: BTreeMap<LearnerId, Vec<Enrollment>>,
    pub(super) grades: BTreeMap<LearnerId, Vec<GradeEntry>>,
    pub(super) on_track: bool,
    failing: Mutex<BTreeSet<&'static str>>,
}

impl Default for FixtureCampus {
    fn default() -> Self {
        let mut related = BTreeMap::new();
        related.insert(math().id, vec![science().id, computing().id]);

        let mut campus = Self {
            courses: catalog(),
            areas: vec![math(), science(), english(), social_studies(), computing()],
            related,
            sequences: vec![math_sequence()],
            learners: BTreeMap::new(),
            enrollments: BTreeMap::new(),
            grades: BTreeMap::new(),
            on_track: false,
            failing: Mutex::new(BTreeSet::new()),
        };

        campus.add_learner(GEO_LEARNER, Some("10th"), Some(3.6));
        campus.enroll(GEO_LEARNER, "alg1", EnrollmentStatus::Completed);
        campus.grade(GEO_LEARNER, "alg1", "A", date(2025, 6, 1));

        campus.add_learner(NEW_LEARNER, Some("9"), None);

        campus.add_learner(BUSY_LEARNER, Some("11th grade"), Some(2.5));
        for slot in 1..=8 {
            campus.enroll(BUSY_LEARNER, &format!("elective-{slot}"), EnrollmentStatus::Active);
        }

        campus
    }
}

impl FixtureCampus {
    pub(super) fn add_learner(&mut self, id: &str, grade_level: Option<&str>, gpa: Option<f64>) {
        self.learners.insert(
            learner_id(id),
            LearnerRecord {
                id: learner_id(id),
                grade_level: grade_level.map(str::to_string),
                current_gpa: gpa,
            },
        );
    }

    pub(super) fn enroll(&mut self, id: &str, course_id: &str, status: EnrollmentStatus) {
        self.enrollments
            .entry(learner_id(id))
            .or_default()
            .push(enrollment(course_id, status));
    }

    pub(super) fn grade(&mut self, id: &str, course_id: &str, letter: &str, on: NaiveDate) {
        self.grades
            .entry(learner_id(id))
            .or_default()
            .push(grade(course_id, letter, on));
    }

    /// Makes every call to the named service fail until the campus is dropped.
    pub(super) fn fail(&self, service: &'static str) {
        self.failing
            .lock()
            .expect("failure mutex poisoned")
            .insert(service);
    }

    fn check(&self, service: &'static str) -> Result<(), CollaboratorError> {
        if self
            .failing
            .lock()
            .expect("failure mutex poisoned")
            .contains(service)
        {
            return Err(CollaboratorError::Unavailable {
                service,
                reason: "fixture outage".to_string(),
            });
        }
        Ok(())
    }
}

impl CourseCatalog for FixtureCampus {
    fn active_courses(&self) -> Result<Vec<CatalogCourse>, CollaboratorError> {
        self.check("catalog")?;
        Ok(self.courses.clone())
    }

    fn course(&self, id: &CourseId) -> Result<Option<CatalogCourse>, CollaboratorError> {
        self.check("catalog")?;
        Ok(self.courses.iter().find(|course| &course.id == id).cloned())
    }
}

impl LearnerDirectory for FixtureCampus {
    fn learner(&self, id: &LearnerId) -> Result<Option<LearnerRecord>, CollaboratorError> {
        self.check("learners")?;
        Ok(self.learners.get(id).cloned())
    }

    fn enrollments(&self, id: &LearnerId) -> Result<Vec<Enrollment>, CollaboratorError> {
        self.check("enrollments")?;
        Ok(self.enrollments.get(id).cloned().unwrap_or_default())
    }

    fn grade_history(&self, id: &LearnerId) -> Result<Vec<GradeEntry>, CollaboratorError> {
        self.check("grades")?;
        Ok(self.grades.get(id).cloned().unwrap_or_default())
    }
}

impl SequenceService for FixtureCampus {
    fn suitable_for_gpa(&self, gpa: Option<f64>) -> Result<Vec<CourseSequence>, CollaboratorError> {
        self.check("sequences")?;
        Ok(self
            .sequences
            .iter()
            .filter(|sequence| sequence.suits_gpa(gpa))
            .cloned()
            .collect())
    }
}

impl SubjectAreaService for FixtureCampus {
    fn strongly_related(
        &self,
        subject_area: &SubjectAreaId,
    ) -> Result<Vec<SubjectArea>, CollaboratorError> {
        self.check("subjects")?;
        let related = self.related.get(subject_area).cloned().unwrap_or_default();
        Ok(self
            .areas
            .iter()
            .filter(|area| related.contains(&area.id))
            .cloned()
            .collect())
    }

    fn courses_for(
        &self,
        subject_area: &SubjectAreaId,
    ) -> Result<Vec<CatalogCourse>, CollaboratorError> {
        self.check("subjects")?;
        Ok(self
            .courses
            .iter()
            .filter(|course| {
                course
                    .subject_area
                    .as_ref()
                    .is_some_and(|area| &area.id == subject_area)
            })
            .cloned()
            .collect())
    }

    fn by_code(&self, code: &str) -> Result<Option<SubjectArea>, CollaboratorError> {
        self.check("subjects")?;
        Ok(self.areas.iter().find(|area| area.code == code).cloned())
    }
}

impl GraduationRequirementsService for FixtureCampus {
    fn is_on_track(&self, _learner: &LearnerState) -> Result<bool, CollaboratorError> {
        self.check("graduation")?;
        Ok(self.on_track)
    }

    fn credits_behind(&self, _learner: &LearnerState) -> Result<f64, CollaboratorError> {
        self.check("graduation")?;
        Ok(if self.on_track { 0.0 } else { 2.5 })
    }
}

pub(super) fn engine_for(campus: Arc<FixtureCampus>) -> RecommendationEngine {
    RecommendationEngine::new(Collaborators::from_shared(campus), EngineConfig::default())
}

pub(super) fn build_service() -> (
    CourseRecommendationService<MemoryRepository>,
    Arc<MemoryRepository>,
    Arc<FixtureCampus>,
) {
    build_service_with(FixtureCampus::default())
}

pub(super) fn build_service_with(
    campus: FixtureCampus,
) -> (
    CourseRecommendationService<MemoryRepository>,
    Arc<MemoryRepository>,
    Arc<FixtureCampus>,
) {
    let campus = Arc::new(campus);
    let repository = Arc::new(MemoryRepository::default());
    let service = CourseRecommendationService::new(
        repository.clone(),
        Collaborators::from_shared(campus.clone()),
        EngineConfig::default(),
    );
    (service, repository, campus)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<BTreeMap<RecommendationId, Recommendation>>>,
    issued: Arc<AtomicU64>,
}

impl MemoryRepository {
    pub(super) fn active_count(&self, learner: &str, course: &str) -> usize {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .values()
            .filter(|record| {
                record.active
                    && record.learner_id.as_str() == learner
                    && record.course_id.as_str() == course
            })
            .count()
    }
}

impl RecommendationRepository for MemoryRepository {
    fn next_id(&self) -> Result<RecommendationId, RepositoryError> {
        let id = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(RecommendationId::new(format!("rec-{id:06}")))
    }

    fn has_active(&self, learner: &LearnerId, course: &CourseId) -> Result<bool, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .any(|record| {
                record.active && &record.learner_id == learner && &record.course_id == course
            }))
    }

    fn save_all(
        &self,
        records: Vec<Recommendation>,
    ) -> Result<Vec<Recommendation>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let mut taken: BTreeSet<(LearnerId, CourseId)> = guard
            .values()
            .filter(|record| record.active)
            .map(|record| (record.learner_id.clone(), record.course_id.clone()))
            .collect();
        for record in &records {
            if guard.contains_key(&record.id) {
                return Err(RepositoryError::DuplicateId(record.id.clone()));
            }
            let key = (record.learner_id.clone(), record.course_id.clone());
            if record.active && !taken.insert(key) {
                return Err(RepositoryError::Conflict {
                    learner: record.learner_id.clone(),
                    course: record.course_id.clone(),
                });
            }
        }
        for record in &records {
            guard.insert(record.id.clone(), record.clone());
        }
        Ok(records)
    }

    fn find_active_for(&self, learner: &LearnerId) -> Result<Vec<Recommendation>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.active && &record.learner_id == learner)
            .cloned()
            .collect())
    }

    fn fetch(&self, id: &RecommendationId) -> Result<Option<Recommendation>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, record: Recommendation) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&record.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn all(&self) -> Result<Vec<Recommendation>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
