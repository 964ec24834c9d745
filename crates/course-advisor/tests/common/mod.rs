#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use course_advisor::recommendations::{
    CatalogCourse, CollaboratorError, Collaborators, CourseCatalog, CourseId, CourseKind,
    CourseRecommendationService, CourseSequence, EngineConfig, Enrollment, EnrollmentStatus,
    GradeEntry, GraduationRequirementsService, LearnerDirectory, LearnerId, LearnerRecord,
    LearnerState, Recommendation, RecommendationId, RecommendationRepository, RepositoryError,
    SequenceId, SequenceService, SequenceStep, SubjectArea, SubjectAreaId, SubjectAreaService,
};

pub const COURSE_IDS: [&str; 8] = ["alg1", "geo", "alg2", "bio", "chem", "eng9", "eng10", "hist"];

pub fn area(code: &str, name: &str) -> SubjectArea {
    SubjectArea {
        id: SubjectAreaId::new(code.to_ascii_lowercase()),
        code: code.to_string(),
        name: name.to_string(),
    }
}

fn course(
    id: &str,
    name: &str,
    subject: &SubjectArea,
    kind: CourseKind,
    prerequisites: &[&str],
) -> CatalogCourse {
    CatalogCourse {
        id: CourseId::new(id),
        code: id.to_ascii_uppercase(),
        name: name.to_string(),
        subject_area: Some(subject.clone()),
        kind: Some(kind),
        min_gpa_required: None,
        prerequisites: prerequisites.iter().map(|id| CourseId::new(*id)).collect(),
    }
}

/// Small high-school catalog shared by the integration suites.
pub struct Campus {
    pub courses: Vec<CatalogCourse>,
    pub areas: Vec<SubjectArea>,
    pub sequences: Vec<CourseSequence>,
    pub learners: BTreeMap<LearnerId, LearnerRecord>,
    pub enrollments: BTreeMap<LearnerId, Vec<Enrollment>>,
    pub grades: BTreeMap<LearnerId, Vec<GradeEntry>>,
}

impl Campus {
    pub fn standard() -> Self {
        let math = area("MATH", "Mathematics");
        let science = area("SCI", "Science");
        let english = area("ENG", "English");
        let social = area("SS", "Social Studies");

        let courses = vec![
            course("alg1", "Algebra I", &math, CourseKind::Regular, &[]),
            course("geo", "Geometry", &math, CourseKind::Regular, &["alg1"]),
            course("alg2", "Algebra II", &math, CourseKind::Honors, &["geo"]),
            course("bio", "Biology", &science, CourseKind::Regular, &[]),
            course("chem", "Chemistry", &science, CourseKind::Ap, &["bio", "alg1"]),
            course("eng9", "English 9", &english, CourseKind::Regular, &[]),
            course("eng10", "English 10", &english, CourseKind::Regular, &["eng9"]),
            course("hist", "World History", &social, CourseKind::Regular, &[]),
        ];
        let sequences = vec![CourseSequence {
            id: SequenceId::new("math-pathway"),
            name: "Mathematics".to_string(),
            subject_area: Some(math.id.clone()),
            min_gpa_recommended: Some(3.0),
            steps: ["alg1", "geo", "alg2"]
                .iter()
                .zip(1u16..)
                .map(|(id, order)| SequenceStep {
                    course_id: CourseId::new(*id),
                    order,
                    required: true,
                    alternatives: Vec::new(),
                })
                .collect(),
        }];

        Self {
            courses,
            areas: vec![math, science, english, social],
            sequences,
            learners: BTreeMap::new(),
            enrollments: BTreeMap::new(),
            grades: BTreeMap::new(),
        }
    }

    pub fn with_learner(
        mut self,
        id: &str,
        gpa: Option<f64>,
        completed: &[(&str, &str)],
    ) -> Self {
        let learner = LearnerId::new(id);
        self.learners.insert(
            learner.clone(),
            LearnerRecord {
                id: learner.clone(),
                grade_level: Some("10th".to_string()),
                current_gpa: gpa,
            },
        );
        let graded_on = NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date");
        for (course_id, letter) in completed {
            self.enrollments
                .entry(learner.clone())
                .or_default()
                .push(Enrollment {
                    course_id: CourseId::new(*course_id),
                    status: EnrollmentStatus::Completed,
                });
            self.grades.entry(learner.clone()).or_default().push(GradeEntry {
                course_id: CourseId::new(*course_id),
                letter_grade: letter.to_string(),
                graded_on,
            });
        }
        self
    }
}

impl CourseCatalog for Campus {
    fn active_courses(&self) -> Result<Vec<CatalogCourse>, CollaboratorError> {
        Ok(self.courses.clone())
    }

    fn course(&self, id: &CourseId) -> Result<Option<CatalogCourse>, CollaboratorError> {
        Ok(self.courses.iter().find(|course| &course.id == id).cloned())
    }
}

impl LearnerDirectory for Campus {
    fn learner(&self, id: &LearnerId) -> Result<Option<LearnerRecord>, CollaboratorError> {
        Ok(self.learners.get(id).cloned())
    }

    fn enrollments(&self, id: &LearnerId) -> Result<Vec<Enrollment>, CollaboratorError> {
        Ok(self.enrollments.get(id).cloned().unwrap_or_default())
    }

    fn grade_history(&self, id: &LearnerId) -> Result<Vec<GradeEntry>, CollaboratorError> {
        Ok(self.grades.get(id).cloned().unwrap_or_default())
    }
}

impl SequenceService for Campus {
    fn suitable_for_gpa(&self, gpa: Option<f64>) -> Result<Vec<CourseSequence>, CollaboratorError> {
        Ok(self
            .sequences
            .iter()
            .filter(|sequence| sequence.suits_gpa(gpa))
            .cloned()
            .collect())
    }
}

impl SubjectAreaService for Campus {
    fn strongly_related(
        &self,
        subject_area: &SubjectAreaId,
    ) -> Result<Vec<SubjectArea>, CollaboratorError> {
        // Math and science feed each other; nothing else is related.
        let related = match subject_area.as_str() {
            "math" => "sci",
            "sci" => "math",
            _ => return Ok(Vec::new()),
        };
        Ok(self
            .areas
            .iter()
            .filter(|area| area.id.as_str() == related)
            .cloned()
            .collect())
    }

    fn courses_for(
        &self,
        subject_area: &SubjectAreaId,
    ) -> Result<Vec<CatalogCourse>, CollaboratorError> {
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
        Ok(self.areas.iter().find(|area| area.code == code).cloned())
    }
}

impl GraduationRequirementsService for Campus {
    fn is_on_track(&self, _learner: &LearnerState) -> Result<bool, CollaboratorError> {
        Err(CollaboratorError::Unavailable {
            service: "graduation",
            reason: "audit not configured".to_string(),
        })
    }

    fn credits_behind(&self, _learner: &LearnerState) -> Result<f64, CollaboratorError> {
        Ok(0.0)
    }
}

/// Store enforcing one active row per (learner, course).
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Recommendation>>,
    issued: AtomicU64,
}

impl MemoryStore {
    pub fn active_pairs(&self) -> Vec<(LearnerId, CourseId)> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .filter(|record| record.active)
            .map(|record| (record.learner_id.clone(), record.course_id.clone()))
            .collect()
    }
}

impl RecommendationRepository for MemoryStore {
    fn next_id(&self) -> Result<RecommendationId, RepositoryError> {
        let id = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(RecommendationId::new(format!("rec-{id:06}")))
    }

    fn has_active(&self, learner: &LearnerId, course: &CourseId) -> Result<bool, RepositoryError> {
        Ok(self
            .active_pairs()
            .iter()
            .any(|(l, c)| l == learner && c == course))
    }

    fn save_all(
        &self,
        records: Vec<Recommendation>,
    ) -> Result<Vec<Recommendation>, RepositoryError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let mut taken: BTreeSet<(LearnerId, CourseId)> = guard
            .iter()
            .filter(|record| record.active)
            .map(|record| (record.learner_id.clone(), record.course_id.clone()))
            .collect();
        for record in &records {
            if guard.iter().any(|stored| stored.id == record.id) {
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
        guard.extend(records.iter().cloned());
        Ok(records)
    }

    fn find_active_for(&self, learner: &LearnerId) -> Result<Vec<Recommendation>, RepositoryError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| record.active && &record.learner_id == learner)
            .cloned()
            .collect())
    }

    fn fetch(&self, id: &RecommendationId) -> Result<Option<Recommendation>, RepositoryError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.iter().find(|record| &record.id == id).cloned())
    }

    fn update(&self, record: Recommendation) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let slot = guard
            .iter_mut()
            .find(|existing| existing.id == record.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = record;
        Ok(())
    }

    fn all(&self) -> Result<Vec<Recommendation>, RepositoryError> {
        Ok(self.records.lock().expect("store mutex poisoned").clone())
    }
}

pub fn service_for(
    campus: Campus,
) -> (CourseRecommendationService<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let service = CourseRecommendationService::new(
        store.clone(),
        Collaborators::from_shared(Arc::new(campus)),
        EngineConfig::default(),
    );
    (service, store)
}
