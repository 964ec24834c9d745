use chrono::{Datelike, NaiveDate};
use course_advisor::error::AppError;
use course_advisor::recommendations::{
    CatalogCourse, CollaboratorError, CourseCatalog, CourseId, CourseKind, CourseSequence,
    Enrollment, GradeEntry, GraduationRequirementsService, LearnerDirectory, LearnerId,
    LearnerRecord, LearnerState, Recommendation, RecommendationId, RecommendationRepository,
    RepositoryError, SequenceService, SubjectArea, SubjectAreaId, SubjectAreaService,
};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Serialized school data the CLI runs against.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CatalogSnapshot {
    pub(crate) subject_areas: Vec<SubjectArea>,
    #[serde(default)]
    pub(crate) related_subjects: BTreeMap<String, Vec<String>>,
    pub(crate) courses: Vec<SnapshotCourse>,
    #[serde(default)]
    pub(crate) sequences: Vec<CourseSequence>,
    #[serde(default)]
    pub(crate) learners: Vec<SnapshotLearner>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SnapshotCourse {
    pub(crate) id: CourseId,
    pub(crate) code: String,
    pub(crate) name: String,
    /// Subject area code, e.g. `MATH`.
    #[serde(default)]
    pub(crate) subject: Option<String>,
    #[serde(default)]
    pub(crate) kind: Option<CourseKind>,
    #[serde(default)]
    pub(crate) min_gpa_required: Option<f64>,
    #[serde(default)]
    pub(crate) prerequisites: BTreeSet<CourseId>,
    #[serde(default = "default_active")]
    pub(crate) active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SnapshotLearner {
    pub(crate) id: LearnerId,
    #[serde(default)]
    pub(crate) grade_level: Option<String>,
    #[serde(default)]
    pub(crate) current_gpa: Option<f64>,
    #[serde(default)]
    pub(crate) enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub(crate) grades: Vec<GradeEntry>,
    /// Missing when no graduation audit has been run for the learner.
    #[serde(default)]
    pub(crate) credits_behind: Option<f64>,
}

impl CatalogSnapshot {
    pub(crate) fn from_json(raw: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub(crate) fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub(crate) fn learner_ids(&self) -> Vec<LearnerId> {
        self.learners.iter().map(|learner| learner.id.clone()).collect()
    }
}

/// Read-only collaborator backed by a loaded [`CatalogSnapshot`].
pub(crate) struct SnapshotCatalog {
    courses: Vec<(CatalogCourse, bool)>,
    areas: Vec<SubjectArea>,
    related: BTreeMap<SubjectAreaId, Vec<SubjectAreaId>>,
    sequences: Vec<CourseSequence>,
    learners: BTreeMap<LearnerId, SnapshotLearner>,
}

impl SnapshotCatalog {
    pub(crate) fn new(snapshot: CatalogSnapshot) -> Self {
        let by_code: BTreeMap<String, SubjectArea> = snapshot
            .subject_areas
            .iter()
            .map(|area| (area.code.clone(), area.clone()))
            .collect();

        let courses = snapshot
            .courses
            .into_iter()
            .map(|course| {
                let subject_area = course.subject.as_ref().and_then(|code| {
                    let area = by_code.get(code).cloned();
                    if area.is_none() {
                        warn!(
                            course = %course.code,
                            subject = %code,
                            "course references unknown subject area"
                        );
                    }
                    area
                });
                let resolved = CatalogCourse {
                    id: course.id,
                    code: course.code,
                    name: course.name,
                    subject_area,
                    kind: course.kind,
                    min_gpa_required: course.min_gpa_required,
                    prerequisites: course.prerequisites,
                };
                (resolved, course.active)
            })
            .collect();

        let related = snapshot
            .related_subjects
            .iter()
            .filter_map(|(code, related_codes)| {
                let area = by_code.get(code)?;
                let related_ids = related_codes
                    .iter()
                    .filter_map(|related| by_code.get(related).map(|area| area.id.clone()))
                    .collect();
                Some((area.id.clone(), related_ids))
            })
            .collect();

        let learners = snapshot
            .learners
            .into_iter()
            .map(|learner| (learner.id.clone(), learner))
            .collect();

        Self {
            courses,
            areas: snapshot.subject_areas,
            related,
            sequences: snapshot.sequences,
            learners,
        }
    }

    fn snapshot_learner(&self, learner: &LearnerId) -> Result<&SnapshotLearner, CollaboratorError> {
        self.learners
            .get(learner)
            .ok_or_else(|| CollaboratorError::NotFound(format!("learner {learner}")))
    }
}

impl CourseCatalog for SnapshotCatalog {
    fn active_courses(&self) -> Result<Vec<CatalogCourse>, CollaboratorError> {
        Ok(self
            .courses
            .iter()
            .filter(|(_, active)| *active)
            .map(|(course, _)| course.clone())
            .collect())
    }

    fn course(&self, id: &CourseId) -> Result<Option<CatalogCourse>, CollaboratorError> {
        Ok(self
            .courses
            .iter()
            .find(|(course, _)| &course.id == id)
            .map(|(course, _)| course.clone()))
    }
}

impl LearnerDirectory for SnapshotCatalog {
    fn learner(&self, id: &LearnerId) -> Result<Option<LearnerRecord>, CollaboratorError> {
        Ok(self.learners.get(id).map(|learner| LearnerRecord {
            id: learner.id.clone(),
            grade_level: learner.grade_level.clone(),
            current_gpa: learner.current_gpa,
        }))
    }

    fn enrollments(&self, id: &LearnerId) -> Result<Vec<Enrollment>, CollaboratorError> {
        Ok(self.snapshot_learner(id)?.enrollments.clone())
    }

    fn grade_history(&self, id: &LearnerId) -> Result<Vec<GradeEntry>, CollaboratorError> {
        Ok(self.snapshot_learner(id)?.grades.clone())
    }
}

impl SequenceService for SnapshotCatalog {
    fn suitable_for_gpa(&self, gpa: Option<f64>) -> Result<Vec<CourseSequence>, CollaboratorError> {
        Ok(self
            .sequences
            .iter()
            .filter(|sequence| sequence.suits_gpa(gpa))
            .cloned()
            .collect())
    }
}

impl SubjectAreaService for SnapshotCatalog {
    fn strongly_related(
        &self,
        subject_area: &SubjectAreaId,
    ) -> Result<Vec<SubjectArea>, CollaboratorError> {
        let Some(related) = self.related.get(subject_area) else {
            return Ok(Vec::new());
        };
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
        Ok(self
            .courses
            .iter()
            .filter(|(course, active)| {
                *active
                    && course
                        .subject_area
                        .as_ref()
                        .is_some_and(|area| &area.id == subject_area)
            })
            .map(|(course, _)| course.clone())
            .collect())
    }

    fn by_code(&self, code: &str) -> Result<Option<SubjectArea>, CollaboratorError> {
        Ok(self.areas.iter().find(|area| area.code == code).cloned())
    }
}

impl GraduationRequirementsService for SnapshotCatalog {
    fn is_on_track(&self, learner: &LearnerState) -> Result<bool, CollaboratorError> {
        Ok(self.credits_behind(learner)? <= 0.0)
    }

    fn credits_behind(&self, learner: &LearnerState) -> Result<f64, CollaboratorError> {
        self.snapshot_learner(&learner.learner_id)?
            .credits_behind
            .ok_or_else(|| CollaboratorError::Unavailable {
                service: "graduation audit",
                reason: format!("no audit on file for {}", learner.learner_id),
            })
    }
}

/// Process-local store. Writes are checked against the active (learner, course) index
/// under one lock, so concurrent batch runs cannot double-insert a pair.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRecommendationRepository {
    records: Arc<Mutex<BTreeMap<RecommendationId, Recommendation>>>,
    issued: Arc<AtomicU64>,
}

fn active_key(record: &Recommendation) -> Option<(LearnerId, CourseId)> {
    record
        .active
        .then(|| (record.learner_id.clone(), record.course_id.clone()))
}

impl RecommendationRepository for InMemoryRecommendationRepository {
    fn next_id(&self) -> Result<RecommendationId, RepositoryError> {
        let id = self.issued.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(RecommendationId::new(format!("rec-{id:06}")))
    }

    fn has_active(&self, learner: &LearnerId, course: &CourseId) -> Result<bool, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().any(|record| {
            record.active && &record.learner_id == learner && &record.course_id == course
        }))
    }

    fn save_all(
        &self,
        records: Vec<Recommendation>,
    ) -> Result<Vec<Recommendation>, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let mut taken: BTreeSet<(LearnerId, CourseId)> =
            guard.values().filter_map(active_key).collect();
        for record in &records {
            if guard.contains_key(&record.id) {
                return Err(RepositoryError::DuplicateId(record.id.clone()));
            }
            if let Some(key) = active_key(record) {
                if !taken.insert(key) {
                    return Err(RepositoryError::Conflict {
                        learner: record.learner_id.clone(),
                        course: record.course_id.clone(),
                    });
                }
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
        if let Some(key) = active_key(&record) {
            let clash = guard
                .values()
                .any(|other| other.id != record.id && active_key(other).as_ref() == Some(&key));
            if clash {
                return Err(RepositoryError::Conflict {
                    learner: key.0,
                    course: key.1,
                });
            }
        }
        guard.insert(record.id.clone(), record);
        Ok(())
    }

    fn all(&self) -> Result<Vec<Recommendation>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

/// Academic term label for a date: July onward is the fall term.
pub(crate) fn term_for(date: NaiveDate) -> String {
    if date.month() >= 7 {
        format!("{}-FALL", date.year())
    } else {
        format!("{}-SPRING", date.year())
    }
}
