use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::collaborators::CourseCatalog;
use super::domain::{
    CompletedCourse, CourseId, Enrollment, EnrollmentStatus, GradeEntry, LearnerRecord,
    LearnerState,
};
use super::grading::{mean_grade_points, LetterGrade};

/// Builds the per-run learner view from stored records.
///
/// Malformed letter grades are dropped from the GPA mean and recorded as unreadable for
/// their course. A stored GPA that is not a finite number is ignored in favor of the mean,
/// and a learner with no readable grades starts at 0.0.
pub fn assemble_learner_state(
    record: &LearnerRecord,
    enrollments: &[Enrollment],
    grade_history: &[GradeEntry],
    catalog: &dyn CourseCatalog,
) -> LearnerState {
    let mut state = LearnerState::new(record.id.clone());
    state.grade_level = record.grade_level.as_deref().and_then(parse_grade_level);

    let mut latest: BTreeMap<CourseId, (NaiveDate, Option<LetterGrade>)> = BTreeMap::new();
    let mut readable = Vec::new();
    for entry in grade_history {
        let parsed = match entry.letter_grade.parse::<LetterGrade>() {
            Ok(grade) => {
                readable.push(grade);
                Some(grade)
            }
            Err(err) => {
                warn!(
                    learner = %record.id,
                    course = %entry.course_id,
                    %err,
                    "skipping malformed grade"
                );
                None
            }
        };

        let newer = latest
            .get(&entry.course_id)
            .map_or(true, |(graded_on, _)| entry.graded_on > *graded_on);
        if newer {
            latest.insert(entry.course_id.clone(), (entry.graded_on, parsed));
        }
    }
    state.recent_grades = latest
        .into_iter()
        .map(|(course_id, (_, grade))| (course_id, grade))
        .collect();

    let stored = match record.current_gpa {
        Some(gpa) if gpa.is_finite() && gpa >= 0.0 => Some(gpa),
        Some(gpa) => {
            warn!(learner = %record.id, gpa, "ignoring malformed stored gpa");
            None
        }
        None => None,
    };
    state.gpa = Some(stored.unwrap_or_else(|| {
        mean_grade_points(readable).unwrap_or_else(|| {
            debug!(learner = %record.id, "no readable grades, starting gpa at 0.0");
            0.0
        })
    }));

    for enrollment in enrollments {
        match enrollment.status {
            EnrollmentStatus::Completed => {
                let subject_area = match catalog.course(&enrollment.course_id) {
                    Ok(Some(course)) => course.subject_area,
                    Ok(None) => None,
                    Err(err) => {
                        warn!(
                            course = %enrollment.course_id,
                            %err,
                            "catalog lookup failed for completed course"
                        );
                        None
                    }
                };
                let grade = state.most_recent_grade(&enrollment.course_id);
                state.completed.insert(
                    enrollment.course_id.clone(),
                    CompletedCourse {
                        course_id: enrollment.course_id.clone(),
                        subject_area,
                        grade,
                    },
                );
            }
            EnrollmentStatus::Active => {
                state
                    .active_enrollments
                    .insert(enrollment.course_id.clone());
            }
            EnrollmentStatus::Dropped => {}
        }
    }

    state
}

/// Accepts "10", "10th", "Grade 11"; anything without digits is unknown.
pub fn parse_grade_level(raw: &str) -> Option<u8> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        if !raw.trim().is_empty() {
            debug!(grade_level = raw, "grade level carries no digits");
        }
        return None;
    }
    match digits.parse::<u8>() {
        Ok(level) => Some(level),
        Err(_) => {
            warn!(grade_level = raw, "could not parse grade level");
            None
        }
    }
}
