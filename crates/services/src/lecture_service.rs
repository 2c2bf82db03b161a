use std::sync::Arc;

use codeline_core::model::{
    AccessDenied, Course, CourseId, Lecture, LectureDraft, LectureId, ProgressKey, User,
    ensure_unlocked,
};
use storage::repository::{
    CourseRepository, LecturePersistence, LectureRepository, ProgressRepository, StorageError,
};

use crate::error::LectureServiceError;
use crate::lecture_view::{LectureDetail, LectureSummary};

/// Manages the course → lecture → section aggregate and gates lecture reads
/// on a user's progress through the course.
#[derive(Clone)]
pub struct LectureService {
    courses: Arc<dyn CourseRepository>,
    lectures: Arc<dyn LectureRepository>,
    writes: Arc<dyn LecturePersistence>,
    progress: Arc<dyn ProgressRepository>,
}

impl LectureService {
    #[must_use]
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        lectures: Arc<dyn LectureRepository>,
        writes: Arc<dyn LecturePersistence>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            courses,
            lectures,
            writes,
            progress,
        }
    }

    /// Add a lecture with its sections to the end of a course.
    ///
    /// The lecture, its sections and the course's new lecture count are
    /// written together or not at all.
    ///
    /// # Errors
    ///
    /// Returns `LectureServiceError::CourseNotFound` if the course does not exist.
    /// Returns `LectureServiceError::Storage` if persistence fails.
    pub async fn create_lecture(
        &self,
        course_id: CourseId,
        draft: LectureDraft,
    ) -> Result<Lecture, LectureServiceError> {
        self.require_course(course_id).await?;
        let (course, lecture) = match self.writes.create_lecture(course_id, draft).await {
            Ok(written) => written,
            Err(StorageError::NotFound) => {
                return Err(LectureServiceError::CourseNotFound(course_id));
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(
            course_id = %course_id,
            lecture_id = %lecture.id(),
            sections = lecture.section_count(),
            lecture_count = course.lecture_count(),
            "lecture created"
        );
        Ok(lecture)
    }

    /// Summaries of every lecture in a course, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `LectureServiceError::CourseNotFound` if the course does not exist.
    /// Returns `LectureServiceError::Storage` if repository access fails.
    pub async fn get_all_lectures_by_course_id(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<LectureSummary>, LectureServiceError> {
        self.require_course(course_id).await?;
        let lectures = self.lectures.lectures_for_course(course_id).await?;

        tracing::debug!(course_id = %course_id, count = lectures.len(), "listed lectures");
        Ok(lectures.iter().map(LectureSummary::from_lecture).collect())
    }

    /// Fetch a lecture without consulting progress.
    ///
    /// Course and lecture are looked up independently; both must exist.
    ///
    /// # Errors
    ///
    /// Returns `LectureServiceError::CourseNotFound` or
    /// `LectureServiceError::LectureNotFound` for missing records.
    /// Returns `LectureServiceError::Storage` if repository access fails.
    pub async fn get_lecture_without_check(
        &self,
        course_id: CourseId,
        lecture_id: LectureId,
    ) -> Result<LectureDetail, LectureServiceError> {
        self.require_course(course_id).await?;
        let lecture = self.require_lecture(lecture_id).await?;

        tracing::debug!(course_id = %course_id, lecture_id = %lecture_id, "read lecture");
        Ok(LectureDetail::from_lecture(&lecture))
    }

    /// Fetch a lecture if the user has progressed far enough in the course.
    ///
    /// Access is granted when the user's current lecture has a sequence
    /// number at least as large as the requested one.
    ///
    /// # Errors
    ///
    /// Returns `LectureServiceError::CourseNotFound` or
    /// `LectureServiceError::LectureNotFound` for missing records.
    /// Returns `LectureServiceError::AccessDenied` when the user has no
    /// progress in the course, their current lecture no longer exists, or the
    /// lecture is not yet unlocked.
    /// Returns `LectureServiceError::Storage` if repository access fails.
    pub async fn get_lecture_with_check(
        &self,
        user: &User,
        course_id: CourseId,
        lecture_id: LectureId,
    ) -> Result<LectureDetail, LectureServiceError> {
        self.require_course(course_id).await?;
        let lecture = self.require_lecture(lecture_id).await?;

        if let Err(denied) = self.check_access(user, course_id, &lecture).await? {
            tracing::warn!(
                user_id = %user.id(),
                course_id = %course_id,
                lecture_id = %lecture_id,
                reason = %denied,
                "lecture access denied"
            );
            return Err(denied.into());
        }

        tracing::debug!(
            user_id = %user.id(),
            course_id = %course_id,
            lecture_id = %lecture_id,
            "gated lecture read"
        );
        Ok(LectureDetail::from_lecture(&lecture))
    }

    /// Overwrite a lecture's fields and replace all of its sections.
    ///
    /// # Errors
    ///
    /// Returns `LectureServiceError::CourseNotFound` if the course does not exist.
    /// Returns `LectureServiceError::LectureNotFound` if the lecture does not
    /// exist or belongs to another course.
    /// Returns `LectureServiceError::Storage` if persistence fails.
    pub async fn update_lecture(
        &self,
        course_id: CourseId,
        lecture_id: LectureId,
        draft: LectureDraft,
    ) -> Result<LectureDetail, LectureServiceError> {
        let lecture = self.require_member(course_id, lecture_id).await?;

        let updated = match self.writes.replace_lecture(&lecture, draft).await {
            Ok(updated) => updated,
            Err(StorageError::NotFound) => {
                return Err(LectureServiceError::LectureNotFound(lecture_id));
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(
            course_id = %course_id,
            lecture_id = %lecture_id,
            sections = updated.section_count(),
            "lecture updated"
        );
        Ok(LectureDetail::from_lecture(&updated))
    }

    /// Remove a lecture and its sections from a course.
    ///
    /// # Errors
    ///
    /// Returns `LectureServiceError::CourseNotFound` if the course does not exist.
    /// Returns `LectureServiceError::LectureNotFound` if the lecture does not
    /// exist or belongs to another course.
    /// Returns `LectureServiceError::LectureInUse` while a student's progress
    /// points at the lecture.
    /// Returns `LectureServiceError::Storage` if persistence fails.
    pub async fn delete_lecture_by_id(
        &self,
        course_id: CourseId,
        lecture_id: LectureId,
    ) -> Result<(), LectureServiceError> {
        self.require_member(course_id, lecture_id).await?;
        let course = match self.writes.remove_lecture(course_id, lecture_id).await {
            Ok(course) => course,
            Err(StorageError::NotFound) => {
                return Err(LectureServiceError::LectureNotFound(lecture_id));
            }
            Err(StorageError::Conflict) => {
                tracing::warn!(
                    course_id = %course_id,
                    lecture_id = %lecture_id,
                    "lecture delete refused: progress points at it"
                );
                return Err(LectureServiceError::LectureInUse(lecture_id));
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(
            course_id = %course_id,
            lecture_id = %lecture_id,
            lecture_count = course.lecture_count(),
            "lecture deleted"
        );
        Ok(())
    }

    async fn require_course(&self, course_id: CourseId) -> Result<Course, LectureServiceError> {
        self.courses
            .get_course(course_id)
            .await?
            .ok_or(LectureServiceError::CourseNotFound(course_id))
    }

    async fn require_lecture(&self, lecture_id: LectureId) -> Result<Lecture, LectureServiceError> {
        self.lectures
            .get_lecture(lecture_id)
            .await?
            .ok_or(LectureServiceError::LectureNotFound(lecture_id))
    }

    /// Loads a course and a lecture that must be one of its members.
    async fn require_member(
        &self,
        course_id: CourseId,
        lecture_id: LectureId,
    ) -> Result<Lecture, LectureServiceError> {
        let course = self.require_course(course_id).await?;
        let lecture = self.require_lecture(lecture_id).await?;
        if !lecture.belongs_to(course_id) || !course.contains_lecture(lecture_id) {
            return Err(LectureServiceError::LectureNotFound(lecture_id));
        }
        Ok(lecture)
    }

    /// Outer error is a storage failure; inner is the access decision.
    async fn check_access(
        &self,
        user: &User,
        course_id: CourseId,
        lecture: &Lecture,
    ) -> Result<Result<(), AccessDenied>, LectureServiceError> {
        let key = ProgressKey::new(user.id(), course_id);
        let Some(progress) = self.progress.get_progress(key).await? else {
            return Ok(Err(AccessDenied::NoProgress));
        };

        let Some(current) = self.lectures.get_lecture(progress.current_lecture()).await? else {
            return Ok(Err(AccessDenied::CurrentLectureMissing(
                progress.current_lecture(),
            )));
        };

        Ok(ensure_unlocked(current.num_in_seq(), lecture.num_in_seq()))
    }
}
