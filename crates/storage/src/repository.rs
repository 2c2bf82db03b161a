use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codeline_core::model::{
    Course, CourseId, Credential, CredentialId, Lecture, LectureDraft, LectureId, Progress,
    ProgressKey, Role, Section, User, UserId,
};
use thiserror::Error;

use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Insert shape for a course; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewCourseRecord {
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewCourseRecord {
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            title: course.title().to_owned(),
            description: course.description().map(str::to_owned),
            created_at: course.created_at(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl NewUserRecord {
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            email: user.email().to_owned(),
            first_name: user.first_name().to_owned(),
            last_name: user.last_name().to_owned(),
        }
    }
}

/// Insert shape for a credential, linked to its user by email.
#[derive(Debug, Clone)]
pub struct NewCredentialRecord {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Insert a new course and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn insert_new_course(&self, course: NewCourseRecord) -> Result<CourseId, StorageError>;

    /// Fetch a course with its lecture ids in stored order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures; a missing course is `Ok(None)`.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// List courses ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError>;
}

#[async_trait]
pub trait LectureRepository: Send + Sync {
    /// Fetch a lecture with its sections.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures; a missing lecture is `Ok(None)`.
    async fn get_lecture(&self, id: LectureId) -> Result<Option<Lecture>, StorageError>;

    /// All lectures of a course in insertion order, sections included.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn lectures_for_course(&self, course_id: CourseId) -> Result<Vec<Lecture>, StorageError>;
}

#[async_trait]
pub trait SectionRepository: Send + Sync {
    /// Sections of a lecture in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn sections_for_lecture(&self, lecture_id: LectureId)
    -> Result<Vec<Section>, StorageError>;
}

/// Atomic writes over the course → lecture → section aggregate.
///
/// Each method commits all of its rows or none of them. Lecture counts are
/// adjusted relative to the stored row, so concurrent writers to one course
/// never invalidate each other.
#[async_trait]
pub trait LecturePersistence: Send + Sync {
    /// Insert the lecture and its sections, append it to the course and bump
    /// the course's lecture count. Returns the course as stored after the
    /// write, and the saved lecture.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course does not exist.
    async fn create_lecture(
        &self,
        course_id: CourseId,
        draft: LectureDraft,
    ) -> Result<(Course, Lecture), StorageError>;

    /// Overwrite the lecture's scalar fields and replace all of its sections.
    /// Previous section records are deleted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lecture vanished.
    async fn replace_lecture(
        &self,
        lecture: &Lecture,
        draft: LectureDraft,
    ) -> Result<Lecture, StorageError>;

    /// Delete the lecture and its sections and decrement the course's count.
    /// Returns the course as stored after the write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lecture is not a member of the
    /// course, `StorageError::Conflict` while a progress record points at it.
    async fn remove_lecture(
        &self,
        course_id: CourseId,
        lecture_id: LectureId,
    ) -> Result<Course, StorageError>;
}

#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the progress record for a (user, course) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures; no record is `Ok(None)`.
    async fn get_progress(&self, key: ProgressKey) -> Result<Option<Progress>, StorageError>;

    /// Insert or move a progress pointer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the user, course or lecture does
    /// not exist.
    async fn upsert_progress(&self, progress: &Progress) -> Result<(), StorageError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user and return its id. The email is stored normalized.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the email is taken, compared after
    /// normalization.
    async fn insert_new_user(&self, user: NewUserRecord) -> Result<UserId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on repository failures; a missing user is `Ok(None)`.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;
}

#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Insert a credential for an existing user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no user has the email,
    /// `StorageError::Conflict` if the user already has a credential.
    async fn insert_new_credential(
        &self,
        credential: NewCredentialRecord,
    ) -> Result<CredentialId, StorageError>;

    /// Look up a credential by its username (the user's email).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures; unknown usernames are `Ok(None)`.
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StorageError>;
}

//
// ─── STORAGE BUNDLE ────────────────────────────────────────────────────────────
//

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub lectures: Arc<dyn LectureRepository>,
    pub sections: Arc<dyn SectionRepository>,
    pub lecture_writes: Arc<dyn LecturePersistence>,
    pub progress: Arc<dyn ProgressRepository>,
    pub users: Arc<dyn UserRepository>,
    pub credentials: Arc<dyn CredentialRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Wire every contract to one repository implementing all of them.
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: CourseRepository
            + LectureRepository
            + SectionRepository
            + LecturePersistence
            + ProgressRepository
            + UserRepository
            + CredentialRepository
            + 'static,
    {
        let repo = Arc::new(repo);
        Self {
            courses: repo.clone(),
            lectures: repo.clone(),
            sections: repo.clone(),
            lecture_writes: repo.clone(),
            progress: repo.clone(),
            users: repo.clone(),
            credentials: repo,
        }
    }
}
