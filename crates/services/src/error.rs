//! Shared error types for the services crate.

use thiserror::Error;

use codeline_core::model::{AccessDenied, CourseError, CourseId, LectureId, UserError, UserId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `CourseService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServiceError {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LectureService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LectureServiceError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("lecture {0} not found")]
    LectureNotFound(LectureId),
    #[error("lecture {0} is the current lecture of at least one student")]
    LectureInUse(LectureId),
    #[error("access denied: {0}")]
    AccessDenied(#[from] AccessDenied),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AccountService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccountServiceError {
    #[error("no account for username {0}")]
    UnknownUsername(String),
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
