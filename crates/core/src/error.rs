use thiserror::Error;

use crate::model::{AccessDenied, CourseError, RoleParseError, UserError};

/// Any domain-level failure raised by this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Role(#[from] RoleParseError),
    #[error(transparent)]
    Access(#[from] AccessDenied),
}
