use serde::Serialize;
use thiserror::Error;

use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("email cannot be empty")]
    EmptyEmail,

    #[error("email must contain '@': {0}")]
    InvalidEmail(String),
}

/// An authenticated person as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    id: UserId,
    email: String,
    first_name: String,
    last_name: String,
}

impl User {
    /// Creates a user, normalising the email to trimmed lowercase.
    ///
    /// # Errors
    ///
    /// Returns `UserError` if the email is blank or has no `@`.
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Result<Self, UserError> {
        let email = normalize_email(&email.into())?;
        Ok(Self {
            id,
            email,
            first_name: first_name.into().trim().to_owned(),
            last_name: last_name.into().trim().to_owned(),
        })
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }
}

/// Trims and lowercases an email address.
///
/// # Errors
///
/// Returns `UserError` if the email is blank or has no `@`.
pub fn normalize_email(raw: &str) -> Result<String, UserError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(UserError::EmptyEmail);
    }
    if !email.contains('@') {
        return Err(UserError::InvalidEmail(email.to_owned()));
    }
    Ok(email.to_lowercase())
}
