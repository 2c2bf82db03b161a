use std::sync::Arc;

use codeline_core::model::{Credential, Role, User, UserId, normalize_email};
use storage::repository::{
    CredentialRepository, NewCredentialRecord, NewUserRecord, UserRepository,
};

use crate::error::AccountServiceError;

/// Registers accounts and resolves them for the identity layer.
///
/// Passwords arrive already hashed; this service never sees plaintext.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    credentials: Arc<dyn CredentialRepository>,
}

impl AccountService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, credentials: Arc<dyn CredentialRepository>) -> Self {
        Self { users, credentials }
    }

    /// Create a user and its credential.
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError::User` if the email is invalid.
    /// Returns `AccountServiceError::Storage` if persistence fails, including
    /// `StorageError::Conflict` when the email is already registered.
    pub async fn register_account(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        password_hash: String,
        role: Role,
    ) -> Result<Credential, AccountServiceError> {
        let draft = User::new(UserId::new(0), email, first_name, last_name)?;
        let user_id = self
            .users
            .insert_new_user(NewUserRecord::from_user(&draft))
            .await?;
        let user = User::new(user_id, draft.email(), draft.first_name(), draft.last_name())?;

        let credential_id = self
            .credentials
            .insert_new_credential(NewCredentialRecord {
                email: user.email().to_owned(),
                password_hash: password_hash.clone(),
                role,
            })
            .await?;

        tracing::info!(user_id = %user_id, role = %role, "account registered");
        Ok(Credential::new(credential_id, user, password_hash, role))
    }

    /// Resolve a credential by username (the account's email).
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError::UnknownUsername` if no account matches.
    /// Returns `AccountServiceError::Storage` if repository access fails.
    pub async fn load_by_username(&self, username: &str) -> Result<Credential, AccountServiceError> {
        let Ok(email) = normalize_email(username) else {
            return Err(AccountServiceError::UnknownUsername(username.to_owned()));
        };
        self.credentials
            .find_by_username(&email)
            .await?
            .ok_or_else(|| AccountServiceError::UnknownUsername(username.to_owned()))
    }

    /// Fetch a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AccountServiceError::UserNotFound` if the user does not exist.
    /// Returns `AccountServiceError::Storage` if repository access fails.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AccountServiceError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or(AccountServiceError::UserNotFound(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use codeline_core::model::{Principal, UserError};
    use storage::repository::{Storage, StorageError};

    fn service() -> AccountService {
        let storage = Storage::in_memory();
        AccountService::new(
            Arc::clone(&storage.users),
            Arc::clone(&storage.credentials),
        )
    }

    #[tokio::test]
    async fn registered_account_loads_by_any_casing_of_email() {
        let service = service();
        let created = service
            .register_account("Ada@Example.com", "Ada", "Lovelace", "h1".into(), Role::Admin)
            .await
            .unwrap();
        assert_eq!(created.username(), "ada@example.com");

        let loaded = service.load_by_username(" ADA@example.com").await.unwrap();
        assert_eq!(loaded, created);
        let names: Vec<_> = loaded.authorities().iter().map(|a| a.name()).collect();
        assert_eq!(names, ["ADMIN"]);
        assert!(loaded.is_enabled());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let service = service();
        service
            .register_account("ada@example.com", "Ada", "L", "h".into(), Role::Student)
            .await
            .unwrap();
        let err = service
            .register_account("ADA@example.com", "Ada", "L", "h".into(), Role::Student)
            .await
            .unwrap_err();
        assert_matches!(err, AccountServiceError::Storage(StorageError::Conflict));
    }

    #[tokio::test]
    async fn invalid_email_is_rejected_before_storage() {
        let err = service()
            .register_account("nobody", "N", "B", "h".into(), Role::Student)
            .await
            .unwrap_err();
        assert_matches!(err, AccountServiceError::User(UserError::InvalidEmail(_)));
    }

    #[tokio::test]
    async fn unknown_lookups_are_typed() {
        let service = service();
        assert_matches!(
            service.load_by_username("ghost@example.com").await.unwrap_err(),
            AccountServiceError::UnknownUsername(name) if name == "ghost@example.com"
        );
        assert_matches!(
            service.load_by_username("").await.unwrap_err(),
            AccountServiceError::UnknownUsername(_)
        );
        assert_matches!(
            service.get_user(UserId::new(77)).await.unwrap_err(),
            AccountServiceError::UserNotFound(id) if id == UserId::new(77)
        );
    }
}
