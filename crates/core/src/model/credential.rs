use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::model::ids::CredentialId;
use crate::model::user::User;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct RoleParseError(String);

/// The single role carried by a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    /// Stored and granted name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Teacher => "TEACHER",
            Role::Admin => "ADMIN",
        }
    }

    /// The fixed capability set granted by this role.
    #[must_use]
    pub fn authorities(self) -> Vec<Authority> {
        vec![Authority(self.as_str())]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STUDENT" => Ok(Role::Student),
            "TEACHER" => Ok(Role::Teacher),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

/// A granted capability name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Authority(&'static str);

impl Authority {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0
    }
}

/// The shape an authentication layer expects from a stored login.
pub trait Principal {
    fn username(&self) -> &str;

    fn password_hash(&self) -> &str;

    fn authorities(&self) -> Vec<Authority>;

    fn is_account_non_expired(&self) -> bool {
        true
    }

    fn is_account_non_locked(&self) -> bool {
        true
    }

    fn is_credentials_non_expired(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

/// Authentication record for a user: a password hash and one role.
///
/// The credential references its user; users do not know about credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    id: CredentialId,
    user: User,
    password_hash: String,
    role: Role,
}

impl Credential {
    #[must_use]
    pub fn new(id: CredentialId, user: User, password_hash: String, role: Role) -> Self {
        Self {
            id,
            user,
            password_hash,
            role,
        }
    }

    #[must_use]
    pub fn id(&self) -> CredentialId {
        self.id
    }

    #[must_use]
    pub fn user(&self) -> &User {
        &self.user
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }
}

impl Principal for Credential {
    fn username(&self) -> &str {
        self.user.email()
    }

    fn password_hash(&self) -> &str {
        &self.password_hash
    }

    fn authorities(&self) -> Vec<Authority> {
        self.role.authorities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::UserId;

    fn credential(role: Role) -> Credential {
        let user = User::new(UserId::new(4), "grace@example.com", "Grace", "Hopper").unwrap();
        Credential::new(CredentialId::new(1), user, "$argon2id$stub".into(), role)
    }

    #[test]
    fn username_is_user_email() {
        assert_eq!(credential(Role::Student).username(), "grace@example.com");
    }

    #[test]
    fn single_authority_named_after_role() {
        let authorities = credential(Role::Teacher).authorities();
        assert_eq!(authorities.len(), 1);
        assert_eq!(authorities[0].name(), "TEACHER");
    }

    #[test]
    fn account_is_always_usable() {
        let c = credential(Role::Admin);
        assert!(c.is_enabled());
        assert!(c.is_account_non_locked());
        assert!(c.is_account_non_expired());
        assert!(c.is_credentials_non_expired());
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("student".parse::<Role>().unwrap(), Role::Student);
        assert_eq!(" ADMIN ".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }
}
