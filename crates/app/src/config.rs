use std::path::{Path, PathBuf};

use crate::args::ArgsError;

pub(crate) const DB_URL_ENV: &str = "CODELINE_DB_URL";
pub(crate) const DEFAULT_DB_FILE: &str = "codeline.sqlite3";
pub(crate) const DEFAULT_LOG_FILTER: &str = "app=info,services=info,storage=warn";

const MEMORY_URL: &str = "sqlite::memory:";

/// Where the `SQLite` store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DbTarget {
    Memory,
    File(PathBuf),
}

impl DbTarget {
    /// Accepts `sqlite::memory:`, `sqlite://<path>`, `sqlite:<path>` or a bare
    /// path. Relative paths resolve against the working directory and query
    /// parameters are dropped.
    pub(crate) fn parse(raw: &str) -> Result<Self, ArgsError> {
        let invalid = || ArgsError::InvalidDbUrl {
            raw: raw.to_owned(),
        };
        let trimmed = raw.trim();
        if trimmed == MEMORY_URL {
            return Ok(Self::Memory);
        }

        let location = match trimmed.strip_prefix("sqlite:") {
            Some(rest) => rest.strip_prefix("//").unwrap_or(rest),
            None if trimmed.contains("://") => return Err(invalid()),
            None => trimmed,
        };
        let path = location.split('?').next().unwrap_or_default();
        if path.is_empty() {
            return Err(invalid());
        }

        let path = Path::new(path);
        if path.is_absolute() {
            return Ok(Self::File(path.to_path_buf()));
        }
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Ok(Self::File(cwd.join(path)))
    }

    pub(crate) fn url(&self) -> String {
        match self {
            Self::Memory => MEMORY_URL.to_owned(),
            Self::File(path) => format!("sqlite://{}", path.display()),
        }
    }

    /// Creates missing parent directories. The file itself is created when
    /// the pool first connects.
    pub(crate) fn ensure_parent_dir(&self) -> std::io::Result<()> {
        let Self::File(path) = self else {
            return Ok(());
        };
        match path.parent() {
            Some(parent) if !parent.exists() => {
                std::fs::create_dir_all(parent)?;
                tracing::info!(dir = %parent.display(), "created database directory");
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Runtime settings. Environment first, then command-line flags on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AppConfig {
    pub db: DbTarget,
}

impl AppConfig {
    pub(crate) fn from_env() -> Result<Self, ArgsError> {
        Self::from_db_url(std::env::var(DB_URL_ENV).ok())
    }

    pub(crate) fn from_db_url(raw: Option<String>) -> Result<Self, ArgsError> {
        let db = match raw.filter(|value| !value.trim().is_empty()) {
            Some(value) => DbTarget::parse(&value)?,
            None => DbTarget::parse(DEFAULT_DB_FILE)?,
        };
        Ok(Self { db })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_or_missing_env_falls_back_to_default_file() {
        let default = AppConfig::from_db_url(None).unwrap();
        let DbTarget::File(path) = &default.db else {
            panic!("expected a file target");
        };
        assert!(path.is_absolute());
        assert!(path.ends_with(DEFAULT_DB_FILE));
        assert_eq!(AppConfig::from_db_url(Some("  ".into())).unwrap(), default);
    }

    #[test]
    fn url_forms_resolve_to_the_same_target() {
        let expected = DbTarget::File(PathBuf::from("/tmp/a.db"));
        assert_eq!(DbTarget::parse("sqlite:///tmp/a.db").unwrap(), expected);
        assert_eq!(DbTarget::parse("sqlite:/tmp/a.db").unwrap(), expected);
        assert_eq!(DbTarget::parse(" /tmp/a.db ").unwrap(), expected);
        assert_eq!(DbTarget::parse("sqlite:///tmp/a.db?mode=rwc").unwrap(), expected);
        assert_eq!(expected.url(), "sqlite:///tmp/a.db");

        assert_eq!(DbTarget::parse("sqlite::memory:").unwrap(), DbTarget::Memory);
        assert_eq!(DbTarget::Memory.url(), "sqlite::memory:");
    }

    #[test]
    fn relative_paths_resolve_against_working_dir() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            DbTarget::parse("sqlite:data/dev.db").unwrap(),
            DbTarget::File(cwd.join("data/dev.db"))
        );
    }

    #[test]
    fn foreign_or_empty_urls_are_rejected() {
        for raw in ["postgres://localhost/db", "sqlite://", "sqlite:", ""] {
            assert_eq!(
                DbTarget::parse(raw).unwrap_err(),
                ArgsError::InvalidDbUrl { raw: raw.into() }
            );
        }
    }

    #[test]
    fn parent_directories_are_created() {
        let dir = std::env::temp_dir().join(format!("codeline-target-{}", std::process::id()));
        let target = DbTarget::File(dir.join("nested").join("db.sqlite3"));

        target.ensure_parent_dir().unwrap();
        assert!(dir.join("nested").is_dir());
        DbTarget::Memory.ensure_parent_dir().unwrap();

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
