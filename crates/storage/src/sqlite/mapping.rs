use codeline_core::model::{
    CourseId, Credential, CredentialId, LectureId, Role, Section, SectionId, User, UserId,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Classifies driver errors: constraint violations become `Conflict`,
/// everything else is a connection-level failure.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db)
            if db.is_unique_violation() || db.is_foreign_key_violation() =>
        {
            StorageError::Conflict
        }
        _ => StorageError::Connection(e.to_string()),
    }
}

/// Commits on success; rolls back before handing the error on.
pub(crate) async fn finish<T>(
    tx: Transaction<'_, Sqlite>,
    written: Result<T, StorageError>,
) -> Result<T, StorageError> {
    match written {
        Ok(value) => {
            tx.commit().await.map_err(db_err)?;
            Ok(value)
        }
        Err(err) => {
            tx.rollback().await.map_err(db_err)?;
            Err(err)
        }
    }
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn lecture_id_from_i64(v: i64) -> Result<LectureId, StorageError> {
    Ok(LectureId::new(i64_to_u64("lecture_id", v)?))
}

pub(crate) fn section_id_from_i64(v: i64) -> Result<SectionId, StorageError> {
    Ok(SectionId::new(i64_to_u64("section_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn credential_id_from_i64(v: i64) -> Result<CredentialId, StorageError> {
    Ok(CredentialId::new(i64_to_u64("credential_id", v)?))
}

pub(crate) fn count_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_section_row(row: &SqliteRow) -> Result<Section, StorageError> {
    Ok(Section::from_persisted(
        section_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        lecture_id_from_i64(row.try_get::<i64, _>("lecture_id").map_err(ser)?)?,
        row.try_get::<i32, _>("num_in_seq").map_err(ser)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("content").map_err(ser)?,
    ))
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    User::new(
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        row.try_get::<String, _>("email").map_err(ser)?,
        row.try_get::<String, _>("first_name").map_err(ser)?,
        row.try_get::<String, _>("last_name").map_err(ser)?,
    )
    .map_err(ser)
}

/// Maps a `credentials JOIN users` row; the user's id must be aliased `user_id`.
pub(crate) fn map_credential_row(row: &SqliteRow) -> Result<Credential, StorageError> {
    let role: Role = row
        .try_get::<String, _>("role")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    Ok(Credential::new(
        credential_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        map_user_row(row)?,
        row.try_get::<String, _>("password").map_err(ser)?,
        role,
    ))
}
