use codeline_core::model::{Credential, CredentialId, User, UserId, normalize_email};
use sqlx::{Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{
    credential_id_from_i64, db_err, finish, id_to_i64, map_credential_row, map_user_row, ser,
    user_id_from_i64,
};
use crate::repository::{
    CredentialRepository, NewCredentialRecord, NewUserRecord, StorageError, UserRepository,
};

async fn insert_credential_row(
    tx: &mut Transaction<'_, Sqlite>,
    credential: &NewCredentialRecord,
) -> Result<CredentialId, StorageError> {
    let Ok(email) = normalize_email(&credential.email) else {
        return Err(StorageError::NotFound);
    };
    let user = sqlx::query("SELECT id FROM users WHERE email = ?1")
        .bind(&email)
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_err)?;
    if user.is_none() {
        return Err(StorageError::NotFound);
    }

    let res = sqlx::query(
        r"
        INSERT INTO credentials (email, password, role)
        VALUES (?1, ?2, ?3)
        ",
    )
    .bind(&email)
    .bind(&credential.password_hash)
    .bind(credential.role.as_str())
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    credential_id_from_i64(res.last_insert_rowid())
}

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_new_user(&self, user: NewUserRecord) -> Result<UserId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO users (email, first_name, last_name)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(normalize_email(&user.email).map_err(ser)?)
        .bind(user.first_name)
        .bind(user.last_name)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        user_id_from_i64(res.last_insert_rowid())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id AS user_id, email, first_name, last_name
            FROM users WHERE id = ?1
            ",
        )
        .bind(id_to_i64("user_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_user_row).transpose()
    }
}

#[async_trait::async_trait]
impl CredentialRepository for SqliteRepository {
    async fn insert_new_credential(
        &self,
        credential: NewCredentialRecord,
    ) -> Result<CredentialId, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let written = insert_credential_row(&mut tx, &credential).await;
        finish(tx, written).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StorageError> {
        let Ok(username) = normalize_email(username) else {
            return Ok(None);
        };
        let row = sqlx::query(
            r"
            SELECT c.id, c.password, c.role,
                   u.id AS user_id, u.email, u.first_name, u.last_name
            FROM credentials c
            JOIN users u ON u.email = c.email
            WHERE c.email = ?1
            ",
        )
        .bind(&username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.as_ref().map(map_credential_row).transpose()
    }
}
