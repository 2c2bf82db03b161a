use codeline_core::model::{Progress, ProgressKey};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, lecture_id_from_i64, ser};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(&self, key: ProgressKey) -> Result<Option<Progress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT lecture_id FROM progress
            WHERE user_id = ?1 AND course_id = ?2
            ",
        )
        .bind(id_to_i64("user_id", key.user_id.value())?)
        .bind(id_to_i64("course_id", key.course_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let lecture = lecture_id_from_i64(row.try_get::<i64, _>("lecture_id").map_err(ser)?)?;
        Ok(Some(Progress::new(key, lecture)))
    }

    async fn upsert_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress (user_id, course_id, lecture_id)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, course_id) DO UPDATE SET lecture_id = excluded.lecture_id
            ",
        )
        .bind(id_to_i64("user_id", progress.user_id().value())?)
        .bind(id_to_i64("course_id", progress.course_id().value())?)
        .bind(id_to_i64("lecture_id", progress.current_lecture().value())?)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}
