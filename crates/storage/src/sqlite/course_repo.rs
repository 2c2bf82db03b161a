use codeline_core::model::{Course, CourseId, LectureId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::SqliteRepository;
use super::mapping::{
    count_from_i64, course_id_from_i64, db_err, finish, id_to_i64, lecture_id_from_i64, ser,
};
use crate::repository::{CourseRepository, NewCourseRecord, StorageError};

async fn lecture_ids_for_course(
    conn: &mut SqliteConnection,
    course_id: i64,
) -> Result<Vec<LectureId>, StorageError> {
    let rows = sqlx::query("SELECT id FROM lectures WHERE course_id = ?1 ORDER BY id ASC")
        .bind(course_id)
        .fetch_all(&mut *conn)
        .await
        .map_err(db_err)?;

    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
        ids.push(lecture_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?);
    }
    Ok(ids)
}

async fn course_from_row(
    conn: &mut SqliteConnection,
    row: &SqliteRow,
) -> Result<Course, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let lectures = lecture_ids_for_course(conn, id).await?;
    Ok(Course::from_persisted(
        course_id_from_i64(id)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<Option<String>, _>("description")
            .map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
        count_from_i64(
            "num_of_lectures",
            row.try_get::<i64, _>("num_of_lectures").map_err(ser)?,
        )?,
        lectures,
    ))
}

/// Reads a course row and its lecture ids. Callers run this inside a
/// transaction so both come from the same snapshot.
pub(super) async fn load_course(
    conn: &mut SqliteConnection,
    id: CourseId,
) -> Result<Option<Course>, StorageError> {
    let row = sqlx::query(
        r"
        SELECT id, title, description, created_at, num_of_lectures
        FROM courses WHERE id = ?1
        ",
    )
    .bind(id_to_i64("course_id", id.value())?)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;

    match row {
        Some(row) => course_from_row(conn, &row).await.map(Some),
        None => Ok(None),
    }
}

async fn load_courses(
    conn: &mut SqliteConnection,
    limit: u32,
) -> Result<Vec<Course>, StorageError> {
    let rows = sqlx::query(
        r"
        SELECT id, title, description, created_at, num_of_lectures
        FROM courses
        ORDER BY id ASC
        LIMIT ?1
        ",
    )
    .bind(i64::from(limit))
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;

    let mut courses = Vec::with_capacity(rows.len());
    for row in &rows {
        courses.push(course_from_row(conn, row).await?);
    }
    Ok(courses)
}

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn insert_new_course(&self, course: NewCourseRecord) -> Result<CourseId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO courses (title, description, created_at, num_of_lectures)
            VALUES (?1, ?2, ?3, 0)
            ",
        )
        .bind(course.title)
        .bind(course.description)
        .bind(course.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        course_id_from_i64(res.last_insert_rowid())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let read = load_course(&mut tx, id).await;
        finish(tx, read).await
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let read = load_courses(&mut tx, limit).await;
        finish(tx, read).await
    }
}
