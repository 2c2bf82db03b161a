use std::collections::HashMap;

use codeline_core::model::{Course, CourseId, Lecture, LectureDraft, LectureId, Section, SectionId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, Transaction};

use super::SqliteRepository;
use super::course_repo::load_course;
use super::mapping::{
    course_id_from_i64, db_err, finish, id_to_i64, lecture_id_from_i64, map_section_row,
    section_id_from_i64, ser,
};
use crate::repository::{LecturePersistence, LectureRepository, SectionRepository, StorageError};

fn lecture_from_row(row: &SqliteRow, sections: Vec<Section>) -> Result<Lecture, StorageError> {
    Ok(Lecture::from_persisted(
        lecture_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        row.try_get::<i32, _>("num_in_seq").map_err(ser)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("description").map_err(ser)?,
        sections,
    ))
}

async fn insert_sections(
    tx: &mut Transaction<'_, Sqlite>,
    lecture_id: i64,
    draft: &LectureDraft,
) -> Result<Vec<SectionId>, StorageError> {
    let mut ids = Vec::with_capacity(draft.sections.len());
    for section in &draft.sections {
        let res = sqlx::query(
            r"
            INSERT INTO sections (lecture_id, num_in_seq, title, content)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(lecture_id)
        .bind(section.num_in_seq)
        .bind(&section.title)
        .bind(&section.content)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
        ids.push(section_id_from_i64(res.last_insert_rowid())?);
    }
    Ok(ids)
}

/// Moves the stored lecture count by `delta`.
async fn adjust_lecture_count(
    tx: &mut Transaction<'_, Sqlite>,
    course_id: i64,
    delta: i64,
) -> Result<(), StorageError> {
    let res = sqlx::query(
        r"
        UPDATE courses SET num_of_lectures = num_of_lectures + ?2
        WHERE id = ?1
        ",
    )
    .bind(course_id)
    .bind(delta)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    if res.rows_affected() == 0 {
        return Err(StorageError::NotFound);
    }
    Ok(())
}

/// Course as this transaction sees it after its own writes.
async fn reload_course(
    tx: &mut Transaction<'_, Sqlite>,
    course_id: CourseId,
) -> Result<Course, StorageError> {
    load_course(&mut **tx, course_id).await?.ok_or(StorageError::NotFound)
}

async fn insert_lecture_rows(
    tx: &mut Transaction<'_, Sqlite>,
    course_id: CourseId,
    draft: &LectureDraft,
) -> Result<(Course, LectureId, Vec<SectionId>), StorageError> {
    let course = id_to_i64("course_id", course_id.value())?;
    // Count first: the write lock is taken before anything is read.
    adjust_lecture_count(tx, course, 1).await?;

    let res = sqlx::query(
        r"
        INSERT INTO lectures (course_id, num_in_seq, title, description)
        VALUES (?1, ?2, ?3, ?4)
        ",
    )
    .bind(course)
    .bind(draft.num_in_seq)
    .bind(&draft.title)
    .bind(&draft.description)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    let row_id = res.last_insert_rowid();
    let lecture_id = lecture_id_from_i64(row_id)?;

    let section_ids = insert_sections(tx, row_id, draft).await?;
    let updated = reload_course(tx, course_id).await?;
    Ok((updated, lecture_id, section_ids))
}

async fn replace_lecture_rows(
    tx: &mut Transaction<'_, Sqlite>,
    lecture_id: LectureId,
    draft: &LectureDraft,
) -> Result<(CourseId, Vec<SectionId>), StorageError> {
    let lecture_id = id_to_i64("lecture_id", lecture_id.value())?;
    let row = sqlx::query(
        r"
        UPDATE lectures SET num_in_seq = ?2, title = ?3, description = ?4
        WHERE id = ?1
        RETURNING course_id
        ",
    )
    .bind(lecture_id)
    .bind(draft.num_in_seq)
    .bind(&draft.title)
    .bind(&draft.description)
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_err)?
    .ok_or(StorageError::NotFound)?;
    let course_id = course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?;

    sqlx::query("DELETE FROM sections WHERE lecture_id = ?1")
        .bind(lecture_id)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

    let section_ids = insert_sections(tx, lecture_id, draft).await?;
    Ok((course_id, section_ids))
}

async fn delete_lecture_rows(
    tx: &mut Transaction<'_, Sqlite>,
    course_id: CourseId,
    lecture_id: LectureId,
) -> Result<Course, StorageError> {
    let course = id_to_i64("course_id", course_id.value())?;
    let lecture = id_to_i64("lecture_id", lecture_id.value())?;

    sqlx::query("DELETE FROM sections WHERE lecture_id = ?1")
        .bind(lecture)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

    // Progress rows reference the lecture without cascade; a pointed-at
    // lecture fails here with a foreign key violation.
    let res = sqlx::query("DELETE FROM lectures WHERE id = ?1 AND course_id = ?2")
        .bind(lecture)
        .bind(course)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    if res.rows_affected() == 0 {
        return Err(StorageError::NotFound);
    }

    adjust_lecture_count(tx, course, -1).await?;
    reload_course(tx, course_id).await
}

/// Lectures with their sections, read from one snapshot.
async fn load_lectures_for_course(
    conn: &mut SqliteConnection,
    course_id: CourseId,
) -> Result<Vec<Lecture>, StorageError> {
    let course = id_to_i64("course_id", course_id.value())?;

    let section_rows = sqlx::query(
        r"
        SELECT s.id, s.lecture_id, s.num_in_seq, s.title, s.content
        FROM sections s
        JOIN lectures l ON l.id = s.lecture_id
        WHERE l.course_id = ?1
        ORDER BY s.id ASC
        ",
    )
    .bind(course)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;

    let mut by_lecture: HashMap<LectureId, Vec<Section>> = HashMap::new();
    for row in &section_rows {
        let section = map_section_row(row)?;
        by_lecture
            .entry(section.lecture_id())
            .or_default()
            .push(section);
    }

    let rows = sqlx::query(
        r"
        SELECT id, course_id, num_in_seq, title, description
        FROM lectures
        WHERE course_id = ?1
        ORDER BY id ASC
        ",
    )
    .bind(course)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;

    let mut lectures = Vec::with_capacity(rows.len());
    for row in &rows {
        let id = lecture_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
        let sections = by_lecture.remove(&id).unwrap_or_default();
        lectures.push(lecture_from_row(row, sections)?);
    }
    Ok(lectures)
}

async fn load_sections(
    conn: &mut SqliteConnection,
    lecture_id: LectureId,
) -> Result<Vec<Section>, StorageError> {
    let rows = sqlx::query(
        r"
        SELECT id, lecture_id, num_in_seq, title, content
        FROM sections
        WHERE lecture_id = ?1
        ORDER BY id ASC
        ",
    )
    .bind(id_to_i64("lecture_id", lecture_id.value())?)
    .fetch_all(&mut *conn)
    .await
    .map_err(db_err)?;

    let mut sections = Vec::with_capacity(rows.len());
    for row in &rows {
        sections.push(map_section_row(row)?);
    }
    Ok(sections)
}

async fn load_lecture(
    conn: &mut SqliteConnection,
    id: LectureId,
) -> Result<Option<Lecture>, StorageError> {
    let row = sqlx::query(
        r"
        SELECT id, course_id, num_in_seq, title, description
        FROM lectures WHERE id = ?1
        ",
    )
    .bind(id_to_i64("lecture_id", id.value())?)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_err)?;

    let Some(row) = row else {
        return Ok(None);
    };
    let sections = load_sections(conn, id).await?;
    lecture_from_row(&row, sections).map(Some)
}

#[async_trait::async_trait]
impl LectureRepository for SqliteRepository {
    async fn get_lecture(&self, id: LectureId) -> Result<Option<Lecture>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let read = load_lecture(&mut tx, id).await;
        finish(tx, read).await
    }

    async fn lectures_for_course(&self, course_id: CourseId) -> Result<Vec<Lecture>, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let read = load_lectures_for_course(&mut tx, course_id).await;
        finish(tx, read).await
    }
}

#[async_trait::async_trait]
impl SectionRepository for SqliteRepository {
    async fn sections_for_lecture(
        &self,
        lecture_id: LectureId,
    ) -> Result<Vec<Section>, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        load_sections(&mut conn, lecture_id).await
    }
}

#[async_trait::async_trait]
impl LecturePersistence for SqliteRepository {
    async fn create_lecture(
        &self,
        course_id: CourseId,
        draft: LectureDraft,
    ) -> Result<(Course, Lecture), StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let written = insert_lecture_rows(&mut tx, course_id, &draft).await;
        let (updated, lecture_id, section_ids) = finish(tx, written).await?;

        let lecture = Lecture::from_draft(lecture_id, course_id, draft, &section_ids);
        Ok((updated, lecture))
    }

    async fn replace_lecture(
        &self,
        lecture: &Lecture,
        draft: LectureDraft,
    ) -> Result<Lecture, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let written = replace_lecture_rows(&mut tx, lecture.id(), &draft).await;
        let (course_id, section_ids) = finish(tx, written).await?;

        Ok(Lecture::from_draft(
            lecture.id(),
            course_id,
            draft,
            &section_ids,
        ))
    }

    async fn remove_lecture(
        &self,
        course_id: CourseId,
        lecture_id: LectureId,
    ) -> Result<Course, StorageError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let written = delete_lecture_rows(&mut tx, course_id, lecture_id).await;
        finish(tx, written).await
    }
}
