use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CourseId, LectureId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("lecture {lecture} does not belong to course {course}")]
    LectureNotInCourse { course: CourseId, lecture: LectureId },

    #[error("lecture {0} is already part of the course")]
    DuplicateLecture(LectureId),
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A course and the ordered collection of lectures it owns.
///
/// `lecture_count` is the denormalised count kept in storage. Every aggregate
/// update goes through [`Course::with_lecture_appended`] or
/// [`Course::with_lecture_removed`], which return a new value with the
/// collection and the count changed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    lecture_count: u32,
    lectures: Vec<LectureId>,
}

impl Course {
    /// Creates a course with no lectures.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` if the title is empty or whitespace-only.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        description: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }

        let description = description
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            description,
            created_at,
            lecture_count: 0,
            lectures: Vec::new(),
        })
    }

    /// Rehydrates a course exactly as stored.
    ///
    /// The stored count is kept even when it disagrees with the collection so
    /// that callers can detect drift.
    #[must_use]
    pub fn from_persisted(
        id: CourseId,
        title: String,
        description: Option<String>,
        created_at: DateTime<Utc>,
        lecture_count: u32,
        lectures: Vec<LectureId>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            created_at,
            lecture_count,
            lectures,
        }
    }

    /// Returns the course with `lecture` appended and the count incremented.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::DuplicateLecture` if the lecture is already a member.
    pub fn with_lecture_appended(&self, lecture: LectureId) -> Result<Self, CourseError> {
        if self.contains_lecture(lecture) {
            return Err(CourseError::DuplicateLecture(lecture));
        }

        let mut lectures = self.lectures.clone();
        lectures.push(lecture);
        Ok(Self {
            lecture_count: self.lecture_count.saturating_add(1),
            lectures,
            ..self.clone()
        })
    }

    /// Returns the course with `lecture` removed and the count decremented by one.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::LectureNotInCourse` if the lecture is not a member.
    pub fn with_lecture_removed(&self, lecture: LectureId) -> Result<Self, CourseError> {
        if !self.contains_lecture(lecture) {
            return Err(CourseError::LectureNotInCourse {
                course: self.id,
                lecture,
            });
        }

        let lectures = self
            .lectures
            .iter()
            .copied()
            .filter(|id| *id != lecture)
            .collect();
        Ok(Self {
            lecture_count: self.lecture_count.saturating_sub(1),
            lectures,
            ..self.clone()
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn lecture_count(&self) -> u32 {
        self.lecture_count
    }

    /// Lecture ids in stored (insertion) order.
    #[must_use]
    pub fn lectures(&self) -> &[LectureId] {
        &self.lectures
    }

    #[must_use]
    pub fn contains_lecture(&self, lecture: LectureId) -> bool {
        self.lectures.contains(&lecture)
    }

    /// True when the denormalised count matches the collection size.
    #[must_use]
    pub fn is_count_consistent(&self) -> bool {
        usize::try_from(self.lecture_count).is_ok_and(|count| count == self.lectures.len())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
