use std::sync::Arc;

use serde::Serialize;

use codeline_core::model::{Course, CourseId};
use storage::repository::{CourseRepository, NewCourseRecord};

use crate::Clock;
use crate::error::CourseServiceError;

/// List row for a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseSummary {
    pub id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub lecture_count: u32,
}

impl CourseSummary {
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            id: course.id(),
            title: course.title().to_owned(),
            description: course.description().map(str::to_owned),
            lecture_count: course.lecture_count(),
        }
    }
}

/// Orchestrates course creation and lookup.
#[derive(Clone)]
pub struct CourseService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
}

impl CourseService {
    #[must_use]
    pub fn new(clock: Clock, courses: Arc<dyn CourseRepository>) -> Self {
        Self { clock, courses }
    }

    /// Create an empty course and persist it.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Course` if the title is blank.
    /// Returns `CourseServiceError::Storage` if persistence fails.
    pub async fn create_course(
        &self,
        title: String,
        description: Option<String>,
    ) -> Result<CourseId, CourseServiceError> {
        let course = Course::new(CourseId::new(0), title, description, self.clock.now())?;
        let course_id = self
            .courses
            .insert_new_course(NewCourseRecord::from_course(&course))
            .await?;

        tracing::info!(course_id = %course_id, title = course.title(), "course created");
        Ok(course_id)
    }

    /// Fetch a course by ID.
    ///
    /// Returns `Ok(None)` when the course does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn get_course(&self, course_id: CourseId) -> Result<Option<Course>, CourseServiceError> {
        let course = self.courses.get_course(course_id).await?;
        Ok(course)
    }

    /// List courses ordered by ID, up to the given limit.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError::Storage` if repository access fails.
    pub async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, CourseServiceError> {
        let courses = self.courses.list_courses(limit).await?;
        tracing::debug!(count = courses.len(), limit, "listed courses");
        Ok(courses)
    }
}
