use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::account_service::AccountService;
use crate::course_service::CourseService;
use crate::error::AppServicesError;
use crate::lecture_service::LectureService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    courses: Arc<CourseService>,
    lectures: Arc<LectureService>,
    accounts: Arc<AccountService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let courses = Arc::new(CourseService::new(clock, Arc::clone(&storage.courses)));
        let lectures = Arc::new(LectureService::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.lectures),
            Arc::clone(&storage.lecture_writes),
            Arc::clone(&storage.progress),
        ));
        let accounts = Arc::new(AccountService::new(
            Arc::clone(&storage.users),
            Arc::clone(&storage.credentials),
        ));

        Self {
            courses,
            lectures,
            accounts,
        }
    }

    #[must_use]
    pub fn course_service(&self) -> Arc<CourseService> {
        Arc::clone(&self.courses)
    }

    #[must_use]
    pub fn lecture_service(&self) -> Arc<LectureService> {
        Arc::clone(&self.lectures)
    }

    #[must_use]
    pub fn account_service(&self) -> Arc<AccountService> {
        Arc::clone(&self.accounts)
    }
}
