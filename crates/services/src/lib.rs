#![forbid(unsafe_code)]

pub mod account_service;
pub mod app_services;
pub mod course_service;
pub mod error;
pub mod lecture_service;
pub mod lecture_view;

pub use codeline_core::Clock;

pub use account_service::AccountService;
pub use app_services::AppServices;
pub use course_service::{CourseService, CourseSummary};
pub use error::{AccountServiceError, AppServicesError, CourseServiceError, LectureServiceError};
pub use lecture_service::LectureService;
pub use lecture_view::{LectureDetail, LectureSummary, SectionView};
