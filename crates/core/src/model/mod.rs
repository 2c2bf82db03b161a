mod course;
mod credential;
mod ids;
mod lecture;
mod progress;
mod user;

pub use ids::{CourseId, CredentialId, LectureId, ParseIdError, SectionId, UserId};

pub use course::{Course, CourseError};
pub use credential::{Authority, Credential, Principal, Role, RoleParseError};
pub use lecture::{Lecture, LectureDraft, Section, SectionDraft};
pub use progress::{AccessDenied, Progress, ProgressKey, ensure_unlocked};
pub use user::{User, UserError, normalize_email};
