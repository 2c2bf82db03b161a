use thiserror::Error;

use crate::model::ids::{CourseId, LectureId, UserId};

/// Reasons a gated lecture read is refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AccessDenied {
    #[error("progress not found for user in this course")]
    NoProgress,

    #[error("progress points at lecture {0}, which no longer exists")]
    CurrentLectureMissing(LectureId),

    #[error("student does not have access to this lecture yet (reached {reached}, requested {requested})")]
    NotYetUnlocked { reached: i32, requested: i32 },
}

/// Composite identity of a progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgressKey {
    pub user_id: UserId,
    pub course_id: CourseId,
}

impl ProgressKey {
    #[must_use]
    pub fn new(user_id: UserId, course_id: CourseId) -> Self {
        Self { user_id, course_id }
    }
}

/// A user's furthest unlocked lecture within one course.
///
/// The lecture reference is a position marker only; progress never owns the
/// lecture it points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    key: ProgressKey,
    current_lecture: LectureId,
}

impl Progress {
    #[must_use]
    pub fn new(key: ProgressKey, current_lecture: LectureId) -> Self {
        Self {
            key,
            current_lecture,
        }
    }

    #[must_use]
    pub fn key(&self) -> ProgressKey {
        self.key
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.key.user_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.key.course_id
    }

    #[must_use]
    pub fn current_lecture(&self) -> LectureId {
        self.current_lecture
    }
}

/// Decides whether a lecture at `requested` is visible to a user who has
/// reached `reached`. The current lecture itself is always visible.
///
/// # Errors
///
/// Returns `AccessDenied::NotYetUnlocked` when `reached < requested`.
pub fn ensure_unlocked(reached: i32, requested: i32) -> Result<(), AccessDenied> {
    if reached >= requested {
        Ok(())
    } else {
        Err(AccessDenied::NotYetUnlocked { reached, requested })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn earlier_and_current_lectures_are_unlocked() {
        assert_eq!(ensure_unlocked(3, 1), Ok(()));
        assert_eq!(ensure_unlocked(3, 3), Ok(()));
    }

    #[test]
    fn later_lecture_is_locked() {
        assert_eq!(
            ensure_unlocked(1, 2),
            Err(AccessDenied::NotYetUnlocked {
                reached: 1,
                requested: 2,
            })
        );
    }

    #[test]
    fn comparison_is_purely_numeric() {
        // gaps and negative positions are not normalised
        assert_eq!(ensure_unlocked(10, -4), Ok(()));
        assert!(ensure_unlocked(-1, 0).is_err());
    }

    #[test]
    fn progress_exposes_its_key() {
        let key = ProgressKey::new(UserId::new(1), CourseId::new(2));
        let progress = Progress::new(key, LectureId::new(3));
        assert_eq!(progress.user_id(), UserId::new(1));
        assert_eq!(progress.course_id(), CourseId::new(2));
        assert_eq!(progress.current_lecture(), LectureId::new(3));
    }
}
