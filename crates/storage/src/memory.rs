use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codeline_core::model::{
    Course, CourseId, Credential, CredentialId, Lecture, LectureDraft, LectureId, Progress,
    ProgressKey, Role, Section, SectionId, User, UserId, normalize_email,
};

use crate::repository::{
    CourseRepository, CredentialRepository, LecturePersistence, LectureRepository,
    NewCourseRecord, NewCredentialRecord, NewUserRecord, ProgressRepository, SectionRepository,
    StorageError, UserRepository,
};

#[derive(Debug, Clone)]
struct CourseRow {
    title: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    lecture_count: u32,
}

#[derive(Debug, Clone)]
struct LectureRow {
    course_id: CourseId,
    num_in_seq: i32,
    title: String,
    description: String,
}

#[derive(Debug, Clone)]
struct CredentialRow {
    user_id: UserId,
    password_hash: String,
    role: Role,
}

/// All tables behind one lock so aggregate writes are all-or-nothing.
#[derive(Debug, Default)]
struct State {
    last_id: u64,
    courses: BTreeMap<CourseId, CourseRow>,
    lectures: BTreeMap<LectureId, LectureRow>,
    sections: BTreeMap<SectionId, Section>,
    progress: HashMap<ProgressKey, Progress>,
    users: BTreeMap<UserId, User>,
    credentials: BTreeMap<CredentialId, CredentialRow>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn course(&self, id: CourseId) -> Option<Course> {
        let row = self.courses.get(&id)?;
        let lectures = self
            .lectures
            .iter()
            .filter(|(_, l)| l.course_id == id)
            .map(|(lecture_id, _)| *lecture_id)
            .collect();
        Some(Course::from_persisted(
            id,
            row.title.clone(),
            row.description.clone(),
            row.created_at,
            row.lecture_count,
            lectures,
        ))
    }

    fn sections_of(&self, lecture_id: LectureId) -> Vec<Section> {
        self.sections
            .values()
            .filter(|s| s.lecture_id() == lecture_id)
            .cloned()
            .collect()
    }

    fn lecture(&self, id: LectureId) -> Option<Lecture> {
        let row = self.lectures.get(&id)?;
        Some(Lecture::from_persisted(
            id,
            row.course_id,
            row.num_in_seq,
            row.title.clone(),
            row.description.clone(),
            self.sections_of(id),
        ))
    }

    fn set_lecture_count(&mut self, course: &Course) {
        if let Some(row) = self.courses.get_mut(&course.id()) {
            row.lecture_count = course.lecture_count();
        }
    }

    fn user_by_email(&self, email: &str) -> Option<&User> {
        let email = normalize_email(email).ok()?;
        self.users.values().find(|u| u.email() == email)
    }

    fn drop_sections_of(&mut self, lecture_id: LectureId) {
        self.sections.retain(|_, s| s.lecture_id() != lecture_id);
    }

    fn insert_sections(&mut self, lecture_id: LectureId, draft: &LectureDraft) -> Vec<SectionId> {
        let mut ids = Vec::with_capacity(draft.sections.len());
        for section in &draft.sections {
            let id = SectionId::new(self.next_id());
            self.sections
                .insert(id, section.clone().assign_id(id, lecture_id));
            ids.push(id);
        }
        ids
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn insert_new_course(&self, course: NewCourseRecord) -> Result<CourseId, StorageError> {
        let mut state = self.lock()?;
        let id = CourseId::new(state.next_id());
        state.courses.insert(
            id,
            CourseRow {
                title: course.title,
                description: course.description,
                created_at: course.created_at,
                lecture_count: 0,
            },
        );
        Ok(id)
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        Ok(self.lock()?.course(id))
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<Course>, StorageError> {
        let state = self.lock()?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(state
            .courses
            .keys()
            .take(limit)
            .filter_map(|id| state.course(*id))
            .collect())
    }
}

#[async_trait]
impl LectureRepository for InMemoryRepository {
    async fn get_lecture(&self, id: LectureId) -> Result<Option<Lecture>, StorageError> {
        Ok(self.lock()?.lecture(id))
    }

    async fn lectures_for_course(&self, course_id: CourseId) -> Result<Vec<Lecture>, StorageError> {
        let state = self.lock()?;
        Ok(state
            .lectures
            .iter()
            .filter(|(_, row)| row.course_id == course_id)
            .filter_map(|(id, _)| state.lecture(*id))
            .collect())
    }
}

#[async_trait]
impl SectionRepository for InMemoryRepository {
    async fn sections_for_lecture(
        &self,
        lecture_id: LectureId,
    ) -> Result<Vec<Section>, StorageError> {
        Ok(self.lock()?.sections_of(lecture_id))
    }
}

#[async_trait]
impl LecturePersistence for InMemoryRepository {
    async fn create_lecture(
        &self,
        course_id: CourseId,
        draft: LectureDraft,
    ) -> Result<(Course, Lecture), StorageError> {
        let mut state = self.lock()?;
        let stored = state.course(course_id).ok_or(StorageError::NotFound)?;

        let lecture_id = LectureId::new(state.next_id());
        let updated = stored
            .with_lecture_appended(lecture_id)
            .map_err(|_| StorageError::Conflict)?;

        state.lectures.insert(
            lecture_id,
            LectureRow {
                course_id,
                num_in_seq: draft.num_in_seq,
                title: draft.title.clone(),
                description: draft.description.clone(),
            },
        );
        let section_ids = state.insert_sections(lecture_id, &draft);
        state.set_lecture_count(&updated);

        let lecture = Lecture::from_draft(lecture_id, course_id, draft, &section_ids);
        Ok((updated, lecture))
    }

    async fn replace_lecture(
        &self,
        lecture: &Lecture,
        draft: LectureDraft,
    ) -> Result<Lecture, StorageError> {
        let mut state = self.lock()?;
        let row = state
            .lectures
            .get_mut(&lecture.id())
            .ok_or(StorageError::NotFound)?;
        row.num_in_seq = draft.num_in_seq;
        row.title = draft.title.clone();
        row.description = draft.description.clone();
        let course_id = row.course_id;

        state.drop_sections_of(lecture.id());
        let section_ids = state.insert_sections(lecture.id(), &draft);

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
        let mut state = self.lock()?;
        let stored = state.course(course_id).ok_or(StorageError::NotFound)?;
        let updated = stored
            .with_lecture_removed(lecture_id)
            .map_err(|_| StorageError::NotFound)?;
        if state
            .progress
            .values()
            .any(|p| p.current_lecture() == lecture_id)
        {
            return Err(StorageError::Conflict);
        }

        state.drop_sections_of(lecture_id);
        state.lectures.remove(&lecture_id);
        state.set_lecture_count(&updated);
        Ok(updated)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(&self, key: ProgressKey) -> Result<Option<Progress>, StorageError> {
        Ok(self.lock()?.progress.get(&key).copied())
    }

    async fn upsert_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        let mut state = self.lock()?;
        if !state.users.contains_key(&progress.user_id())
            || !state.courses.contains_key(&progress.course_id())
            || !state.lectures.contains_key(&progress.current_lecture())
        {
            return Err(StorageError::Conflict);
        }
        state.progress.insert(progress.key(), *progress);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_new_user(&self, user: NewUserRecord) -> Result<UserId, StorageError> {
        let mut state = self.lock()?;
        let email =
            normalize_email(&user.email).map_err(|e| StorageError::Serialization(e.to_string()))?;
        if state.user_by_email(&email).is_some() {
            return Err(StorageError::Conflict);
        }
        let id = UserId::new(state.next_id());
        let user = User::new(id, email, user.first_name, user.last_name)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        state.users.insert(id, user);
        Ok(id)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }
}

#[async_trait]
impl CredentialRepository for InMemoryRepository {
    async fn insert_new_credential(
        &self,
        credential: NewCredentialRecord,
    ) -> Result<CredentialId, StorageError> {
        let mut state = self.lock()?;
        let user_id = state
            .user_by_email(&credential.email)
            .map(User::id)
            .ok_or(StorageError::NotFound)?;
        if state.credentials.values().any(|c| c.user_id == user_id) {
            return Err(StorageError::Conflict);
        }

        let id = CredentialId::new(state.next_id());
        state.credentials.insert(
            id,
            CredentialRow {
                user_id,
                password_hash: credential.password_hash,
                role: credential.role,
            },
        );
        Ok(id)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, StorageError> {
        let state = self.lock()?;
        let Some(user) = state.user_by_email(username) else {
            return Ok(None);
        };
        Ok(state
            .credentials
            .iter()
            .find(|(_, c)| c.user_id == user.id())
            .map(|(id, c)| Credential::new(*id, user.clone(), c.password_hash.clone(), c.role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use codeline_core::model::SectionDraft;
    use codeline_core::time::fixed_now;

    async fn seeded_course(repo: &InMemoryRepository) -> Course {
        let id = repo
            .insert_new_course(NewCourseRecord {
                title: "Systems".into(),
                description: None,
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        repo.get_course(id).await.unwrap().unwrap()
    }

    fn draft(num: i32, sections: usize) -> LectureDraft {
        (0..sections).fold(LectureDraft::new(num, format!("L{num}"), "desc"), |d, i| {
            let i = i32::try_from(i).unwrap();
            d.with_section(SectionDraft::new(i, format!("S{i}"), "body"))
        })
    }

    #[tokio::test]
    async fn create_lecture_updates_count_and_collection_together() {
        let repo = InMemoryRepository::new();
        let course = seeded_course(&repo).await;

        let (updated, lecture) = repo.create_lecture(course.id(), draft(1, 2)).await.unwrap();

        assert_eq!(updated.lecture_count(), 1);
        let stored = repo.get_course(course.id()).await.unwrap().unwrap();
        assert_eq!(stored, updated);
        assert!(stored.is_count_consistent());
        assert_eq!(
            repo.sections_for_lecture(lecture.id()).await.unwrap().len(),
            2
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_all_land_on_the_same_course() {
        let repo = InMemoryRepository::new();
        let course_id = seeded_course(&repo).await.id();

        let tasks: Vec<_> = (1..=8)
            .map(|num| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.create_lecture(course_id, draft(num, 1)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stored = repo.get_course(course_id).await.unwrap().unwrap();
        assert_eq!(stored.lecture_count(), 8);
        assert!(stored.is_count_consistent());
    }

    #[tokio::test]
    async fn create_on_missing_course_is_not_found() {
        let repo = InMemoryRepository::new();

        let err = repo
            .create_lecture(CourseId::new(99), draft(1, 1))
            .await
            .unwrap_err();

        assert_matches!(err, StorageError::NotFound);
        assert!(repo.lock().unwrap().sections.is_empty());
    }

    #[tokio::test]
    async fn replace_lecture_deletes_previous_sections() {
        let repo = InMemoryRepository::new();
        let course = seeded_course(&repo).await;
        let (_, lecture) = repo.create_lecture(course.id(), draft(1, 3)).await.unwrap();
        let old_ids: Vec<_> = lecture.sections().iter().map(Section::id).collect();

        let replaced = repo.replace_lecture(&lecture, draft(4, 1)).await.unwrap();

        assert_eq!(replaced.num_in_seq(), 4);
        let remaining = repo.sections_for_lecture(lecture.id()).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining.iter().all(|s| !old_ids.contains(&s.id())));
    }

    #[tokio::test]
    async fn remove_lecture_drops_sections_and_decrements() {
        let repo = InMemoryRepository::new();
        let course = seeded_course(&repo).await;
        let (course, lecture) = repo.create_lecture(course.id(), draft(1, 2)).await.unwrap();

        let updated = repo.remove_lecture(course.id(), lecture.id()).await.unwrap();

        assert_eq!(updated.lecture_count(), 0);
        assert!(repo.get_lecture(lecture.id()).await.unwrap().is_none());
        assert!(repo.sections_for_lecture(lecture.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_is_refused_while_progress_points_at_lecture() {
        let repo = InMemoryRepository::new();
        let course = seeded_course(&repo).await;
        let (course, lecture) = repo.create_lecture(course.id(), draft(1, 1)).await.unwrap();
        let user_id = repo
            .insert_new_user(NewUserRecord {
                email: "sam@example.com".into(),
                first_name: "Sam".into(),
                last_name: "Lee".into(),
            })
            .await
            .unwrap();
        repo.upsert_progress(&Progress::new(
            ProgressKey::new(user_id, course.id()),
            lecture.id(),
        ))
        .await
        .unwrap();

        let err = repo
            .remove_lecture(course.id(), lecture.id())
            .await
            .unwrap_err();

        assert_matches!(err, StorageError::Conflict);
        let stored = repo.get_course(course.id()).await.unwrap().unwrap();
        assert_eq!(stored.lectures(), &[lecture.id()]);
        assert_eq!(stored.lecture_count(), 1);
        assert_eq!(repo.sections_for_lecture(lecture.id()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn progress_requires_existing_lecture() {
        let repo = InMemoryRepository::new();
        let course = seeded_course(&repo).await;
        let user_id = repo
            .insert_new_user(NewUserRecord {
                email: "sam@example.com".into(),
                first_name: "Sam".into(),
                last_name: "Lee".into(),
            })
            .await
            .unwrap();

        let err = repo
            .upsert_progress(&Progress::new(
                ProgressKey::new(user_id, course.id()),
                LectureId::new(404),
            ))
            .await
            .unwrap_err();
        assert_matches!(err, StorageError::Conflict);
    }

    #[tokio::test]
    async fn user_emails_are_unique_after_normalization() {
        let repo = InMemoryRepository::new();
        let record = |email: &str| NewUserRecord {
            email: email.into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        };
        let id = repo.insert_new_user(record("ada@example.com")).await.unwrap();

        assert_matches!(
            repo.insert_new_user(record(" ADA@Example.com")).await,
            Err(StorageError::Conflict)
        );
        assert_eq!(repo.lock().unwrap().users.len(), 1);

        repo.insert_new_credential(NewCredentialRecord {
            email: "Ada@Example.com".into(),
            password_hash: "hash".into(),
            role: Role::Student,
        })
        .await
        .unwrap();
        let found = repo.find_by_username("ADA@EXAMPLE.COM").await.unwrap();
        assert_eq!(found.map(|c| c.user().id()), Some(id));
    }

    #[tokio::test]
    async fn credential_requires_existing_user_and_is_unique() {
        let repo = InMemoryRepository::new();
        let record = NewCredentialRecord {
            email: "ada@example.com".into(),
            password_hash: "hash".into(),
            role: Role::Student,
        };
        assert_matches!(
            repo.insert_new_credential(record.clone()).await,
            Err(StorageError::NotFound)
        );

        repo.insert_new_user(NewUserRecord {
            email: "ada@example.com".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        })
        .await
        .unwrap();
        repo.insert_new_credential(record.clone()).await.unwrap();
        assert_matches!(
            repo.insert_new_credential(record).await,
            Err(StorageError::Conflict)
        );

        let found = repo.find_by_username("ada@example.com").await.unwrap();
        assert_eq!(found.map(|c| c.role()), Some(Role::Student));
    }
}
