use assert_matches::assert_matches;
use codeline_core::model::{CourseId, LectureDraft, LectureId, SectionDraft};
use codeline_core::time::fixed_now;
use services::{AppServices, Clock, LectureServiceError};
use storage::repository::Storage;

async fn sqlite_services(name: &str) -> (AppServices, Storage) {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let storage = Storage::sqlite(&url).await.expect("connect sqlite");
    let services = AppServices::from_storage(&storage, Clock::fixed(fixed_now()));
    (services, storage)
}

fn intro_draft() -> LectureDraft {
    LectureDraft::new(1, "Ownership", "moves and borrows")
        .with_section(SectionDraft::new(1, "Moves", "let b = a;"))
        .with_section(SectionDraft::new(2, "Borrows", "let r = &a;"))
}

#[tokio::test]
async fn lecture_lifecycle_keeps_course_count_in_step() {
    let (services, storage) = sqlite_services("memdb_lecture_lifecycle").await;
    let courses = services.course_service();
    let lectures = services.lecture_service();

    let course_id = courses
        .create_course("Rust".into(), None)
        .await
        .expect("create course");
    assert!(
        lectures
            .get_all_lectures_by_course_id(course_id)
            .await
            .unwrap()
            .is_empty()
    );

    let lecture = lectures
        .create_lecture(course_id, intro_draft())
        .await
        .expect("create lecture");
    let course = courses.get_course(course_id).await.unwrap().unwrap();
    assert_eq!(course.lecture_count(), 1);
    assert!(course.contains_lecture(lecture.id()));

    let summaries = lectures
        .get_all_lectures_by_course_id(course_id)
        .await
        .unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].id, lecture.id());
    assert_eq!(summaries[0].section_count, 2);

    let updated = lectures
        .update_lecture(
            course_id,
            lecture.id(),
            LectureDraft::new(5, "Ownership, again", "no sections this time"),
        )
        .await
        .expect("update lecture");
    assert_eq!(updated.num_in_seq, 5);
    assert!(updated.sections.is_empty());
    assert!(
        storage
            .sections
            .sections_for_lecture(lecture.id())
            .await
            .unwrap()
            .is_empty()
    );

    lectures
        .delete_lecture_by_id(course_id, lecture.id())
        .await
        .expect("delete lecture");
    let course = courses.get_course(course_id).await.unwrap().unwrap();
    assert_eq!(course.lecture_count(), 0);
    assert!(!course.contains_lecture(lecture.id()));
    assert_matches!(
        lectures
            .get_lecture_without_check(course_id, lecture.id())
            .await
            .unwrap_err(),
        LectureServiceError::LectureNotFound(id) if id == lecture.id()
    );
}

#[tokio::test]
async fn create_on_missing_course_leaves_store_unchanged() {
    let (services, storage) = sqlite_services("memdb_missing_course").await;
    let missing = CourseId::new(41);

    let err = services
        .lecture_service()
        .create_lecture(missing, intro_draft())
        .await
        .unwrap_err();
    assert_matches!(err, LectureServiceError::CourseNotFound(id) if id == missing);

    assert!(storage.courses.list_courses(10).await.unwrap().is_empty());
    assert!(
        storage
            .lectures
            .lectures_for_course(missing)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn reads_report_missing_course_before_missing_lecture() {
    let (services, _) = sqlite_services("memdb_missing_reads").await;
    let lectures = services.lecture_service();
    let course_id = services
        .course_service()
        .create_course("Rust".into(), None)
        .await
        .unwrap();

    assert_matches!(
        lectures
            .get_lecture_without_check(CourseId::new(999), LectureId::new(999))
            .await
            .unwrap_err(),
        LectureServiceError::CourseNotFound(_)
    );
    assert_matches!(
        lectures
            .get_lecture_without_check(course_id, LectureId::new(999))
            .await
            .unwrap_err(),
        LectureServiceError::LectureNotFound(_)
    );
    assert_matches!(
        lectures
            .update_lecture(course_id, LectureId::new(999), intro_draft())
            .await
            .unwrap_err(),
        LectureServiceError::LectureNotFound(_)
    );
    assert_matches!(
        lectures
            .delete_lecture_by_id(CourseId::new(999), LectureId::new(999))
            .await
            .unwrap_err(),
        LectureServiceError::CourseNotFound(_)
    );
}

#[tokio::test]
async fn unchecked_read_is_repeatable() {
    let (services, _) = sqlite_services("memdb_repeatable_read").await;
    let lectures = services.lecture_service();
    let course_id = services
        .course_service()
        .create_course("Rust".into(), None)
        .await
        .unwrap();
    let lecture = lectures
        .create_lecture(course_id, intro_draft())
        .await
        .unwrap();

    let first = lectures
        .get_lecture_without_check(course_id, lecture.id())
        .await
        .unwrap();
    let second = lectures
        .get_lecture_without_check(course_id, lecture.id())
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.sections.len(), 2);
}

#[tokio::test]
async fn new_sqlite_bootstraps_an_empty_store() {
    let services = AppServices::new_sqlite(
        "sqlite:file:memdb_bootstrap?mode=memory&cache=shared",
        Clock::fixed(fixed_now()),
    )
    .await
    .expect("bootstrap");

    let courses = services.course_service().list_courses(10).await.unwrap();
    assert!(courses.is_empty());
}

async fn create_eight_concurrently(services: &AppServices) -> CourseId {
    let course_id = services
        .course_service()
        .create_course("Rust".into(), None)
        .await
        .unwrap();

    let tasks: Vec<_> = (1..=8)
        .map(|num| {
            let lectures = services.lecture_service();
            tokio::spawn(async move {
                lectures
                    .create_lecture(course_id, LectureDraft::new(num, format!("L{num}"), ""))
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().expect("every create succeeds");
    }
    course_id
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_on_one_course_all_succeed() {
    let services = AppServices::from_storage(&Storage::in_memory(), Clock::fixed(fixed_now()));
    let course_id = create_eight_concurrently(&services).await;
    let course = services.course_service().get_course(course_id).await.unwrap().unwrap();
    assert_eq!(course.lecture_count(), 8);
    assert!(course.is_count_consistent());

    let path = std::env::temp_dir().join(format!(
        "codeline-service-creates-{}.sqlite3",
        std::process::id()
    ));
    let services = AppServices::new_sqlite(
        &format!("sqlite://{}", path.display()),
        Clock::fixed(fixed_now()),
    )
    .await
    .expect("file database");
    let course_id = create_eight_concurrently(&services).await;
    let course = services.course_service().get_course(course_id).await.unwrap().unwrap();
    assert_eq!(course.lecture_count(), 8);
    assert!(course.is_count_consistent());

    drop(services);
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.clone().into_os_string();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}
