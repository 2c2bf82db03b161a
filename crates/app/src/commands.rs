use std::error::Error;

use codeline_core::model::{LectureDraft, Progress, ProgressKey, Role, SectionDraft};
use serde_json::json;
use services::{AccountServiceError, AppServices, CourseSummary};
use storage::repository::Storage;

use crate::args::Command;

const SEED_STUDENT_EMAIL: &str = "student@codeline.dev";
// Accounts are created with an opaque placeholder; real hashes come from the identity layer.
const SEED_PASSWORD_HASH: &str = "seed-placeholder-hash";

pub(crate) async fn execute(
    command: Command,
    storage: &Storage,
    services: &AppServices,
) -> Result<(), Box<dyn Error>> {
    let output = match command {
        Command::Seed => seed(storage, services).await?,
        Command::Courses => {
            let courses = services.course_service().list_courses(u32::MAX).await?;
            let summaries: Vec<_> = courses.iter().map(CourseSummary::from_course).collect();
            serde_json::to_value(summaries)?
        }
        Command::Lectures { course } => {
            let lectures = services
                .lecture_service()
                .get_all_lectures_by_course_id(course)
                .await?;
            serde_json::to_value(lectures)?
        }
        Command::Lecture {
            course,
            lecture,
            user: None,
        } => {
            let detail = services
                .lecture_service()
                .get_lecture_without_check(course, lecture)
                .await?;
            serde_json::to_value(detail)?
        }
        Command::Lecture {
            course,
            lecture,
            user: Some(user_id),
        } => {
            let user = services.account_service().get_user(user_id).await?;
            let detail = services
                .lecture_service()
                .get_lecture_with_check(&user, course, lecture)
                .await?;
            serde_json::to_value(detail)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Creates a demo course with two lectures and a student positioned at the first.
async fn seed(
    storage: &Storage,
    services: &AppServices,
) -> Result<serde_json::Value, Box<dyn Error>> {
    let course_id = services
        .course_service()
        .create_course(
            "Introduction to Rust".into(),
            Some("Ownership, borrowing and traits from first principles".into()),
        )
        .await?;

    let lectures = services.lecture_service();
    let first = lectures
        .create_lecture(
            course_id,
            LectureDraft::new(1, "Ownership", "Who owns a value and when it is dropped")
                .with_section(SectionDraft::new(1, "Moves", "let b = a; // a is moved"))
                .with_section(SectionDraft::new(2, "Drop", "Values are dropped at scope end")),
        )
        .await?;
    let second = lectures
        .create_lecture(
            course_id,
            LectureDraft::new(2, "Borrowing", "Shared and mutable references")
                .with_section(SectionDraft::new(1, "Shared", "let r = &a;")),
        )
        .await?;

    let accounts = services.account_service();
    let student = match accounts.load_by_username(SEED_STUDENT_EMAIL).await {
        Ok(existing) => existing,
        Err(AccountServiceError::UnknownUsername(_)) => {
            accounts
                .register_account(
                    SEED_STUDENT_EMAIL,
                    "Demo",
                    "Student",
                    SEED_PASSWORD_HASH.into(),
                    Role::Student,
                )
                .await?
        }
        Err(err) => return Err(err.into()),
    };
    let user_id = student.user().id();

    storage
        .progress
        .upsert_progress(&Progress::new(
            ProgressKey::new(user_id, course_id),
            first.id(),
        ))
        .await?;

    tracing::info!(
        course_id = %course_id,
        user_id = %user_id,
        "seeded demo course"
    );

    Ok(json!({
        "course_id": course_id,
        "lecture_ids": [first.id(), second.id()],
        "user_id": user_id,
    }))
}
