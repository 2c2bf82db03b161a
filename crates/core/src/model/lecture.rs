use serde::Deserialize;

use crate::model::ids::{CourseId, LectureId, SectionId};

//
// ─── DRAFTS ────────────────────────────────────────────────────────────────────
//

/// Caller-supplied lecture contents for create and full-replace updates.
///
/// `num_in_seq` is taken as given; it is neither checked for uniqueness within
/// the course nor for contiguity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LectureDraft {
    pub num_in_seq: i32,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub sections: Vec<SectionDraft>,
}

impl LectureDraft {
    #[must_use]
    pub fn new(num_in_seq: i32, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            num_in_seq,
            title: title.into(),
            description: description.into(),
            sections: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_section(mut self, section: SectionDraft) -> Self {
        self.sections.push(section);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SectionDraft {
    pub num_in_seq: i32,
    pub title: String,
    pub content: String,
}

impl SectionDraft {
    #[must_use]
    pub fn new(num_in_seq: i32, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            num_in_seq,
            title: title.into(),
            content: content.into(),
        }
    }

    /// Binds the draft to its stored id and owning lecture.
    #[must_use]
    pub fn assign_id(self, id: SectionId, lecture_id: LectureId) -> Section {
        Section {
            id,
            lecture_id,
            num_in_seq: self.num_in_seq,
            title: self.title,
            content: self.content,
        }
    }
}

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    id: SectionId,
    lecture_id: LectureId,
    num_in_seq: i32,
    title: String,
    content: String,
}

impl Section {
    #[must_use]
    pub fn from_persisted(
        id: SectionId,
        lecture_id: LectureId,
        num_in_seq: i32,
        title: String,
        content: String,
    ) -> Self {
        Self {
            id,
            lecture_id,
            num_in_seq,
            title,
            content,
        }
    }

    #[must_use]
    pub fn id(&self) -> SectionId {
        self.id
    }

    #[must_use]
    pub fn lecture_id(&self) -> LectureId {
        self.lecture_id
    }

    #[must_use]
    pub fn num_in_seq(&self) -> i32 {
        self.num_in_seq
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

//
// ─── LECTURE ───────────────────────────────────────────────────────────────────
//

/// A lecture owned by exactly one course, with its sections in stored order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lecture {
    id: LectureId,
    course_id: CourseId,
    num_in_seq: i32,
    title: String,
    description: String,
    sections: Vec<Section>,
}

impl Lecture {
    #[must_use]
    pub fn from_persisted(
        id: LectureId,
        course_id: CourseId,
        num_in_seq: i32,
        title: String,
        description: String,
        sections: Vec<Section>,
    ) -> Self {
        Self {
            id,
            course_id,
            num_in_seq,
            title,
            description,
            sections,
        }
    }

    /// Builds the stored shape of `draft` once the store has assigned ids.
    ///
    /// `section_ids` must line up with `draft.sections`; extra ids are ignored.
    #[must_use]
    pub fn from_draft(
        id: LectureId,
        course_id: CourseId,
        draft: LectureDraft,
        section_ids: &[SectionId],
    ) -> Self {
        let sections = draft
            .sections
            .into_iter()
            .zip(section_ids.iter().copied())
            .map(|(section, section_id)| section.assign_id(section_id, id))
            .collect();

        Self {
            id,
            course_id,
            num_in_seq: draft.num_in_seq,
            title: draft.title,
            description: draft.description,
            sections,
        }
    }

    #[must_use]
    pub fn id(&self) -> LectureId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn num_in_seq(&self) -> i32 {
        self.num_in_seq
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn belongs_to(&self, course_id: CourseId) -> bool {
        self.course_id == course_id
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
