//! Read shapes handed back to callers. Projection never touches storage.

use serde::Serialize;

use codeline_core::model::{CourseId, Lecture, LectureId, Section, SectionId};

/// List row for a lecture: scalar fields plus how many sections it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LectureSummary {
    pub id: LectureId,
    pub num_in_seq: i32,
    pub title: String,
    pub description: String,
    pub section_count: usize,
}

impl LectureSummary {
    #[must_use]
    pub fn from_lecture(lecture: &Lecture) -> Self {
        Self {
            id: lecture.id(),
            num_in_seq: lecture.num_in_seq(),
            title: lecture.title().to_owned(),
            description: lecture.description().to_owned(),
            section_count: lecture.section_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionView {
    pub id: SectionId,
    pub num_in_seq: i32,
    pub title: String,
    pub content: String,
}

impl SectionView {
    #[must_use]
    pub fn from_section(section: &Section) -> Self {
        Self {
            id: section.id(),
            num_in_seq: section.num_in_seq(),
            title: section.title().to_owned(),
            content: section.content().to_owned(),
        }
    }
}

/// A single lecture with its sections in stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LectureDetail {
    pub id: LectureId,
    pub course_id: CourseId,
    pub num_in_seq: i32,
    pub title: String,
    pub description: String,
    pub sections: Vec<SectionView>,
}

impl LectureDetail {
    #[must_use]
    pub fn from_lecture(lecture: &Lecture) -> Self {
        Self {
            id: lecture.id(),
            course_id: lecture.course_id(),
            num_in_seq: lecture.num_in_seq(),
            title: lecture.title().to_owned(),
            description: lecture.description().to_owned(),
            sections: lecture
                .sections()
                .iter()
                .map(SectionView::from_section)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use codeline_core::model::{LectureDraft, SectionDraft};

    fn lecture() -> Lecture {
        let draft = LectureDraft::new(4, "Traits", "shared behaviour")
            .with_section(SectionDraft::new(1, "Definition", "trait Shape {}"))
            .with_section(SectionDraft::new(2, "Impl", "impl Shape for Circle {}"));
        Lecture::from_draft(
            LectureId::new(10),
            CourseId::new(1),
            draft,
            &[SectionId::new(11), SectionId::new(12)],
        )
    }

    #[test]
    fn summary_counts_sections_without_bodies() {
        let summary = LectureSummary::from_lecture(&lecture());
        assert_eq!(summary.id, LectureId::new(10));
        assert_eq!(summary.num_in_seq, 4);
        assert_eq!(summary.section_count, 2);

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("sections").is_none());
        assert_eq!(json["id"], 10);
    }

    #[test]
    fn detail_keeps_section_order() {
        let detail = LectureDetail::from_lecture(&lecture());
        let titles: Vec<_> = detail.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["Definition", "Impl"]);
        assert_eq!(detail.sections[1].content, "impl Shape for Circle {}");
        assert_eq!(detail.course_id, CourseId::new(1));
    }
}
