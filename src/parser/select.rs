use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::labels::label_match;
use super::sections::Section;

/// Which label class the selected text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionKind {
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "lecke")]
    Lesson,
    #[serde(rename = "none")]
    None,
}

impl SelectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionKind::Video => "video",
            SelectionKind::Lesson => "lecke",
            SelectionKind::None => "none",
        }
    }
}

impl std::fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub kind: SelectionKind,
    pub heading: String,
    pub text: String,
}

impl Selection {
    pub fn none() -> Self {
        Selection {
            kind: SelectionKind::None,
            heading: String::new(),
            text: String::new(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == SelectionKind::None
    }
}

/// Label sets plus the inclusive heading-level window searched for them.
#[derive(Debug, Clone)]
pub struct Criteria<'a> {
    pub video: &'a [String],
    pub lesson: &'a [String],
    pub levels: RangeInclusive<usize>,
}

/// Pick the first non-empty video section, else the first non-empty lesson
/// section, else `none`. A section matching the video labels is never
/// considered as a lesson candidate.
pub fn select_section(sections: &[Section], criteria: &Criteria<'_>) -> Selection {
    let mut video: Vec<&Section> = Vec::new();
    let mut lesson: Vec<&Section> = Vec::new();

    for section in sections.iter().filter(|s| criteria.levels.contains(&s.level)) {
        if label_match(&section.title, criteria.video) {
            video.push(section);
        } else if label_match(&section.title, criteria.lesson) {
            lesson.push(section);
        }
    }

    for (kind, candidates) in [(SelectionKind::Video, video), (SelectionKind::Lesson, lesson)] {
        for section in candidates {
            let text = section.text();
            if !text.is_empty() {
                return Selection {
                    kind,
                    heading: section.title.clone(),
                    text,
                };
            }
        }
    }

    Selection::none()
}

/// Measured candidate sections, for auditing false negatives. Unlike
/// selection, a heading matching both label sets counts for both, and the
/// reported length is that of the last candidate in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateStats {
    pub video_len: usize,
    pub lesson_len: usize,
    pub video_candidates: usize,
    pub lesson_candidates: usize,
}

pub fn candidate_stats(sections: &[Section], criteria: &Criteria<'_>) -> CandidateStats {
    let mut stats = CandidateStats::default();
    for section in sections.iter().filter(|s| criteria.levels.contains(&s.level)) {
        if label_match(&section.title, criteria.video) {
            stats.video_candidates += 1;
            stats.video_len = section.text().chars().count();
        }
        if label_match(&section.title, criteria.lesson) {
            stats.lesson_candidates += 1;
            stats.lesson_len = section.text().chars().count();
        }
    }
    stats
}

// ── Tests ──
