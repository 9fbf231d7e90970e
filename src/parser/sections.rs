use std::sync::LazyLock;

use regex::Regex;

pub(crate) static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#+)\s+(.*)$").unwrap());

/// A heading and the body lines up to the next heading of any level.
/// Level 0 holds whatever precedes the first heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub level: usize,
    pub title: String,
    pub lines: Vec<String>,
}

impl Section {
    fn preamble() -> Self {
        Section {
            level: 0,
            title: String::new(),
            lines: Vec::new(),
        }
    }

    /// Body joined back together and trimmed.
    pub fn text(&self) -> String {
        self.lines.join("\n").trim().to_string()
    }
}

/// Parse a heading line into `(level, title)`.
pub fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let caps = HEADING_RE.captures(line)?;
    let level = caps.get(1)?.as_str().len();
    let title = caps.get(2)?.as_str().trim();
    Some((level, title))
}

/// Split markdown into sections in document order. Every line lands in
/// exactly one section, either as its heading or as a body line.
pub fn split_sections(markdown: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;

    for line in markdown.lines() {
        if let Some((level, title)) = parse_heading(line) {
            if let Some(done) = current.take() {
                sections.push(done);
            }
            current = Some(Section {
                level,
                title: title.to_string(),
                lines: Vec::new(),
            });
        } else {
            current
                .get_or_insert_with(Section::preamble)
                .lines
                .push(line.to_string());
        }
    }

    if let Some(done) = current {
        sections.push(done);
    }
    if sections.is_empty() {
        sections.push(Section::preamble());
    }

    sections
}

// ── Tests ──
