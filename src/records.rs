use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::parser::select::SelectionKind;
use crate::parser::tables::TableRow;

/// Ordered `key: value` page properties, serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(pub Vec<(String, String)>);

impl Properties {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Properties {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Identity fields shared by every record of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocIdentity {
    pub doc_id: String,
    pub page_id: String,
    pub file_name: String,
    pub page_title: String,
}

// ── output.jsonl ──

#[derive(Debug, Clone, Serialize)]
pub struct DocRecord {
    pub run_id: String,
    pub doc_id: String,
    pub page_id: String,
    pub file_name: String,
    pub page_title: String,
    pub selected_section: SelectionKind,
    pub selected_heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_end: Option<usize>,
    pub text_markdown: String,
    pub char_len: usize,
    #[serde(skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

// ── tables.jsonl ──

#[derive(Debug, Clone, Serialize)]
pub struct TableRecord {
    pub run_id: String,
    pub doc_id: String,
    pub page_id: String,
    pub file_name: String,
    pub page_title: String,
    pub table_index: usize,
    pub line_start: usize,
    pub line_end: usize,
    pub headers: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

// ── output.csv ──

#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    pub file_name: String,
    pub page_id: String,
    pub page_title: String,
    pub selected_section: SelectionKind,
    pub selected_heading: String,
    pub char_len: usize,
    pub tartalom: String,
}

// ── report.csv ──

#[derive(Debug, Clone, Serialize)]
pub struct ReportRow {
    pub file_name: String,
    pub page_id: String,
    pub page_title: String,
    pub video_len: usize,
    pub lesson_len: usize,
    pub video_candidates: usize,
    pub lesson_candidates: usize,
    pub selected: SelectionKind,
    pub selected_len: usize,
    pub lossy_decoding: bool,
}

// ── cleaned/<doc_id>.md ──

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedPage {
    pub doc_id: String,
    pub markdown: String,
}

/// Everything produced for one input document.
#[derive(Debug, Clone)]
pub struct DocumentResult {
    pub identity: DocIdentity,
    pub records: Vec<DocRecord>,
    pub tables: Vec<TableRecord>,
    pub summary: SummaryRow,
    pub report: ReportRow,
    pub cleaned: CleanedPage,
}
