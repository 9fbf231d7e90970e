//! GitHub-flavored markdown pipe tables: detection, cell parsing, and the
//! machine-readable appendix appended to the document.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::clean::{is_fence, strip_emphasis};
use super::normalize::column_key;
use super::sections::parse_heading;

static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\|?\s*:?-{3,}:?\s*(?:\|\s*:?-{3,}:?\s*)*\|?\s*$").unwrap()
});

pub const APPENDIX_HEADING: &str = "## Extracted tables";

/// One data row: cell text keyed by column key, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    cells: Vec<(String, String)>,
}

impl TableRow {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, v)| v.as_str())
    }
}

impl Serialize for TableRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (key, value) in &self.cells {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    /// Header cells as written.
    pub headers: Vec<String>,
    /// Normalized, unique column keys.
    pub keys: Vec<String>,
    pub rows: Vec<TableRow>,
    /// 1-based line of the header row.
    pub line_start: usize,
    /// 1-based line of the last row (inclusive).
    pub line_end: usize,
}

/// Find every pipe table in `markdown`. Returns the text with an appendix
/// (unchanged when no tables were found) and the tables in document order.
pub fn extract_tables(markdown: &str) -> (String, Vec<Table>) {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut tables = Vec::new();
    let mut in_code = false;
    let mut i = 0;

    while i + 1 < lines.len() {
        if is_fence(lines[i]) {
            in_code = !in_code;
        }
        if in_code || !has_unescaped_pipe(lines[i]) || !is_separator(lines[i + 1]) {
            i += 1;
            continue;
        }

        let headers = split_cells(lines[i]);
        let keys = unique_keys(&headers);
        let mut rows = Vec::new();
        let mut j = i + 2;
        while j < lines.len() && is_row_line(lines[j]) {
            let mut cells = split_cells(lines[j]);
            cells.resize(keys.len(), String::new());
            rows.push(TableRow {
                cells: keys.iter().cloned().zip(cells).collect(),
            });
            j += 1;
        }

        tables.push(Table {
            headers,
            keys,
            rows,
            line_start: i + 1,
            line_end: j,
        });
        i = j;
    }

    if tables.is_empty() {
        return (markdown.to_string(), tables);
    }
    let text = format!("{}\n\n{}", markdown.trim_end(), render_appendix(&tables));
    (text, tables)
}

/// Delimiter row under the header. A bare `---` is a horizontal rule.
fn is_separator(line: &str) -> bool {
    line.contains('|') && SEPARATOR_RE.is_match(line)
}

fn is_row_line(line: &str) -> bool {
    !line.trim().is_empty() && parse_heading(line.trim_start()).is_none() && has_unescaped_pipe(line)
}

/// A `|` that is not preceded by a backslash.
pub fn has_unescaped_pipe(line: &str) -> bool {
    let mut escaped = false;
    for c in line.chars() {
        match c {
            '\\' if !escaped => escaped = true,
            '|' if !escaped => return true,
            _ => escaped = false,
        }
    }
    false
}

/// Split a row into trimmed cells. `\|` and pipes inside backtick code
/// spans are literal; empty cells produced by outer pipes are dropped.
pub fn split_cells(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_code = false;
    let mut chars = line.trim().chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '`' => {
                in_code = !in_code;
                current.push(c);
            }
            '|' if !in_code => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    cells.push(current);

    let mut cells: Vec<String> = cells.into_iter().map(|c| c.trim().to_string()).collect();
    let trimmed = line.trim();
    if trimmed.starts_with('|') && cells.first().is_some_and(String::is_empty) {
        cells.remove(0);
    }
    if trimmed.ends_with('|') && !trimmed.ends_with("\\|") && cells.last().is_some_and(String::is_empty) {
        cells.pop();
    }
    cells
}

/// Column keys with `_2`, `_3`, ... appended on collision; blank headers
/// become `col_<n>`.
pub fn unique_keys(headers: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut keys = Vec::with_capacity(headers.len());

    for (idx, header) in headers.iter().enumerate() {
        let mut base = column_key(&strip_emphasis(header));
        if base.is_empty() {
            base = format!("col_{}", idx + 1);
        }
        let mut key = base.clone();
        let mut n = 2;
        while seen.contains(&key) {
            key = format!("{}_{}", base, n);
            n += 1;
        }
        seen.insert(key.clone());
        keys.push(key);
    }
    keys
}

#[derive(Serialize)]
struct AppendixEntry<'a> {
    columns: &'a [String],
    rows: &'a [TableRow],
}

fn render_appendix(tables: &[Table]) -> String {
    let mut out = String::from(APPENDIX_HEADING);
    for (idx, table) in tables.iter().enumerate() {
        let payload = AppendixEntry {
            columns: &table.keys,
            rows: &table.rows,
        };
        let json = serde_json::to_string_pretty(&payload)
            .expect("string-keyed rows always serialize");
        out.push_str(&format!(
            "\n\n### Table {} (lines {}-{})\n\n```json\n{}\n```",
            idx + 1,
            table.line_start,
            table.line_end,
            json
        ));
    }
    out
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "| Name | Age |\n| --- | --- |\n| Alice | 30 |";

    #[test]
    fn simple_table() {
        let (text, tables) = extract_tables(SIMPLE);
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        assert_eq!(t.keys, vec!["name", "age"]);
        assert_eq!(t.headers, vec!["Name", "Age"]);
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0].get("name"), Some("Alice"));
        assert_eq!(t.rows[0].get("age"), Some("30"));
        assert_eq!((t.line_start, t.line_end), (1, 3));
        assert!(text.starts_with(SIMPLE));
        assert!(text.contains(APPENDIX_HEADING));
        assert!(text.contains("```json"));
    }

    #[test]
    fn horizontal_rule_is_not_a_separator() {
        let md = "Use a | b for pipes\n---\nmore";
        let (text, tables) = extract_tables(md);
        assert!(tables.is_empty());
        assert_eq!(text, md);

        let (_, tables) = extract_tables("| Only |\n|---|\n| x |");
        assert_eq!(tables.len(), 1);
    }

    #[test]
    fn row_serializes_in_column_order() {
        let (_, tables) = extract_tables(SIMPLE);
        let json = serde_json::to_string(&tables[0].rows[0]).unwrap();
        assert_eq!(json, r#"{"name":"Alice","age":"30"}"#);
    }

    #[test]
    fn duplicate_headers_get_suffix() {
        let (_, tables) = extract_tables("|Name|Name|**Name**|\n|:---|---:|:---:|\n|a|b|c|");
        assert_eq!(tables[0].keys, vec!["name", "name_2", "name_3"]);
    }

    #[test]
    fn escaped_and_code_pipes_are_literal() {
        let cells = split_cells(r"| a \| b | `x | y` | c |");
        assert_eq!(cells, vec!["a | b", "`x | y`", "c"]);
    }

    #[test]
    fn rows_padded_and_truncated() {
        let md = "| a | b | c |\n|---|---|---|\n| 1 |\n| 1 | 2 | 3 | 4 |";
        let (_, tables) = extract_tables(md);
        let rows = &tables[0].rows;
        assert_eq!(rows[0].values().collect::<Vec<_>>(), vec!["1", "", ""]);
        assert_eq!(rows[1].values().collect::<Vec<_>>(), vec!["1", "2", "3"]);
    }

    #[test]
    fn stops_at_blank_heading_or_plain_line() {
        let md = "x | y\n--- | ---\n1 | 2\n## Next | heading\n3 | 4";
        let (_, tables) = extract_tables(md);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].rows.len(), 1);
        assert_eq!(tables[0].line_end, 3);
    }

    #[test]
    fn two_tables_in_order() {
        let md = format!("intro\n\n{}\n\nbetween\n\n| k |\n| --- |\n| v |", SIMPLE);
        let (text, tables) = extract_tables(&md);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].keys, vec!["k"]);
        assert_eq!(tables[1].line_start, 9);
        assert!(text.contains("### Table 2 (lines 9-11)"));
    }

    #[test]
    fn no_tables_returns_text_unchanged() {
        let md = "a | b\nnot a separator\n";
        let (text, tables) = extract_tables(md);
        assert!(tables.is_empty());
        assert_eq!(text, md);
    }

    #[test]
    fn fenced_tables_are_ignored() {
        let md = format!("```\n{}\n```", SIMPLE);
        let (text, tables) = extract_tables(&md);
        assert!(tables.is_empty());
        assert_eq!(text, md);
    }

    #[test]
    fn separator_needs_three_dashes() {
        let (_, tables) = extract_tables("| a |\n| -- |\n| 1 |");
        assert!(tables.is_empty());
    }

    #[test]
    fn escaped_pipe_alone_is_not_a_table() {
        let (_, tables) = extract_tables("a \\| b\n---\n");
        assert!(tables.is_empty());
    }
}
