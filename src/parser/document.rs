use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::normalize::slugify;
use super::sections::parse_heading;

static PAGE_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([0-9a-fA-F]{32})$").unwrap());
static PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\p{L}\p{N}][\p{L}\p{N} _\-/()]{0,48}?)\s*:(?:\s+(.*))?$").unwrap()
});

const SLUG_MAX: usize = 100;

/// Last path component of an archive entry name.
pub fn basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Basename without its extension.
pub fn stem(name: &str) -> &str {
    let base = basename(name);
    Path::new(base)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(base)
}

/// Stable page id: the trailing 32-hex token of the file stem, lower-cased.
pub fn page_id(name: &str) -> Option<String> {
    PAGE_ID_RE
        .captures(stem(name))
        .map(|caps| caps[1].to_lowercase())
}

/// First level-1 heading, else `fallback`.
pub fn page_title(markdown: &str, fallback: &str) -> String {
    markdown
        .lines()
        .filter_map(parse_heading)
        .find(|(level, _)| *level == 1)
        .map(|(_, title)| title.to_string())
        .unwrap_or_else(|| fallback.to_string())
}

pub fn doc_id(title: &str, page_id: Option<&str>) -> String {
    format!("{}_{}", slugify(title, SLUG_MAX), page_id.unwrap_or("noid"))
}

/// `Key: value` lines directly under the title, up to the next heading or
/// the first line that is not a property.
pub fn properties(markdown: &str) -> Vec<(String, String)> {
    let mut props = Vec::new();
    let mut lines = markdown.lines();

    if !lines.by_ref().any(|l| matches!(parse_heading(l), Some((1, _)))) {
        return props;
    }

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if parse_heading(line).is_some() {
            break;
        }
        let Some(caps) = PROPERTY_RE.captures(line) else {
            break;
        };
        let value = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
        props.push((caps[1].trim().to_string(), value.to_string()));
    }
    props
}
