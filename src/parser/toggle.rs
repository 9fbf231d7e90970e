//! Content hidden inside HTML disclosure blocks (`<details>`/`<summary>`
//! toggles) embedded in the markdown.

use std::sync::LazyLock;

use html_escape::decode_html_entities;
use regex::Regex;

use super::normalize::normalize;

static DECORATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(?:[ \t]*>)*[ \t]*").unwrap());
static DETAILS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<details\b[^>]*>(.*?)</details\s*>").unwrap());
static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<summary\b[^>]*>(.*?)</summary\s*>").unwrap());
static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</p\s*>|</ul\s*>|</ol\s*>|</div\s*>").unwrap()
});
static LIST_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<li\b[^>]*>").unwrap());
static HEADING_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Concatenated content of every toggle whose summary normalizes exactly to
/// `target`, separated by a blank line. Empty when nothing matches.
pub fn extract_toggle_blocks(markdown: &str, target: &str) -> String {
    let target = normalize(target);
    if target.is_empty() {
        return String::new();
    }

    let undecorated = DECORATION_RE.replace_all(markdown, "");
    let mut parts = Vec::new();

    for block in DETAILS_RE.captures_iter(&undecorated) {
        let Some(inner) = block.get(1).map(|m| m.as_str()) else {
            continue;
        };
        let Some(summary) = SUMMARY_RE.captures(inner) else {
            continue;
        };
        let Some(whole) = summary.get(0) else {
            continue;
        };
        let label = strip_tags(&decode_html_entities(&summary[1]));
        if normalize(&label) != target {
            continue;
        }

        let fragment = &inner[whole.end()..];
        let content = html_to_markdown(fragment);
        let content = if content.is_empty() {
            strip_tags(&decode_html_entities(fragment)).trim().to_string()
        } else {
            content
        };
        if !content.is_empty() {
            parts.push(content);
        }
    }

    parts.join("\n\n")
}

/// Summary labels of every toggle in the document, in order.
pub fn toggle_summaries(markdown: &str) -> Vec<String> {
    let undecorated = DECORATION_RE.replace_all(markdown, "");
    DETAILS_RE
        .captures_iter(&undecorated)
        .filter_map(|block| {
            let inner = block.get(1)?.as_str();
            let summary = SUMMARY_RE.captures(inner)?;
            let label = strip_tags(&decode_html_entities(&summary[1]));
            Some(label.trim().to_string())
        })
        .collect()
}

/// Render an HTML fragment as markdown-ish plain text.
pub fn html_to_markdown(fragment: &str) -> String {
    let text = HEADING_TAG_RE.replace_all(fragment, |caps: &regex::Captures| {
        let level: usize = caps[1].parse().unwrap_or(1);
        format!("\n{} {}\n", "#".repeat(level), strip_tags(&caps[2]).trim())
    });
    let text = LIST_ITEM_RE.replace_all(&text, "\n- ");
    let text = BREAK_RE.replace_all(&text, "\n");
    let text = strip_tags(&text);
    let text = decode_html_entities(&text);

    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let joined = lines.join("\n");
    BLANK_RUN_RE
        .replace_all(joined.trim(), "\n\n")
        .into_owned()
}

fn strip_tags(s: &str) -> String {
    TAG_RE.replace_all(s, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_items_become_bullets() {
        let md = "<details>\n<summary>Videó szövege</summary>\n<ul><li>első</li><li>második</li></ul>\n</details>";
        let out = extract_toggle_blocks(md, "video szovege");
        assert_eq!(out, "- első\n- második");
    }

    #[test]
    fn summary_must_match_exactly() {
        let md = "<details><summary>Videó szövege (régi)</summary><p>old</p></details>";
        assert_eq!(extract_toggle_blocks(md, "Videó szövege"), "");
    }

    #[test]
    fn quoted_toggle_is_found() {
        let md = "> <details>\n> <summary><b>Videó&nbsp;szövege</b></summary>\n> <p>Hello &amp; welcome</p>\n> </details>";
        assert_eq!(extract_toggle_blocks(md, "Videó szövege"), "Hello & welcome");
    }

    #[test]
    fn headings_and_breaks() {
        let md = "<details><summary>Transcript</summary><h2>Part <em>one</em></h2>line a<br/>line b</details>";
        assert_eq!(
            extract_toggle_blocks(md, "transcript"),
            "## Part one\nline a\nline b"
        );
    }

    #[test]
    fn multiple_matches_joined() {
        let md = "<details><summary>Transcript</summary>a</details>\ntext\n<details><summary>Other</summary>x</details>\n<details><summary>transcript</summary>b</details>";
        assert_eq!(extract_toggle_blocks(md, "Transcript"), "a\n\nb");
    }

    #[test]
    fn tags_only_content_is_empty() {
        let md = "<details><summary>Transcript</summary><p></p><br></details>";
        assert_eq!(extract_toggle_blocks(md, "Transcript"), "");
    }

    #[test]
    fn summaries_listed() {
        let md = "<details><summary>A</summary>1</details><details><summary> B </summary>2</details>";
        assert_eq!(toggle_summaries(md), vec!["A", "B"]);
    }
}
