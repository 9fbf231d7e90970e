use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*```").unwrap());
static TIGHT_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#+)([^\s#])").unwrap());
static HEADING_LINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#+\s").unwrap());
static QUOTE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^>\s").unwrap());
static QUOTED_BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^>\s-\s").unwrap());
static ORDERED_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(\d+)\.\s+(.*)$").unwrap());
static BOLD_STAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static BOLD_UNDERSCORE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__(.+?)__").unwrap());

/// Whether `line` opens or closes a fenced code block.
pub fn is_fence(line: &str) -> bool {
    FENCE_RE.is_match(line)
}

/// Normalize heading spacing, blank-line density and block-quote artifacts.
/// Lines inside fenced code blocks pass through untouched.
pub fn clean_markdown(markdown: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_code = false;

    for line in markdown.lines() {
        if is_fence(line) {
            in_code = !in_code;
            out.push(line.to_string());
            continue;
        }
        if in_code {
            out.push(line.to_string());
            continue;
        }

        if line.trim().is_empty() {
            // Runs of blank lines collapse to one.
            if out.last().is_some_and(|l| !l.is_empty()) {
                out.push(String::new());
            }
            continue;
        }

        let line = TIGHT_HEADING_RE.replace(line, "$1 $2");
        let is_heading = HEADING_LINE_RE.is_match(&line);
        let is_quote = QUOTE_LINE_RE.is_match(&line);

        if (is_heading || is_quote) && out.last().is_some_and(|l| !l.is_empty()) {
            out.push(String::new());
        }

        out.push(QUOTED_BULLET_RE.replace(&line, "- ").into_owned());
    }

    out.join("\n").trim().to_string()
}

/// Rewrite ordered-list numbers so each run counts up from 1, with a
/// separate counter per indent level. Moving to a different indent resets
/// that level and drops every deeper one; any non-list line ends the run.
pub fn renumber_lists(markdown: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_code = false;
    let mut counters: BTreeMap<usize, usize> = BTreeMap::new();
    let mut active_indent: Option<usize> = None;

    for line in markdown.lines() {
        if is_fence(line) {
            in_code = !in_code;
            out.push(line.to_string());
            continue;
        }
        if in_code {
            out.push(line.to_string());
            continue;
        }

        let Some(caps) = ORDERED_ITEM_RE.captures(line) else {
            active_indent = None;
            out.push(line.to_string());
            continue;
        };

        let indent = caps[1].chars().count();
        let content = &caps[3];
        let n = if active_indent == Some(indent) {
            let counter = counters.entry(indent).or_insert(0);
            *counter += 1;
            *counter
        } else {
            active_indent = Some(indent);
            counters.retain(|&level, _| level < indent);
            counters.insert(indent, 1);
            1
        };

        out.push(format!("{}{}. {}", " ".repeat(indent), n, content));
    }

    out.join("\n").trim().to_string()
}

/// Unwrap `**bold**` and `__bold__` outside fenced blocks and inline code.
pub fn strip_emphasis(markdown: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_code = false;

    for line in markdown.lines() {
        if is_fence(line) {
            in_code = !in_code;
            out.push(line.to_string());
            continue;
        }
        if in_code {
            out.push(line.to_string());
            continue;
        }

        // Odd segments sit between backticks; an unmatched trailing
        // backtick leaves the remainder as code.
        let segments: Vec<String> = line
            .split('`')
            .enumerate()
            .map(|(i, seg)| {
                if i % 2 == 1 {
                    seg.to_string()
                } else {
                    unwrap_bold(seg)
                }
            })
            .collect();
        out.push(segments.join("`"));
    }

    out.join("\n")
}

fn unwrap_bold(segment: &str) -> String {
    let s = BOLD_STAR_RE.replace_all(segment, "$1");
    BOLD_UNDERSCORE_RE.replace_all(&s, "$1").into_owned()
}

// ── Tests ──
