use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static SLUG_DROP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9_]+").unwrap());
static KEY_SEP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Fold accents away and keep only the ASCII remainder.
pub fn ascii_fold(s: &str) -> String {
    s.nfkd().filter(char::is_ascii).collect()
}

/// Canonical form for case/accent/punctuation-insensitive comparison.
///
/// `"Videó Szöveg!"` and `"video szoveg"` both become `"video szoveg"`.
pub fn normalize(s: &str) -> String {
    let folded = ascii_fold(s).to_lowercase();
    let spaced = NON_WORD_RE.replace_all(&folded, " ");
    SPACE_RE.replace_all(&spaced, " ").trim().to_string()
}

/// Filesystem/identifier-safe slug, truncated to `maxlen` bytes (always ASCII).
pub fn slugify(s: &str, maxlen: usize) -> String {
    let underscored = normalize(s).replace(' ', "_");
    let mut slug = SLUG_DROP_RE.replace_all(&underscored, "").into_owned();
    slug.truncate(maxlen);
    slug
}

/// Column key for a table header cell: ASCII-folded, lower-case, non-word
/// runs collapsed to `_`, outer underscores trimmed.
pub fn column_key(s: &str) -> String {
    let folded = ascii_fold(s).to_lowercase();
    KEY_SEP_RE
        .replace_all(&folded, "_")
        .trim_matches('_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accents_and_punctuation() {
        assert_eq!(normalize("Videó Szöveg!"), normalize("video szoveg"));
        assert_eq!(normalize("Videó Szöveg!"), "video szoveg");
        assert_eq!(normalize("  Lecke -- anyag  "), "lecke anyag");
    }

    #[test]
    fn idempotent() {
        for s in ["Árvíztűrő tükörfúrógép", "a_b  C!?", "", "  ", "Ünnepi   Beszéd."] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn drops_non_latin_remainder() {
        assert_eq!(normalize("日本 video"), "video");
        assert_eq!(normalize("🧩"), "");
    }

    #[test]
    fn slug() {
        assert_eq!(slugify("Első lecke: Bevezetés", 100), "elso_lecke_bevezetes");
        assert_eq!(slugify("abcdef", 3), "abc");
        assert_eq!(slugify("", 100), "");
    }

    #[test]
    fn keys() {
        assert_eq!(column_key("Name"), "name");
        assert_eq!(column_key(" Születési év (kb.) "), "szuletesi_ev_kb");
        assert_eq!(column_key("---"), "");
    }
}
