//! Input side: markdown pages from a ZIP export or an unpacked directory.

use std::fs;
use std::io::{Read, Seek};
use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::ConvertError;

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDoc {
    /// Path of the page inside the export, `/`-separated.
    pub name: String,
    pub text: String,
    /// Invalid UTF-8 was replaced while decoding.
    pub lossy: bool,
}

impl SourceDoc {
    pub fn new(name: impl Into<String>, bytes: &[u8]) -> Self {
        let (text, lossy) = decode_text(bytes);
        SourceDoc {
            name: name.into(),
            text,
            lossy,
        }
    }
}

/// Read every `.md` page under `path`, which is either a directory or a ZIP.
pub fn read_input(path: &Path) -> Result<Vec<SourceDoc>, ConvertError> {
    let docs = if path.is_dir() {
        read_dir_tree(path)
    } else {
        let file = fs::File::open(path).map_err(|e| ConvertError::io(path, e))?;
        read_zip(file).map_err(|source| ConvertError::MalformedContainer {
            path: path.to_path_buf(),
            source,
        })?
    };

    for doc in docs.iter().filter(|d| d.lossy) {
        warn!(name = %doc.name, "page is not valid UTF-8, undecodable bytes replaced");
    }
    Ok(docs)
}

/// Markdown entries of a ZIP archive, in archive order. Only a container
/// that cannot be opened is an error; an entry that fails to read is
/// logged and skipped.
pub fn read_zip<R: Read + Seek>(reader: R) -> Result<Vec<SourceDoc>, zip::result::ZipError> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut docs = Vec::new();

    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(index = i, error = %e, "skipping unreadable archive entry");
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry_name(entry.name_raw(), entry.name());
        if !is_markdown(&name) {
            debug!(%name, "skipping non-markdown entry");
            continue;
        }
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        if let Err(e) = entry.read_to_end(&mut bytes) {
            warn!(%name, error = %e, "skipping unreadable page");
            continue;
        }
        docs.push(SourceDoc::new(name, &bytes));
    }

    Ok(docs)
}

/// Markdown files below `root`, sorted by path. Unreadable entries are
/// logged and skipped.
pub fn read_dir_tree(root: &Path) -> Vec<SourceDoc> {
    let mut docs = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = ?e.path().unwrap_or(root), error = %e, "skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !is_markdown(&name) {
            continue;
        }
        match fs::read(entry.path()) {
            Ok(bytes) => docs.push(SourceDoc::new(name, &bytes)),
            Err(e) => warn!(%name, error = %e, "skipping unreadable page"),
        }
    }
    docs
}

/// Exports often store UTF-8 names without setting the UTF-8 flag, which
/// makes the archive decode them as CP437. Prefer the raw bytes when they
/// are valid UTF-8.
fn entry_name(raw: &[u8], decoded: &str) -> String {
    match std::str::from_utf8(raw) {
        Ok(name) => name.to_string(),
        Err(_) => decoded.to_string(),
    }
}

fn is_markdown(name: &str) -> bool {
    name.to_lowercase().ends_with(".md")
}

/// UTF-8 decode with replacement on failure; a leading BOM is dropped.
pub fn decode_text(bytes: &[u8]) -> (String, bool) {
    let (text, lossy) = match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), false),
        Err(_) => (String::from_utf8_lossy(bytes).into_owned(), true),
    };
    match text.strip_prefix(BOM) {
        Some(rest) => (rest.to_string(), lossy),
        None => (text, lossy),
    }
}
