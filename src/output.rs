//! Writes the conversion artifacts for a run.

use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use zip::write::FileOptions;

use crate::error::ConvertError;
use crate::records::{CleanedPage, DocumentResult};

pub const RECORDS_FILE: &str = "output.jsonl";
pub const SUMMARY_FILE: &str = "output.csv";
pub const REPORT_FILE: &str = "report.csv";
pub const TABLES_FILE: &str = "tables.jsonl";
pub const CLEANED_DIR: &str = "cleaned";

/// What was written where.
#[derive(Debug, Default)]
pub struct WriteSummary {
    pub records: usize,
    pub tables: usize,
    pub cleaned: usize,
    /// Every artifact, relative to the output directory.
    pub files: Vec<PathBuf>,
    pub bundle: Option<PathBuf>,
}

pub fn write_all(
    out_dir: &Path,
    run_id: &str,
    results: &[DocumentResult],
    bundle: bool,
) -> Result<WriteSummary, ConvertError> {
    fs::create_dir_all(out_dir).map_err(|e| ConvertError::io(out_dir, e))?;
    let mut summary = WriteSummary::default();

    let records = results.iter().flat_map(|r| r.records.iter());
    summary.records = write_jsonl(&out_dir.join(RECORDS_FILE), records)?;
    summary.files.push(RECORDS_FILE.into());

    let tables = results.iter().flat_map(|r| r.tables.iter());
    summary.tables = write_jsonl(&out_dir.join(TABLES_FILE), tables)?;
    summary.files.push(TABLES_FILE.into());

    write_csv(&out_dir.join(SUMMARY_FILE), results.iter().map(|r| &r.summary))?;
    summary.files.push(SUMMARY_FILE.into());

    write_csv(&out_dir.join(REPORT_FILE), results.iter().map(|r| &r.report))?;
    summary.files.push(REPORT_FILE.into());

    let cleaned = write_cleaned(&out_dir.join(CLEANED_DIR), results.iter().map(|r| &r.cleaned))?;
    summary.cleaned = cleaned.len();
    summary
        .files
        .extend(cleaned.into_iter().map(|name| Path::new(CLEANED_DIR).join(name)));

    if bundle {
        let name = format!("converted_{}.zip", run_id);
        write_bundle(out_dir, &out_dir.join(&name), &summary.files)?;
        summary.bundle = Some(name.into());
    }

    info!(
        dir = %out_dir.display(),
        records = summary.records,
        tables = summary.tables,
        cleaned = summary.cleaned,
        "artifacts written"
    );
    Ok(summary)
}

/// One JSON object per line. Returns the number of lines written.
pub fn write_jsonl<'a, T, I>(path: &Path, items: I) -> Result<usize, ConvertError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let file = fs::File::create(path).map_err(|e| ConvertError::io(path, e))?;
    let mut out = BufWriter::new(file);
    let mut count = 0;
    for item in items {
        serde_json::to_writer(&mut out, item)?;
        out.write_all(b"\n").map_err(|e| ConvertError::io(path, e))?;
        count += 1;
    }
    out.flush().map_err(|e| ConvertError::io(path, e))?;
    debug!(path = %path.display(), lines = count, "wrote jsonl");
    Ok(count)
}

/// CSV with a header row derived from the row type's field names.
pub fn write_csv<'a, T, I>(path: &Path, rows: I) -> Result<(), ConvertError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| ConvertError::io(path, e))?;
    Ok(())
}

/// `<doc_id>.md` per page. Repeated ids get `_2`, `_3`, ... so no page
/// overwrites another. Returns the file names in input order.
pub fn write_cleaned<'a, I>(dir: &Path, pages: I) -> Result<Vec<String>, ConvertError>
where
    I: IntoIterator<Item = &'a CleanedPage>,
{
    fs::create_dir_all(dir).map_err(|e| ConvertError::io(dir, e))?;
    let mut used = HashSet::new();
    let mut names = Vec::new();

    for page in pages {
        let name = unique_name(&page.doc_id, &mut used);
        let path = dir.join(&name);
        fs::write(&path, &page.markdown).map_err(|e| ConvertError::io(&path, e))?;
        names.push(name);
    }
    Ok(names)
}

fn unique_name(doc_id: &str, used: &mut HashSet<String>) -> String {
    let mut name = format!("{}.md", doc_id);
    let mut n = 2;
    while !used.insert(name.clone()) {
        name = format!("{}_{}.md", doc_id, n);
        n += 1;
    }
    name
}

/// Deflated ZIP of `files` (relative to `base`), stored under `/`-joined names.
pub fn write_bundle(base: &Path, zip_path: &Path, files: &[PathBuf]) -> Result<(), ConvertError> {
    let file = fs::File::create(zip_path).map_err(|e| ConvertError::io(zip_path, e))?;
    let mut zw = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for rel in files {
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let path = base.join(rel);
        let bytes = fs::read(&path).map_err(|e| ConvertError::io(&path, e))?;
        zw.start_file(name, options)?;
        zw.write_all(&bytes).map_err(|e| ConvertError::io(zip_path, e))?;
    }
    zw.finish()?;
    Ok(())
}

// ── Tests ──
