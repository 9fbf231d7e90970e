pub mod chunk;
pub mod clean;
pub mod document;
pub mod labels;
pub mod normalize;
pub mod sections;
pub mod select;
pub mod tables;
pub mod toggle;

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::debug;

use crate::archive::SourceDoc;
use crate::records::{
    CleanedPage, DocIdentity, DocRecord, DocumentResult, Properties, ReportRow, SummaryRow,
    TableRecord,
};
use crate::settings::{Settings, Strategy};
use select::{Selection, SelectionKind};

/// Pick the target text according to the configured strategy.
pub fn select_text(markdown: &str, sections: &[sections::Section], settings: &Settings) -> Selection {
    match settings.strategy {
        Strategy::Headings => select::select_section(sections, &settings.criteria()),
        Strategy::Toggles => select_toggle(markdown, settings),
        Strategy::Auto => {
            let selection = select::select_section(sections, &settings.criteria());
            if selection.is_none() {
                select_toggle(markdown, settings)
            } else {
                selection
            }
        }
    }
}

fn select_toggle(markdown: &str, settings: &Settings) -> Selection {
    let phrases = [
        (SelectionKind::Video, &settings.video_toggle),
        (SelectionKind::Lesson, &settings.lesson_toggle),
    ];
    for (kind, phrase) in phrases {
        let text = toggle::extract_toggle_blocks(markdown, phrase);
        if !text.trim().is_empty() {
            return Selection {
                kind,
                heading: phrase.clone(),
                text,
            };
        }
    }
    Selection::none()
}

/// Clean, renumber and optionally unbold selected text.
pub fn clean_text(raw: &str, settings: &Settings) -> String {
    let cleaned = clean::renumber_lists(&clean::clean_markdown(raw));
    if settings.strip_emphasis {
        clean::strip_emphasis(&cleaned)
    } else {
        cleaned
    }
}

/// Pipeline for one page: metadata → selection → cleaning → tables → chunks.
pub fn process_document(doc: &SourceDoc, settings: &Settings, run_id: &str) -> DocumentResult {
    let page_id = document::page_id(&doc.name).unwrap_or_default();
    let title = document::page_title(&doc.text, document::stem(&doc.name));
    let identity = DocIdentity {
        doc_id: document::doc_id(&title, Some(page_id.as_str()).filter(|p| !p.is_empty())),
        page_id,
        file_name: document::basename(&doc.name).to_string(),
        page_title: title,
    };
    let properties = Properties(document::properties(&doc.text));

    let sections = sections::split_sections(&doc.text);
    let selection = select_text(&doc.text, &sections, settings);
    let stats = select::candidate_stats(&sections, &settings.criteria());

    let cleaned = clean_text(&selection.text, settings);
    let (final_text, tables) = if settings.extract_tables {
        tables::extract_tables(&cleaned)
    } else {
        (cleaned, Vec::new())
    };
    let char_len = final_text.chars().count();

    debug!(
        name = %doc.name,
        kind = %selection.kind,
        heading = %selection.heading,
        chars = char_len,
        tables = tables.len(),
        "processed page"
    );

    let record = |text: String, chunk: Option<(usize, &chunk::Chunk)>| DocRecord {
        run_id: run_id.to_string(),
        doc_id: identity.doc_id.clone(),
        page_id: identity.page_id.clone(),
        file_name: identity.file_name.clone(),
        page_title: identity.page_title.clone(),
        selected_section: selection.kind,
        selected_heading: selection.heading.clone(),
        chunk_index: chunk.map(|(i, _)| i),
        chunk_start: chunk.map(|(_, c)| c.start),
        chunk_end: chunk.map(|(_, c)| c.end),
        char_len: text.chars().count(),
        text_markdown: text,
        properties: properties.clone(),
    };

    let records = if settings.chunk {
        chunk::chunk_or_whole(&final_text, settings.target_chars, settings.overlap_chars)
            .iter()
            .enumerate()
            .map(|(i, c)| record(c.text.clone(), Some((i + 1, c))))
            .collect()
    } else {
        vec![record(final_text.clone(), None)]
    };

    let table_records = tables
        .into_iter()
        .enumerate()
        .map(|(i, t)| TableRecord {
            run_id: run_id.to_string(),
            doc_id: identity.doc_id.clone(),
            page_id: identity.page_id.clone(),
            file_name: identity.file_name.clone(),
            page_title: identity.page_title.clone(),
            table_index: i + 1,
            line_start: t.line_start,
            line_end: t.line_end,
            headers: t.headers,
            columns: t.keys,
            rows: t.rows,
        })
        .collect();

    let summary = SummaryRow {
        file_name: identity.file_name.clone(),
        page_id: identity.page_id.clone(),
        page_title: identity.page_title.clone(),
        selected_section: selection.kind,
        selected_heading: selection.heading.clone(),
        char_len,
        tartalom: final_text.clone(),
    };

    let report = ReportRow {
        file_name: identity.file_name.clone(),
        page_id: identity.page_id.clone(),
        page_title: identity.page_title.clone(),
        video_len: stats.video_len,
        lesson_len: stats.lesson_len,
        video_candidates: stats.video_candidates,
        lesson_candidates: stats.lesson_candidates,
        selected: selection.kind,
        selected_len: char_len,
        lossy_decoding: doc.lossy,
    };

    let cleaned = CleanedPage {
        doc_id: identity.doc_id.clone(),
        markdown: render_cleaned_page(&identity.page_title, &final_text),
    };

    DocumentResult {
        identity,
        records,
        tables: table_records,
        summary,
        report,
        cleaned,
    }
}

fn render_cleaned_page(title: &str, body: &str) -> String {
    if body.is_empty() {
        format!("# {}\n", title)
    } else {
        format!("# {}\n\n{}\n", title, body)
    }
}

/// Process pages in parallel, preserving input order. `progress` receives
/// `(completed, total)` once per finished page, from whichever worker
/// finished it.
pub fn process_documents<F>(
    docs: &[SourceDoc],
    settings: &Settings,
    run_id: &str,
    progress: F,
) -> Vec<DocumentResult>
where
    F: Fn(usize, usize) + Sync,
{
    let total = docs.len();
    let completed = AtomicUsize::new(0);

    docs.par_iter()
        .map(|doc| {
            let result = process_document(doc, settings, run_id);
            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            progress(done, total);
            result
        })
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    const PAGE_NAME: &str = "Kurzus/Intro 0123456789abcdef0123456789abcdef.md";

    fn doc(text: &str) -> SourceDoc {
        SourceDoc::new(PAGE_NAME, text.as_bytes())
    }

    fn unchunked() -> Settings {
        Settings {
            chunk: false,
            ..Settings::default()
        }
    }

    #[test]
    fn end_to_end_video_renumbered() {
        let md = "# Intro\n\n## Videó szöveg\n1. Step\n1. Step two\n";
        let result = process_document(&doc(md), &unchunked(), "run");
        assert_eq!(result.summary.selected_section, SelectionKind::Video);
        assert_eq!(result.summary.selected_heading, "Videó szöveg");
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].text_markdown, "1. Step\n2. Step two");
        assert_eq!(result.records[0].chunk_index, None);
        assert_eq!(result.identity.doc_id, "intro_0123456789abcdef0123456789abcdef");
        assert_eq!(result.identity.file_name, "Intro 0123456789abcdef0123456789abcdef.md");
    }

    #[test]
    fn lesson_fallback_and_report() {
        let md = "# Lecke\n## Videó szöveg\n\n## Lecke szöveg\nTanuljunk.\n";
        let result = process_document(&doc(md), &unchunked(), "run");
        assert_eq!(result.report.selected, SelectionKind::Lesson);
        assert_eq!(result.report.video_len, 0);
        assert_eq!(result.report.lesson_len, 10);
        assert_eq!(result.report.video_candidates, 1);
        assert_eq!(result.summary.tartalom, "Tanuljunk.");
    }

    #[test]
    fn no_match_still_yields_rows() {
        let md = "# Üres oldal\n## Kép galéria\n![](a.png)\n";
        let result = process_document(&doc(md), &Settings::default(), "run");
        assert_eq!(result.summary.selected_section, SelectionKind::None);
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].text_markdown, "");
        assert_eq!(result.records[0].chunk_index, Some(1));
        assert_eq!(result.cleaned.markdown, "# Üres oldal\n");
    }

    #[test]
    fn auto_falls_back_to_toggle() {
        let md = "# Intro\n<details>\n<summary>Videó szövege</summary>\n<p>Helló</p>\n</details>\n";
        let result = process_document(&doc(md), &unchunked(), "run");
        assert_eq!(result.summary.selected_section, SelectionKind::Video);
        assert_eq!(result.summary.selected_heading, "Videó szövege");
        assert_eq!(result.summary.tartalom, "Helló");

        let headings_only = Settings {
            strategy: Strategy::Headings,
            ..unchunked()
        };
        let result = process_document(&doc(md), &headings_only, "run");
        assert_eq!(result.summary.selected_section, SelectionKind::None);
    }

    #[test]
    fn tables_extracted_and_appended() {
        let md = "# Intro\n## Videó szöveg\nLásd:\n\n| Name | Age |\n| --- | --- |\n| Alice | 30 |\n";
        let result = process_document(&doc(md), &unchunked(), "run");
        assert_eq!(result.tables.len(), 1);
        assert_eq!(result.tables[0].columns, vec!["name", "age"]);
        assert_eq!(result.tables[0].table_index, 1);
        assert!(result.summary.tartalom.contains(tables::APPENDIX_HEADING));

        let no_tables = Settings {
            extract_tables: false,
            ..unchunked()
        };
        let result = process_document(&doc(md), &no_tables, "run");
        assert!(result.tables.is_empty());
        assert!(!result.summary.tartalom.contains(tables::APPENDIX_HEADING));
    }

    #[test]
    fn chunked_records_carry_offsets() {
        let body: Vec<String> = (0..6).map(|i| format!("Bekezdés {} {}", i, "x".repeat(30))).collect();
        let md = format!("# Intro\n## Transcript\n{}\n", body.join("\n\n"));
        let settings = Settings {
            target_chars: 100,
            overlap_chars: 50,
            extract_tables: false,
            ..Settings::default()
        };
        let result = process_document(&doc(&md), &settings, "run");
        assert!(result.records.len() > 1);
        for (i, r) in result.records.iter().enumerate() {
            assert_eq!(r.chunk_index, Some(i + 1));
            let (start, end) = (r.chunk_start.unwrap(), r.chunk_end.unwrap());
            assert_eq!(end - start, r.char_len);
        }
    }

    #[test]
    fn properties_pass_through() {
        let md = "# Intro\nTípus: videó\n\n## Videó\nszöveg\n";
        let result = process_document(&doc(md), &unchunked(), "run");
        assert_eq!(
            result.records[0].properties,
            Properties(vec![("Típus".to_string(), "videó".to_string())])
        );
    }

    fn fixture(name: &str) -> SourceDoc {
        let bytes = std::fs::read(format!("tests/fixtures/{}.md", name)).unwrap();
        SourceDoc::new(format!("{} 0123456789abcdef0123456789abcdef.md", name), &bytes)
    }

    #[test]
    fn fixture_heading_page() {
        let result = process_document(&fixture("python_alapok"), &unchunked(), "run");
        assert_eq!(result.identity.page_title, "Python alapok 1. lecke");
        assert_eq!(result.identity.doc_id, "python_alapok_1_lecke_0123456789abcdef0123456789abcdef");
        assert_eq!(result.summary.selected_heading, "Videó szöveg");

        let expected = "Sziasztok, üdv a kurzuson!

### Első lépések
1. Telepítsd a Pythont
2. Nyisd meg a terminált
   1. Windows: cmd
   2. macOS: Terminal

> Tipp: használj **virtuális** környezetet.

- venv

```python
print(\"**hello**\")
1. nem lista
```

| Parancs | Leírás |
|---|---|
| `python -V` | verzió |
| **pip** list | csomagok |

## Extracted tables";
        assert!(result.summary.tartalom.starts_with(expected));

        assert_eq!(result.tables.len(), 1);
        let table = &result.tables[0];
        assert_eq!(table.columns, vec!["parancs", "leiras"]);
        assert_eq!((table.line_start, table.line_end), (18, 21));
        assert_eq!(table.rows[0].get("leiras"), Some("verzió"));

        assert_eq!(result.report.video_candidates, 1);
        assert_eq!(result.report.lesson_candidates, 1);
        assert_eq!(result.report.lesson_len, 26);
        assert_eq!(
            result.records[0].properties,
            Properties(vec![
                ("Created".to_string(), "2024. március 1.".to_string()),
                ("Tags".to_string(), "python, alapok".to_string()),
            ])
        );
    }

    #[test]
    fn fixture_emphasis_stripped_outside_code() {
        let settings = Settings {
            strip_emphasis: true,
            ..unchunked()
        };
        let result = process_document(&fixture("python_alapok"), &settings, "run");
        let text = &result.summary.tartalom;
        assert!(text.contains("> Tipp: használj virtuális környezetet."));
        assert!(text.contains("print(\"**hello**\")"));
        assert!(text.contains("| pip list | csomagok |"));
    }

    #[test]
    fn fixture_quoted_toggle_page() {
        let result = process_document(&fixture("toggle_export"), &unchunked(), "run");
        assert_eq!(result.summary.selected_section, SelectionKind::Video);
        assert_eq!(
            result.summary.tartalom,
            "Most a függvényekről lesz szó.\n\n- def kulcsszó\n- visszatérési érték"
        );
        assert_eq!(
            result.records[0].properties,
            Properties(vec![("Status".to_string(), "Kész".to_string())])
        );

        let lesson_only = Settings {
            video_toggle: "Nincs ilyen".to_string(),
            ..unchunked()
        };
        let result = process_document(&fixture("toggle_export"), &lesson_only, "run");
        assert_eq!(result.summary.selected_section, SelectionKind::Lesson);
        assert_eq!(result.summary.tartalom, "Ez a lecke szövege.");
    }

    #[test]
    fn batch_preserves_order_and_reports_progress() {
        let docs: Vec<SourceDoc> = (0..3)
            .map(|i| SourceDoc::new(format!("p{}.md", i), format!("# Page {}\n", i).as_bytes()))
            .collect();
        let seen = Mutex::new(Vec::new());
        let results = process_documents(&docs, &Settings::default(), "run", |done, total| {
            seen.lock().unwrap().push((done, total))
        });
        let titles: Vec<&str> = results.iter().map(|r| r.identity.page_title.as_str()).collect();
        assert_eq!(titles, vec!["Page 0", "Page 1", "Page 2"]);
        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }
}
