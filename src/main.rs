mod archive;
mod error;
mod output;
mod parser;
mod records;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use parser::select::SelectionKind;
use records::DocumentResult;
use settings::{Settings, Strategy};

#[derive(Parser)]
#[command(name = "mdconvert", about = "Extract video transcripts from a markdown knowledge-base export")]
struct Cli {
    /// TOML settings file (overridden by MDCONV_* variables and flags)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a ZIP export or directory into JSONL/CSV/markdown artifacts
    Convert {
        /// ZIP archive or unpacked export directory
        input: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "converted")]
        out: PathBuf,
        /// One record per document instead of per chunk
        #[arg(long)]
        no_chunk: bool,
        /// Chunk size budget in characters
        #[arg(long)]
        target: Option<usize>,
        /// Overlap budget in characters (the last paragraph is always carried)
        #[arg(long)]
        overlap: Option<usize>,
        /// Where to look for the text
        #[arg(long, value_enum)]
        strategy: Option<Strategy>,
        /// Unwrap **bold** and __bold__ outside code
        #[arg(long)]
        strip_emphasis: bool,
        /// Skip table extraction
        #[arg(long)]
        no_tables: bool,
        /// Also bundle the artifacts into converted_<run_id>.zip
        #[arg(long)]
        zip: bool,
    },
    /// Show the section outline and selection outcome of one page
    Inspect {
        /// Markdown file
        file: PathBuf,
    },
    /// Print the effective label sets
    Labels,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Convert {
            input,
            out,
            no_chunk,
            target,
            overlap,
            strategy,
            strip_emphasis,
            no_tables,
            zip,
        } => {
            if no_chunk {
                settings.chunk = false;
            }
            if let Some(n) = target {
                settings.target_chars = n;
            }
            if let Some(n) = overlap {
                settings.overlap_chars = n;
            }
            if let Some(s) = strategy {
                settings.strategy = s;
            }
            if strip_emphasis {
                settings.strip_emphasis = true;
            }
            if no_tables {
                settings.extract_tables = false;
            }
            settings.validate()?;
            convert(&input, &out, &settings, zip)
        }
        Commands::Inspect { file } => {
            settings.validate()?;
            inspect(&file, &settings)
        }
        Commands::Labels => {
            println!("Video labels ({}):", settings.video_labels.len());
            for label in &settings.video_labels {
                println!("  {}", label);
            }
            println!("Lesson labels ({}):", settings.lesson_labels.len());
            for label in &settings.lesson_labels {
                println!("  {}", label);
            }
            println!("Heading levels: {}..={}", settings.min_level, settings.max_level);
            println!("Toggles: {:?} / {:?}", settings.video_toggle, settings.lesson_toggle);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn convert(input: &Path, out: &Path, settings: &Settings, bundle: bool) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    let run_id = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let docs = archive::read_input(input)?;
    if docs.is_empty() {
        println!("No markdown pages found in {}.", input.display());
        return Ok(());
    }
    info!(run_id = %run_id, pages = docs.len(), strategy = ?settings.strategy, "converting");
    println!("Converting {} pages...", docs.len());

    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );
    let results = parser::process_documents(&docs, settings, &run_id, |_, _| pb.inc(1));
    pb.finish_and_clear();

    let written = output::write_all(out, &run_id, &results, bundle)?;
    SelectionCounts::from_results(&results).print();
    println!(
        "Wrote {} records, {} tables, {} cleaned pages to {}",
        written.records,
        written.tables,
        written.cleaned,
        out.display()
    );
    if let Some(name) = written.bundle {
        println!("Bundle: {}", out.join(name).display());
    }
    Ok(())
}

fn inspect(file: &Path, settings: &Settings) -> anyhow::Result<()> {
    use parser::labels::label_match;

    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let doc = archive::SourceDoc::new(file.to_string_lossy().into_owned(), &bytes);
    let sections = parser::sections::split_sections(&doc.text);

    println!("{:>3} | {:<5} | {:<48} | {:>7} | {}", "#", "Level", "Heading", "Chars", "Match");
    println!("{}", "-".repeat(80));
    for (i, section) in sections.iter().enumerate() {
        let in_range = settings.levels().contains(&section.level);
        let video = in_range && label_match(&section.title, &settings.video_labels);
        let lesson = in_range && !video && label_match(&section.title, &settings.lesson_labels);
        let tag = match (video, lesson) {
            (true, _) => "video",
            (_, true) => "lecke",
            _ => "",
        };
        println!(
            "{:>3} | {:<5} | {:<48} | {:>7} | {}",
            i + 1,
            section.level,
            truncate(&section.title, 45),
            section.text().chars().count(),
            tag
        );
    }

    let toggles = parser::toggle::toggle_summaries(&doc.text);
    if !toggles.is_empty() {
        println!("\n--- Toggles ---");
        for summary in &toggles {
            println!("  {}", truncate(summary, 60));
        }
    }

    let result = parser::process_document(&doc, settings, "inspect");
    println!(
        "\nTitle: {}\nDoc id: {}\nSelected: {} {:?} ({} chars, {} chunks, {} tables)",
        result.identity.page_title,
        result.identity.doc_id,
        result.summary.selected_section,
        result.summary.selected_heading,
        result.summary.char_len,
        result.records.len(),
        result.tables.len(),
    );
    for table in &result.tables {
        let first_row = table
            .rows
            .first()
            .map(|row| row.values().collect::<Vec<_>>().join(" | "))
            .unwrap_or_default();
        println!(
            "  Table {} (lines {}-{}): [{}] {}",
            table.table_index,
            table.line_start,
            table.line_end,
            table.columns.join(", "),
            truncate(&first_row, 50)
        );
    }
    if doc.lossy {
        println!("Warning: invalid UTF-8 was replaced while decoding.");
    }
    Ok(())
}

struct SelectionCounts {
    video: usize,
    lesson: usize,
    none: usize,
    lossy: usize,
}

impl SelectionCounts {
    fn from_results(results: &[DocumentResult]) -> Self {
        let mut counts = SelectionCounts {
            video: 0,
            lesson: 0,
            none: 0,
            lossy: 0,
        };
        for r in results {
            match r.summary.selected_section {
                SelectionKind::Video => counts.video += 1,
                SelectionKind::Lesson => counts.lesson += 1,
                SelectionKind::None => counts.none += 1,
            }
            if r.report.lossy_decoding {
                counts.lossy += 1;
            }
        }
        counts
    }

    fn print(&self) {
        println!(
            "Selected {} video, {} lesson, {} none ({} lossy decodes).",
            self.video, self.lesson, self.none, self.lossy,
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
