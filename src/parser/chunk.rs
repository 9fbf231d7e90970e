//! Paragraph-aware chunking with trailing-paragraph overlap.
//!
//! Offsets are character positions into the chunked text. A chunk's text
//! is always the exact slice `text[start..end]`, so consecutive chunks
//! satisfy `next.start == prev.end - overlap` where `overlap` is the length
//! of the paragraphs carried over.

use serde::Serialize;
use thiserror::Error;

use super::clean::is_fence;

/// Per-paragraph separator cost counted against the budgets.
const SEPARATOR_COST: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("target_chars must be positive")]
    ZeroBudget,
    #[error("chunk span {start}..{end} falls outside {len} characters")]
    SpanOutOfBounds { start: usize, end: usize, len: usize },
}

/// A paragraph: a maximal run of non-blank lines, except that a fenced code
/// block is never split on its inner blank lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    /// Byte range into the source text.
    pub bytes: std::ops::Range<usize>,
    /// Character offset of the first byte.
    pub start: usize,
    /// Character length.
    pub len: usize,
}

impl Paragraph {
    fn end(&self) -> usize {
        self.start + self.len
    }

    fn cost(&self) -> usize {
        self.len + SEPARATOR_COST
    }
}

pub fn split_paragraphs(text: &str) -> Vec<Paragraph> {
    let mut paras = Vec::new();
    let mut open: Option<Paragraph> = None;
    let mut in_code = false;
    let mut byte_pos = 0;
    let mut char_pos = 0;

    for line in text.split('\n') {
        let line_chars = line.chars().count();
        if is_fence(line) {
            in_code = !in_code;
        }

        if !in_code && line.trim().is_empty() {
            if let Some(p) = open.take() {
                paras.push(p);
            }
        } else {
            match open.as_mut() {
                Some(p) => {
                    p.bytes.end = byte_pos + line.len();
                    p.len = char_pos + line_chars - p.start;
                }
                None => {
                    open = Some(Paragraph {
                        bytes: byte_pos..byte_pos + line.len(),
                        start: char_pos,
                        len: line_chars,
                    });
                }
            }
        }

        byte_pos += line.len() + 1;
        char_pos += line_chars + 1;
    }

    if let Some(p) = open {
        paras.push(p);
    }
    paras
}

/// Group paragraphs into chunks of at most `target_chars` (a single
/// oversized paragraph still forms its own chunk). Each new chunk is seeded
/// with trailing paragraphs of the previous one totalling at most
/// `overlap_chars`, always keeping at least one.
pub fn chunk_text(text: &str, target_chars: usize, overlap_chars: usize) -> Result<Vec<Chunk>, ChunkError> {
    if target_chars == 0 {
        return Err(ChunkError::ZeroBudget);
    }
    let paras = split_paragraphs(text);
    if paras.is_empty() {
        return Ok(vec![Chunk {
            text: String::new(),
            start: 0,
            end: 0,
        }]);
    }

    let total_chars = text.chars().count();
    let mut chunks = Vec::new();
    let mut buf: &[Paragraph] = &[];
    let mut lo = 0;
    let mut size = 0;

    for (i, para) in paras.iter().enumerate() {
        if size > 0 && size + para.cost() > target_chars {
            chunks.push(make_chunk(text, buf, total_chars)?);

            let keep = overlap_count(buf, overlap_chars);
            lo = i - keep;
            size = paras[lo..i].iter().map(Paragraph::cost).sum();
        }
        size += para.cost();
        buf = &paras[lo..=i];
    }
    chunks.push(make_chunk(text, buf, total_chars)?);

    Ok(chunks)
}

/// Chunk, falling back to a single whole-text chunk on failure.
pub fn chunk_or_whole(text: &str, target_chars: usize, overlap_chars: usize) -> Vec<Chunk> {
    match chunk_text(text, target_chars, overlap_chars) {
        Ok(chunks) => chunks,
        Err(e) => {
            tracing::warn!(error = %e, "chunking failed, keeping text as one chunk");
            vec![Chunk {
                text: text.to_string(),
                start: 0,
                end: text.chars().count(),
            }]
        }
    }
}

fn overlap_count(buf: &[Paragraph], overlap_chars: usize) -> usize {
    let mut kept = 0;
    let mut used = 0;
    for para in buf.iter().rev() {
        if kept > 0 && used + para.cost() > overlap_chars {
            break;
        }
        used += para.cost();
        kept += 1;
    }
    kept
}

fn make_chunk(text: &str, buf: &[Paragraph], total_chars: usize) -> Result<Chunk, ChunkError> {
    let (Some(first), Some(last)) = (buf.first(), buf.last()) else {
        return Ok(Chunk {
            text: String::new(),
            start: 0,
            end: 0,
        });
    };
    let (start, end) = (first.start, last.end());
    let slice = text
        .get(first.bytes.start..last.bytes.end)
        .filter(|_| end <= total_chars)
        .ok_or(ChunkError::SpanOutOfBounds {
            start,
            end,
            len: total_chars,
        })?;
    Ok(Chunk {
        text: slice.to_string(),
        start,
        end,
    })
}

// ── Tests ──
