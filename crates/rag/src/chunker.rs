//! Line-window chunking for source files and paragraph chunking for documents.

use studio_core::RagSettings;

use crate::types::Chunk;

/// Parameters for [`chunk_lines`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    /// Lines per chunk
    pub chunk_size: usize,
    /// Lines shared with the previous chunk
    pub overlap: usize,
    /// Chunks whose trimmed content is shorter than this are dropped
    pub min_chars: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            overlap: 10,
            min_chars: 50,
        }
    }
}

impl From<&RagSettings> for ChunkParams {
    fn from(settings: &RagSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            overlap: settings.chunk_overlap,
            min_chars: settings.min_chunk_chars,
        }
    }
}

/// Slide a window of `chunk_size` lines over `lines`, advancing by
/// `chunk_size - overlap` so consecutive chunks share `overlap` lines.
///
/// Line numbers are 1-indexed and inclusive. The window stops once it reaches
/// the last line, so the final chunk holds only the remaining lines.
pub fn chunk_lines(file_path: &str, lines: &[&str], params: ChunkParams) -> Vec<Chunk> {
    let chunk_size = params.chunk_size.max(1);
    let step = if chunk_size > params.overlap {
        chunk_size - params.overlap
    } else {
        chunk_size
    };

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < lines.len() {
        let end = (start + chunk_size).min(lines.len());
        let content = lines[start..end].join("\n");

        if content.trim().chars().count() >= params.min_chars {
            chunks.push(Chunk {
                content,
                file_path: file_path.to_string(),
                line_start: start + 1,
                line_end: end,
            });
        }

        if end == lines.len() {
            break;
        }
        start += step;
    }

    tracing::debug!(
        "Chunked {} into {} chunks (size: {}, overlap: {})",
        file_path,
        chunks.len(),
        chunk_size,
        params.overlap
    );

    chunks
}

/// Group blank-line-separated paragraphs into chunks of at most `max_chars`.
///
/// A paragraph longer than `max_chars` becomes a chunk of its own.
pub fn chunk_paragraphs(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs(text) {
        let projected = current.chars().count() + 2 + paragraph.chars().count();
        if !current.is_empty() && projected > max_chars {
            chunks.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }

    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }

    paragraphs
}
