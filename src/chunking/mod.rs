//! Text chunking for file uploads.
//!
//! Splits plain text into overlapping character windows, preferring to cut
//! at a sentence end when one falls in the second half of the window.

/// Characters that end a sentence.
const SENTENCE_ENDS: [char; 3] = ['.', '?', '!'];

/// Chunk sizing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters repeated at the start of the next chunk.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

impl From<&crate::config::ChunkingSettings> for ChunkingConfig {
    fn from(settings: &crate::config::ChunkingSettings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            overlap: settings.overlap,
        }
    }
}

/// Split `text` into chunks of at most `config.chunk_size` characters.
///
/// Empty input yields no chunks. Every chunk after the first starts
/// `config.overlap` characters before the previous chunk's end, but the
/// window always advances by at least one character.
pub fn chunk_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let chunk_size = config.chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    if len <= chunk_size {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = (start + chunk_size).min(len);

        if end < len {
            let sentence_end = chars[start..end]
                .iter()
                .rposition(|c| SENTENCE_ENDS.contains(c))
                .map(|offset| start + offset);

            if let Some(idx) = sentence_end {
                if idx > start + chunk_size / 2 {
                    end = idx + 1;
                }
            }
        }

        chunks.push(chars[start..end].iter().collect());

        if end == len {
            break;
        }
        start = end.saturating_sub(config.overlap).max(start + 1);
    }

    chunks
}
