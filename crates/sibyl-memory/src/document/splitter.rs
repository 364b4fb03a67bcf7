use super::error::DocumentError;
use super::types::{Chunk, Document};

#[derive(Debug, Clone)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl SplitterConfig {
    /// # Errors
    ///
    /// Returns an error when `chunk_size` is zero or the overlap is not
    /// strictly smaller than the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, DocumentError> {
        if chunk_size == 0 {
            return Err(DocumentError::InvalidConfig(
                "chunk_size must be at least 1".into(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(DocumentError::InvalidConfig(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }
}

/// Character-based splitter with an exact-overlap guarantee.
///
/// Each chunk holds at most `chunk_size` characters and shares exactly
/// `chunk_overlap` characters with its predecessor (the suffix of chunk N is
/// the prefix of chunk N+1). Cut points prefer paragraph breaks, then line
/// breaks, then word boundaries, falling back to a hard cut, which keeps
/// retrieved passages readable without weakening the overlap invariant.
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let chars: Vec<char> = document.content.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            if chars.len() - start <= size {
                chunks.push(chars[start..].iter().collect::<String>());
                break;
            }
            let cut = find_cut(&chars, start + overlap, start + size);
            chunks.push(chars[start..cut].iter().collect::<String>());
            // next chunk re-reads exactly `overlap` characters; cut > start +
            // overlap, so the split always advances
            start = cut - overlap;
        }

        chunks
            .into_iter()
            .enumerate()
            .map(|(i, content)| Chunk {
                content,
                metadata: document.metadata.clone(),
                chunk_index: i,
            })
            .collect()
    }
}

/// Latest position in `(lo, hi]` lying at a preferred boundary. Each
/// separator class is exhausted before falling back to the next; `hi` itself
/// is the hard cut.
fn find_cut(chars: &[char], lo: usize, hi: usize) -> usize {
    for p in (lo + 1..=hi).rev() {
        if p >= 2 && chars[p - 1] == '\n' && chars[p - 2] == '\n' {
            return p;
        }
    }
    for p in (lo + 1..=hi).rev() {
        if chars[p - 1] == '\n' {
            return p;
        }
    }
    for p in (lo + 1..=hi).rev() {
        if chars[p] == ' ' {
            return p;
        }
    }
    hi
}
