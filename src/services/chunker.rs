//! Word-window chunking with overlap for embedding.

use crate::error::ChunkError;
use crate::models::IndexingConfig;

/// Splits text into overlapping windows of whitespace-separated words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    /// Window size in words
    chunk_size: usize,
    /// Words shared with the previous window
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker, rejecting windows that would not advance.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::ZeroSize);
        }
        if overlap >= chunk_size {
            return Err(ChunkError::OverlapTooLarge {
                size: chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn from_config(config: &IndexingConfig) -> Result<Self, ChunkError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Number of words the window advances by.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk `text` into windows re-joined with single spaces.
    ///
    /// Windows start at every multiple of the stride below the word count, so
    /// the final windows may be shorter than `chunk_size`.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();

        (0..words.len())
            .step_by(self.stride())
            .map(|start| {
                let end = (start + self.chunk_size).min(words.len());
                words[start..end].join(" ")
            })
            .collect()
    }

    /// Number of chunks [`chunk`](Self::chunk) produces for `word_count` words.
    pub fn expected_chunks(&self, word_count: usize) -> usize {
        word_count.div_ceil(self.stride())
    }
}

/// Chunk `text` with the given window, failing on a non-advancing window.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<String>, ChunkError> {
    Ok(TextChunker::new(chunk_size, chunk_overlap)?.chunk(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn numbered_words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunker = TextChunker::new(10, 2).unwrap();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk(" \n\t ").is_empty());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("Hello,   world!\nBye.", 1000, 200).unwrap();
        assert_eq!(chunks, vec!["Hello, world! Bye.".to_string()]);
    }

    #[test]
    fn test_window_and_stride() {
        let chunks = chunk_text("a b c d e f g", 3, 1).unwrap();
        assert_eq!(chunks, vec!["a b c", "c d e", "e f g", "g"]);
    }

    #[test]
    fn test_zero_overlap() {
        let chunks = chunk_text("a b c d e", 2, 0).unwrap();
        assert_eq!(chunks, vec!["a b", "c d", "e"]);
    }

    #[test]
    fn test_rejects_non_advancing_window() {
        assert_eq!(
            TextChunker::new(100, 100),
            Err(ChunkError::OverlapTooLarge {
                size: 100,
                overlap: 100
            })
        );
        assert_eq!(
            chunk_text("a b", 5, 9),
            Err(ChunkError::OverlapTooLarge {
                size: 5,
                overlap: 9
            })
        );
        assert_eq!(TextChunker::new(0, 0), Err(ChunkError::ZeroSize));
    }

    #[test]
    fn test_three_thousand_words() {
        let chunker = TextChunker::new(1000, 200).unwrap();
        let chunks = chunker.chunk(&numbered_words(3000));

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunker.expected_chunks(3000), 4);
        assert!(chunks[2].starts_with("w1600 "));
        assert!(chunks[2].ends_with(" w2599"));
        assert_eq!(chunks[3].split_whitespace().count(), 600);
    }

    #[test]
    fn test_from_config_defaults() {
        let chunker = TextChunker::from_config(&IndexingConfig::default()).unwrap();
        assert_eq!(chunker.chunk_size(), 1000);
        assert_eq!(chunker.overlap(), 200);
        assert_eq!(chunker.stride(), 800);
    }

    proptest! {
        #[test]
        fn prop_chunk_count_matches_formula(
            words in 0usize..400,
            size in 1usize..40,
            overlap_seed in 0usize..40,
        ) {
            let overlap = overlap_seed % size;
            let chunker = TextChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&numbered_words(words));
            prop_assert_eq!(chunks.len(), words.div_ceil(size - overlap));
            for chunk in &chunks {
                prop_assert!(chunk.split_whitespace().count() <= size);
            }
        }

        #[test]
        fn prop_consecutive_chunks_share_overlap(
            words in 0usize..400,
            size in 1usize..40,
            overlap_seed in 0usize..40,
        ) {
            let overlap = overlap_seed % size;
            let chunker = TextChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&numbered_words(words));

            for pair in chunks.windows(2) {
                let current: Vec<&str> = pair[0].split_whitespace().collect();
                let next: Vec<&str> = pair[1].split_whitespace().collect();
                // Only full windows are guaranteed to carry the whole overlap.
                if current.len() == size && next.len() >= overlap {
                    prop_assert_eq!(&current[size - overlap..], &next[..overlap]);
                }
            }
        }

        #[test]
        fn prop_stride_prefixes_reconstruct_words(
            words in 0usize..400,
            size in 1usize..40,
            overlap_seed in 0usize..40,
        ) {
            let overlap = overlap_seed % size;
            let chunker = TextChunker::new(size, overlap).unwrap();
            let text = numbered_words(words);
            let rebuilt: Vec<String> = chunker
                .chunk(&text)
                .iter()
                .flat_map(|c| {
                    c.split_whitespace()
                        .take(chunker.stride())
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .collect();
            let original: Vec<String> = text.split_whitespace().map(str::to_string).collect();
            prop_assert_eq!(rebuilt, original);
        }
    }
}
