//! Aligner abstraction over the external acoustic-model tool.
//!
//! The `Aligner` trait is the seam between orchestration and the external
//! forced-alignment tool, so the pipeline can be exercised with a mock.

pub mod command;

use crate::chunker::Chunk;
use crate::dictionary::LexiconEntry;
use crate::error::{Result, TieralignError};
use crate::timeline::{ChunkAlignment, Interval};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

pub use command::CommandAligner;

/// Trait for per-chunk forced alignment.
///
/// Implementations receive the full recording path plus the chunk's time
/// bounds and produce intervals in segment-local time (0 = chunk start).
pub trait Aligner: Send + Sync {
    /// Aligns one chunk against its audio segment.
    ///
    /// # Arguments
    /// * `audio` - Path to the full recording
    /// * `chunk` - The chunk with its global time bounds and word sequence
    /// * `lexicon` - One pronunciation-resolved entry per word
    ///
    /// # Returns
    /// Segment-local word and phone intervals, or a `ChunkAlignment` error.
    fn align(&self, audio: &Path, chunk: &Chunk, lexicon: &[LexiconEntry])
    -> Result<ChunkAlignment>;

    /// Name of the aligner backend, for logging.
    fn name(&self) -> &str;
}

/// Implement Aligner for Arc<T> so one instance can be shared across workers.
impl<T: Aligner + ?Sized> Aligner for Arc<T> {
    fn align(
        &self,
        audio: &Path,
        chunk: &Chunk,
        lexicon: &[LexiconEntry],
    ) -> Result<ChunkAlignment> {
        (**self).align(audio, chunk, lexicon)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Mock aligner for testing.
///
/// Distributes the chunk duration evenly across words, and each word's span
/// evenly across its phones. Individual chunks (or all of them) can be
/// configured to fail.
#[derive(Debug, Clone, Default)]
pub struct MockAligner {
    fail_all: bool,
    fail_chunks: HashSet<u64>,
    delay: Option<std::time::Duration>,
}

impl MockAligner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure every invocation to fail as if the output file were missing.
    pub fn with_failure(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Configure one chunk id to fail.
    pub fn with_failing_chunk(mut self, chunk_id: u64) -> Self {
        self.fail_chunks.insert(chunk_id);
        self
    }

    /// Sleep before answering, to exercise in-flight cancellation.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Aligner for MockAligner {
    fn align(
        &self,
        _audio: &Path,
        chunk: &Chunk,
        lexicon: &[LexiconEntry],
    ) -> Result<ChunkAlignment> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail_all || self.fail_chunks.contains(&chunk.id) {
            return Err(TieralignError::ChunkAlignment {
                chunk_id: chunk.id,
                message: "aligner produced no output file".to_string(),
            });
        }

        let n = lexicon.len();
        if n == 0 {
            return Ok(ChunkAlignment {
                chunk_id: chunk.id,
                words: Vec::new(),
                phones: Vec::new(),
            });
        }

        let word_step = chunk.duration() / n as f64;
        let mut words = Vec::with_capacity(n);
        let mut phones = Vec::new();
        for (i, entry) in lexicon.iter().enumerate() {
            let w_start = i as f64 * word_step;
            let w_end = w_start + word_step;
            words.push(Interval::new(w_start, w_end, entry.word.clone()));

            let p_count = entry.phones.len().max(1);
            let p_step = word_step / p_count as f64;
            for (j, phone) in entry.phones.iter().enumerate() {
                phones.push(Interval::new(
                    w_start + j as f64 * p_step,
                    w_start + (j + 1) as f64 * p_step,
                    phone.clone(),
                ));
            }
        }

        Ok(ChunkAlignment {
            chunk_id: chunk.id,
            words,
            phones,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
