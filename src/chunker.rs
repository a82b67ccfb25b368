//! Breath-group chunking.
//!
//! Maps each transcript record to exactly one alignment chunk. No merging or
//! splitting happens here; chunk boundaries are the breath-group boundaries
//! from the transcript.

use crate::transcript::TranscriptRecord;

/// Breath groups shorter than this cannot be aligned by the acoustic model
/// and are skipped by the orchestrator.
pub const MIN_ALIGNABLE_SECS: f64 = 0.05;

/// One independently alignable segment, derived from a single transcript record.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Identifier unique within the run (1-based, in transcript order).
    pub id: u64,
    /// Speaker the chunk belongs to.
    pub speaker: String,
    /// Global start time in seconds.
    pub start: f64,
    /// Global end time in seconds.
    pub end: f64,
    /// Words tokenized from the normalized transcription text.
    pub words: Vec<String>,
}

impl Chunk {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// True if the chunk is too short for the acoustic model.
    pub fn is_too_short(&self) -> bool {
        self.duration() < MIN_ALIGNABLE_SECS
    }
}

/// Produces one chunk per transcript record.
///
/// Pure and total: valid records always yield chunks, even when the word
/// sequence turns out empty after tokenization.
pub fn chunk_records(records: &[TranscriptRecord]) -> Vec<Chunk> {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| Chunk {
            id: idx as u64 + 1,
            speaker: record.speaker.clone(),
            start: record.start,
            end: record.end,
            words: record
                .text
                .split_whitespace()
                .map(str::to_string)
                .collect(),
        })
        .collect()
}
