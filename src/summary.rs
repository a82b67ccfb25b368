//! Run summary: per-chunk outcome tallies and the JSON run log.

use crate::chunker::Chunk;
use crate::error::Result;
use crate::pipeline::ChunkOutcome;
use serde::Serialize;
use std::path::Path;

/// One failed chunk, with enough context to find it in the transcript.
#[derive(Debug, Clone, Serialize)]
pub struct FailedChunk {
    pub chunk_id: u64,
    pub speaker: String,
    pub start: f64,
    pub end: f64,
    pub diagnostic: String,
}

/// Aggregate view of a completed run, written next to the TextGrid.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub total_chunks: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failed_chunks: Vec<FailedChunk>,
    pub unresolved_words: Vec<String>,
    pub duration_secs: f64,
}

impl RunSummary {
    pub fn new(
        chunks: &[Chunk],
        outcomes: &[ChunkOutcome],
        unresolved_words: Vec<String>,
        duration_secs: f64,
    ) -> Self {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut skipped = 0;
        let mut failed_chunks = Vec::new();
        for outcome in outcomes {
            match outcome {
                ChunkOutcome::Succeeded(_) => succeeded += 1,
                ChunkOutcome::Failed {
                    chunk_id,
                    diagnostic,
                } => {
                    failed += 1;
                    if let Some(chunk) = chunks.iter().find(|c| c.id == *chunk_id) {
                        failed_chunks.push(FailedChunk {
                            chunk_id: *chunk_id,
                            speaker: chunk.speaker.clone(),
                            start: chunk.start,
                            end: chunk.end,
                            diagnostic: diagnostic.clone(),
                        });
                    }
                }
                ChunkOutcome::Skipped { .. } => skipped += 1,
            }
        }
        Self {
            total_chunks: outcomes.len(),
            succeeded,
            failed,
            skipped,
            failed_chunks,
            unresolved_words,
            duration_secs,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| crate::error::TieralignError::Other(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Human-readable report for stderr.
    pub fn report(&self) -> String {
        let mut out = format!(
            "aligned {}/{} chunks ({} failed, {} skipped), {:.1}s of audio",
            self.succeeded, self.total_chunks, self.failed, self.skipped, self.duration_secs
        );
        for failure in &self.failed_chunks {
            out.push_str(&format!(
                "\n  chunk {} ({} {:.3}-{:.3}): {}",
                failure.chunk_id, failure.speaker, failure.start, failure.end, failure.diagnostic
            ));
        }
        if !self.unresolved_words.is_empty() {
            out.push_str(&format!(
                "\n  {} word(s) missing from the dictionary: {}",
                self.unresolved_words.len(),
                self.unresolved_words.join(", ")
            ));
        }
        out
    }
}
