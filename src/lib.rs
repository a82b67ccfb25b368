//! Forced-alignment orchestration for time-stamped transcripts.
//!
//! Takes a WAV recording plus a tab-separated transcript of breath groups,
//! resolves each word against a pronunciation dictionary, aligns every breath
//! group independently through an external aligner, and reconciles the
//! segment-local results into per-speaker word and phone tiers written as a
//! Praat TextGrid.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod aligner;
pub mod audio;
pub mod chunker;
pub mod cli;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod pipeline;
pub mod summary;
pub mod textgrid;
pub mod timeline;
pub mod transcript;

pub use aligner::{Aligner, CommandAligner, MockAligner};
pub use chunker::{Chunk, chunk_records};
pub use config::Config;
pub use dictionary::{PronunciationDictionary, apply_rewrites};
pub use error::{Result, TieralignError};
pub use pipeline::{ChunkJob, ChunkOutcome, Orchestrator, OrchestratorConfig};
pub use summary::RunSummary;
pub use textgrid::{to_textgrid_string, write_textgrid};
pub use timeline::{AnnotationDocument, assemble};
pub use transcript::load_transcript;
