//! Alignment pipeline: orchestration and error reporting.

pub mod error;
pub mod orchestrator;

pub use error::{ErrorReporter, LogReporter, StageError};
pub use orchestrator::{
    ChunkJob, ChunkOutcome, Orchestrator, OrchestratorConfig, successful_alignments,
};
