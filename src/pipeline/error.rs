//! Stage error classification and reporting.

use std::fmt;

/// Classifies errors surfaced while the pipeline runs.
///
/// Recoverable errors affect a single chunk; the run continues. Fatal errors
/// mean the run itself cannot produce a usable result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    Recoverable(String),
    Fatal(String),
}

impl StageError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StageError::Fatal(_))
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::Recoverable(msg) => write!(f, "recoverable: {msg}"),
            StageError::Fatal(msg) => write!(f, "fatal: {msg}"),
        }
    }
}

/// Receives errors from pipeline stages as they happen.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, stage: &str, error: &StageError);
}

/// Default reporter that writes to stderr.
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, stage: &str, error: &StageError) {
        eprintln!("[{stage}] {error}");
    }
}
