//! Error types for tieralign.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TieralignError {
    // Input parsing errors (fatal)
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Unknown locale: {locale}")]
    UnknownLocale { locale: String },

    // Dictionary errors
    #[error("Dictionary error: {message}")]
    Dictionary { message: String },

    // Per-chunk alignment failures (recoverable at run level)
    #[error("Alignment failed for chunk {chunk_id}: {message}")]
    ChunkAlignment { chunk_id: u64, message: String },

    // Global timeline inconsistencies (fatal)
    #[error("Reconciliation failed: {message}")]
    Reconciliation { message: String },

    // Audio probing errors
    #[error("Audio error for {path:?}: {message}")]
    Audio {
        path: std::path::PathBuf,
        message: String,
    },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, TieralignError>;
