//! Command-line interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Forced-alignment orchestration for time-stamped transcripts.
#[derive(Debug, Parser)]
#[command(name = "tieralign", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress the run summary on stderr.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase diagnostic verbosity (repeatable).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Align a recording against its transcript and write a TextGrid.
    Align {
        /// WAV recording.
        audio: PathBuf,
        /// Tab-separated transcript.
        transcript: PathBuf,
        /// Output TextGrid path.
        output: PathBuf,
        /// Pronunciation dictionary, overriding config and locale.
        #[arg(long)]
        dict: Option<PathBuf>,
        /// Locale id, e.g. "sv-SE".
        #[arg(long)]
        locale: Option<String>,
        /// Extra dictionary merged in before alignment.
        #[arg(long)]
        import: Option<PathBuf>,
        /// External aligner executable, overriding config.
        #[arg(long)]
        aligner_path: Option<PathBuf>,
        /// Never prompt for missing pronunciations.
        #[arg(long)]
        noprompt: bool,
        /// Worker threads, overriding config.
        #[arg(long)]
        workers: Option<usize>,
        /// Per-chunk timeout, e.g. "90s" or "5m".
        #[arg(long, value_parser = parse_timeout)]
        timeout: Option<Duration>,
    },
    /// Report transcript words missing from the dictionary, without aligning.
    Check {
        /// Tab-separated transcript.
        transcript: PathBuf,
        /// Pronunciation dictionary, overriding config and locale.
        #[arg(long)]
        dict: Option<PathBuf>,
        /// Locale id, e.g. "sv-SE".
        #[arg(long)]
        locale: Option<String>,
        /// Write the missing words to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Merge a dictionary file into an existing dictionary.
    Import {
        /// Dictionary file with entries to add.
        file: PathBuf,
        /// Dictionary to merge into.
        #[arg(long)]
        dict: PathBuf,
        /// Where to write the merged dictionary (defaults to --dict in place).
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|e| format!("invalid duration {value:?}: {e}"))
}
