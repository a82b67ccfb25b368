//! Aligner backend that shells out to an external alignment tool.
//!
//! Each invocation gets a private scratch directory holding the word list and
//! lexicon for one chunk. The tool is expected to write `aligned.tsv` into the
//! scratch directory; the scratch directory is removed when the invocation
//! ends, on success and on failure alike.

use crate::chunker::Chunk;
use crate::dictionary::LexiconEntry;
use crate::error::{Result, TieralignError};
use crate::timeline::{ChunkAlignment, Interval};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use super::Aligner;

const OUTPUT_FILE: &str = "aligned.tsv";
const KILL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs an external forced-alignment executable once per chunk.
pub struct CommandAligner {
    tool: PathBuf,
    model_dir: Option<PathBuf>,
    timeout: Duration,
}

impl CommandAligner {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            model_dir: None,
            timeout: Duration::from_secs(300),
        }
    }

    /// Set the acoustic model directory passed to the tool.
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = Some(dir.into());
        self
    }

    /// Set the per-chunk wall-clock timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn chunk_error(chunk: &Chunk, message: impl Into<String>) -> TieralignError {
        TieralignError::ChunkAlignment {
            chunk_id: chunk.id,
            message: message.into(),
        }
    }

    fn write_inputs(
        &self,
        scratch: &Path,
        chunk: &Chunk,
        lexicon: &[LexiconEntry],
    ) -> std::io::Result<()> {
        let mut words = fs::File::create(scratch.join("words.txt"))?;
        for entry in lexicon {
            writeln!(words, "{}", entry.word)?;
        }

        let mut dict = fs::File::create(scratch.join("lexicon.txt"))?;
        for entry in lexicon {
            writeln!(dict, "{}\t{}", entry.word, entry.phones.join(" "))?;
        }

        let mut meta = fs::File::create(scratch.join("segment.txt"))?;
        writeln!(meta, "{}\t{}\t{}", chunk.speaker, chunk.start, chunk.end)?;
        Ok(())
    }

    /// Waits for the child, killing it once the timeout elapses.
    fn wait_with_timeout(
        &self,
        child: &mut std::process::Child,
        chunk: &Chunk,
    ) -> Result<std::process::ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(Self::chunk_error(
                            chunk,
                            format!("aligner timed out after {:?}", self.timeout),
                        ));
                    }
                    std::thread::sleep(KILL_POLL_INTERVAL);
                }
                Err(e) => {
                    return Err(Self::chunk_error(chunk, format!("wait failed: {e}")));
                }
            }
        }
    }

    /// Parses the tool's `aligned.tsv` output.
    ///
    /// Expected line shape: `TIER<TAB>START<TAB>END<TAB>LABEL`, where TIER is
    /// `word` or `phone` and times are segment-local seconds.
    fn parse_output(path: &Path, chunk: &Chunk) -> Result<ChunkAlignment> {
        let contents = fs::read_to_string(path)
            .map_err(|_| Self::chunk_error(chunk, "aligner produced no output file"))?;

        let mut words = Vec::new();
        let mut phones = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let columns: Vec<&str> = line.split('\t').collect();
            if columns.len() != 4 {
                return Err(Self::chunk_error(
                    chunk,
                    format!("malformed output line {}: {line:?}", idx + 1),
                ));
            }
            let start: f64 = columns[1].parse().map_err(|_| {
                Self::chunk_error(chunk, format!("bad start time on line {}", idx + 1))
            })?;
            let end: f64 = columns[2].parse().map_err(|_| {
                Self::chunk_error(chunk, format!("bad end time on line {}", idx + 1))
            })?;
            let interval = Interval::new(start, end, columns[3].to_string());
            match columns[0] {
                "word" => words.push(interval),
                "phone" => phones.push(interval),
                other => {
                    return Err(Self::chunk_error(
                        chunk,
                        format!("unknown tier {other:?} on line {}", idx + 1),
                    ));
                }
            }
        }

        Ok(ChunkAlignment {
            chunk_id: chunk.id,
            words,
            phones,
        })
    }
}

impl Aligner for CommandAligner {
    fn align(
        &self,
        audio: &Path,
        chunk: &Chunk,
        lexicon: &[LexiconEntry],
    ) -> Result<ChunkAlignment> {
        let scratch = tempfile::Builder::new()
            .prefix("tieralign-chunk-")
            .tempdir()
            .map_err(|e| Self::chunk_error(chunk, format!("scratch dir: {e}")))?;

        self.write_inputs(scratch.path(), chunk, lexicon)
            .map_err(|e| Self::chunk_error(chunk, format!("writing inputs: {e}")))?;

        let mut cmd = Command::new(&self.tool);
        cmd.arg(audio)
            .arg(format!("{}", chunk.start))
            .arg(format!("{}", chunk.duration()))
            .arg(scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(model_dir) = &self.model_dir {
            cmd.arg(model_dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| Self::chunk_error(chunk, format!("spawning {:?}: {e}", self.tool)))?;

        let status = self.wait_with_timeout(&mut child, chunk)?;
        if !status.success() {
            return Err(Self::chunk_error(
                chunk,
                format!("aligner exited with {status}"),
            ));
        }

        Self::parse_output(&scratch.path().join(OUTPUT_FILE), chunk)
        // scratch TempDir is removed here on every return path
    }

    fn name(&self) -> &str {
        "command"
    }
}
