//! Transcript loading and text normalization.
//!
//! Input is tab-delimited: speaker id, speaker name, breath-group start
//! (seconds), breath-group end (seconds), transcribed text. Encoding is
//! auto-detected (UTF-8 with or without BOM, UTF-16 LE/BE) before parsing.

use crate::error::{Result, TieralignError};
use std::fs;
use std::path::Path;

/// One breath group from the input transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptRecord {
    /// Speaker id (first column).
    pub speaker_id: String,
    /// Speaker display name. Falls back to the id when the name column is empty.
    pub speaker: String,
    /// Breath-group start in seconds, relative to the recording.
    pub start: f64,
    /// Breath-group end in seconds.
    pub end: f64,
    /// Normalized transcription text.
    pub text: String,
    /// 1-based line number in the input file, for diagnostics.
    pub line: usize,
}

impl TranscriptRecord {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Loads and parses a transcript file.
///
/// Fatal on malformed rows; blank lines and rows with an empty text column
/// are skipped.
pub fn load_transcript(path: &Path) -> Result<Vec<TranscriptRecord>> {
    let bytes = fs::read(path)?;
    let text = decode_transcript(&bytes)?;
    parse_transcript(&text)
}

/// Decodes raw transcript bytes, auto-detecting the encoding.
///
/// Recognizes UTF-8 (with or without BOM) and UTF-16 LE/BE by BOM. BOM-less
/// UTF-16LE is caught by a NUL-byte heuristic, since such files decode as
/// valid-looking garbage under UTF-8.
pub fn decode_transcript(bytes: &[u8]) -> Result<String> {
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return decode_utf16(&bytes[2..], true);
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return decode_utf16(&bytes[2..], false);
    }
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    // BOM-less UTF-16LE: ASCII text shows up as alternating char/NUL bytes.
    if bytes.len() >= 4 && bytes.iter().skip(1).step_by(2).take(16).all(|&b| b == 0) {
        return decode_utf16(bytes, true);
    }

    String::from_utf8(bytes.to_vec()).map_err(|e| TieralignError::Parse {
        line: 0,
        message: format!("transcript is not valid UTF-8 or UTF-16: {e}"),
    })
}

fn decode_utf16(bytes: &[u8], little_endian: bool) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(TieralignError::Parse {
            line: 0,
            message: "UTF-16 transcript has odd byte length".to_string(),
        });
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| TieralignError::Parse {
            line: 0,
            message: format!("invalid UTF-16 in transcript: {e}"),
        })
}

/// Parses decoded transcript text into ordered records.
///
/// Validates per-speaker ordering: records for one speaker must be sorted by
/// start time and non-overlapping.
pub fn parse_transcript(input: &str) -> Result<Vec<TranscriptRecord>> {
    let mut records = Vec::new();

    for (idx, raw_line) in input.lines().enumerate() {
        let line_no = idx + 1;
        if raw_line.trim().is_empty() {
            continue;
        }

        let columns: Vec<&str> = raw_line.split('\t').collect();
        if columns.len() < 5 {
            return Err(TieralignError::Parse {
                line: line_no,
                message: format!(
                    "expected 5 tab-separated columns, found {}",
                    columns.len()
                ),
            });
        }

        let start = parse_seconds(columns[2], line_no, "start")?;
        let end = parse_seconds(columns[3], line_no, "end")?;
        if end <= start {
            return Err(TieralignError::Parse {
                line: line_no,
                message: format!("end time {end} is not after start time {start}"),
            });
        }

        // Text may itself contain stray tabs; everything after column 4 is text.
        let text = normalize_text(&columns[4..].join(" "));
        if text.trim().is_empty() {
            // Empty annotation unit, nothing to align.
            continue;
        }

        let speaker_id = columns[0].trim().to_string();
        let mut speaker = columns[1].trim().to_string();
        if speaker.is_empty() {
            speaker = speaker_id.clone();
        }

        records.push(TranscriptRecord {
            speaker_id,
            speaker,
            start,
            end,
            text,
            line: line_no,
        });
    }

    validate_speaker_order(&records)?;
    Ok(records)
}

fn parse_seconds(field: &str, line: usize, name: &str) -> Result<f64> {
    let value: f64 = field.trim().parse().map_err(|_| TieralignError::Parse {
        line,
        message: format!("{name} time is not numeric: {:?}", field.trim()),
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(TieralignError::Parse {
            line,
            message: format!("{name} time must be a non-negative number, got {value}"),
        });
    }
    Ok(value)
}

fn validate_speaker_order(records: &[TranscriptRecord]) -> Result<()> {
    use std::collections::HashMap;

    let mut last_seen: HashMap<&str, &TranscriptRecord> = HashMap::new();
    for record in records {
        if let Some(prev) = last_seen.get(record.speaker.as_str()) {
            if record.start < prev.end - 1e-9 {
                return Err(TieralignError::Parse {
                    line: record.line,
                    message: format!(
                        "breath groups for speaker {:?} overlap: [{}, {}] follows [{}, {}] (line {})",
                        record.speaker, record.start, record.end, prev.start, prev.end, prev.line
                    ),
                });
            }
        }
        last_seen.insert(record.speaker.as_str(), record);
    }
    Ok(())
}

/// Normalizes transcription text for dictionary lookup.
///
/// Smart apostrophes become ASCII apostrophes so word matching is
/// encoding-insensitive; double quotes (smart or ASCII) and sentence
/// punctuation become whitespace.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{00B4}' | '\u{0060}' => {
                out.push('\'')
            }
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => out.push(' '),
            ',' | '.' | ':' | ';' | '!' | '?' | '"' | '%' => out.push(' '),
            _ => out.push(c),
        }
    }
    // A double dash is an utterance break, not part of any word.
    while out.contains("--") {
        out = out.replace("--", " ");
    }
    out.trim().to_string()
}
