//! Temporal reconciliation and tier assembly.
//!
//! Takes per-chunk alignment results in segment-local time, shifts them onto
//! the global timeline, and assembles per-speaker word and phone tiers with
//! explicit silence intervals for gaps, failed chunks, and skipped chunks.
//! Coverage over [0, duration] is total, never sparse.

use crate::chunker::Chunk;
use crate::error::{Result, TieralignError};
use std::collections::HashMap;

/// Gap below this width is treated as adjacency, not silence.
const EPS: f64 = 1e-6;

/// How far a shifted interval may leak past its chunk bounds before it is a
/// reconciliation error. Absorbs the aligner's millisecond rounding.
const BOUNDS_TOL: f64 = 1e-3;

/// A labeled time span. The label is empty for silence.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
    pub label: String,
}

impl Interval {
    pub fn new(start: f64, end: f64, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    pub fn silence(start: f64, end: f64) -> Self {
        Self::new(start, end, "")
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_silence(&self) -> bool {
        self.label.is_empty()
    }
}

/// Successful alignment of one chunk, in segment-local time (0 = chunk start).
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkAlignment {
    pub chunk_id: u64,
    pub words: Vec<Interval>,
    pub phones: Vec<Interval>,
}

/// Annotation level of a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierKind {
    Word,
    Phone,
}

impl TierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::Word => "word",
            TierKind::Phone => "phone",
        }
    }
}

/// Time-ordered, non-overlapping intervals for one speaker and one level.
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub speaker: String,
    pub kind: TierKind,
    pub intervals: Vec<Interval>,
}

impl Tier {
    /// Tier name in the output document, e.g. `"Nate - word"`.
    pub fn name(&self) -> String {
        format!("{} - {}", self.speaker, self.kind.as_str())
    }
}

/// The assembled output document: all tiers plus the recording duration.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDocument {
    pub tiers: Vec<Tier>,
    pub duration: f64,
}

impl AnnotationDocument {
    pub fn tier(&self, speaker: &str, kind: TierKind) -> Option<&Tier> {
        self.tiers
            .iter()
            .find(|t| t.speaker == speaker && t.kind == kind)
    }
}

/// Assembles the final document from chunks and their successful alignments.
///
/// Chunks without an entry in `alignments` (failed, skipped, or cancelled)
/// are rendered as silence across their span. Fails with a reconciliation
/// error when shifted intervals overlap or escape their chunk's bounds,
/// naming the chunks involved.
pub fn assemble(
    chunks: &[Chunk],
    alignments: &HashMap<u64, ChunkAlignment>,
    duration: f64,
) -> Result<AnnotationDocument> {
    // Speakers in order of first appearance, chunks per speaker by start time.
    let mut speakers: Vec<&str> = Vec::new();
    let mut by_speaker: HashMap<&str, Vec<&Chunk>> = HashMap::new();
    for chunk in chunks {
        let entry = by_speaker.entry(chunk.speaker.as_str()).or_default();
        if entry.is_empty() {
            speakers.push(chunk.speaker.as_str());
        }
        entry.push(chunk);
    }

    let mut tiers = Vec::with_capacity(speakers.len() * 2);
    for speaker in speakers {
        let mut speaker_chunks = by_speaker.remove(speaker).unwrap_or_default();
        speaker_chunks.sort_by(|a, b| a.start.total_cmp(&b.start));

        for kind in [TierKind::Phone, TierKind::Word] {
            let intervals = build_tier(&speaker_chunks, alignments, duration, kind)?;
            tiers.push(Tier {
                speaker: speaker.to_string(),
                kind,
                intervals,
            });
        }
    }

    Ok(AnnotationDocument { tiers, duration })
}

fn build_tier(
    chunks: &[&Chunk],
    alignments: &HashMap<u64, ChunkAlignment>,
    duration: f64,
    kind: TierKind,
) -> Result<Vec<Interval>> {
    let mut intervals: Vec<Interval> = Vec::new();
    let mut cursor = 0.0_f64;
    let mut prev_chunk_id: Option<u64> = None;

    for chunk in chunks {
        // The audio may end before the transcript claims; everything past the
        // probed duration is unrepresentable. Chunks are sorted by start, so
        // once one begins past the end of the audio the rest do too.
        if chunk.start >= duration {
            break;
        }
        let chunk_end = chunk.end.min(duration);
        if chunk.start < cursor - BOUNDS_TOL {
            return Err(overlap_error(prev_chunk_id, chunk.id, chunk.start, cursor));
        }
        if chunk.start > cursor + EPS {
            intervals.push(Interval::silence(cursor, chunk.start));
        }
        cursor = cursor.max(chunk.start);

        match alignments.get(&chunk.id) {
            Some(alignment) => {
                let local = match kind {
                    TierKind::Word => &alignment.words,
                    TierKind::Phone => &alignment.phones,
                };
                for interval in local {
                    let g_start = interval.start + chunk.start;
                    let g_end = interval.end + chunk.start;
                    if g_start < chunk.start - BOUNDS_TOL || g_end > chunk.end + BOUNDS_TOL {
                        return Err(TieralignError::Reconciliation {
                            message: format!(
                                "chunk {} produced a {} interval [{:.3}, {:.3}] outside its bounds [{:.3}, {:.3}]",
                                chunk.id,
                                kind.as_str(),
                                g_start,
                                g_end,
                                chunk.start,
                                chunk.end
                            ),
                        });
                    }
                    if g_start < cursor - BOUNDS_TOL {
                        return Err(overlap_error(Some(chunk.id), chunk.id, g_start, cursor));
                    }
                    let g_start = g_start.max(cursor).min(chunk_end);
                    let g_end = g_end.clamp(g_start, chunk_end);
                    if g_start > cursor + EPS {
                        intervals.push(Interval::silence(cursor, g_start));
                    }
                    if g_end - g_start > EPS {
                        intervals.push(Interval::new(g_start, g_end, interval.label.clone()));
                    }
                    cursor = g_end.max(cursor);
                }
                if cursor < chunk_end - EPS {
                    intervals.push(Interval::silence(cursor, chunk_end));
                }
            }
            // Failed or skipped chunk: its whole span is silence.
            None => {
                if chunk_end > cursor + EPS {
                    intervals.push(Interval::silence(cursor, chunk_end));
                }
            }
        }
        cursor = cursor.max(chunk_end);
        prev_chunk_id = Some(chunk.id);
    }

    if cursor < duration - EPS {
        intervals.push(Interval::silence(cursor, duration));
    }

    Ok(coalesce_silence(intervals, duration))
}

fn overlap_error(prev: Option<u64>, chunk_id: u64, start: f64, cursor: f64) -> TieralignError {
    let message = match prev {
        Some(prev_id) if prev_id != chunk_id => format!(
            "chunks {prev_id} and {chunk_id} overlap: chunk {chunk_id} starts at {start:.3} before {cursor:.3}"
        ),
        _ => format!(
            "intervals within chunk {chunk_id} overlap: start {start:.3} precedes cursor {cursor:.3}"
        ),
    };
    TieralignError::Reconciliation { message }
}

/// Merges adjacent silence intervals and pins the final end to the duration.
fn coalesce_silence(intervals: Vec<Interval>, duration: f64) -> Vec<Interval> {
    let mut out: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        if interval.duration() <= EPS {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.is_silence() && interval.is_silence() => {
                last.end = interval.end;
            }
            _ => out.push(interval),
        }
    }
    if let Some(last) = out.last_mut() {
        if (last.end - duration).abs() <= BOUNDS_TOL {
            last.end = duration;
        }
    }
    out
}
