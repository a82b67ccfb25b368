//! Chunk-level alignment orchestration.
//!
//! Fans chunk jobs out to a pool of worker threads, each invoking the aligner
//! backend, and collects per-chunk outcomes. A failed chunk never aborts the
//! run; it is recorded and the remaining chunks proceed.

use crate::aligner::Aligner;
use crate::chunker::Chunk;
use crate::dictionary::LexiconEntry;
use crate::error::TieralignError;
use crate::timeline::ChunkAlignment;
use crossbeam_channel::bounded;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use super::error::{ErrorReporter, LogReporter, StageError};

/// One unit of work: a chunk plus its resolved lexicon.
#[derive(Debug, Clone)]
pub struct ChunkJob {
    pub chunk: Chunk,
    pub lexicon: Vec<LexiconEntry>,
}

/// Result of attempting to align one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    Succeeded(ChunkAlignment),
    Failed { chunk_id: u64, diagnostic: String },
    Skipped { chunk_id: u64, reason: String },
}

impl ChunkOutcome {
    pub fn chunk_id(&self) -> u64 {
        match self {
            ChunkOutcome::Succeeded(alignment) => alignment.chunk_id,
            ChunkOutcome::Failed { chunk_id, .. } => *chunk_id,
            ChunkOutcome::Skipped { chunk_id, .. } => *chunk_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ChunkOutcome::Succeeded(_))
    }
}

/// Orchestrator tuning knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Number of worker threads aligning chunks concurrently.
    pub workers: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { workers: 4 }
    }
}

/// Runs chunk alignment jobs across a worker pool.
pub struct Orchestrator {
    aligner: Arc<dyn Aligner>,
    config: OrchestratorConfig,
    reporter: Arc<dyn ErrorReporter>,
}

impl Orchestrator {
    pub fn new(aligner: Arc<dyn Aligner>, config: OrchestratorConfig) -> Self {
        Self {
            aligner,
            config,
            reporter: Arc::new(LogReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Aligns all jobs and returns one outcome per job, sorted by chunk id.
    ///
    /// Chunks too short for the acoustic model and chunks with nothing to
    /// align are skipped without reaching a worker. Setting `cancel` stops
    /// submission; jobs not yet submitted come back as skipped.
    pub fn run(
        &self,
        audio: &Path,
        jobs: Vec<ChunkJob>,
        cancel: Arc<AtomicBool>,
    ) -> Vec<ChunkOutcome> {
        let mut outcomes: Vec<ChunkOutcome> = Vec::with_capacity(jobs.len());
        let mut runnable: Vec<ChunkJob> = Vec::with_capacity(jobs.len());
        for job in jobs {
            if job.chunk.is_too_short() {
                outcomes.push(ChunkOutcome::Skipped {
                    chunk_id: job.chunk.id,
                    reason: "breath group too short to align".to_string(),
                });
            } else if job.lexicon.is_empty() {
                outcomes.push(ChunkOutcome::Skipped {
                    chunk_id: job.chunk.id,
                    reason: "no alignable words".to_string(),
                });
            } else {
                runnable.push(job);
            }
        }

        if runnable.is_empty() {
            outcomes.sort_by_key(ChunkOutcome::chunk_id);
            return outcomes;
        }

        let workers = self.config.workers.max(1).min(runnable.len());
        let (job_tx, job_rx) = bounded::<ChunkJob>(workers * 2);
        let (result_tx, result_rx) = bounded::<ChunkOutcome>(runnable.len());

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let aligner = Arc::clone(&self.aligner);
            let reporter = Arc::clone(&self.reporter);
            let audio: PathBuf = audio.to_path_buf();
            handles.push(thread::spawn(move || {
                for job in job_rx.iter() {
                    let outcome = match aligner.align(&audio, &job.chunk, &job.lexicon) {
                        Ok(alignment) => ChunkOutcome::Succeeded(alignment),
                        Err(e) => {
                            let diagnostic = match &e {
                                TieralignError::ChunkAlignment { message, .. } => message.clone(),
                                other => other.to_string(),
                            };
                            reporter.report(
                                "align",
                                &StageError::Recoverable(format!(
                                    "chunk {}: {diagnostic}",
                                    job.chunk.id
                                )),
                            );
                            ChunkOutcome::Failed {
                                chunk_id: job.chunk.id,
                                diagnostic,
                            }
                        }
                    };
                    if result_tx.send(outcome).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(job_rx);
        drop(result_tx);

        let mut submitted = 0usize;
        for job in &runnable {
            if cancel.load(Ordering::SeqCst) {
                break;
            }
            if job_tx.send(job.clone()).is_err() {
                break;
            }
            submitted += 1;
        }
        drop(job_tx);

        for job in runnable.iter().skip(submitted) {
            outcomes.push(ChunkOutcome::Skipped {
                chunk_id: job.chunk.id,
                reason: "cancelled".to_string(),
            });
        }

        for outcome in result_rx.iter() {
            outcomes.push(outcome);
        }
        for handle in handles {
            let _ = handle.join();
        }

        outcomes.sort_by_key(ChunkOutcome::chunk_id);
        outcomes
    }
}

/// Collects successful alignments keyed by chunk id.
pub fn successful_alignments(outcomes: &[ChunkOutcome]) -> HashMap<u64, ChunkAlignment> {
    outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            ChunkOutcome::Succeeded(alignment) => {
                Some((alignment.chunk_id, alignment.clone()))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::MockAligner;
    use crate::timeline::assemble;
    use std::sync::Mutex;
    use std::time::Duration;

    struct CollectingReporter {
        reports: Mutex<Vec<(String, StageError)>>,
    }

    impl CollectingReporter {
        fn new() -> Self {
            Self {
                reports: Mutex::new(Vec::new()),
            }
        }
    }

    impl ErrorReporter for CollectingReporter {
        fn report(&self, stage: &str, error: &StageError) {
            self.reports
                .lock()
                .unwrap()
                .push((stage.to_string(), error.clone()));
        }
    }

    fn job(id: u64, start: f64, end: f64, words: &[&str]) -> ChunkJob {
        ChunkJob {
            chunk: Chunk {
                id,
                speaker: "Nate".to_string(),
                start,
                end,
                words: words.iter().map(|w| w.to_string()).collect(),
            },
            lexicon: words
                .iter()
                .map(|w| LexiconEntry {
                    word: w.to_string(),
                    phones: vec!["HH".to_string()],
                })
                .collect(),
        }
    }

    fn run_jobs(aligner: MockAligner, jobs: Vec<ChunkJob>) -> Vec<ChunkOutcome> {
        let orchestrator =
            Orchestrator::new(Arc::new(aligner), OrchestratorConfig { workers: 2 });
        orchestrator.run(
            Path::new("audio.wav"),
            jobs,
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[test]
    fn test_all_chunks_succeed() {
        let jobs = vec![
            job(1, 0.0, 1.0, &["A"]),
            job(2, 1.0, 2.0, &["B"]),
            job(3, 2.0, 3.0, &["C"]),
        ];
        let outcomes = run_jobs(MockAligner::new(), jobs);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(ChunkOutcome::is_success));
    }

    #[test]
    fn test_outcomes_sorted_by_chunk_id() {
        let jobs: Vec<ChunkJob> = (1..=20)
            .map(|i| job(i, i as f64, i as f64 + 0.5, &["A"]))
            .collect();
        let outcomes = run_jobs(MockAligner::new(), jobs);
        let ids: Vec<u64> = outcomes.iter().map(ChunkOutcome::chunk_id).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<u64>>());
    }

    #[test]
    fn test_failed_chunk_does_not_abort_run() {
        let jobs = vec![
            job(1, 0.0, 1.0, &["A"]),
            job(2, 1.0, 2.0, &["B"]),
            job(3, 2.0, 3.0, &["C"]),
        ];
        let outcomes = run_jobs(MockAligner::new().with_failing_chunk(2), jobs);
        assert!(outcomes[0].is_success());
        assert!(matches!(
            outcomes[1],
            ChunkOutcome::Failed { chunk_id: 2, .. }
        ));
        assert!(outcomes[2].is_success());
    }

    #[test]
    fn test_too_short_chunk_skipped() {
        let jobs = vec![job(1, 0.0, 0.04, &["A"]), job(2, 1.0, 2.0, &["B"])];
        let outcomes = run_jobs(MockAligner::new(), jobs);
        match &outcomes[0] {
            ChunkOutcome::Skipped { chunk_id, reason } => {
                assert_eq!(*chunk_id, 1);
                assert!(reason.contains("too short"));
            }
            other => panic!("expected skip, got {other:?}"),
        }
        assert!(outcomes[1].is_success());
    }

    #[test]
    fn test_empty_lexicon_skipped() {
        let mut j = job(1, 0.0, 1.0, &[]);
        j.lexicon.clear();
        let outcomes = run_jobs(MockAligner::new(), vec![j]);
        assert!(matches!(outcomes[0], ChunkOutcome::Skipped { .. }));
    }

    #[test]
    fn test_cancel_skips_unsubmitted_jobs() {
        let jobs: Vec<ChunkJob> = (1..=50)
            .map(|i| job(i, i as f64, i as f64 + 0.5, &["A"]))
            .collect();
        let aligner = MockAligner::new().with_delay(Duration::from_millis(20));
        let orchestrator =
            Orchestrator::new(Arc::new(aligner), OrchestratorConfig { workers: 1 });
        let cancel = Arc::new(AtomicBool::new(false));
        cancel.store(true, Ordering::SeqCst);
        let outcomes = orchestrator.run(Path::new("audio.wav"), jobs, cancel);
        assert_eq!(outcomes.len(), 50);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, ChunkOutcome::Skipped { .. })));
    }

    #[test]
    fn test_cancel_mid_run_keeps_completed_results() {
        let jobs: Vec<ChunkJob> = (1..=30)
            .map(|i| job(i, i as f64, i as f64 + 0.5, &["A"]))
            .collect();
        let chunks: Vec<Chunk> = jobs.iter().map(|j| j.chunk.clone()).collect();
        let aligner = MockAligner::new().with_delay(Duration::from_millis(20));
        let orchestrator =
            Orchestrator::new(Arc::new(aligner), OrchestratorConfig { workers: 1 });

        let cancel = Arc::new(AtomicBool::new(false));
        let trigger = Arc::clone(&cancel);
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            trigger.store(true, Ordering::SeqCst);
        });
        let outcomes = orchestrator.run(Path::new("audio.wav"), jobs, cancel);
        canceller.join().unwrap();

        assert_eq!(outcomes.len(), 30);
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let cancelled = outcomes
            .iter()
            .filter(|o| matches!(o, ChunkOutcome::Skipped { reason, .. } if reason == "cancelled"))
            .count();
        assert!(succeeded >= 1, "in-flight chunks should finish");
        assert!(cancelled >= 1, "unsubmitted chunks should be skipped");

        // Reconciliation proceeds over the partial set; unreached chunks
        // come out as silence.
        let doc = assemble(&chunks, &successful_alignments(&outcomes), 31.0).unwrap();
        let tier = &doc.tiers[0];
        assert_eq!(tier.intervals.last().unwrap().end, 31.0);
        assert!(tier.intervals.iter().any(|i| i.is_silence()));
        let labeled = tier.intervals.iter().filter(|i| !i.is_silence()).count();
        assert_eq!(labeled, succeeded);
    }

    #[test]
    fn test_failures_are_reported_as_recoverable() {
        let reporter = Arc::new(CollectingReporter::new());
        let orchestrator = Orchestrator::new(
            Arc::new(MockAligner::new().with_failing_chunk(2)),
            OrchestratorConfig { workers: 2 },
        )
        .with_reporter(Arc::clone(&reporter) as Arc<dyn ErrorReporter>);

        let jobs = vec![job(1, 0.0, 1.0, &["A"]), job(2, 1.0, 2.0, &["B"])];
        orchestrator.run(
            Path::new("audio.wav"),
            jobs,
            Arc::new(AtomicBool::new(false)),
        );

        let reports = reporter.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "align");
        match &reports[0].1 {
            StageError::Recoverable(msg) => assert!(msg.contains("chunk 2")),
            other => panic!("expected a recoverable report, got {other:?}"),
        }
    }

    #[test]
    fn test_successful_alignments_map() {
        let jobs = vec![job(1, 0.0, 1.0, &["A"]), job(2, 1.0, 2.0, &["B"])];
        let outcomes = run_jobs(MockAligner::new().with_failing_chunk(1), jobs);
        let map = successful_alignments(&outcomes);
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&2));
    }

    #[test]
    fn test_empty_job_list() {
        let outcomes = run_jobs(MockAligner::new(), Vec::new());
        assert!(outcomes.is_empty());
    }
}
