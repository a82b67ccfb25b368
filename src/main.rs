use anyhow::{Context, Result, bail};
use clap::Parser;
use std::collections::HashSet;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tieralign::aligner::{Aligner, CommandAligner};
use tieralign::audio;
use tieralign::chunker::{Chunk, chunk_records};
use tieralign::cli::{Cli, Commands};
use tieralign::config::{Config, LocaleConfig};
use tieralign::dictionary::{PronunciationDictionary, apply_rewrites};
use tieralign::pipeline::{
    ChunkJob, ChunkOutcome, ErrorReporter, LogReporter, Orchestrator, OrchestratorConfig,
    StageError, successful_alignments,
};
use tieralign::summary::RunSummary;
use tieralign::textgrid::write_textgrid;
use tieralign::timeline::assemble;
use tieralign::transcript::load_transcript;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())
        .context("loading configuration")?
        .with_env_overrides()?;

    match cli.command {
        Commands::Align {
            audio,
            transcript,
            output,
            dict,
            locale,
            import,
            aligner_path,
            noprompt,
            workers,
            timeout,
        } => run_align(
            &config,
            AlignArgs {
                audio,
                transcript,
                output,
                dict,
                locale,
                import,
                aligner_path,
                noprompt,
                workers,
                timeout,
                quiet: cli.quiet,
                verbose: cli.verbose,
            },
        ),
        Commands::Check {
            transcript,
            dict,
            locale,
            output,
        } => run_check(&config, &transcript, dict.as_deref(), locale.as_deref(), output.as_deref()),
        Commands::Import { file, dict, output } => run_import(&file, &dict, output.as_deref()),
    }
}

struct AlignArgs {
    audio: PathBuf,
    transcript: PathBuf,
    output: PathBuf,
    dict: Option<PathBuf>,
    locale: Option<String>,
    import: Option<PathBuf>,
    aligner_path: Option<PathBuf>,
    noprompt: bool,
    workers: Option<usize>,
    timeout: Option<Duration>,
    quiet: bool,
    verbose: u8,
}

fn run_align(config: &Config, args: AlignArgs) -> Result<()> {
    let locale = resolve_locale(config, args.locale.as_deref())?;
    let duration = audio::wav_duration_secs(&args.audio)?;

    let mut records = load_transcript(&args.transcript)?;
    // Transcripts sometimes run past the recording. Clamp to the probed
    // duration the way downstream tooling expects, and drop rows that start
    // after the audio ends.
    let before = records.len();
    records.retain(|r| r.start < duration);
    let dropped = before - records.len();
    if dropped > 0 && args.verbose > 0 {
        eprintln!("dropped {dropped} transcript row(s) starting after the audio ends");
    }
    for record in &mut records {
        if record.end > duration {
            record.end = duration;
        }
    }

    let mut dict = load_dictionary(config, args.dict.as_deref(), locale)?;
    if let Some(import_path) = &args.import {
        let import = PronunciationDictionary::load(import_path)?;
        dict.merge(&import);
    }

    let mut chunks = chunk_records(&records);
    if let Some(locale) = locale {
        for chunk in &mut chunks {
            chunk.words = apply_rewrites(&chunk.words, &locale.rewrites);
        }
    }

    let unknown = unknown_words(&chunks, &dict);
    if !unknown.is_empty() && !args.noprompt && std::io::stdin().is_terminal() {
        prompt_for_pronunciations(&mut dict, &unknown)?;
    }

    let mut jobs = Vec::with_capacity(chunks.len());
    let mut unresolved: Vec<String> = Vec::new();
    let mut seen_unresolved = HashSet::new();
    for chunk in &chunks {
        let (lexicon, missing) = dict.lexicon_for(&chunk.words);
        for word in missing {
            if seen_unresolved.insert(word.to_uppercase()) {
                unresolved.push(word);
            }
        }
        jobs.push(ChunkJob {
            chunk: chunk.clone(),
            lexicon,
        });
    }

    let aligner = build_aligner(config, &args, locale)?;
    if args.verbose > 0 {
        eprintln!(
            "aligning {} chunk(s) with the {} backend",
            jobs.len(),
            aligner.name()
        );
    }
    let reporter: Arc<dyn ErrorReporter> = Arc::new(LogReporter);
    let orchestrator = Orchestrator::new(
        Arc::new(aligner),
        OrchestratorConfig {
            workers: args.workers.unwrap_or(config.aligner.workers),
        },
    )
    .with_reporter(Arc::clone(&reporter));

    // Ctrl-C stops submission of new chunks; in-flight invocations finish and
    // the completed results are still reconciled as a partial set.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst))
            .context("installing the interrupt handler")?;
    }
    let outcomes = orchestrator.run(&args.audio, jobs, cancel);

    if args.verbose > 0 {
        for outcome in &outcomes {
            match outcome {
                ChunkOutcome::Succeeded(a) => eprintln!("chunk {}: aligned", a.chunk_id),
                ChunkOutcome::Failed {
                    chunk_id,
                    diagnostic,
                } => eprintln!("chunk {chunk_id}: failed: {diagnostic}"),
                ChunkOutcome::Skipped { chunk_id, reason } => {
                    eprintln!("chunk {chunk_id}: skipped: {reason}");
                }
            }
        }
    }

    let alignments = successful_alignments(&outcomes);
    let document = match assemble(&chunks, &alignments, duration) {
        Ok(document) => document,
        Err(e) => {
            reporter.report("reconcile", &StageError::Fatal(e.to_string()));
            return Err(e.into());
        }
    };
    write_textgrid(&document, &args.output)?;

    let summary = RunSummary::new(&chunks, &outcomes, unresolved, duration);
    summary.write_json(&runlog_path(&args.output))?;
    if !args.quiet {
        eprintln!("{}", summary.report());
    }

    if summary.succeeded == 0 && summary.total_chunks > 0 {
        bail!("no chunk could be aligned; see {:?}", runlog_path(&args.output));
    }
    Ok(())
}

fn run_check(
    config: &Config,
    transcript: &Path,
    dict_path: Option<&Path>,
    locale_id: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let locale = resolve_locale(config, locale_id)?;
    let dict = load_dictionary(config, dict_path, locale)?;

    let records = load_transcript(transcript)?;
    let mut chunks = chunk_records(&records);
    if let Some(locale) = locale {
        for chunk in &mut chunks {
            chunk.words = apply_rewrites(&chunk.words, &locale.rewrites);
        }
    }

    let missing = unknown_words(&chunks, &dict);
    match output {
        Some(path) => {
            let mut file = std::fs::File::create(path)?;
            for word in &missing {
                writeln!(file, "{word}")?;
            }
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for word in &missing {
                writeln!(out, "{word}")?;
            }
        }
    }
    eprintln!("{} word(s) missing from the dictionary", missing.len());
    Ok(())
}

fn run_import(file: &Path, dict_path: &Path, output: Option<&Path>) -> Result<()> {
    let mut dict = PronunciationDictionary::load(dict_path)?;
    let incoming = PronunciationDictionary::load(file)?;
    let before = dict.len();
    dict.merge(&incoming);
    dict.write_tsv(output.unwrap_or(dict_path))?;
    eprintln!("added {} new word(s)", dict.len() - before);
    Ok(())
}

fn resolve_locale<'a>(config: &'a Config, id: Option<&str>) -> Result<Option<&'a LocaleConfig>> {
    match id {
        Some(id) => Ok(Some(config.locale(id)?)),
        None => Ok(None),
    }
}

fn load_dictionary(
    config: &Config,
    cli_path: Option<&Path>,
    locale: Option<&LocaleConfig>,
) -> Result<PronunciationDictionary> {
    let path = cli_path
        .map(Path::to_path_buf)
        .or_else(|| locale.and_then(|l| l.dictionary_path.clone()))
        .or_else(|| config.dictionary.path.clone());
    match path {
        Some(path) => Ok(PronunciationDictionary::load(&path)?),
        None => bail!("no pronunciation dictionary: pass --dict or set one in the configuration"),
    }
}

fn build_aligner(
    config: &Config,
    args: &AlignArgs,
    locale: Option<&LocaleConfig>,
) -> Result<CommandAligner> {
    let tool = args
        .aligner_path
        .clone()
        .or_else(|| config.aligner.tool.clone());
    let Some(tool) = tool else {
        bail!("no aligner executable: pass --aligner-path or set aligner.tool in the configuration");
    };
    let mut aligner = CommandAligner::new(tool).with_timeout(
        args.timeout
            .unwrap_or(Duration::from_secs(config.aligner.timeout_secs)),
    );
    if let Some(model) = locale.and_then(|l| l.model_path.clone()) {
        aligner = aligner.with_model_dir(model);
    }
    Ok(aligner)
}

/// Unique transcript words absent from the dictionary, in first-appearance
/// order.
fn unknown_words(chunks: &[Chunk], dict: &PronunciationDictionary) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for chunk in chunks {
        for word in &chunk.words {
            if !dict.contains(word) && seen.insert(word.to_uppercase()) {
                out.push(word.clone());
            }
        }
    }
    out
}

fn prompt_for_pronunciations(
    dict: &mut PronunciationDictionary,
    unknown: &[String],
) -> Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    eprintln!(
        "{} word(s) missing from the dictionary; enter a phone sequence, or leave empty to skip",
        unknown.len()
    );
    for word in unknown {
        eprint!("{word}: ");
        let Some(line) = lines.next() else { break };
        let line = line?;
        let pron = line.trim();
        if !pron.is_empty() {
            dict.add_pronunciation(word, pron);
        }
    }
    Ok(())
}

fn runlog_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".runlog.json");
    PathBuf::from(name)
}
