use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cry_classifier::analysis::ClassificationResult;
use cry_classifier::audio::{load_wav_stream, CancellationToken, CaptureOutcome, WavSource};
use cry_classifier::config::AppConfig;
use cry_classifier::context::{PipelineContext, PipelineOutcome};
use cry_classifier::engine::DenseEngineFactory;
use serde::Serialize;

/// Exit code when a recording was too short to classify
const EXIT_NO_RESULT: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "cry_cli", about = "Infant cry classification from WAV files or the microphone")]
struct Cli {
    /// JSON configuration file (defaults are used when absent)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the MFCC feature vector of a WAV file as JSON
    Features {
        #[arg(long)]
        wav: PathBuf,
        /// Print the per-frame matrix instead of the pooled vector
        #[arg(long)]
        frames: bool,
    },
    /// Classify a WAV file as if it had been recorded
    Classify {
        #[arg(long)]
        wav: PathBuf,
        /// Dense model JSON (falls back to inference.model_path)
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Record from the default microphone until Ctrl-C or the duration cap
    Record {
        #[arg(long)]
        model: Option<PathBuf>,
        /// Also write the captured audio to this WAV file
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Report {
    Classified {
        #[serde(flatten)]
        result: ClassificationResult,
    },
    NoResult {
        samples: usize,
        required: usize,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    cry_classifier::init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Features { wav, frames } => run_features(config, &wav, frames),
        Commands::Classify { wav, model } => run_classify(config, &wav, model.as_deref()),
        Commands::Record { model, save } => run_record(config, model.as_deref(), save.as_deref()),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_context(config: AppConfig, model: Option<&Path>) -> Result<PipelineContext<DenseEngineFactory>> {
    let ctx = PipelineContext::new(config, DenseEngineFactory).context("invalid configuration")?;
    match model {
        Some(path) => ctx
            .load_model_file(path)
            .with_context(|| format!("loading model {}", path.display()))?,
        None => {
            if !ctx.load_configured_model().context("loading configured model")? {
                bail!("no model given: pass --model or set inference.model_path");
            }
        }
    }
    Ok(ctx)
}

fn run_features(config: AppConfig, wav: &Path, frames: bool) -> Result<ExitCode> {
    let ctx = PipelineContext::new(config, DenseEngineFactory).context("invalid configuration")?;
    let stream = load_wav_stream(wav, ctx.config().features.sample_rate)
        .with_context(|| format!("reading {}", wav.display()))?;

    if frames {
        let matrix = ctx.extractor().extract_frames(stream.samples());
        println!("{}", serde_json::to_string(&matrix)?);
    } else {
        let features = ctx.extract(&stream)?;
        println!("{}", serde_json::to_string(&features)?);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_classify(config: AppConfig, wav: &Path, model: Option<&Path>) -> Result<ExitCode> {
    let ctx = build_context(config, model)?;
    let mut source = WavSource::new(wav);
    let outcome = ctx
        .record_and_classify(&mut source, &CancellationToken::new())
        .with_context(|| format!("classifying {}", wav.display()))?;

    let report = match outcome {
        PipelineOutcome::Classified(result) => Report::Classified { result },
        PipelineOutcome::NoResult { samples, required } => Report::NoResult { samples, required },
    };
    emit(&report)
}

#[cfg(not(target_os = "android"))]
fn run_record(config: AppConfig, model: Option<&Path>, save: Option<&Path>) -> Result<ExitCode> {
    use cry_classifier::audio::MicrophoneSource;

    let ctx = build_context(config, model)?;
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    runtime.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Ctrl-C received, stopping capture");
            signal_token.cancel();
        }
    });

    eprintln!(
        "Recording up to {:.1}s, press Ctrl-C to stop...",
        ctx.config().capture.max_duration_secs
    );
    let mut source = MicrophoneSource::new();
    let outcome = ctx.record(&mut source, &token).context("recording")?;

    let stream = match outcome {
        CaptureOutcome::Captured(stream) => stream,
        CaptureOutcome::TooShort { samples, required } => {
            return emit(&Report::NoResult { samples, required });
        }
    };

    if let Some(path) = save {
        stream
            .write_wav(path)
            .with_context(|| format!("saving {}", path.display()))?;
        log::info!("Saved recording to {}", path.display());
    }

    let result = runtime
        .block_on(ctx.classify_in_background(stream))
        .context("classifying recording")?;
    emit(&Report::Classified { result })
}

#[cfg(target_os = "android")]
fn run_record(_config: AppConfig, _model: Option<&Path>, _save: Option<&Path>) -> Result<ExitCode> {
    bail!("microphone capture is not available from the CLI on Android")
}

fn emit(report: &Report) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(match report {
        Report::Classified { .. } => ExitCode::SUCCESS,
        Report::NoResult { .. } => ExitCode::from(EXIT_NO_RESULT),
    })
}
