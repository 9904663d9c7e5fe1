//! marker-pose CLI: replay detection logs through the pose tracking pipeline.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};
use marker_pose::replay::replay;
use marker_pose::tracker::{DisambiguationStrategy, MarkerTrackerConfig, OutputMapping};
use marker_pose::{SessionConfig, TrackingSession};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "marker-pose")]
#[command(about = "Stable single-marker pose tracking from recorded detections")]
#[command(version)]
struct Cli {
    /// Log verbosity written to stderr.
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines detection log and emit one pose report per frame.
    Replay(ReplayArgs),

    /// Write a session config with default tracking parameters.
    SampleConfig(SampleConfigArgs),
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    /// Session config (JSON).
    #[arg(long)]
    config: PathBuf,

    /// Detection log, one JSON frame per line.
    #[arg(long)]
    detections: PathBuf,

    /// Where to write pose reports (JSON lines). Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct SampleConfigArgs {
    /// Destination path.
    #[arg(long)]
    output: PathBuf,

    /// Marker IDs to track.
    #[arg(long = "marker-id", required = true, num_args = 1..)]
    marker_ids: Vec<u32>,

    /// Physical marker side length; translations use the same unit.
    #[arg(long, default_value = "50.0")]
    marker_size: f64,

    /// Candidate selection heuristic.
    #[arg(long, value_enum, default_value_t = StrategyArg::Normal)]
    strategy: StrategyArg,

    /// Scale from marker units to renderer units.
    #[arg(long, default_value = "1.0")]
    scale: f64,

    /// Keep the camera's +Z forward instead of the renderer's -Z.
    #[arg(long)]
    no_flip_z: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Best,
    Normal,
    Translation,
}

impl From<StrategyArg> for DisambiguationStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Best => DisambiguationStrategy::BestOnly,
            StrategyArg::Normal => DisambiguationStrategy::default(),
            StrategyArg::Translation => {
                DisambiguationStrategy::TranslationContinuity { min_jump: 20.0 }
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    init_logging(cli.log_level.into())?;

    match cli.command {
        Commands::Replay(args) => run_replay(&args),
        Commands::SampleConfig(args) => run_sample_config(&args),
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(level: LevelFilter) -> CliResult<()> {
    marker_pose::core::init_with_level(level)?;
    Ok(())
}

/// `RUST_LOG`, when set, overrides `--log-level`.
#[cfg(feature = "tracing")]
fn init_logging(level: LevelFilter) -> CliResult<()> {
    marker_pose::core::init_tracing(false, level);
    Ok(())
}

fn run_replay(args: &ReplayArgs) -> CliResult<()> {
    info!("loading session config: {}", args.config.display());
    let config = SessionConfig::load_json(&args.config)?;
    let mut session = TrackingSession::new(config)?;
    let ids: Vec<String> = session.marker_ids().map(|id| id.to_string()).collect();
    info!("tracking marker(s) {}", ids.join(", "));

    let input = BufReader::new(File::open(&args.detections).map_err(|e| -> CliError {
        format!("failed to open {}: {e}", args.detections.display()).into()
    })?);

    let summary = match &args.output {
        Some(path) => {
            let out = BufWriter::new(File::create(path)?);
            let summary = replay(&mut session, input, out)?;
            info!("wrote {}", path.display());
            summary
        }
        None => replay(&mut session, input, io::stdout().lock())?,
    };

    if summary.frames == 0 {
        log::warn!("detection log {} had no frames", args.detections.display());
    }
    Ok(())
}

fn run_sample_config(args: &SampleConfigArgs) -> CliResult<()> {
    let output = OutputMapping {
        scale: args.scale,
        flip_z: !args.no_flip_z,
    };
    let markers = args
        .marker_ids
        .iter()
        .map(|&id| MarkerTrackerConfig {
            disambiguation: args.strategy.into(),
            output,
            ..MarkerTrackerConfig::new(id, args.marker_size)
        })
        .collect();
    let config = SessionConfig {
        markers,
        ..SessionConfig::default()
    };

    // Validate before writing.
    TrackingSession::new(config.clone())?;
    config.write_json(&args.output)?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "wrote {}", args.output.display())?;
    Ok(())
}
