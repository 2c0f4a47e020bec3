//! Reps CLI - Command-line interface for Synheart Reps
//!
//! Commands:
//! - replay: Run a recorded keypoint session through the engine (batch mode)
//! - run: Process frames streamed on stdin (streaming mode)
//! - modes: List the supported exercise modes
//! - config: Print the default configuration or validate a configuration file

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use synheart_reps::report::{replay_frames, ReplayRecorder};
use synheart_reps::{EngineConfig, EngineError, EngineOutput, ExerciseMode, Frame, RepEngine};
use synheart_reps::{ENGINE_VERSION, PRODUCER_NAME};

/// Reps - Activity and repetition engine driven by pose keypoints
#[derive(Parser)]
#[command(name = "reps")]
#[command(author = "Synheart AI Inc")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Count exercise repetitions from pose keypoint frames", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded session (batch mode)
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Exercise mode, e.g. pull_up
        #[arg(short, long)]
        mode: String,

        /// Engine configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Write one output record per frame to stdout
        #[arg(long)]
        outputs: bool,

        /// Write the session report to this path (use - for stdout)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Process frames streamed on stdin, one JSON frame per line (streaming mode)
    Run {
        /// Exercise mode, e.g. push_up
        #[arg(short, long)]
        mode: String,

        /// Engine configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the session report to stderr on exit
        #[arg(long)]
        report: bool,

        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// List supported exercise modes
    Modes {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration, or validate a configuration file
    Config {
        /// Configuration file to validate
        #[arg(long)]
        validate: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one frame per line)
    Ndjson,
    /// JSON array of frames
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), RepsCliError> {
    match cli.command {
        Commands::Replay {
            input,
            mode,
            config,
            input_format,
            outputs,
            report,
        } => cmd_replay(&input, &mode, config.as_deref(), input_format, outputs, report.as_deref()),

        Commands::Run {
            mode,
            config,
            report,
            flush,
        } => cmd_run(&mode, config.as_deref(), report, flush),

        Commands::Modes { json } => cmd_modes(json),

        Commands::Config { validate } => cmd_config(validate.as_deref()),
    }
}

fn build_engine(mode: &str, config: Option<&Path>) -> Result<RepEngine, RepsCliError> {
    let mode: ExerciseMode = mode.parse()?;
    let config = match config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    Ok(RepEngine::with_config(mode, config)?)
}

fn cmd_replay(
    input: &Path,
    mode: &str,
    config: Option<&Path>,
    input_format: InputFormat,
    outputs: bool,
    report: Option<&Path>,
) -> Result<(), RepsCliError> {
    let mut engine = build_engine(mode, config)?;

    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let frames = match input_format {
        InputFormat::Ndjson => Frame::parse_ndjson(&input_data)?,
        InputFormat::Json => Frame::parse_array(&input_data)?,
    };
    if frames.is_empty() {
        return Err(RepsCliError::NoFrames);
    }

    let (results, summary) = replay_frames(&mut engine, &frames);

    if outputs {
        let mut stdout = io::stdout().lock();
        for output in &results {
            writeln!(stdout, "{}", serde_json::to_string(output)?)?;
        }
    }

    let summary_json = summary.to_json()?;
    match report {
        Some(path) if path.to_string_lossy() != "-" => fs::write(path, summary_json)?,
        Some(_) => println!("{}", summary_json),
        None if !outputs => println!("{}", summary_json),
        None => {}
    }

    Ok(())
}

fn cmd_run(mode: &str, config: Option<&Path>, report: bool, flush: bool) -> Result<(), RepsCliError> {
    let mut engine = build_engine(mode, config)?;
    let mut recorder = ReplayRecorder::new(engine.mode());

    if atty::is(atty::Stream::Stdin) {
        eprintln!("Reading frames from stdin, one JSON object per line (Ctrl-D to finish)");
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let frame = Frame::from_json(trimmed)
            .map_err(|e| RepsCliError::ParseError(format!("line {}: {}", line_no + 1, e)))?;

        let output: EngineOutput = engine.process(&frame, frame.timestamp_ms);
        recorder.record(frame.timestamp_ms, &output);

        writeln!(stdout, "{}", serde_json::to_string(&output)?)?;
        if flush {
            stdout.flush()?;
        }
    }
    stdout.flush()?;

    if report {
        eprintln!("{}", recorder.finish().to_json()?);
    }

    Ok(())
}

fn cmd_modes(json: bool) -> Result<(), RepsCliError> {
    let modes: Vec<ModeInfo> = ExerciseMode::ALL
        .iter()
        .map(|mode| ModeInfo {
            name: mode.as_str().to_string(),
            archetype: mode.archetype().as_str().to_string(),
            counts_reps: mode.counts_reps(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&modes)?);
    } else {
        println!("{} {} - exercise modes", PRODUCER_NAME, ENGINE_VERSION);
        println!();
        for mode in &modes {
            let kind = if mode.counts_reps { "reps" } else { "timed" };
            println!("  {:<20} {:<12} {}", mode.name, mode.archetype, kind);
        }
    }
    Ok(())
}

fn cmd_config(validate: Option<&Path>) -> Result<(), RepsCliError> {
    match validate {
        Some(path) => {
            let config = EngineConfig::from_json(&fs::read_to_string(path)?)?;
            eprintln!("Configuration is valid");
            println!("{}", config.to_json()?);
        }
        None => println!("{}", EngineConfig::default().to_json()?),
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum RepsCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    NoFrames,
    ParseError(String),
}

impl From<io::Error> for RepsCliError {
    fn from(e: io::Error) -> Self {
        RepsCliError::Io(e)
    }
}

impl From<EngineError> for RepsCliError {
    fn from(e: EngineError) -> Self {
        RepsCliError::Engine(e)
    }
}

impl From<serde_json::Error> for RepsCliError {
    fn from(e: serde_json::Error) -> Self {
        RepsCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RepsCliError> for CliError {
    fn from(e: RepsCliError) -> Self {
        match e {
            RepsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RepsCliError::Engine(e) => {
                let (code, hint) = match &e {
                    EngineError::UnknownMode(_) => ("UNKNOWN_MODE", "Run 'reps modes' for the supported modes"),
                    EngineError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", "Run 'reps config' to see the default configuration")
                    }
                    _ => ("PARSE_ERROR", "Frames are JSON objects with timestamp_ms and landmarks"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            RepsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            RepsCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            RepsCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

#[derive(serde::Serialize)]
struct ModeInfo {
    name: String,
    archetype: String,
    counts_reps: bool,
}
