//! turncoder CLI - Command-line interface for the turn coding engine
//!
//! Commands:
//! - stats: Compute interaction statistics for a saved session
//! - report: Render the plain-text turn log for a saved session
//! - validate: Check a saved session for structural problems
//! - scheme: Print the coding scheme registry

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};

use turncoder::encoder::{render_statistics_text, render_turn_log_text, StatisticsEncoder};
use turncoder::scheme::{self, CommunicationMode, ParentalStyle, Strategy, VocalizationType};
use turncoder::session::{parse_session, SessionFile, TurnLog, UnknownStrategy};
use turncoder::{CodingError, ENGINE_VERSION, SCHEME_VERSION};

/// turncoder - Statistics engine for coded parent-child communication turns
#[derive(Parser)]
#[command(name = "turncoder")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Compute interaction statistics from coded turn sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute interaction statistics for a saved session
    Stats {
        /// Input session file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: StatsFormat,
    },

    /// Render the plain-text turn log for a saved session
    Report {
        /// Input session file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Check a saved session for structural problems
    Validate {
        /// Input session file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the coding scheme registry
    Scheme {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum StatsFormat {
    /// Compact JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
    /// Plain-text statistics report
    Text,
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), TurncoderCliError> {
    match cli.command {
        Commands::Stats {
            input,
            output,
            format,
        } => cmd_stats(&input, &output, format),
        Commands::Report { input, output } => cmd_report(&input, &output),
        Commands::Validate { input, json } => cmd_validate(&input, json),
        Commands::Scheme { json } => cmd_scheme(json),
    }
}

fn cmd_stats(input: &Path, output: &Path, format: StatsFormat) -> Result<(), TurncoderCliError> {
    let session = parse_session(&read_input(input)?)?;
    let log = TurnLog::from_session(&session)?;
    let statistics = log.statistics();

    let output_data = match format {
        StatsFormat::Json => {
            let report = StatisticsEncoder::new().encode(
                &session.video_filename,
                log.turns(),
                &statistics,
            );
            serde_json::to_string(&report)? + "\n"
        }
        StatsFormat::JsonPretty => {
            let encoder = StatisticsEncoder::new();
            encoder.encode_to_json(&session.video_filename, log.turns(), &statistics)? + "\n"
        }
        StatsFormat::Text => render_statistics_text(&statistics, Utc::now()),
    };

    write_output(output, &output_data)
}

fn cmd_report(input: &Path, output: &Path) -> Result<(), TurncoderCliError> {
    let session = parse_session(&read_input(input)?)?;
    let log = TurnLog::from_session(&session)?;
    write_output(output, &render_turn_log_text(log.turns()))
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), TurncoderCliError> {
    let session = parse_session(&read_input(input)?)?;
    let report = ValidationReport::for_session(&session);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Video:              {}", report.video_filename);
        println!("Total turns:        {}", report.total_turns);
        println!("Classified turns:   {}", report.classified_turns);
        println!("Unknown strategies: {}", report.unknown_strategies.len());

        for unknown in &report.unknown_strategies {
            println!(
                "  - Turn {}: '{}' is not in the coding scheme (ignored)",
                unknown.turn_id, unknown.strategy_id
            );
        }

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {}", err);
            }
        }
    }

    if report.errors.is_empty() {
        Ok(())
    } else {
        Err(TurncoderCliError::ValidationFailed(report.errors.len()))
    }
}

fn cmd_scheme(json: bool) -> Result<(), TurncoderCliError> {
    let report = SchemeReport::current();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Coding Scheme: {}", report.scheme_version);
    println!();
    println!("Communication modes:");
    for label in &report.communication_modes {
        println!("  - {}", label);
    }
    println!();
    println!("Vocalization types:");
    for label in &report.vocalization_types {
        println!("  - {}", label);
    }
    println!();
    println!("Parent communication strategies:");
    for strategy in report.strategies {
        let tags: Vec<&str> = strategy.styles.iter().map(|s| s.code()).collect();
        if tags.is_empty() {
            println!("  {:<18} {}", strategy.id, strategy.label);
        } else {
            println!(
                "  {:<18} {} [{}]",
                strategy.id,
                strategy.label,
                tags.join(", ")
            );
        }
    }
    println!();
    println!(
        "Style codes: {}",
        ParentalStyle::ALL
            .iter()
            .map(|s| format!("{} = {}", s.code(), s))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, TurncoderCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            warn!("reading session from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        debug!(path = %input.display(), "reading session file");
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), TurncoderCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error types

enum TurncoderCliError {
    Io(io::Error),
    Coding(CodingError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for TurncoderCliError {
    fn from(e: io::Error) -> Self {
        TurncoderCliError::Io(e)
    }
}

impl From<CodingError> for TurncoderCliError {
    fn from(e: CodingError) -> Self {
        TurncoderCliError::Coding(e)
    }
}

impl From<serde_json::Error> for TurncoderCliError {
    fn from(e: serde_json::Error) -> Self {
        TurncoderCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TurncoderCliError> for CliError {
    fn from(e: TurncoderCliError) -> Self {
        match e {
            TurncoderCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TurncoderCliError::Coding(e) => coding_error(e),
            TurncoderCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            TurncoderCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} problems found in session", count),
                hint: Some("Fix the listed turns and retry".to_string()),
            },
        }
    }
}

fn coding_error(e: CodingError) -> CliError {
    let (code, hint) = match &e {
        CodingError::ParseError(_) | CodingError::JsonError(_) => (
            "PARSE_ERROR",
            "Ensure input is a session file saved by the annotation tool",
        ),
        CodingError::MissingField(_) => (
            "MISSING_FIELD",
            "Sessions need a non-empty videoFilename and a turns array",
        ),
        CodingError::InvalidTimestamp { .. } | CodingError::DuplicateTurnId(_) => (
            "INVALID_SESSION",
            "Run 'turncoder validate' for details",
        ),
        CodingError::TurnNotFound(_) => ("TURN_NOT_FOUND", "Check the turn id"),
        CodingError::EncodingError(_) => ("ENCODING_ERROR", "Report this as a bug"),
    };

    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: Some(hint.to_string()),
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    video_filename: String,
    total_turns: usize,
    classified_turns: usize,
    unknown_strategies: Vec<UnknownStrategy>,
    errors: Vec<String>,
}

impl ValidationReport {
    fn for_session(session: &SessionFile) -> Self {
        let errors = match session.validate() {
            Ok(()) => Vec::new(),
            Err(e) => vec![e.to_string()],
        };

        Self {
            video_filename: session.video_filename.clone(),
            total_turns: session.turns.len(),
            classified_turns: session
                .turns
                .iter()
                .filter(|t| t.classification().is_some())
                .count(),
            unknown_strategies: session.unknown_strategies(),
            errors,
        }
    }
}

#[derive(serde::Serialize)]
struct SchemeReport {
    scheme_version: &'static str,
    communication_modes: Vec<&'static str>,
    vocalization_types: Vec<&'static str>,
    strategies: &'static [Strategy],
}

impl SchemeReport {
    fn current() -> Self {
        Self {
            scheme_version: SCHEME_VERSION,
            communication_modes: CommunicationMode::ALL.iter().map(|m| m.label()).collect(),
            vocalization_types: VocalizationType::ALL.iter().map(|v| v.label()).collect(),
            strategies: scheme::list_strategies(),
        }
    }
}
