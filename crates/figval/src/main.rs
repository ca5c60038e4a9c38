//! figval: validate annotation figures or convert masks to polygons.
//!
//! Reads one request as JSON from a file (or stdin) and prints the
//! response JSON to stdout. Per-figure failures are part of the response;
//! the exit code is non-zero only when the request itself cannot be read
//! or parsed.
//!
//! # Usage
//!
//! ```text
//! figval [OPTIONS] validate [INPUT]
//! figval [OPTIONS] convert [INPUT]
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod logger;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand, ValueEnum};
use figval_engine::{
    BatchDiagnostics, Clock, ConversionRequest, CoordinateSystem, ValidationConfig,
    ValidationRequest,
};
use serde::Serialize;

/// Figure validation and mask-to-polygon conversion.
#[derive(Parser)]
#[command(name = "figval", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// How vector coordinates in figure payloads are expressed.
    #[arg(long, global = true, value_enum, default_value_t = Coordinates::Pixel)]
    coordinates: Coordinates,

    /// Batches with at least this many figures run in parallel.
    #[arg(long, global = true, default_value_t = ValidationConfig::DEFAULT_PARALLEL_THRESHOLD)]
    parallel_threshold: usize,

    /// Full engine config as a JSON string.
    ///
    /// When provided, `--coordinates` and `--parallel-threshold` are
    /// ignored. The JSON must be a valid `ValidationConfig` serialization.
    #[arg(long, global = true)]
    config_json: Option<String>,

    /// Pretty-print the response JSON.
    #[arg(long, global = true)]
    pretty: bool,

    /// Print the batch diagnostics report to stderr.
    #[arg(long, global = true)]
    diagnostics: bool,

    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, global = true, env = "FIGVAL_LOG", default_value_t = log::LevelFilter::Warn)]
    log_level: log::LevelFilter,
}

#[derive(Subcommand)]
enum Command {
    /// Validate figures against a canvas.
    ///
    /// INPUT holds `{"height", "width", "figures", "skipBoundsValidation"?}`.
    Validate {
        /// Request file; stdin when omitted or `-`.
        input: Option<PathBuf>,
    },
    /// Convert bitmap figures to single-contour polygons.
    ///
    /// INPUT holds `{"figures"}`.
    Convert {
        /// Request file; stdin when omitted or `-`.
        input: Option<PathBuf>,
    },
}

/// Coordinate system selection.
#[derive(Clone, Copy, ValueEnum)]
enum Coordinates {
    /// Absolute pixel indices.
    Pixel,
    /// Fractions of the canvas size.
    Relative,
}

/// Build a [`ValidationConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<ValidationConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(ValidationConfig {
        coordinates: match cli.coordinates {
            Coordinates::Pixel => CoordinateSystem::Pixel,
            Coordinates::Relative => CoordinateSystem::Relative,
        },
        parallel_threshold: cli.parallel_threshold,
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.log_level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;
    log::debug!("config: {config:?}");

    match cli.command {
        Command::Validate { ref input } => {
            let text = read_input(input.as_ref())?;
            let request: ValidationRequest = serde_json::from_str(&text)
                .map_err(|e| format!("Error parsing validation request: {e}"))?;
            let (response, diagnostics) =
                figval_engine::validate_figures_with_diagnostics(&request, &config, &StdClock)
                    .map_err(|e| format!("Invalid request: {e}"))?;
            emit(&response, cli.pretty)?;
            report(&diagnostics, cli.diagnostics);
        }
        Command::Convert { ref input } => {
            let text = read_input(input.as_ref())?;
            let request: ConversionRequest = serde_json::from_str(&text)
                .map_err(|e| format!("Error parsing conversion request: {e}"))?;
            let (response, diagnostics) =
                figval_engine::convert_masks_with_diagnostics(&request, &config, &StdClock);
            emit(&response, cli.pretty)?;
            report(&diagnostics, cli.diagnostics);
        }
    }
    Ok(())
}

/// Read the whole request from `path`, or from stdin for `None` and `-`.
fn read_input(path: Option<&PathBuf>) -> Result<String, String> {
    match path {
        Some(p) if p.as_os_str() != "-" => std::fs::read_to_string(p)
            .map_err(|e| format!("Error reading {}: {e}", p.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| format!("Error reading stdin: {e}"))?;
            Ok(text)
        }
    }
}

fn emit<T: Serialize>(response: &T, pretty: bool) -> Result<(), String> {
    let json = if pretty {
        serde_json::to_string_pretty(response)
    } else {
        serde_json::to_string(response)
    }
    .map_err(|e| format!("Error serializing response: {e}"))?;
    println!("{json}");
    Ok(())
}

fn report(diagnostics: &BatchDiagnostics, enabled: bool) {
    if enabled {
        eprintln!("{}", diagnostics.report());
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
