// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use edcp_cli::{detect_series, parse_series_json};
use edcp_core::{ChangeDetector, CpdError, ExecutionContext};
use edcp_offline::{EDivisive, EDivisiveConfig, EDivisiveMedians, EdmConfig};
use serde::Serialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "EDCP_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";
const CLI_DEFAULT_PVALUE: f64 = 0.5;
const CLI_DEFAULT_PERMUTATIONS: usize = 1_000;

struct Cli {
    command: Command,
}

enum Command {
    EDivisive(EDivisiveArgs),
    Edm(EdmArgs),
}

#[derive(Debug, Default, PartialEq)]
enum InputSource {
    #[default]
    Missing,
    Inline(String),
    File(PathBuf),
}

#[derive(Debug)]
struct EDivisiveArgs {
    config: EDivisiveConfig,
    input: InputSource,
    output: Option<PathBuf>,
}

impl Default for EDivisiveArgs {
    fn default() -> Self {
        Self {
            config: EDivisiveConfig {
                significance: CLI_DEFAULT_PVALUE,
                permutations: CLI_DEFAULT_PERMUTATIONS,
                seed: unix_time_seed(),
                ..EDivisiveConfig::default()
            },
            input: InputSource::Missing,
            output: None,
        }
    }
}

/// Seconds since the Unix epoch; zero if the clock is before it.
fn unix_time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

#[derive(Debug)]
struct EdmArgs {
    config: EdmConfig,
    input: InputSource,
    output: Option<PathBuf>,
}

impl Default for EdmArgs {
    fn default() -> Self {
        Self {
            config: EdmConfig::default(),
            input: InputSource::Missing,
            output: None,
        }
    }
}

#[derive(Debug)]
enum CliError {
    Cpd(CpdError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
    InvalidInput(String),
}

impl CliError {
    fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Cpd(err) => err.code(),
            Self::InvalidInput(_) => "invalid_input",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpd(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cpd(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<CpdError> for CliError {
    fn from(value: CpdError) -> Self {
        Self::Cpd(value)
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        tracing::debug!(code = err.code(), "command failed");
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<(), CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    let Some(cli) = parse_cli(&args)? else {
        return Ok(());
    };

    match cli.command {
        Command::EDivisive(args) => handle_edivisive(args),
        Command::Edm(args) => handle_edm(args),
    }
}

fn parse_cli(args: &[String]) -> Result<Option<Cli>, CliError> {
    if args.is_empty() || matches!(args[0].as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(None);
    }
    if matches!(args[0].as_str(), "-V" | "--version") {
        print_version();
        return Ok(None);
    }

    let command_name = args[0].as_str();
    let rest = &args[1..];

    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_command_help(command_name)?;
        return Ok(None);
    }
    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        print_version();
        return Ok(None);
    }

    let command = match command_name {
        "edivisive" => Command::EDivisive(parse_edivisive_args(rest)?),
        "edm" => Command::Edm(parse_edm_args(rest)?),
        _ => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{command_name}'; expected one of: edivisive, edm"
            )));
        }
    };

    Ok(Some(Cli { command }))
}

fn parse_edivisive_args(tokens: &[String]) -> Result<EDivisiveArgs, CliError> {
    let mut args = EDivisiveArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--pvalue" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.config.significance = parse_f64_arg(raw.as_str(), flag)?;
            }
            "--permutations" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.config.permutations = parse_count_arg(raw.as_str(), flag)?;
            }
            "--seed" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.config.seed = parse_count_arg(raw.as_str(), flag)?;
            }
            "--input-json" | "--input" | "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                apply_io_flag(flag, raw, &mut args.input, &mut args.output)?;
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown edivisive option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    ensure_input("edivisive", &args.input)?;
    Ok(args)
}

fn parse_edm_args(tokens: &[String]) -> Result<EdmArgs, CliError> {
    let mut args = EdmArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--min-size" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.config.min_size = parse_count_arg(raw.as_str(), flag)?;
            }
            "--input-json" | "--input" | "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                apply_io_flag(flag, raw, &mut args.input, &mut args.output)?;
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown edm option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    ensure_input("edm", &args.input)?;
    Ok(args)
}

fn apply_io_flag(
    flag: &str,
    raw: String,
    input: &mut InputSource,
    output: &mut Option<PathBuf>,
) -> Result<(), CliError> {
    match flag {
        "--output" => {
            *output = Some(PathBuf::from(raw));
            return Ok(());
        }
        _ if *input != InputSource::Missing => {
            return Err(CliError::invalid_input(
                "--input and --input-json are mutually exclusive and may appear once",
            ));
        }
        "--input-json" => *input = InputSource::Inline(raw),
        _ => *input = InputSource::File(PathBuf::from(raw)),
    }
    Ok(())
}

fn ensure_input(command: &str, input: &InputSource) -> Result<(), CliError> {
    if *input == InputSource::Missing {
        return Err(CliError::invalid_input(format!(
            "{command} requires --input <path> or --input-json <array>"
        )));
    }
    Ok(())
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CliError::invalid_input(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn parse_count_arg<T: FromStr>(raw: &str, flag: &str) -> Result<T, CliError> {
    raw.parse::<T>().map_err(|_| {
        CliError::invalid_input(format!("{flag} expects a non-negative integer, got '{raw}'"))
    })
}

fn parse_f64_arg(raw: &str, flag: &str) -> Result<f64, CliError> {
    raw.parse::<f64>()
        .map_err(|_| CliError::invalid_input(format!("{flag} expects a number, got '{raw}'")))
}

fn print_version() {
    println!("edcp {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "edcp {}\n\nUSAGE:\n  edcp <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  edivisive   Detect change points with E-Divisive permutation testing\n  edm         Detect change points with E-Divisive with Medians\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n\nLogging goes to stderr; set {LOG_ENV} (e.g. {LOG_ENV}=debug) to change the filter.\nRun 'edcp <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

fn print_command_help(command: &str) -> Result<(), CliError> {
    match command {
        "edivisive" => {
            println!(
                "USAGE:\n  edcp edivisive (--input <path> | --input-json <array>) [OPTIONS]\n\nOPTIONS:\n  --pvalue <float>            Significance threshold in (0, 1]. Default: 0.5\n  --permutations <usize>      Shuffled trials per test. Default: 1000\n  --seed <u64>                Random seed. Default: current Unix time\n  --input <path>              JSON array of numbers\n  --input-json <array>        Inline JSON array of numbers\n  --output <path>             Write JSON output to file"
            );
            Ok(())
        }
        "edm" => {
            println!(
                "USAGE:\n  edcp edm (--input <path> | --input-json <array>) [OPTIONS]\n\nOPTIONS:\n  --min-size <usize>          Minimum segment length. Default: 10\n  --input <path>              JSON array of numbers\n  --input-json <array>        Inline JSON array of numbers\n  --output <path>             Write JSON output to file"
            );
            Ok(())
        }
        _ => Err(CliError::invalid_input(format!(
            "unknown command '{command}'; expected one of: edivisive, edm"
        ))),
    }
}

fn handle_edivisive(args: EDivisiveArgs) -> Result<(), CliError> {
    let values = load_series(&args.input)?;
    let detector = EDivisive::new(args.config)?;
    run_detector(&detector, &values, args.output.as_deref())
}

fn handle_edm(args: EdmArgs) -> Result<(), CliError> {
    let values = load_series(&args.input)?;
    let detector = EDivisiveMedians::new(args.config)?;
    run_detector(&detector, &values, args.output.as_deref())
}

fn run_detector(
    detector: &dyn ChangeDetector,
    values: &[f64],
    output: Option<&Path>,
) -> Result<(), CliError> {
    let change_points = detect_series(detector, values, &ExecutionContext::new())?;
    tracing::info!(
        n = values.len(),
        change_points = change_points.len(),
        "detection finished"
    );
    write_json_output(&change_points, output)
}

fn load_series(input: &InputSource) -> Result<Vec<f64>, CliError> {
    match input {
        InputSource::Missing => Err(CliError::invalid_input("no input series provided")),
        InputSource::Inline(raw) => Ok(parse_series_json(raw)?),
        InputSource::File(path) => {
            let raw = fs::read_to_string(path).map_err(|source| {
                CliError::io(format!("failed to read '{}'", path.display()), source)
            })?;
            Ok(parse_series_json(&raw)?)
        }
    }
}

fn write_json_output<T: Serialize>(
    payload: &T,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let encoded = serde_json::to_string_pretty(payload)
        .map_err(|source| CliError::json("failed to serialize JSON output", source))?;

    if let Some(path) = output_path {
        fs::write(path, format!("{encoded}\n"))
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
    } else {
        println!("{encoded}");
        Ok(())
    }
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!(
            "{{\"error\":{{\"code\":\"{}\",\"message\":\"{}\"}}}}",
            err.code(),
            err
        ),
    }
}
