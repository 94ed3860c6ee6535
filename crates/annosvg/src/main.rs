//! annosvg: convert annotation documents to and from SVG.
//!
//! # Usage
//!
//! ```text
//! annosvg encode drawing.colorrm.json            # writes drawing.svg
//! annosvg decode drawing.svg out.json -v         # debug logging on stderr
//! annosvg decode drawing.svg --config-json '{"highlighter_opacity_threshold":0.5}'
//! ```
//!
//! Both subcommands exit with status 1 on a read, parse or write failure.
//! Per-element problems are not failures: they are listed in the summary.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use annosvg_core::{CodecConfig, CodecError, ConversionWarning, Document};
use annosvg_import::Decoded;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Convert annotation JSON documents to SVG and back.
#[derive(Parser)]
#[command(name = "annosvg", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (-v debug, -vv trace).  `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Annotation JSON → SVG.
    Encode(Files),
    /// SVG → annotation JSON.
    Decode(Files),
}

#[derive(clap::Args)]
struct Files {
    /// File to read.
    input: PathBuf,

    /// File to write.  Derived from INPUT when omitted.
    output: Option<PathBuf>,

    #[command(flatten)]
    codec: CodecArgs,
}

#[derive(clap::Args)]
struct CodecArgs {
    /// Decoded strokes below this effective opacity become highlighters.
    #[arg(long, default_value_t = CodecConfig::DEFAULT_HIGHLIGHTER_OPACITY_THRESHOLD)]
    highlighter_threshold: f64,

    /// RDP tolerance applied to decoded stroke points (0 keeps all).
    #[arg(long, default_value_t = CodecConfig::DEFAULT_SIMPLIFY_TOLERANCE)]
    simplify_tolerance: f64,

    /// Straight segments per flattened curve.
    #[arg(long, default_value_t = CodecConfig::DEFAULT_CURVE_FLATTEN_SEGMENTS, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    curve_segments: usize,

    /// Full codec config as a JSON string.
    ///
    /// When provided, the individual codec flags are ignored.  Missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Build a [`CodecConfig`] from CLI arguments.
fn config_from_cli(args: &CodecArgs) -> Result<CodecConfig, String> {
    if let Some(ref json) = args.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }
    Ok(CodecConfig {
        highlighter_opacity_threshold: args.highlighter_threshold,
        simplify_tolerance: args.simplify_tolerance,
        curve_flatten_segments: args.curve_segments,
        ..CodecConfig::default()
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Encode,
    Decode,
}

/// Output path next to `input`: `x.json`/`x.colorrm.json` → `x.svg` when
/// encoding, `x.svg` → `x.colorrm.json` when decoding.
fn default_output(input: &Path, direction: Direction) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (suffixes, replacement): (&[&str], &str) = match direction {
        Direction::Encode => (&[".colorrm.json", ".json"], ".svg"),
        Direction::Decode => (&[".svg"], ".colorrm.json"),
    };
    let stem = suffixes
        .iter()
        .find_map(|suffix| strip_suffix_ignore_case(&name, suffix))
        .unwrap_or(&name);
    input.with_file_name(format!("{stem}{replacement}"))
}

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let split = name.len().checked_sub(suffix.len())?;
    let (stem, tail) = (name.get(..split)?, name.get(split..)?);
    (!stem.is_empty() && tail.eq_ignore_ascii_case(suffix)).then_some(stem)
}

fn read(path: &Path) -> Result<String, CodecError> {
    std::fs::read_to_string(path).map_err(|source| CodecError::InputRead {
        path: path.to_owned(),
        source,
    })
}

fn write(path: &Path, contents: &str) -> Result<(), CodecError> {
    std::fs::write(path, contents).map_err(|source| CodecError::OutputWrite {
        path: path.to_owned(),
        source,
    })
}

/// What an encode run produced.
struct EncodeReport {
    tool_counts: BTreeMap<String, usize>,
    warnings: Vec<ConversionWarning>,
}

fn encode_file(input: &Path, output: &Path, config: &CodecConfig) -> Result<EncodeReport, CodecError> {
    let document: Document = serde_json::from_str(&read(input)?).map_err(CodecError::Json)?;
    config.validate()?;
    let encoded = annosvg_export::encode(&document, config);
    write(output, &encoded.svg)?;
    info!(output = %output.display(), bytes = encoded.svg.len(), "wrote svg");
    Ok(EncodeReport {
        tool_counts: document.tool_counts(),
        warnings: encoded.warnings,
    })
}

fn decode_file(input: &Path, output: &Path, config: &CodecConfig) -> Result<Decoded, CodecError> {
    let decoded = annosvg_import::decode(&read(input)?, config)?;
    let json = serde_json::to_string_pretty(&decoded.document).map_err(CodecError::Serialize)?;
    write(output, &json)?;
    info!(output = %output.display(), bytes = json.len(), "wrote annotation json");
    Ok(decoded)
}

fn print_counts(counts: &BTreeMap<String, usize>) {
    for (tool, count) in counts {
        println!("  {tool}: {count}");
    }
}

fn print_warnings(warnings: &[ConversionWarning]) {
    if warnings.is_empty() {
        return;
    }
    println!("Warnings ({}):", warnings.len());
    for warning in warnings {
        println!("  {warning}");
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (direction, files) = match &cli.command {
        Command::Encode(files) => (Direction::Encode, files),
        Command::Decode(files) => (Direction::Decode, files),
    };
    let config = match config_from_cli(&files.codec) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let output = files
        .output
        .clone()
        .unwrap_or_else(|| default_output(&files.input, direction));

    match direction {
        Direction::Encode => match encode_file(&files.input, &output, &config) {
            Ok(report) => {
                println!("Wrote {}", output.display());
                print_counts(&report.tool_counts);
                print_warnings(&report.warnings);
            }
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        },
        Direction::Decode => match decode_file(&files.input, &output, &config) {
            Ok(decoded) => {
                let document = &decoded.document;
                println!("Wrote {}", output.display());
                println!(
                    "Items: {} (canvas {} x {})",
                    document.history.len(),
                    document.metadata.width,
                    document.metadata.height
                );
                print_counts(&document.tool_counts());
                print_warnings(&decoded.warnings);
            }
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}
