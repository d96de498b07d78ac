//! cardsheet command-line importer
//!
//! Reads the importer configuration, imports every configured workbook and
//! prints the resulting decks.
//!
//! Usage:
//!   cardsheet [-c importer.json] [--format-text false] [--output-format json]
//!     [-o cards.json] [--strict] [-v]
//!
//! Exit status: 0 on success, 1 when the configuration or a workbook cannot be
//! used, 2 under `--strict` when unhandled characters remained in card texts.

use clap::Parser;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use cardsheet::{AnomalyKind, ImportError, ImporterBuilder, ImporterConfig, LogSink, OutputFormat};

#[derive(Parser)]
#[command(name = "cardsheet", version, about = "Import cards by deck from Excel workbooks")]
struct Cli {
    /// Importer configuration file (JSON)
    #[arg(short, long, default_value = "importer.json")]
    configuration: PathBuf,

    /// Override the configuration's format_text setting (true/false)
    #[arg(long)]
    format_text: Option<bool>,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    output_format: String,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Exit with status 2 if any card text still contains unhandled characters
    #[arg(long)]
    strict: bool,

    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// 標準エラー出力へのロガー
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn run(cli: &Cli) -> Result<ExitCode, ImportError> {
    let format: OutputFormat = cli.output_format.parse()?;

    let config = ImporterConfig::from_path(&cli.configuration)?;
    let mut builder = ImporterBuilder::from_config(config);
    if let Some(format_text) = cli.format_text {
        builder = builder.format_text(format_text);
    }
    let importer = builder.build()?;

    let mut sink = LogSink::new();
    let result = importer.run(&mut sink)?;

    match &cli.output {
        Some(path) => {
            result.write_to(format, File::create(path)?)?;
            log::info!("Wrote {}", path.display());
        }
        None => result.write_to(format, io::stdout().lock())?,
    }

    if sink.count() > 0 {
        log::info!("{} anomalies reported", sink.count());
    }

    let unhandled = sink.count_of(AnomalyKind::UnhandledCharacter);
    if cli.strict && unhandled > 0 {
        log::error!(
            "{} card texts contain unhandled characters; add replacements for them",
            unhandled
        );
        return Ok(ExitCode::from(2));
    }

    Ok(ExitCode::SUCCESS)
}

fn handle_error(error: &ImportError) {
    match error {
        ImportError::Io(io_err) => {
            eprintln!("I/O Error: {}", io_err);
            eprintln!("Please check that the file exists and you have permission to access it.");
        }
        ImportError::Parse(parse_err) => {
            eprintln!("Parse Error: {}", parse_err);
            eprintln!("The workbook may not be a valid XLSX file or may be corrupted.");
        }
        ImportError::Utf8(utf8_err) => {
            eprintln!("UTF-8 Conversion Error: {}", utf8_err);
        }
        ImportError::Zip(msg) => {
            eprintln!("ZIP Archive Error: {}", msg);
            eprintln!("The workbook may be corrupted or not a valid ZIP archive.");
        }
        ImportError::Xml(msg) => {
            eprintln!("XML Error: {}", msg);
        }
        ImportError::Json(json_err) => {
            eprintln!("Configuration Error: {}", json_err);
            eprintln!("The configuration file is not valid JSON for the importer.");
        }
        ImportError::Config(msg) => {
            eprintln!("Configuration Error: {}", msg);
        }
        ImportError::SecurityViolation(msg) => {
            eprintln!("Security Violation: {}", msg);
            eprintln!("The workbook violates security constraints (e.g., file size limit).");
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(status) => status,
        Err(e) => {
            handle_error(&e);
            ExitCode::from(1)
        }
    }
}
