//! emulog CLI entry point.
//!
//! Provides `analyze`, `page`, and `check-config` subcommands for running
//! log files through the intake pipeline, paging arbitrary text into
//! display segments, or validating a configuration file.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use emulog::config::{emulog_paths, load_config, load_config_or_default, EmulogConfig};
use emulog::intake::{Intake, IntakeResponse, SkipReason, REJECTION_MESSAGE};
use emulog::limiter::IntakeLimiter;
use emulog::pager::{self, MessageUnit};
use emulog::report::{into_units, Report};
use emulog::rules::{NoIntegrityLookup, RuleEngine};
use emulog::sources::{Attachment, SourceRegistry};

/// emulog: triage for emulator log files.
#[derive(Parser)]
#[command(name = "emulog", version, about)]
struct Cli {
    /// Config file (defaults to `~/.emulog/emulog.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write JSON logs to `~/.emulog/logs/` with daily rotation.
    #[arg(long, global = true)]
    log_to_file: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Analyze one or more log files and print a report for each.
    Analyze {
        /// Log files, plain or compressed.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print reports as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Split text into display segments.
    Page {
        /// Text file to page; reads stdin when omitted.
        file: Option<PathBuf>,
        /// Lines per segment (defaults to the configured value).
        #[arg(long)]
        max_lines: Option<usize>,
    },
    /// Load and validate the configuration, then exit.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _logging_guard = if cli.log_to_file {
        let paths = emulog_paths()?;
        Some(emulog::logging::init_production(&paths.logs_dir)?)
    } else {
        emulog::logging::init_cli();
        None
    };

    match cli.command {
        Command::Analyze { files, json } => handle_analyze(cli.config.as_deref(), files, json).await,
        Command::Page { file, max_lines } => handle_page(cli.config.as_deref(), file, max_lines),
        Command::CheckConfig => handle_check_config(cli.config.as_deref()),
    }
}

/// Resolve the config path and load it, falling back to defaults when the
/// default file does not exist.
fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<EmulogConfig> {
    match explicit {
        Some(path) => load_config(path),
        None => {
            let paths = emulog_paths()?;
            load_config_or_default(&paths.config_toml)
        }
    }
}

/// Run every file through the pipeline, one limiter-sized batch at a time.
async fn handle_analyze(
    config_path: Option<&Path>,
    files: Vec<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let config = resolve_config(config_path)?;
    let paths = emulog_paths()?;

    let limiter = match config.intake.max_concurrent_runs {
        Some(runs) => IntakeLimiter::install_global(runs),
        None => IntakeLimiter::global(),
    }
    .clone();
    let batch_size = limiter.capacity();

    let engine = RuleEngine::from_config(
        Arc::new(NoIntegrityLookup),
        &config.integrity,
        config.ird_cache_dir(&paths),
    );
    let intake = Arc::new(Intake::new(
        config,
        limiter,
        SourceRegistry::with_defaults(),
        engine,
    ));
    info!(files = files.len(), batch_size, "analyzing logs");

    for batch in files.chunks(batch_size) {
        let mut handles = Vec::with_capacity(batch.len());
        for path in batch {
            let attachment = Attachment::from_path(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let intake = Arc::clone(&intake);
            handles.push(tokio::spawn(async move { intake.process(attachment).await }));
        }

        for (handle, path) in handles.into_iter().zip(batch) {
            let response = handle.await.context("analysis task panicked")?;
            print_response(path, response, json)?;
        }
    }
    Ok(())
}

fn print_response(path: &Path, response: IntakeResponse, json: bool) -> anyhow::Result<()> {
    match response {
        IntakeResponse::Rejected => println!("{}: {REJECTION_MESSAGE}", path.display()),
        IntakeResponse::Skipped(SkipReason::IgnoredName { suffix }) => {
            println!("{}: skipped (ignored suffix `{suffix}`)", path.display());
        }
        IntakeResponse::Skipped(SkipReason::NotALog) => {
            println!("{}: skipped (not a recognized log)", path.display());
        }
        IntakeResponse::Analyzed(report) if json => {
            let rendered =
                serde_json::to_string_pretty(&report).context("failed to serialize report")?;
            println!("{rendered}");
        }
        IntakeResponse::Analyzed(report) => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &Report) {
    println!("== {} ==", report.title);
    println!("{}", report.description);
    for (i, unit) in into_units(report).iter().enumerate() {
        if i > 0 {
            println!("\n-- continued --");
        }
        print_unit(unit);
    }
    if let Some(moderation) = &report.moderation {
        println!("\n[moderation] {}", moderation.trigger);
        for line in &moderation.context {
            println!("  {line}");
        }
    }
    println!();
}

fn print_unit(unit: &MessageUnit) {
    for field in &unit.fields {
        println!("\n[{}]\n{}", field.title, field.body);
    }
}

/// Page a text file (or stdin) into display units.
fn handle_page(
    config_path: Option<&Path>,
    file: Option<PathBuf>,
    max_lines: Option<usize>,
) -> anyhow::Result<()> {
    let config = resolve_config(config_path)?;
    let max_lines = max_lines.unwrap_or(config.pager.max_lines_per_field);

    let text = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let units = pager::break_in_units(text.lines(), max_lines)?;
    debug!(units = units.len(), "paged input");
    for (i, unit) in units.iter().enumerate() {
        println!("=== unit {} ===", i.saturating_add(1));
        print_unit(unit);
    }
    Ok(())
}

/// Validate the configuration file.
fn handle_check_config(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = resolve_config(config_path)?;
    println!("configuration OK");
    println!(
        "  intake: {} runs, pipe {} x {} bytes",
        config
            .intake
            .max_concurrent_runs
            .unwrap_or_else(IntakeLimiter::default_capacity),
        config.intake.pipe_capacity,
        config.intake.chunk_size
    );
    println!(
        "  extractor: {} byte ceiling, {} triggers",
        config.extractor.max_log_bytes,
        config.extractor.piracy_triggers.len()
    );
    println!(
        "  pager: {} lines per field",
        config.pager.max_lines_per_field
    );
    Ok(())
}
