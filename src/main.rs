//! mypkgs - main entry point
//!
//! Prints the manually installed packages on stdout; logs and warnings go to
//! stderr so the list can be piped.

use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use mypkgs::cli::{Cli, OutputFormat};
use mypkgs::PackageStateReconciler;

/// Initialize logging on stderr; `RUST_LOG` overrides the CLI verbosity
fn init_logger(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logger(cli.log_level());
    debug!(?cli, "CLI arguments parsed");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mypkgs: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let paths = cli.source_paths().context("invalid source configuration")?;

    let mut out = io::stdout().lock();
    if cli.dump_config {
        writeln!(out, "{}", paths.to_json()?)?;
        return Ok(());
    }
    if let Some(target) = &cli.save_config {
        paths.save_to_file(target)?;
        info!(path = %target.display(), "source paths saved");
        return Ok(());
    }

    let reconciler = PackageStateReconciler::new(paths);
    let sources = reconciler.paths();
    info!(
        extended_states = %sources.extended_states.display(),
        dpkg_status = %sources.dpkg_status.display(),
        history_dir = %sources.history_dir.display(),
        "using package sources"
    );

    let report = reconciler.compute()?;
    match (cli.format, cli.history) {
        (OutputFormat::Plain, false) => {
            if report.manual.is_empty() {
                eprintln!("No manually installed packages found.");
            }
            for name in report.manual.iter() {
                writeln!(out, "{}", name)?;
            }
        }
        (OutputFormat::Plain, true) => {
            for event in &report.events {
                let when = event
                    .timestamp
                    .map_or_else(|| "-".to_string(), |ts| ts.to_string());
                writeln!(out, "{}\t{}\t{}", when, event.package, event.log_file.display())?;
            }
        }
        (OutputFormat::Json, false) => writeln!(out, "{}", report.to_json()?)?,
        (OutputFormat::Json, true) => writeln!(out, "{}", report.events_to_json()?)?,
    }
    out.flush()?;

    Ok(())
}
