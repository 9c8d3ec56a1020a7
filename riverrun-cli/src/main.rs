//! RiverRun command-line entry point.

mod cli;
mod commands;
mod settings;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::Context;
use riverrun_core::{migrate_legacy_data, DataLocation, RiverRunError};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<RiverRunError>() {
                Some(core) => {
                    log::debug!("{e:#}");
                    eprintln!("Error: {}", core.user_message());
                }
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            _ => EnvFilter::new("debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

/// Picks the data directory: `--data-dir`, then the settings file, then the
/// platform default. Only the platform default picks up a legacy store left
/// in the working directory.
fn resolve_location(cli: &Cli, settings: &settings::AppSettings) -> Result<DataLocation> {
    if let Some(dir) = &cli.data_dir {
        return Ok(DataLocation::in_dir(dir));
    }
    if let Some(dir) = &settings.data_directory {
        return Ok(DataLocation::in_dir(dir));
    }

    let location = DataLocation::resolve()?;
    let cwd = std::env::current_dir()?;
    let report = migrate_legacy_data(&cwd, &location)?;
    if report.migrated_anything() {
        eprintln!(
            "Moved existing data from {} to {}",
            cwd.display(),
            location.root.display()
        );
    }
    for error in &report.errors {
        eprintln!("warning: legacy data migration failed for {error}");
    }
    Ok(location)
}

fn run(cli: Cli) -> Result<()> {
    let settings_path: PathBuf = cli
        .settings
        .clone()
        .unwrap_or_else(settings::settings_file_path);
    let settings = settings::load_settings(&settings_path);
    let location = resolve_location(&cli, &settings)?;
    log::debug!("Using data directory {}", location.root.display());

    let ctx = Context {
        location,
        settings,
        settings_path,
        json: cli.json,
    };

    match cli.command {
        Commands::River { command } => commands::river(&ctx, command),
        Commands::Trip { command } => commands::trip(&ctx, command),
        Commands::Attach { command } => commands::attach(&ctx, command),
        Commands::Export { path, trips } => commands::export(&ctx, path, trips),
        Commands::Import { path, trips } => commands::import(&ctx, &path, trips),
        Commands::Stats => commands::stats(&ctx),
        Commands::Settings { command } => commands::settings(&ctx, command),
        Commands::Location => commands::location(&ctx),
    }
}
