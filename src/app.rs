//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs logging
//! - loads and validates the catalogs into a `HarvestConfig`
//! - runs the pipeline (or the dry-run plan) and prints the summary

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{CatalogArgs, Command, FetchArgs, PlanArgs, SourceArgs};
use crate::data::{SeriesSource, WorldBankClient};
use crate::domain::{Catalog, HarvestConfig, SourceConfig};
use crate::error::AppError;
use crate::io::catalog::{ensure_distinct_outputs, ensure_indicator_columns, load_catalog};
use crate::io::export::{country_file_name, indicator_file_name};
use crate::report::{PlannedPair, format_plan, format_run_summary};

pub mod pipeline;

/// Entry point for the `wdi` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` has to be loaded before clap reads `WDI_BASE_URL`.
    dotenvy::dotenv().ok();

    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    init_logging(&cli.log_level)?;

    match cli.command {
        Command::Fetch(args) => handle_fetch(args),
        Command::Plan(args) => handle_plan(args),
    }
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    let config = harvest_config_from_args(&args)?;
    let client = WorldBankClient::new(&config.source)?;

    let summary = pipeline::run_harvest(&client, &config)?;

    println!(
        "{}",
        format_run_summary(&summary, &config.output_dir.display().to_string())
    );
    Ok(())
}

fn handle_plan(args: PlanArgs) -> Result<(), AppError> {
    let (countries, indicators) = load_catalogs(&args.catalogs)?;
    let client = WorldBankClient::new(&source_config(&args.source, Duration::from_secs(30), 0))?;

    let dir = &args.catalogs.output;
    let format = args.catalogs.format;

    let mut pairs = Vec::with_capacity(countries.len() * indicators.len());
    for country in countries.iter() {
        for indicator in indicators.iter() {
            pairs.push(PlannedPair {
                country: country.name.clone(),
                indicator: indicator.name.clone(),
                url: client.describe(&country.code, &indicator.code),
                file: dir
                    .join(indicator_file_name(&country.name, &indicator.name, format))
                    .display()
                    .to_string(),
            });
        }
    }
    let country_files: Vec<String> = countries
        .iter()
        .map(|c| dir.join(country_file_name(&c.name, format)).display().to_string())
        .collect();

    println!("{}", format_plan(&pairs, &country_files));
    Ok(())
}

/// Resolve `wdi fetch` arguments into an explicit run configuration.
pub fn harvest_config_from_args(args: &FetchArgs) -> Result<HarvestConfig, AppError> {
    let (countries, indicators) = load_catalogs(&args.catalogs)?;

    Ok(HarvestConfig {
        countries,
        indicators,
        output_dir: args.catalogs.output.clone(),
        format: args.catalogs.format,
        source: source_config(
            &args.source,
            Duration::from_secs(args.timeout_secs),
            args.min_interval_ms,
        ),
        workers: usize::from(args.workers),
        on_parse_error: args.on_parse_error,
        write_manifest: !args.no_manifest,
    })
}

fn load_catalogs(args: &CatalogArgs) -> Result<(Catalog, Catalog), AppError> {
    let countries = load_catalog(&args.countries, "country")?;
    let indicators = load_catalog(&args.indicators, "indicator")?;
    ensure_indicator_columns(&indicators)?;
    ensure_distinct_outputs(&countries, &indicators)?;
    Ok((countries, indicators))
}

fn source_config(args: &SourceArgs, timeout: Duration, min_interval_ms: u64) -> SourceConfig {
    SourceConfig {
        base_url: args.base_url.clone(),
        per_page: args.per_page,
        timeout,
        min_interval: Duration::from_millis(min_interval_ms),
    }
}

/// Install the stderr `tracing` subscriber.
///
/// `RUST_LOG` wins over `--log-level` when set.
fn init_logging(default_level: &str) -> Result<(), AppError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|e| AppError::config(format!("Invalid --log-level '{default_level}': {e}")))?,
    };

    // A subscriber may already be installed (tests); keep the existing one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    Ok(())
}

/// Rewrite argv so `wdi` defaults to `wdi fetch`.
///
/// Rules:
/// - `wdi`                      -> `wdi fetch`
/// - `wdi --output data ...`    -> `wdi fetch --output data ...`
/// - `wdi --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("fetch".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fetch" | "plan");
    if is_subcommand {
        return argv;
    }

    if arg1.starts_with('-') {
        argv.insert(1, "fetch".to_string());
        return argv;
    }

    argv
}
