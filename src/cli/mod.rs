//! Command-line parsing for the World Bank indicator harvester.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline. Everything here is turned into an explicit `HarvestConfig` by
//! `app` before any work starts.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::worldbank::{DEFAULT_BASE_URL, DEFAULT_PER_PAGE};
use crate::domain::{OutputFormat, ParseFailurePolicy};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "wdi", version, about = "World Bank indicator harvester")]
pub struct Cli {
    /// Default log filter (RUST_LOG overrides it).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch every (country, indicator) pair and write per-indicator and per-country tables.
    Fetch(FetchArgs),
    /// Validate the catalogs and list the requests and files `fetch` would produce.
    Plan(PlanArgs),
}

/// Catalog files and output layout, shared by `fetch` and `plan`.
#[derive(Debug, Args, Clone)]
pub struct CatalogArgs {
    /// Country catalog: JSON object of display name -> country code.
    #[arg(long, value_name = "JSON", default_value = "countries.json")]
    pub countries: PathBuf,

    /// Indicator catalog: JSON object of display name -> indicator code.
    #[arg(long, value_name = "JSON", default_value = "indicators.json")]
    pub indicators: PathBuf,

    /// Directory the tables are written to (created if missing, never cleared).
    #[arg(short = 'o', long, value_name = "DIR", default_value = "data")]
    pub output: PathBuf,

    /// Table file format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Parquet)]
    pub format: OutputFormat,
}

/// Remote source options, shared by `fetch` and `plan`.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// API root; requests go to `{base}/v2/country/{code}/indicator/{code}`.
    #[arg(long, env = "WDI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Page size requested from the API. Only the first page is read.
    #[arg(long, default_value_t = DEFAULT_PER_PAGE, value_parser = clap::value_parser!(u32).range(1..))]
    pub per_page: u32,
}

/// Options for `wdi fetch`.
#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    #[command(flatten)]
    pub catalogs: CatalogArgs,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Concurrent requests per country (1 = strictly sequential).
    #[arg(short = 'j', long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..=64))]
    pub workers: u16,

    /// Minimum spacing between request starts, in milliseconds (0 = off).
    #[arg(long, default_value_t = 0)]
    pub min_interval_ms: u64,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// What to do when a response body is not valid JSON.
    #[arg(long, value_enum, default_value_t = ParseFailurePolicy::Skip)]
    pub on_parse_error: ParseFailurePolicy,

    /// Do not write `manifest.json` into the output directory.
    #[arg(long)]
    pub no_manifest: bool,
}

/// Options for `wdi plan`.
#[derive(Debug, Args, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub catalogs: CatalogArgs,

    #[command(flatten)]
    pub source: SourceArgs,
}
