//! The fetch-and-normalize pipeline.
//!
//! For every country (catalog order):
//! 1) fan the country's indicator fetches out over a bounded worker pool
//! 2) re-join the results in indicator catalog order
//! 3) write one long-form table per indicator that returned data
//! 4) pivot everything the country returned into one wide-form table
//!
//! Workers only fetch and decode. Tables are assembled and written by the
//! calling thread, so each country's accumulator has exactly one writer and
//! output does not depend on scheduling.

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::data::{ParsedSeries, SeriesSource, parse_series};
use crate::domain::{CatalogEntry, HarvestConfig, ParseFailurePolicy};
use crate::error::{AppError, EXIT_REMOTE, FetchError};
use crate::io::catalog::ensure_distinct_outputs;
use crate::io::export::{ensure_output_dir, write_country_table, write_indicator_table, write_manifest};
use crate::report::{CountryOutcome, PairOutcome, PairStatus, RunSummary};
use crate::table::{CountryTable, IndicatorTable};

/// Run the pipeline against `source` and return what was written.
///
/// Per-pair failures are logged and recorded, never returned. Errors are
/// reserved for catalogs whose output file names collide, a broken environment
/// (output not writable) and malformed bodies under `ParseFailurePolicy::Abort`.
pub fn run_harvest(source: &dyn SeriesSource, config: &HarvestConfig) -> Result<RunSummary, AppError> {
    ensure_distinct_outputs(&config.countries, &config.indicators)?;
    ensure_output_dir(&config.output_dir)?;

    let pool = ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .thread_name(|i| format!("wdi-fetch-{i}"))
        .build()
        .map_err(|e| AppError::config(format!("Failed to start worker pool: {e}")))?;

    let mut summary = RunSummary::default();

    for country in config.countries.iter() {
        info!(country = %country.name, code = %country.code, "fetching data for country");

        let fetched: Vec<Result<ParsedSeries, FetchError>> = pool.install(|| {
            config
                .indicators
                .entries()
                .par_iter()
                .map(|indicator| fetch_pair(source, country, indicator))
                .collect()
        });

        let mut tables: Vec<IndicatorTable> = Vec::new();

        for (indicator, result) in config.indicators.iter().zip(fetched) {
            let status = match result {
                Ok(parsed) => {
                    let table = IndicatorTable::new(&country.name, &indicator.name, parsed.observations);
                    if table.is_empty() {
                        debug!(country = %country.name, indicator = %indicator.name, "no observations");
                        PairStatus::Empty
                    } else {
                        let path = write_indicator_table(&config.output_dir, &table, config.format)?;
                        let status = PairStatus::Written {
                            file: path.display().to_string(),
                            rows: table.len(),
                        };
                        tables.push(table);
                        status
                    }
                }
                Err(e) if e.is_malformed() && config.on_parse_error == ParseFailurePolicy::Abort => {
                    return Err(AppError::new(
                        EXIT_REMOTE,
                        format!("Failed to parse {} for {}: {e}", indicator.name, country.name),
                    ));
                }
                Err(e) => {
                    warn!(
                        country = %country.name,
                        indicator = %indicator.name,
                        error = %e,
                        "Failed to fetch {} for {}",
                        indicator.name,
                        country.name
                    );
                    PairStatus::Failed { reason: e.to_string() }
                }
            };

            summary.pairs.push(PairOutcome {
                country: country.name.clone(),
                indicator: indicator.name.clone(),
                status,
            });
        }

        summary.countries.push(write_country(config, &country.name, &tables)?);
    }

    if config.write_manifest {
        let path = write_manifest(
            &config.output_dir,
            &config.source.base_url,
            config.format,
            &summary,
        )?;
        debug!(path = %path.display(), "wrote manifest");
    }

    info!(
        written = summary.written(),
        empty = summary.empty(),
        failed = summary.failed(),
        "data collection complete"
    );

    Ok(summary)
}

fn fetch_pair(
    source: &dyn SeriesSource,
    country: &CatalogEntry,
    indicator: &CatalogEntry,
) -> Result<ParsedSeries, FetchError> {
    let body = source.fetch_body(&country.code, &indicator.code)?;
    let parsed = parse_series(&body, &indicator.name)?;

    if parsed.is_truncated() {
        warn!(
            country = %country.name,
            indicator = %indicator.name,
            pages = parsed.pages,
            "series has more than one page; only the first page was read"
        );
    }
    if !parsed.rejected_dates.is_empty() {
        warn!(
            country = %country.name,
            indicator = %indicator.name,
            dates = ?parsed.rejected_dates,
            "dropped observations whose date is not a year"
        );
    }

    Ok(parsed)
}

fn write_country(
    config: &HarvestConfig,
    country: &str,
    tables: &[IndicatorTable],
) -> Result<CountryOutcome, AppError> {
    if tables.is_empty() {
        return Ok(CountryOutcome {
            country: country.to_string(),
            file: None,
            years: 0,
            indicators: 0,
        });
    }

    for table in tables {
        let duplicates = table.duplicate_years();
        if !duplicates.is_empty() {
            warn!(
                country,
                indicator = %table.indicator,
                years = ?duplicates,
                "repeated years; the country table keeps the first value"
            );
        }
    }

    let wide = CountryTable::pivot(country, tables).map_err(|e| {
        AppError::io(format!("Failed to build country table for {country}: {e}"))
    })?;
    let path = write_country_table(&config.output_dir, &wide, config.format)?;

    Ok(CountryOutcome {
        country: country.to_string(),
        file: Some(path.display().to_string()),
        years: wide.year_count(),
        indicators: wide.indicator_names().len(),
    })
}
