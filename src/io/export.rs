//! Write tables and the run manifest to the output directory.
//!
//! File naming is deterministic and depends only on the catalog names:
//! - `{Country}_{Indicator}.<ext>` for long-form tables
//! - `{Country}.<ext>` for wide-form tables
//!
//! Existing files are overwritten.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use chrono::Utc;
use polars::prelude::{CsvWriter, DataFrame, ParquetWriter, PolarsError, SerWriter};
use serde::Serialize;
use tracing::info;

use crate::domain::{OutputFormat, file_stem};
use crate::error::AppError;
use crate::report::RunSummary;
use crate::table::{CountryTable, IndicatorTable};

pub const MANIFEST_FILE: &str = "manifest.json";

pub fn indicator_file_name(country: &str, indicator: &str, format: OutputFormat) -> String {
    format!(
        "{}_{}.{}",
        file_stem(country),
        file_stem(indicator),
        format.extension()
    )
}

pub fn country_file_name(country: &str, format: OutputFormat) -> String {
    format!("{}.{}", file_stem(country), format.extension())
}

/// Create the output directory (and parents) if missing. Never clears it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), AppError> {
    create_dir_all(dir).map_err(|e| {
        AppError::io(format!(
            "Failed to create output directory '{}': {e}",
            dir.display()
        ))
    })
}

pub fn write_indicator_table(
    dir: &Path,
    table: &IndicatorTable,
    format: OutputFormat,
) -> Result<PathBuf, AppError> {
    let path = dir.join(indicator_file_name(&table.country, &table.indicator, format));
    let mut df = table.to_frame().map_err(|e| frame_error(&path, e))?;
    write_frame(&path, &mut df, format)?;
    info!(path = %path.display(), rows = df.height(), "saved indicator table");
    Ok(path)
}

pub fn write_country_table(
    dir: &Path,
    table: &CountryTable,
    format: OutputFormat,
) -> Result<PathBuf, AppError> {
    let path = dir.join(country_file_name(&table.country, format));
    let mut df = table.frame().clone();
    write_frame(&path, &mut df, format)?;
    info!(
        path = %path.display(),
        rows = df.height(),
        indicators = df.width() - 1,
        "saved country table"
    );
    Ok(path)
}

/// Write a frame in the requested format, replacing any existing file.
pub fn write_frame(path: &Path, df: &mut DataFrame, format: OutputFormat) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", path.display())))?;

    let written = match format {
        OutputFormat::Parquet => ParquetWriter::new(&mut file).finish(df).map(|_| ()),
        OutputFormat::Csv => CsvWriter::new(&mut file).include_header(true).finish(df),
    };

    written.map_err(|e| AppError::io(format!("Failed to write '{}': {e}", path.display())))
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    tool: &'static str,
    generated_at: String,
    base_url: &'a str,
    format: OutputFormat,
    #[serde(flatten)]
    summary: &'a RunSummary,
}

/// Write `manifest.json` describing what this run produced.
pub fn write_manifest(
    dir: &Path,
    base_url: &str,
    format: OutputFormat,
    summary: &RunSummary,
) -> Result<PathBuf, AppError> {
    let path = dir.join(MANIFEST_FILE);
    let file = File::create(&path)
        .map_err(|e| AppError::io(format!("Failed to create manifest '{}': {e}", path.display())))?;

    let manifest = Manifest {
        tool: "wdi",
        generated_at: Utc::now().to_rfc3339(),
        base_url,
        format,
        summary,
    };

    serde_json::to_writer_pretty(file, &manifest)
        .map_err(|e| AppError::io(format!("Failed to write manifest: {e}")))?;

    Ok(path)
}

fn frame_error(path: &Path, e: PolarsError) -> AppError {
    AppError::io(format!("Failed to build table for '{}': {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use polars::prelude::{ParquetReader, SerReader};

    use super::*;
    use crate::domain::Observation;
    use crate::report::{PairOutcome, PairStatus};

    fn table() -> IndicatorTable {
        IndicatorTable::new(
            "United States",
            "GDP growth",
            vec![
                Observation {
                    year: 2001,
                    indicator: "GDP growth".into(),
                    value: Some(1.0),
                },
                Observation {
                    year: 2000,
                    indicator: "GDP growth".into(),
                    value: None,
                },
            ],
        )
    }

    #[test]
    fn file_names_replace_spaces() {
        assert_eq!(
            indicator_file_name("United States", "GDP growth", OutputFormat::Parquet),
            "United_States_GDP_growth.parquet"
        );
        assert_eq!(country_file_name("South Africa", OutputFormat::Csv), "South_Africa.csv");
        // Same inputs, same name.
        assert_eq!(
            indicator_file_name("A B", "C D", OutputFormat::Csv),
            indicator_file_name("A B", "C D", OutputFormat::Csv)
        );
    }

    #[test]
    fn parquet_round_trip_keeps_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_indicator_table(dir.path(), &table(), OutputFormat::Parquet).unwrap();
        assert!(path.ends_with("United_States_GDP_growth.parquet"));

        let df = ParquetReader::new(File::open(&path).unwrap()).finish().unwrap();
        assert_eq!(df.height(), 2);
        let values: Vec<Option<f64>> = df
            .column("Value")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![None, Some(1.0)]);
    }

    #[test]
    fn csv_output_has_header_and_sorted_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_indicator_table(dir.path(), &table(), OutputFormat::Csv).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Year,Indicator,Value");
        assert!(lines[1].starts_with("2000,GDP growth,"));
        assert!(lines[2].starts_with("2001,GDP growth,1"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn writes_overwrite_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("United_States_GDP_growth.csv");
        fs::write(&path, "stale").unwrap();
        write_indicator_table(dir.path(), &table(), OutputFormat::Csv).unwrap();
        assert!(fs::read_to_string(&path).unwrap().starts_with("Year,"));
    }

    #[test]
    fn output_dir_is_created_with_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("base");
        ensure_output_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // Idempotent.
        ensure_output_dir(&nested).unwrap();
    }

    #[test]
    fn unwritable_target_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let err = write_indicator_table(&missing, &table(), OutputFormat::Parquet).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_IO);
    }

    #[test]
    fn manifest_lists_pair_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let mut summary = RunSummary::default();
        summary.pairs.push(PairOutcome {
            country: "Testland".into(),
            indicator: "GDP".into(),
            status: PairStatus::Failed {
                reason: "request failed with status 503".into(),
            },
        });
        let path =
            write_manifest(dir.path(), "http://localhost", OutputFormat::Parquet, &summary).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["format"], "parquet");
        assert_eq!(json["pairs"][0]["status"], "failed");
        assert_eq!(json["pairs"][0]["indicator"], "GDP");
        assert!(json["generated_at"].is_string());
    }
}
