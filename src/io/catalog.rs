//! Catalog loading and validation.
//!
//! A catalog file is a flat JSON object of `display name -> code`. The object's
//! key order is preserved (serde_json `preserve_order`) and becomes the
//! processing order.
//!
//! Names end up in file names, so they are checked here instead of being
//! escaped later:
//! - no path separators, no Windows-reserved characters, no control characters
//! - not empty, not `.` or `..`
//! - no two names may map to the same file stem
//! - no two output files may share a name across both catalogs
//!   (`{Country}` vs `{Country}_{Indicator}`)

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::domain::{Catalog, CatalogEntry, file_stem};
use crate::error::AppError;
use crate::table::YEAR_COLUMN;

const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Read and validate a catalog file.
pub fn load_catalog(path: &Path, label: &str) -> Result<Catalog, AppError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        AppError::config(format!(
            "Failed to read {label} catalog '{}': {e}",
            path.display()
        ))
    })?;
    parse_catalog(&raw, label)
        .map_err(|e| AppError::config(format!("{} ({})", e.message(), path.display())))
}

/// Parse and validate catalog JSON.
pub fn parse_catalog(raw: &str, label: &str) -> Result<Catalog, AppError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AppError::config(format!("Invalid {label} catalog JSON: {e}")))?;

    let Value::Object(map) = value else {
        return Err(AppError::config(format!(
            "The {label} catalog must be a JSON object of name -> code"
        )));
    };

    if map.is_empty() {
        return Err(AppError::config(format!("The {label} catalog is empty")));
    }

    let mut entries = Vec::with_capacity(map.len());
    let mut stems: HashMap<String, String> = HashMap::new();

    for (name, code) in map {
        validate_name(&name, label)?;

        let code = match code {
            Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
            other => {
                return Err(AppError::config(format!(
                    "{label} '{name}' needs a non-empty string code, found {other}"
                )));
            }
        };

        let stem = file_stem(&name);
        if let Some(previous) = stems.insert(stem.clone(), name.clone()) {
            return Err(AppError::config(format!(
                "{label} names '{previous}' and '{name}' both map to file name '{stem}'"
            )));
        }

        entries.push(CatalogEntry { name, code });
    }

    Ok(Catalog::from_entries(entries))
}

/// Indicator names become wide-form column names next to `Year`.
pub fn ensure_indicator_columns(indicators: &Catalog) -> Result<(), AppError> {
    match indicators.iter().find(|e| e.name == YEAR_COLUMN) {
        Some(e) => Err(AppError::config(format!(
            "Indicator name '{}' is reserved for the year column",
            e.name
        ))),
        None => Ok(()),
    }
}

/// Every output stem a run can produce must be unique.
///
/// A country named `Testland GDP` would otherwise write its wide-form table
/// over the long-form table of (`Testland`, `GDP`).
pub fn ensure_distinct_outputs(countries: &Catalog, indicators: &Catalog) -> Result<(), AppError> {
    let mut owners: HashMap<String, String> = HashMap::new();

    for country in countries.iter() {
        let country_stem = file_stem(&country.name);
        claim_stem(&mut owners, country_stem.clone(), format!("country '{}'", country.name))?;

        for indicator in indicators.iter() {
            claim_stem(
                &mut owners,
                format!("{country_stem}_{}", file_stem(&indicator.name)),
                format!("pair ('{}', '{}')", country.name, indicator.name),
            )?;
        }
    }
    Ok(())
}

fn claim_stem(owners: &mut HashMap<String, String>, stem: String, owner: String) -> Result<(), AppError> {
    match owners.get(&stem) {
        Some(previous) => Err(AppError::config(format!(
            "{previous} and {owner} would both write '{stem}'"
        ))),
        None => {
            owners.insert(stem, owner);
            Ok(())
        }
    }
}

fn validate_name(name: &str, label: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::config(format!("Empty {label} name in catalog")));
    }
    if name == "." || name == ".." {
        return Err(AppError::config(format!("Invalid {label} name '{name}'")));
    }
    if let Some(c) = name
        .chars()
        .find(|c| RESERVED_CHARS.contains(c) || c.is_control())
    {
        return Err(AppError::config(format!(
            "{label} name '{}' contains reserved character {c:?}",
            name.escape_debug()
        )));
    }
    Ok(())
}
