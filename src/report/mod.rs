//! Run accounting: what happened to each pair and each country.

use serde::Serialize;

pub mod format;

pub use format::*;

/// Outcome of one (country, indicator) fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PairStatus {
    Written { file: String, rows: usize },
    /// The source answered but had no usable observations.
    Empty,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairOutcome {
    pub country: String,
    pub indicator: String,
    #[serde(flatten)]
    pub status: PairStatus,
}

/// Outcome of a country's wide-form table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryOutcome {
    pub country: String,
    /// `None` when none of the country's indicators returned data.
    pub file: Option<String>,
    pub years: usize,
    pub indicators: usize,
}

/// Everything a run did, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub pairs: Vec<PairOutcome>,
    pub countries: Vec<CountryOutcome>,
}

impl RunSummary {
    pub fn written(&self) -> usize {
        self.count(|s| matches!(s, PairStatus::Written { .. }))
    }

    pub fn empty(&self) -> usize {
        self.count(|s| matches!(s, PairStatus::Empty))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, PairStatus::Failed { .. }))
    }

    /// Every file written, per-indicator files first.
    pub fn files(&self) -> Vec<&str> {
        let pair_files = self.pairs.iter().filter_map(|p| match &p.status {
            PairStatus::Written { file, .. } => Some(file.as_str()),
            _ => None,
        });
        let country_files = self.countries.iter().filter_map(|c| c.file.as_deref());
        pair_files.chain(country_files).collect()
    }

    #[cfg(test)]
    pub(crate) fn outcome(&self, country: &str, indicator: &str) -> Option<&PairStatus> {
        self.pairs
            .iter()
            .find(|p| p.country == country && p.indicator == indicator)
            .map(|p| &p.status)
    }

    fn count(&self, pred: impl Fn(&PairStatus) -> bool) -> usize {
        self.pairs.iter().filter(|p| pred(&p.status)).count()
    }
}
