//! Formatted terminal output.
//!
//! Logs go to stderr through `tracing`; the tables built here are the stdout
//! product of `wdi fetch` and `wdi plan`.

use crate::report::{PairStatus, RunSummary};

/// One planned request and the file it would produce.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPair {
    pub country: String,
    pub indicator: String,
    pub url: String,
    pub file: String,
}

/// Format the end-of-run summary.
pub fn format_run_summary(summary: &RunSummary, output_dir: &str) -> String {
    let mut out = String::new();

    out.push_str("=== wdi - indicator harvest ===\n");
    out.push_str(&format!("Output: {output_dir}\n"));
    out.push_str(&format!(
        "Pairs: {} | written={} empty={} failed={}\n",
        summary.pairs.len(),
        summary.written(),
        summary.empty(),
        summary.failed()
    ));
    out.push_str(&format!("Files: {}\n", summary.files().len()));
    out.push('\n');

    out.push_str(
        format!(
            "{:<20} {:<28} {:<8} {:>6} {}\n",
            "country", "indicator", "status", "rows", "detail"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!("{:-<20} {:-<28} {:-<8} {:-<6} {:-<6}\n", "", "", "", "", "").trim_end(),
    );
    out.push('\n');

    for pair in &summary.pairs {
        let (status, rows, detail) = match &pair.status {
            PairStatus::Written { file, rows } => ("written", rows.to_string(), file.as_str()),
            PairStatus::Empty => ("empty", "-".to_string(), ""),
            PairStatus::Failed { reason } => ("failed", "-".to_string(), reason.as_str()),
        };
        out.push_str(
            format!(
                "{:<20} {:<28} {:<8} {:>6} {}\n",
                truncate(&pair.country, 20),
                truncate(&pair.indicator, 28),
                status,
                rows,
                detail
            )
            .trim_end(),
        );
        out.push('\n');
    }

    if !summary.countries.is_empty() {
        out.push_str("\nCountry tables:\n");
        for c in &summary.countries {
            match &c.file {
                Some(file) => out.push_str(&format!(
                    "- {} -> {file} ({} years x {} indicators)\n",
                    c.country, c.years, c.indicators
                )),
                None => out.push_str(&format!("- {} -> no data\n", c.country)),
            }
        }
    }

    out
}

/// Format the dry-run listing of `wdi plan`.
pub fn format_plan(pairs: &[PlannedPair], country_files: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} request(s):\n", pairs.len()));
    for p in pairs {
        out.push_str(&format!(
            "- {} / {}\n    GET {}\n    -> {}\n",
            p.country, p.indicator, p.url, p.file
        ));
    }
    out.push_str(&format!("\n{} country table(s):\n", country_files.len()));
    for f in country_files {
        out.push_str(&format!("- {f}\n"));
    }
    out
}

/// Cut `s` to at most `max` characters, marking a cut with a trailing `.`.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{CountryOutcome, PairOutcome};

    fn summary() -> RunSummary {
        RunSummary {
            pairs: vec![
                PairOutcome {
                    country: "Testland".into(),
                    indicator: "GDP".into(),
                    status: PairStatus::Written {
                        file: "Testland_GDP.parquet".into(),
                        rows: 3,
                    },
                },
                PairOutcome {
                    country: "Testland".into(),
                    indicator: "Exports".into(),
                    status: PairStatus::Empty,
                },
                PairOutcome {
                    country: "Testland".into(),
                    indicator: "Imports".into(),
                    status: PairStatus::Failed {
                        reason: "request failed with status 500".into(),
                    },
                },
            ],
            countries: vec![CountryOutcome {
                country: "Testland".into(),
                file: Some("Testland.parquet".into()),
                years: 3,
                indicators: 1,
            }],
        }
    }

    #[test]
    fn summary_counts_each_status() {
        let s = summary();
        assert_eq!((s.written(), s.empty(), s.failed()), (1, 1, 1));
        assert_eq!(s.files(), vec!["Testland_GDP.parquet", "Testland.parquet"]);
        assert_eq!(s.outcome("Testland", "Exports"), Some(&PairStatus::Empty));
    }

    #[test]
    fn run_summary_lists_every_pair() {
        let text = format_run_summary(&summary(), "data");
        assert!(text.contains("Pairs: 3 | written=1 empty=1 failed=1"));
        assert!(text.contains("Files: 2\n"));
        assert!(text.contains("Testland_GDP.parquet"));
        assert!(text.contains("status 500"));
        assert!(text.contains("Testland -> Testland.parquet (3 years x 1 indicators)"));
        assert!(text.lines().all(|l| l == l.trim_end()));
    }

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("Bolivia", 20), "Bolivia");
        assert_eq!(truncate("abcdefgh", 5), "abcd.");
        assert_eq!(truncate("Côte d'Ivoire", 6), "Côte .");
        assert_eq!(truncate("abc", 3), "abc");
    }

    #[test]
    fn plan_lists_requests_and_country_files() {
        let text = format_plan(
            &[PlannedPair {
                country: "Testland".into(),
                indicator: "GDP".into(),
                url: "http://x/v2/country/TST/indicator/G".into(),
                file: "data/Testland_GDP.csv".into(),
            }],
            &["data/Testland.csv".into()],
        );
        assert!(text.starts_with("1 request(s):"));
        assert!(text.contains("GET http://x/v2/country/TST/indicator/G"));
        assert!(text.contains("- data/Testland.csv"));
    }
}
