//! Long-form and wide-form table assembly.
//!
//! - `IndicatorTable`: one (country, indicator) series, sorted by year
//! - `CountryTable`: every indicator of one country pivoted to one column each
//!
//! Both are backed by polars `DataFrame`s; column names and dtypes are fixed
//! here so every writer produces the same schema (`Year` is i64, values f64).

use polars_ops::pivot::{PivotAgg, pivot_stable};
use polars::prelude::{
    Column, DataFrame, DataType, NamedFrom, PolarsResult, Series, SortMultipleOptions,
};

use crate::domain::Observation;

pub const YEAR_COLUMN: &str = "Year";
pub const INDICATOR_COLUMN: &str = "Indicator";
pub const VALUE_COLUMN: &str = "Value";

/// Long form: `Year, Indicator, Value` for a single (country, indicator) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorTable {
    pub country: String,
    pub indicator: String,
    rows: Vec<Observation>,
}

impl IndicatorTable {
    /// Build the table, sorting rows ascending by year.
    ///
    /// The sort is stable, so rows sharing a year keep their source order.
    pub fn new(
        country: impl Into<String>,
        indicator: impl Into<String>,
        mut rows: Vec<Observation>,
    ) -> Self {
        rows.sort_by_key(|o| o.year);
        Self {
            country: country.into(),
            indicator: indicator.into(),
            rows,
        }
    }

    #[cfg(test)]
    pub(crate) fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Years that occur more than once, each reported once.
    pub fn duplicate_years(&self) -> Vec<i64> {
        let mut out: Vec<i64> = self
            .rows
            .windows(2)
            .filter(|w| w[0].year == w[1].year)
            .map(|w| w[0].year)
            .collect();
        out.dedup();
        out
    }

    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let years: Vec<i64> = self.rows.iter().map(|o| o.year).collect();
        let indicators: Vec<&str> = self.rows.iter().map(|o| o.indicator.as_str()).collect();
        let values: Vec<Option<f64>> = self.rows.iter().map(|o| o.value).collect();

        let columns: Vec<Column> = vec![
            Series::new(YEAR_COLUMN.into(), years).into(),
            Series::new(INDICATOR_COLUMN.into(), indicators).into(),
            Series::new(VALUE_COLUMN.into(), values).into(),
        ];
        DataFrame::new(columns)
    }
}

/// Wide form: one row per year, one column per indicator, for one country.
#[derive(Debug, Clone)]
pub struct CountryTable {
    pub country: String,
    frame: DataFrame,
}

impl CountryTable {
    /// Pivot a country's indicator tables.
    ///
    /// The long-form frames are stacked and pivoted on `Indicator` with `Year`
    /// as the index. Rows are the union of all years, ascending. Columns follow
    /// the order of `tables`; empty tables contribute no column. When a series
    /// repeats a year, the first row for that year wins.
    pub fn pivot(country: impl Into<String>, tables: &[IndicatorTable]) -> PolarsResult<Self> {
        let present: Vec<&IndicatorTable> = tables.iter().filter(|t| !t.is_empty()).collect();

        let Some((first, rest)) = present.split_first() else {
            let year = Series::new_empty(YEAR_COLUMN.into(), &DataType::Int64);
            return Ok(Self {
                country: country.into(),
                frame: DataFrame::new(vec![year.into()])?,
            });
        };

        let mut long = first.to_frame()?;
        for table in rest {
            long.vstack_mut(&table.to_frame()?)?;
        }

        let wide = pivot_stable(
            &long,
            [INDICATOR_COLUMN],
            Some([YEAR_COLUMN]),
            Some([VALUE_COLUMN]),
            false,
            Some(PivotAgg::First),
            None,
        )?;

        let order: Vec<&str> = std::iter::once(YEAR_COLUMN)
            .chain(present.iter().map(|t| t.indicator.as_str()))
            .collect();
        let frame = wide
            .select(order)?
            .sort([YEAR_COLUMN], SortMultipleOptions::default())?;

        Ok(Self {
            country: country.into(),
            frame,
        })
    }

    pub fn year_count(&self) -> usize {
        self.frame.height()
    }

    pub fn indicator_names(&self) -> Vec<&str> {
        self.frame
            .get_column_names()
            .into_iter()
            .skip(1)
            .map(|name| name.as_str())
            .collect()
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    #[cfg(test)]
    fn years(&self) -> Vec<i64> {
        let Ok(column) = self.frame.column(YEAR_COLUMN) else {
            return Vec::new();
        };
        match column.as_materialized_series().i64() {
            Ok(years) => years.into_iter().flatten().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// `None` when the year or indicator is not in the table, `Some(None)` for a
    /// null cell.
    #[cfg(test)]
    fn cell(&self, year: i64, indicator: &str) -> Option<Option<f64>> {
        let row = self.years().iter().position(|y| *y == year)?;
        let column = self.frame.column(indicator).ok()?;
        let values = column.as_materialized_series().f64().ok()?;
        Some(values.get(row))
    }
}
