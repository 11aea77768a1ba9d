//! Ranking selector: filtered, stably sorted top-N rows.

use polars::prelude::*;
use tracing::debug;

use crate::aggregate::stable_sort_options;
use crate::error::Result;
use crate::schema::{MONTHLY_VIEWS, TOTAL_VIEWS, VIEW_MONTH, VIEW_YEAR};
use crate::tables::{CompleteData, TotalViews};

pub use filmviews_cli::MonthWindow;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl FilterValue {
    fn to_lit(&self) -> Expr {
        match self {
            FilterValue::Int(v) => lit(*v),
            FilterValue::Float(v) => lit(*v),
            FilterValue::Str(v) => lit(v.clone()),
        }
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        FilterValue::Int(v as i64)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        FilterValue::Float(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Str(v.to_string())
    }
}

/// `column == value`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: FilterValue,
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<FilterValue>) -> Self {
        Self {
            column: column.to_string(),
            value: value.into(),
        }
    }

    fn expr(&self) -> Expr {
        col(self.column.as_str()).eq(self.value.to_lit())
    }
}

/// The `n` rows with the largest `sort_key` among rows matching every filter.
///
/// Ties keep input order and nulls sort last. Fewer than `n` matches returns all of them;
/// no matches returns an empty frame with the input's columns.
pub fn top_n(lf: LazyFrame, sort_key: &str, n: usize, filters: &[Filter]) -> Result<DataFrame> {
    let mut lf = lf;
    if let Some(predicate) = filters
        .iter()
        .map(Filter::expr)
        .reduce(|acc, e| acc.and(e))
    {
        lf = lf.filter(predicate);
    }
    let limit = IdxSize::try_from(n).unwrap_or(IdxSize::MAX);
    let out = lf
        .sort_by_exprs([col(sort_key)], stable_sort_options(true))
        .limit(limit)
        .collect()?;
    debug!(sort_key, n, filters = filters.len(), rows = out.height(), "top_n");
    Ok(out)
}

/// Films with the most total views.
pub fn top_films(totals: &TotalViews, n: usize) -> Result<DataFrame> {
    top_n(totals.lazy(), TOTAL_VIEWS, n, &[])
}

/// Most recent (view_year, view_month) present, or `None` for an empty table.
pub fn latest_month(complete: &CompleteData) -> Result<Option<MonthWindow>> {
    const KEY: &str = "__month_key";
    let key = (col(VIEW_YEAR).cast(DataType::Int64) * lit(12_i64)
        + col(VIEW_MONTH).cast(DataType::Int64)
        - lit(1_i64))
    .max()
    .alias(KEY);
    let out = complete.lazy().select([key]).collect()?;
    let latest = out.column(KEY)?.as_materialized_series().i64()?.get(0);
    Ok(latest.map(|k| MonthWindow {
        year: k.div_euclid(12) as i32,
        month: (k.rem_euclid(12) + 1) as u32,
    }))
}

/// Films with the most views within one month; the latest month when `window` is `None`.
pub fn top_films_in_window(
    complete: &CompleteData,
    n: usize,
    window: Option<MonthWindow>,
) -> Result<DataFrame> {
    let window = match window {
        Some(w) => Some(w),
        None => latest_month(complete)?,
    };
    let filters = match window {
        Some(w) => vec![
            Filter::eq(VIEW_YEAR, w.year),
            Filter::eq(VIEW_MONTH, w.month as i64),
        ],
        // empty input: nothing to window on
        None => Vec::new(),
    };
    top_n(complete.lazy(), MONTHLY_VIEWS, n, &filters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(df: &DataFrame) -> Vec<String> {
        df.column("Film")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect()
    }

    fn views() -> LazyFrame {
        df!(
            "Film" => &["A", "B", "C", "D", "E"],
            "Genre" => &["Drama", "Comedy", "Drama", "Drama", "Comedy"],
            "Year" => &[2024_i32, 2024, 2025, 2025, 2025],
            "Views" => &[Some(100_i64), Some(50), Some(200), None, Some(100)],
        )
        .unwrap()
        .lazy()
    }

    #[test]
    fn test_top_n_descending() {
        let out = top_n(views(), "Views", 2, &[]).unwrap();
        assert_eq!(names(&out), vec!["C", "A"]);
    }

    #[test]
    fn test_ties_keep_input_order_and_nulls_last() {
        let out = top_n(views(), "Views", 10, &[]).unwrap();
        assert_eq!(names(&out), vec!["C", "A", "E", "B", "D"]);
    }

    #[test]
    fn test_fewer_rows_than_n() {
        let out = top_n(views(), "Views", 3, &[Filter::eq("Genre", "Comedy")]).unwrap();
        assert_eq!(names(&out), vec!["E", "B"]);
    }

    #[test]
    fn test_filters_are_and_ed() {
        let filters = [Filter::eq("Genre", "Drama"), Filter::eq("Year", 2025_i32)];
        let out = top_n(views(), "Views", 5, &filters).unwrap();
        assert_eq!(names(&out), vec!["C", "D"]);
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let out = top_n(views(), "Views", 5, &[Filter::eq("Year", 1999_i32)]).unwrap();
        assert_eq!(out.height(), 0);
        assert_eq!(out.width(), 4);
    }

    #[test]
    fn test_zero_n() {
        let out = top_n(views(), "Views", 0, &[]).unwrap();
        assert_eq!(out.height(), 0);
    }
}
