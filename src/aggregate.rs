//! Aggregation engine: grouped sums, means and counts, plus the named views a dashboard
//! renders (monthly trend, category / language totals, month performance, ...).

use polars::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::schema::{
    CATEGORY, FILM_NAME, LANGUAGE, MONTHLY_VIEWS, MONTH_START, NUMBER_OF_VIEWS, RELEASE_MONTH,
    RELEASE_YEAR, VIEWER_RATE, VIEWING_DAY_NAME, VIEWING_MONTH_NAME, VIEW_MONTH, VIEW_YEAR,
};
use crate::tables::{CompleteData, FilmViews};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Sum,
    Mean,
    /// Number of non-null values.
    Count,
    /// First value of the group, for columns that are constant within a group.
    First,
}

/// One reduced output column.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduce {
    pub column: String,
    pub reduction: Reduction,
    pub alias: Option<String>,
}

impl Reduce {
    pub fn sum(column: &str) -> Self {
        Self::new(column, Reduction::Sum)
    }

    pub fn mean(column: &str) -> Self {
        Self::new(column, Reduction::Mean)
    }

    pub fn count(column: &str) -> Self {
        Self::new(column, Reduction::Count)
    }

    pub fn first(column: &str) -> Self {
        Self::new(column, Reduction::First)
    }

    fn new(column: &str, reduction: Reduction) -> Self {
        Self {
            column: column.to_string(),
            reduction,
            alias: None,
        }
    }

    pub fn alias(mut self, name: &str) -> Self {
        self.alias = Some(name.to_string());
        self
    }

    /// Output column name; the source column name unless aliased.
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.column)
    }

    fn expr(&self) -> Expr {
        let base = col(self.column.as_str());
        let reduced = match self.reduction {
            Reduction::Sum => base.sum(),
            Reduction::Mean => base.mean(),
            Reduction::Count => base.count(),
            Reduction::First => base.first(),
        };
        reduced.alias(self.output_name())
    }
}

/// Sort applied after grouping. Stable: ties keep first-appearance order.
#[derive(Debug, Clone, PartialEq)]
pub struct SortBy {
    pub column: String,
    pub descending: bool,
}

impl SortBy {
    pub fn ascending(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: false,
        }
    }

    pub fn descending(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: true,
        }
    }
}

/// Result of [`group_reduce`]: one row per distinct key tuple.
#[derive(Debug, Clone)]
pub struct AggregateTable {
    pub keys: Vec<String>,
    pub values: Vec<String>,
    pub frame: DataFrame,
}

impl AggregateTable {
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }
}

pub(crate) fn stable_sort_options(descending: bool) -> SortMultipleOptions {
    SortMultipleOptions::default()
        .with_order_descending(descending)
        .with_nulls_last(true)
        .with_maintain_order(true)
}

/// Group `lf` by the ordered `group_keys` and apply `reductions` to each group.
///
/// Keys are compared by exact equality. Groups come out in order of first appearance,
/// then `sort` (if any) is applied stably.
pub fn group_reduce(
    lf: LazyFrame,
    group_keys: &[&str],
    reductions: &[Reduce],
    sort: Option<&SortBy>,
) -> Result<AggregateTable> {
    let keys: Vec<Expr> = group_keys.iter().map(|k| col(*k)).collect();
    let aggs: Vec<Expr> = reductions.iter().map(Reduce::expr).collect();

    let mut grouped = lf.group_by_stable(keys).agg(aggs);
    if let Some(sort) = sort {
        grouped = grouped.sort_by_exprs(
            [col(sort.column.as_str())],
            stable_sort_options(sort.descending),
        );
    }
    let frame = grouped.collect()?;
    debug!(
        keys = ?group_keys,
        groups = frame.height(),
        "group_reduce"
    );

    Ok(AggregateTable {
        keys: group_keys.iter().map(|k| k.to_string()).collect(),
        values: reductions
            .iter()
            .map(|r| r.output_name().to_string())
            .collect(),
        frame,
    })
}

/// Total monthly views per (view_year, view_month) with Month_Start, oldest month first.
pub fn monthly_trend(complete: &CompleteData) -> Result<AggregateTable> {
    group_reduce(
        complete.lazy(),
        &[VIEW_YEAR, VIEW_MONTH],
        &[Reduce::first(MONTH_START), Reduce::sum(MONTHLY_VIEWS)],
        Some(&SortBy::ascending(MONTH_START)),
    )
}

/// Sum of Number_of_Views per category, largest first.
pub fn category_totals(films: &FilmViews) -> Result<AggregateTable> {
    group_reduce(
        films.lazy(),
        &[CATEGORY],
        &[Reduce::sum(NUMBER_OF_VIEWS)],
        Some(&SortBy::descending(NUMBER_OF_VIEWS)),
    )
}

/// Sum of Number_of_Views per language, largest first.
pub fn language_totals(films: &FilmViews) -> Result<AggregateTable> {
    group_reduce(
        films.lazy(),
        &[LANGUAGE],
        &[Reduce::sum(NUMBER_OF_VIEWS)],
        Some(&SortBy::descending(NUMBER_OF_VIEWS)),
    )
}

pub const AVG_VIEWS: &str = "Avg_Views";
pub const SUM_VIEWS: &str = "Sum_Views";
pub const FILM_COUNT: &str = "Film_Count";
pub const AVG_RATING: &str = "Avg_Rating";

/// Views and rating by release month (1-12), January first.
pub fn month_performance(films: &FilmViews) -> Result<AggregateTable> {
    group_reduce(
        films.lazy(),
        &[RELEASE_MONTH],
        &[
            Reduce::mean(NUMBER_OF_VIEWS).alias(AVG_VIEWS),
            Reduce::sum(NUMBER_OF_VIEWS).alias(SUM_VIEWS),
            Reduce::count(NUMBER_OF_VIEWS).alias(FILM_COUNT),
            Reduce::mean(VIEWER_RATE).alias(AVG_RATING),
        ],
        Some(&SortBy::ascending(RELEASE_MONTH)),
    )
}

/// Total views per release year, oldest first.
pub fn release_year_trend(films: &FilmViews) -> Result<AggregateTable> {
    group_reduce(
        films.lazy(),
        &[RELEASE_YEAR],
        &[Reduce::sum(NUMBER_OF_VIEWS)],
        Some(&SortBy::ascending(RELEASE_YEAR)),
    )
}

/// Total views per film with its category, largest first.
pub fn views_per_film(films: &FilmViews) -> Result<AggregateTable> {
    group_reduce(
        films.lazy(),
        &[FILM_NAME],
        &[Reduce::first(CATEGORY), Reduce::sum(NUMBER_OF_VIEWS)],
        Some(&SortBy::descending(NUMBER_OF_VIEWS)),
    )
}

/// Per-snapshot rating vs. views, no grouping.
pub fn rating_vs_views(films: &FilmViews) -> Result<DataFrame> {
    Ok(films
        .lazy()
        .select([
            col(FILM_NAME),
            col(CATEGORY),
            col(VIEWER_RATE),
            col(NUMBER_OF_VIEWS),
        ])
        .collect()?)
}

/// Sum of Number_of_Views per (viewing month name, viewing day name); input of the heatmap.
pub fn heatmap_aggregate(films: &FilmViews) -> Result<AggregateTable> {
    group_reduce(
        films.lazy(),
        &[VIEWING_MONTH_NAME, VIEWING_DAY_NAME],
        &[Reduce::sum(NUMBER_OF_VIEWS)],
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize_films, NormalizeOptions};
    use crate::schema::*;

    fn films() -> FilmViews {
        let lf = df!(
            FILM_NAME => &["A", "B", "C", "D", "E"],
            CATEGORY => &["Drama", "Comedy", "Drama", "Horror", "Comedy"],
            LANGUAGE => &["English", "Hindi", "English", "Korean", "Hindi"],
            VIEWER_RATE => &[8.0_f64, 6.0, 7.0, 5.0, 9.0],
            NUMBER_OF_VIEWS => &[100_i64, 40, 60, 100, 160],
            RELEASE_DATE => &["2020-01-10", "2020-01-20", "2021-03-01", "2019-12-24", "2021-03-05"],
            VIEWING_MONTH => &["2025-01-06", "2025-01-06", "2025-02-03", "2025-01-07", "2025-02-03"],
        )
        .unwrap()
        .lazy();
        normalize_films(
            lf,
            &NormalizeOptions {
                date_format: Some("%Y-%m-%d".to_string()),
            },
        )
        .unwrap()
    }

    fn i64_values(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .iter()
            .collect()
    }

    fn str_values(df: &DataFrame, name: &str) -> Vec<String> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .iter()
            .map(|s| s.unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_category_totals_sorted_desc() {
        let table = category_totals(&films()).unwrap();
        assert_eq!(table.keys, vec![CATEGORY.to_string()]);
        assert_eq!(
            str_values(&table.frame, CATEGORY),
            vec!["Comedy", "Drama", "Horror"]
        );
        assert_eq!(
            i64_values(&table.frame, NUMBER_OF_VIEWS),
            vec![Some(200), Some(160), Some(100)]
        );
    }

    #[test]
    fn test_group_sums_conserve_total() {
        let films = films();
        let source: i64 = i64_values(films.frame(), NUMBER_OF_VIEWS)
            .into_iter()
            .flatten()
            .sum();
        for table in [
            category_totals(&films).unwrap(),
            language_totals(&films).unwrap(),
            release_year_trend(&films).unwrap(),
            heatmap_aggregate(&films).unwrap(),
        ] {
            let total: i64 = i64_values(&table.frame, NUMBER_OF_VIEWS)
                .into_iter()
                .flatten()
                .sum();
            assert_eq!(total, source, "keys {:?}", table.keys);
        }
    }

    #[test]
    fn test_ties_keep_first_appearance() {
        // A and D both total 100; A appears first in the source.
        let table = views_per_film(&films()).unwrap();
        let names = str_values(&table.frame, FILM_NAME);
        assert_eq!(names, vec!["E", "A", "D", "C", "B"]);
        assert_eq!(
            str_values(&table.frame, CATEGORY),
            vec!["Comedy", "Drama", "Horror", "Drama", "Comedy"]
        );
    }

    #[test]
    fn test_month_performance() {
        let table = month_performance(&films()).unwrap();
        let df = &table.frame;
        let months: Vec<Option<i32>> = df
            .column(RELEASE_MONTH)
            .unwrap()
            .as_materialized_series()
            .i32()
            .unwrap()
            .iter()
            .collect();
        assert_eq!(months, vec![Some(1), Some(3), Some(12)]);
        assert_eq!(
            df.column(SUM_VIEWS).unwrap().get(0).unwrap(),
            AnyValue::Int64(140)
        );
        assert_eq!(
            df.column(AVG_VIEWS).unwrap().get(0).unwrap(),
            AnyValue::Float64(70.0)
        );
        assert_eq!(
            df.column(AVG_RATING).unwrap().get(1).unwrap(),
            AnyValue::Float64(8.0)
        );
        let counts = df
            .column(FILM_COUNT)
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Int64)
            .unwrap();
        assert_eq!(counts.i64().unwrap().get(2), Some(1));
    }

    #[test]
    fn test_group_reduce_multiple_keys_are_unique() {
        let table = heatmap_aggregate(&films()).unwrap();
        // (January, Monday), (February, Monday), (January, Tuesday)
        assert_eq!(table.height(), 3);
        assert_eq!(
            table.values,
            vec![NUMBER_OF_VIEWS.to_string()]
        );
    }

    #[test]
    fn test_group_reduce_empty_input() {
        let empty = films().lazy().filter(lit(false));
        let table = group_reduce(
            empty,
            &[CATEGORY],
            &[Reduce::sum(NUMBER_OF_VIEWS)],
            Some(&SortBy::descending(NUMBER_OF_VIEWS)),
        )
        .unwrap();
        assert!(table.is_empty());
    }
}
