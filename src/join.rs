//! Join engine: monthly views ⟕ total views ⟕ de-duplicated film attributes.

use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::schema::{ATTRIBUTES, FILM_NAME, TOTAL_VIEWS, VIEWER_RATE};
use crate::tables::{CompleteData, FilmAttributes, MonthlyViews, TotalViews};

pub use filmviews_cli::DuplicatePolicy;

const ROW_INDEX: &str = "__row_index";

/// Left-join `monthly` with `totals`, then with `attributes` collapsed to one row per film.
///
/// Every monthly row survives exactly once, in its original order; films missing from a
/// right-hand table get nulls in that table's columns.
pub fn merge_views(
    monthly: &MonthlyViews,
    totals: &TotalViews,
    attributes: &FilmAttributes,
    policy: DuplicatePolicy,
) -> Result<CompleteData> {
    let totals_unique = totals
        .lazy()
        .filter(col(FILM_NAME).is_first_distinct());
    let attributes_unique = dedupe_attributes(attributes, policy)?;

    let joined = monthly
        .lazy()
        .with_row_index(ROW_INDEX, None)
        .left_join(totals_unique, col(FILM_NAME), col(FILM_NAME))
        .left_join(attributes_unique.lazy(), col(FILM_NAME), col(FILM_NAME))
        .sort_by_exprs([col(ROW_INDEX)], SortMultipleOptions::default())
        .collect()?
        .drop(ROW_INDEX)?;

    debug_assert_eq!(joined.height(), monthly.height());
    info!(
        rows = joined.height(),
        without_totals = joined.column(TOTAL_VIEWS)?.null_count(),
        without_attributes = joined.column(VIEWER_RATE)?.null_count(),
        "merged monthly views with totals and attributes"
    );
    Ok(CompleteData::from_normalized(joined))
}

/// Collapse `attributes` to one row per film according to `policy`.
pub fn dedupe_attributes(
    attributes: &FilmAttributes,
    policy: DuplicatePolicy,
) -> Result<DataFrame> {
    let keep = match policy {
        DuplicatePolicy::First => col(FILM_NAME).is_first_distinct(),
        DuplicatePolicy::Last => col(FILM_NAME).is_last_distinct(),
        DuplicatePolicy::Error => {
            check_conflicts(attributes)?;
            col(FILM_NAME).is_first_distinct()
        }
    };
    let deduped = attributes.lazy().filter(keep).collect()?;
    let dropped = attributes.height() - deduped.height();
    if dropped > 0 {
        debug!(
            dropped,
            policy = policy.as_str(),
            "collapsed duplicate attribute rows"
        );
    }
    Ok(deduped)
}

/// Fails on the first film (in source order) whose rows disagree on any attribute column.
fn check_conflicts(attributes: &FilmAttributes) -> Result<()> {
    let columns = ATTRIBUTES.attribute_columns();
    let distinct: Vec<Expr> = columns
        .iter()
        .map(|c| col(*c).n_unique().cast(DataType::UInt64).alias(*c))
        .collect();
    let counts = attributes
        .lazy()
        .group_by_stable([col(FILM_NAME)])
        .agg(distinct)
        .collect()?;

    let films = counts.column(FILM_NAME)?.as_materialized_series().str()?;
    for row in 0..counts.height() {
        for name in &columns {
            let n = counts
                .column(name)?
                .as_materialized_series()
                .u64()?
                .get(row)
                .unwrap_or(0);
            if n > 1 {
                return Err(PipelineError::JoinAmbiguity {
                    film: films.get(row).unwrap_or_default().to_string(),
                    column: name.to_string(),
                });
            }
        }
    }
    Ok(())
}
