//! Pairwise-complete Pearson correlation over a chosen set of numeric columns.

use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::schema::{
    AVG_RATING_CATEGORY, AVG_RATING_LANGUAGE, MONTHLY_VIEWS, TOTAL_VIEWS, VIEWER_RATE,
};

/// Columns correlated by the pipeline when none are configured.
pub const DEFAULT_COLUMNS: [&str; 5] = [
    VIEWER_RATE,
    AVG_RATING_CATEGORY,
    AVG_RATING_LANGUAGE,
    MONTHLY_VIEWS,
    TOTAL_VIEWS,
];

/// Label column of [`CorrelationMatrix::to_frame`].
pub const LABEL_COLUMN: &str = "column";

#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    /// Retained columns, in request order.
    pub columns: Vec<String>,
    /// Square and symmetric; NaN where the correlation is undefined.
    pub correlations: Vec<Vec<f64>>,
    /// Rows where both columns are non-null.
    pub sample_sizes: Vec<Vec<usize>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.correlations[i][j])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.columns.len() + 1);
        columns.push(Series::new(LABEL_COLUMN.into(), &self.columns).into());
        for (j, name) in self.columns.iter().enumerate() {
            let cells: Vec<f64> = self.correlations.iter().map(|row| row[j]).collect();
            columns.push(Series::new(name.as_str().into(), cells).into());
        }
        Ok(DataFrame::new(columns)?)
    }
}

fn numeric_values(column: &Column) -> Result<Vec<Option<f64>>> {
    let series = column
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.iter().collect())
}

/// Pearson correlation between every pair of `columns` present in `df`.
///
/// Requested columns that are missing or not numeric are dropped. Each cell uses only the
/// rows where both columns are non-null; with fewer than two such rows, or zero variance
/// on either side, the cell is NaN. The diagonal is 1 for a column with nonzero variance.
pub fn correlate(df: &DataFrame, columns: &[&str]) -> Result<CorrelationMatrix> {
    let schema = df.schema();
    let mut kept: Vec<String> = Vec::with_capacity(columns.len());
    for name in columns {
        match schema.get(name) {
            Some(dtype) if dtype.is_numeric() => {
                if !kept.iter().any(|k| k == name) {
                    kept.push(name.to_string());
                }
            }
            Some(dtype) => debug!(column = name, %dtype, "skipping non-numeric column"),
            None => debug!(column = name, "skipping missing column"),
        }
    }
    if kept.len() < columns.len() {
        warn!(
            requested = columns.len(),
            retained = kept.len(),
            "some correlation columns were dropped"
        );
    }

    let values: Vec<Vec<Option<f64>>> = kept
        .iter()
        .map(|name| numeric_values(df.column(name)?))
        .collect::<Result<_>>()?;

    let n = kept.len();
    let mut correlations = vec![vec![f64::NAN; n]; n];
    let mut sample_sizes = vec![vec![0; n]; n];

    for i in 0..n {
        for j in i..n {
            let (r, size) = pearson(&values[i], &values[j]);
            correlations[i][j] = r;
            correlations[j][i] = r;
            sample_sizes[i][j] = size;
            sample_sizes[j][i] = size;
        }
        // exact 1 rather than a rounding artifact
        if !correlations[i][i].is_nan() {
            correlations[i][i] = 1.0;
        }
    }

    Ok(CorrelationMatrix {
        columns: kept,
        correlations,
        sample_sizes,
    })
}

/// Correlation over complete pairs, and the number of complete pairs.
fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> (f64, usize) {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    let size = pairs.len();
    if size < 2 {
        return (f64::NAN, size);
    }

    let mean_a = pairs.iter().map(|(x, _)| x).sum::<f64>() / size as f64;
    let mean_b = pairs.iter().map(|(_, y)| y).sum::<f64>() / size as f64;

    let numerator: f64 = pairs
        .iter()
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum();
    let var_a: f64 = pairs.iter().map(|(x, _)| (x - mean_a).powi(2)).sum();
    let var_b: f64 = pairs.iter().map(|(_, y)| (y - mean_b).powi(2)).sum();

    if var_a == 0.0 || var_b == 0.0 {
        return (f64::NAN, size);
    }
    let r = numerator / (var_a.sqrt() * var_b.sqrt());
    (r.clamp(-1.0, 1.0), size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_perfect_correlations() {
        let df = df!(
            "x" => &[1.0_f64, 2.0, 3.0, 4.0],
            "up" => &[2_i64, 4, 6, 8],
            "down" => &[8.0_f64, 6.0, 4.0, 2.0],
        )
        .unwrap();
        let m = correlate(&df, &["x", "up", "down"]).unwrap();
        assert!(close(m.get("x", "up").unwrap(), 1.0));
        assert!(close(m.get("x", "down").unwrap(), -1.0));
        assert_eq!(m.sample_sizes[0][1], 4);
    }

    #[test]
    fn test_symmetric_with_unit_diagonal() {
        let df = df!(
            "a" => &[1.0_f64, 5.0, 2.0, 8.0, 3.0],
            "b" => &[3.0_f64, 1.0, 4.0, 1.5, 9.0],
            "c" => &[10_i64, 7, 3, 4, 1],
        )
        .unwrap();
        let m = correlate(&df, &["a", "b", "c"]).unwrap();
        for i in 0..m.len() {
            assert_eq!(m.correlations[i][i], 1.0);
            for j in 0..m.len() {
                assert_eq!(m.correlations[i][j], m.correlations[j][i]);
                assert!(m.correlations[i][j].abs() <= 1.0);
            }
        }
    }

    #[test]
    fn test_pairwise_complete_observations() {
        let df = df!(
            "a" => &[Some(1.0_f64), Some(2.0), Some(3.0), None, Some(100.0)],
            "b" => &[Some(2.0_f64), Some(4.0), Some(6.0), Some(1.0), None],
            "c" => &[Some(1.0_f64), Some(1.0), Some(2.0), Some(5.0), Some(3.0)],
        )
        .unwrap();
        let m = correlate(&df, &["a", "b", "c"]).unwrap();
        // only the first three rows are complete for (a, b)
        assert!(close(m.get("a", "b").unwrap(), 1.0));
        assert_eq!(m.sample_sizes[0][1], 3);
        assert_eq!(m.sample_sizes[0][2], 4);
        assert_eq!(m.sample_sizes[2][2], 5);
    }

    #[test]
    fn test_constant_column_is_nan() {
        let df = df!(
            "a" => &[1.0_f64, 2.0, 3.0],
            "flat" => &[5.0_f64, 5.0, 5.0],
        )
        .unwrap();
        let m = correlate(&df, &["a", "flat"]).unwrap();
        assert!(m.get("a", "flat").unwrap().is_nan());
        assert!(m.get("flat", "flat").unwrap().is_nan());
        assert_eq!(m.get("a", "a"), Some(1.0));
    }

    #[test]
    fn test_missing_and_non_numeric_columns_dropped() {
        let df = df!(
            "a" => &[1.0_f64, 2.0, 3.0],
            "b" => &[3.0_f64, 1.0, 2.0],
            "name" => &["x", "y", "z"],
        )
        .unwrap();
        let m = correlate(&df, &["a", "missing", "name", "b"]).unwrap();
        assert_eq!(m.columns, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(m.correlations.len(), 2);
    }

    #[test]
    fn test_single_complete_pair_is_nan() {
        let df = df!(
            "a" => &[Some(1.0_f64), None],
            "b" => &[Some(2.0_f64), Some(3.0)],
        )
        .unwrap();
        let m = correlate(&df, &["a", "b"]).unwrap();
        assert!(m.get("a", "b").unwrap().is_nan());
        assert!(m.get("a", "a").unwrap().is_nan());
    }

    #[test]
    fn test_to_frame_shape() {
        let df = df!("a" => &[1.0_f64, 2.0], "b" => &[2.0_f64, 1.0]).unwrap();
        let frame = correlate(&df, &["a", "b"]).unwrap().to_frame().unwrap();
        assert_eq!(frame.shape(), (2, 3));
        assert_eq!(frame.get_column_names()[0].as_str(), LABEL_COLUMN);
    }
}
