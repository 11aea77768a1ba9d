//! Pivot/matrix builder: reshapes a two-key aggregate into a dense matrix over fixed axes.

use std::collections::HashMap;

use polars::prelude::*;
use serde::Serialize;

use crate::aggregate::{heatmap_aggregate, AggregateTable};
use crate::calendar::{DAY_NAMES, MONTH_NAMES};
use crate::error::{PipelineError, Result};
use crate::schema::NUMBER_OF_VIEWS;
use crate::tables::FilmViews;

/// Dense matrix: `values[r][c]` belongs to (`row_labels[r]`, `col_labels[c]`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotMatrix {
    /// Name of the key that indexes rows (first column of [`PivotMatrix::to_frame`]).
    pub row_axis: String,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl PivotMatrix {
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let r = self.row_labels.iter().position(|l| l == row)?;
        let c = self.col_labels.iter().position(|l| l == col)?;
        Some(self.values[r][c])
    }

    pub fn cell_count(&self) -> usize {
        self.values.iter().map(Vec::len).sum()
    }

    /// One row per row label: the label column followed by one Float64 column per column label.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.col_labels.len() + 1);
        columns.push(Series::new(self.row_axis.as_str().into(), &self.row_labels).into());
        for (c, label) in self.col_labels.iter().enumerate() {
            let cells: Vec<f64> = self.values.iter().map(|row| row[c]).collect();
            columns.push(Series::new(label.as_str().into(), cells).into());
        }
        Ok(DataFrame::new(columns)?)
    }
}

fn key_strings(frame: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = frame
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    Ok(series
        .str()?
        .iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Largest integer magnitude an `f64` cell holds exactly.
pub const MAX_EXACT_CELL: i64 = 1 << 53;

/// Cell values as `f64`. Integer values beyond [`MAX_EXACT_CELL`] are a `Shape` error
/// rather than a silently rounded cell.
fn cell_values(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = frame.column(name)?.as_materialized_series();
    if series.dtype().is_integer() {
        let ints = series.cast(&DataType::Int64)?;
        return ints
            .i64()?
            .iter()
            .map(|v| match v {
                Some(v) if v.unsigned_abs() > MAX_EXACT_CELL as u64 => Err(PipelineError::Shape(
                    format!("value {} in column {} exceeds exact f64 range", v, name),
                )),
                v => Ok(v.map(|v| v as f64)),
            })
            .collect();
    }
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats.f64()?.iter().collect())
}

/// Reshape a two-key aggregate into a matrix whose rows follow `row_axis_order` and whose
/// columns follow `col_axis_order`.
///
/// The first aggregate key indexes rows and the second indexes columns. Cells with no
/// aggregate row are 0; every other cell holds the aggregate's value unchanged.
pub fn build_matrix(
    aggregate: &AggregateTable,
    value_column: &str,
    row_axis_order: &[&str],
    col_axis_order: &[&str],
) -> Result<PivotMatrix> {
    let [row_key, col_key] = aggregate.keys.as_slice() else {
        return Err(PipelineError::Shape(format!(
            "expected exactly two keys, got {:?}",
            aggregate.keys
        )));
    };

    let row_pos: HashMap<&str, usize> = row_axis_order
        .iter()
        .enumerate()
        .map(|(i, l)| (*l, i))
        .collect();
    let col_pos: HashMap<&str, usize> = col_axis_order
        .iter()
        .enumerate()
        .map(|(i, l)| (*l, i))
        .collect();

    let rows = key_strings(&aggregate.frame, row_key)?;
    let cols = key_strings(&aggregate.frame, col_key)?;
    let values = cell_values(&aggregate.frame, value_column)?;

    let mut matrix = vec![vec![0.0; col_axis_order.len()]; row_axis_order.len()];
    let mut filled = vec![vec![false; col_axis_order.len()]; row_axis_order.len()];

    for (i, (row, col)) in rows.iter().zip(cols.iter()).enumerate() {
        let (Some(row), Some(col)) = (row.as_deref(), col.as_deref()) else {
            return Err(PipelineError::Shape(format!(
                "null key in aggregate row {}",
                i
            )));
        };
        let r = *row_pos.get(row).ok_or_else(|| {
            PipelineError::Shape(format!("'{}' is not on the {} axis", row, row_key))
        })?;
        let c = *col_pos.get(col).ok_or_else(|| {
            PipelineError::Shape(format!("'{}' is not on the {} axis", col, col_key))
        })?;
        if filled[r][c] {
            return Err(PipelineError::Shape(format!(
                "duplicate aggregate row for ({}, {})",
                row, col
            )));
        }
        filled[r][c] = true;
        matrix[r][c] = values[i].unwrap_or(0.0);
    }

    Ok(PivotMatrix {
        row_axis: row_key.clone(),
        row_labels: row_axis_order.iter().map(|s| s.to_string()).collect(),
        col_labels: col_axis_order.iter().map(|s| s.to_string()).collect(),
        values: matrix,
    })
}

/// Views by viewing month (January→December) × weekday (Monday→Sunday).
pub fn heatmap(films: &FilmViews) -> Result<PivotMatrix> {
    let aggregate = heatmap_aggregate(films)?;
    build_matrix(&aggregate, NUMBER_OF_VIEWS, &MONTH_NAMES, &DAY_NAMES)
}
