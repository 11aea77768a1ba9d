//! Schema normalizer: reads raw tables, enforces the declared schemas, parses dates and
//! derives calendar fields.

use std::path::Path;
use std::sync::Arc;

use polars::prelude::*;
use tracing::debug;

use crate::calendar::{self, calendar_exprs, RELEASE_FIELDS, VIEWING_FIELDS};
use crate::error::{PipelineError, Result};
use crate::error_display::user_message_from_polars;
use crate::schema::{
    ColumnKind, ColumnSpec, TableSchema, ATTRIBUTES, FILMS, MONTHLY_VIEWS_TABLE, MONTH_START,
    RELEASE_DATE, TOTAL_VIEWS_TABLE, VIEWING_MONTH, VIEW_MONTH, VIEW_YEAR,
};
use crate::tables::{FilmAttributes, FilmViews, MonthlyViews, TotalViews};

/// Options for reading the CSV inputs.
#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub infer_schema_length: Option<usize>,
}

/// Options for coercing raw columns.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    /// strftime format of every date column; polars infers the format when `None`.
    pub date_format: Option<String>,
}

/// Lazily scan one CSV input. Compressed (.gz, .zst) files are decompressed by polars.
pub fn scan_csv(path: &Path, table: &str, options: &CsvOptions) -> Result<LazyFrame> {
    if !path.is_file() {
        return Err(PipelineError::ingestion(
            table,
            format!("input file not found: {}", path.display()),
        ));
    }
    let pl_path = PlPath::Local(Arc::from(path));
    let mut reader = LazyCsvReader::new(pl_path)
        .with_has_header(options.has_header.unwrap_or(true))
        .with_infer_schema_length(options.infer_schema_length);
    if let Some(delimiter) = options.delimiter {
        reader = reader.with_separator(delimiter);
    }
    reader.finish().map_err(|e| {
        PipelineError::ingestion(
            table,
            format!(
                "could not read {}: {}",
                path.display(),
                user_message_from_polars(&e)
            ),
        )
    })
}

pub fn normalize_films(lf: LazyFrame, options: &NormalizeOptions) -> Result<FilmViews> {
    let df = coerce(lf, &FILMS, options)?;
    let mut derived = calendar_exprs(RELEASE_DATE, &RELEASE_FIELDS);
    derived.extend(calendar_exprs(VIEWING_MONTH, &VIEWING_FIELDS));
    let df = df.lazy().with_columns(derived).collect()?;
    debug!(table = FILMS.table, rows = df.height(), "normalized");
    Ok(FilmViews::from_normalized(df))
}

pub fn normalize_monthly_views(
    lf: LazyFrame,
    options: &NormalizeOptions,
) -> Result<MonthlyViews> {
    let mut df = coerce(lf, &MONTHLY_VIEWS_TABLE, options)?;
    let month_start = month_start_column(&df)?;
    df.with_column(month_start)?;
    debug!(
        table = MONTHLY_VIEWS_TABLE.table,
        rows = df.height(),
        "normalized"
    );
    Ok(MonthlyViews::from_normalized(df))
}

pub fn normalize_total_views(lf: LazyFrame, options: &NormalizeOptions) -> Result<TotalViews> {
    let df = coerce(lf, &TOTAL_VIEWS_TABLE, options)?;
    debug!(
        table = TOTAL_VIEWS_TABLE.table,
        rows = df.height(),
        "normalized"
    );
    Ok(TotalViews::from_normalized(df))
}

pub fn normalize_attributes(
    lf: LazyFrame,
    options: &NormalizeOptions,
) -> Result<FilmAttributes> {
    let df = coerce(lf, &ATTRIBUTES, options)?;
    let df = df
        .lazy()
        .with_columns(calendar_exprs(RELEASE_DATE, &RELEASE_FIELDS))
        .collect()?;
    debug!(table = ATTRIBUTES.table, rows = df.height(), "normalized");
    Ok(FilmAttributes::from_normalized(df))
}

fn raw_name(column: &str) -> String {
    format!("__raw_{}", column)
}

fn date_options(options: &NormalizeOptions) -> StrptimeOptions {
    StrptimeOptions {
        format: options.date_format.as_deref().map(PlSmallStr::from),
        strict: false,
        exact: true,
        cache: true,
    }
}

/// Conversion of one column from its scanned dtype to the declared kind.
fn convert_expr(spec: &ColumnSpec, current: &DataType, options: &NormalizeOptions) -> Expr {
    let base = col(spec.name);
    match spec.kind {
        ColumnKind::Date => match current {
            DataType::Date => base,
            DataType::Datetime(_, _) => base.cast(DataType::Date),
            DataType::String => base.str().to_date(date_options(options)),
            _ => base
                .cast(DataType::String)
                .str()
                .to_date(date_options(options)),
        },
        kind => base.cast(kind.dtype()),
    }
}

/// Validate required columns, cast them to their declared dtypes and reject values that
/// were present in the input but did not survive conversion.
fn coerce(lf: LazyFrame, schema: &TableSchema, options: &NormalizeOptions) -> Result<DataFrame> {
    let input_schema = lf
        .clone()
        .collect_schema()
        .map_err(|e| PipelineError::ingestion(schema.table, user_message_from_polars(&e)))?;
    schema.check_columns(&input_schema)?;

    let mut raw_exprs = Vec::new();
    let mut typed_exprs = Vec::new();
    let mut converted: Vec<(&ColumnSpec, String, DataType)> = Vec::new();
    for spec in schema.columns {
        let current = input_schema
            .get(spec.name)
            .cloned()
            .unwrap_or(DataType::Null);
        if current == spec.kind.dtype() {
            continue;
        }
        let raw = raw_name(spec.name);
        raw_exprs.push(col(spec.name).alias(raw.as_str()));
        typed_exprs.push(convert_expr(spec, &current, options).alias(spec.name));
        converted.push((spec, raw, current));
    }

    let df = lf.with_columns(raw_exprs).with_columns(typed_exprs).collect()?;

    for (spec, raw, current) in &converted {
        if spec.kind == ColumnKind::Text {
            continue;
        }
        let integer = matches!(spec.kind, ColumnKind::Int32 | ColumnKind::Int64);
        if integer && current.is_float() {
            let truncated = df
                .clone()
                .lazy()
                .filter(
                    col(spec.name)
                        .cast(DataType::Float64)
                        .neq(col(raw.as_str()).cast(DataType::Float64)),
                )
                .select([col(raw.as_str()).cast(DataType::String)])
                .limit(1)
                .collect()?;
            if truncated.height() > 0 {
                return Err(PipelineError::ingestion(
                    schema.table,
                    format!(
                        "non-integer value '{}' in column {}",
                        first_value(&truncated, raw),
                        spec.name
                    ),
                ));
            }
        }
        let failed = df
            .clone()
            .lazy()
            .filter(col(raw.as_str()).is_not_null().and(col(spec.name).is_null()))
            .select([col(raw.as_str()).cast(DataType::String)])
            .limit(1)
            .collect()?;
        if failed.height() > 0 {
            let value = first_value(&failed, raw);
            return Err(match spec.kind {
                ColumnKind::Date => PipelineError::InvalidDate {
                    table: schema.table.to_string(),
                    column: spec.name.to_string(),
                    value,
                },
                _ => PipelineError::ingestion(
                    schema.table,
                    format!("non-numeric value '{}' in column {}", value, spec.name),
                ),
            });
        }
    }

    for spec in schema.columns {
        if spec.required_value {
            let missing = df.column(spec.name)?.null_count();
            if missing > 0 {
                return Err(PipelineError::ingestion(
                    schema.table,
                    format!("{} row(s) without a value in column {}", missing, spec.name),
                ));
            }
        }
        if spec.non_negative {
            let negative = df
                .clone()
                .lazy()
                .filter(col(spec.name).lt(lit(0)))
                .select([col(spec.name)])
                .limit(1)
                .collect()?;
            if negative.height() > 0 {
                return Err(PipelineError::ingestion(
                    schema.table,
                    format!(
                        "negative view count {} in column {}",
                        first_value(&negative, spec.name),
                        spec.name
                    ),
                ));
            }
        }
    }

    let keep: Vec<String> = input_schema.iter_names().map(|s| s.to_string()).collect();
    Ok(df.select(keep)?)
}

fn first_value(df: &DataFrame, column: &str) -> String {
    match df.column(column).and_then(|c| c.get(0)) {
        Ok(AnyValue::String(s)) => s.to_string(),
        Ok(v) => v.to_string(),
        Err(_) => String::new(),
    }
}

/// Month_Start (Date) from view_year / view_month. A pair that is not a calendar month is fatal.
fn month_start_column(df: &DataFrame) -> Result<Series> {
    let years = df.column(VIEW_YEAR)?.as_materialized_series().i32()?;
    let months = df.column(VIEW_MONTH)?.as_materialized_series().i32()?;

    let mut days: Vec<Option<i32>> = Vec::with_capacity(df.height());
    for (year, month) in years.iter().zip(months.iter()) {
        let day = match (year, month) {
            (Some(y), Some(m)) => match calendar::month_start(y, m) {
                Some(date) => Some(calendar::epoch_days(date)),
                None => {
                    return Err(PipelineError::InvalidDate {
                        table: MONTHLY_VIEWS_TABLE.table.to_string(),
                        column: format!("{}/{}", VIEW_YEAR, VIEW_MONTH),
                        value: format!("{}-{}", y, m),
                    })
                }
            },
            _ => None,
        };
        days.push(day);
    }

    Ok(Series::new(MONTH_START.into(), days).cast(&DataType::Date)?)
}
