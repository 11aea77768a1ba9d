//! Declared schemas for the four input tables and the joined table.
//!
//! Column names are referenced through these constants everywhere else in the crate.

use polars::prelude::{DataType, Schema};

use crate::error::{PipelineError, Result};

pub const FILM_NAME: &str = "Film_Name";
pub const CATEGORY: &str = "Category";
pub const LANGUAGE: &str = "Language";
pub const VIEWER_RATE: &str = "Viewer_Rate";
pub const NUMBER_OF_VIEWS: &str = "Number_of_Views";
pub const RELEASE_DATE: &str = "Release_Date";
pub const VIEWING_MONTH: &str = "Viewing_Month";

pub const VIEW_YEAR: &str = "view_year";
pub const VIEW_MONTH: &str = "view_month";
pub const MONTHLY_VIEWS: &str = "Monthly_Views";
pub const MONTH_START: &str = "Month_Start";

pub const TOTAL_VIEWS: &str = "Total_Views";

pub const AVG_RATING_CATEGORY: &str = "Avg_Rating_Category";
pub const AVG_RATING_LANGUAGE: &str = "Avg_Rating_Language";

// Calendar fields derived by the normalizer
pub const RELEASE_YEAR: &str = "Release_Year";
pub const RELEASE_MONTH: &str = "Release_Month";
pub const VIEWING_YEAR: &str = "Viewing_Year";
pub const VIEWING_MONTH_NUM: &str = "Viewing_Month_Num";
pub const VIEWING_WEEKDAY: &str = "Viewing_Weekday";
pub const VIEWING_MONTH_NAME: &str = "Viewing_Month_Name";
pub const VIEWING_DAY_NAME: &str = "Viewing_Day_Name";

/// Logical type of a required column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Int32,
    Int64,
    Float,
    Date,
}

impl ColumnKind {
    pub fn dtype(&self) -> DataType {
        match self {
            ColumnKind::Text => DataType::String,
            ColumnKind::Int32 => DataType::Int32,
            ColumnKind::Int64 => DataType::Int64,
            ColumnKind::Float => DataType::Float64,
            ColumnKind::Date => DataType::Date,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Null values are rejected at ingestion.
    pub required_value: bool,
    /// Negative values are rejected at ingestion.
    pub non_negative: bool,
}

const fn column(name: &'static str, kind: ColumnKind) -> ColumnSpec {
    ColumnSpec {
        name,
        kind,
        required_value: false,
        non_negative: false,
    }
}

const fn key(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Text,
        required_value: true,
        non_negative: false,
    }
}

/// Dates feed the calendar fields, so a missing one is rejected like an unparseable one.
const fn date(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Date,
        required_value: true,
        non_negative: false,
    }
}

const fn count(name: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        kind: ColumnKind::Int64,
        required_value: false,
        non_negative: true,
    }
}

/// Required columns of one input table. Extra columns are allowed and carried through.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub table: &'static str,
    pub columns: &'static [ColumnSpec],
}

pub const FILMS: TableSchema = TableSchema {
    table: "films",
    columns: &[
        key(FILM_NAME),
        column(CATEGORY, ColumnKind::Text),
        column(LANGUAGE, ColumnKind::Text),
        column(VIEWER_RATE, ColumnKind::Float),
        count(NUMBER_OF_VIEWS),
        date(RELEASE_DATE),
        date(VIEWING_MONTH),
    ],
};

pub const MONTHLY_VIEWS_TABLE: TableSchema = TableSchema {
    table: "monthly views",
    columns: &[
        key(FILM_NAME),
        ColumnSpec {
            required_value: true,
            ..column(VIEW_YEAR, ColumnKind::Int32)
        },
        ColumnSpec {
            required_value: true,
            ..column(VIEW_MONTH, ColumnKind::Int32)
        },
        count(MONTHLY_VIEWS),
    ],
};

pub const TOTAL_VIEWS_TABLE: TableSchema = TableSchema {
    table: "total views",
    columns: &[key(FILM_NAME), count(TOTAL_VIEWS)],
};

pub const ATTRIBUTES: TableSchema = TableSchema {
    table: "attributes",
    columns: &[
        key(FILM_NAME),
        column(CATEGORY, ColumnKind::Text),
        column(LANGUAGE, ColumnKind::Text),
        column(VIEWER_RATE, ColumnKind::Float),
        column(AVG_RATING_CATEGORY, ColumnKind::Float),
        column(AVG_RATING_LANGUAGE, ColumnKind::Float),
        date(RELEASE_DATE),
    ],
};

impl TableSchema {
    /// Fails on the first required column absent from `schema`.
    pub fn check_columns(&self, schema: &Schema) -> Result<()> {
        for spec in self.columns {
            if schema.get(spec.name).is_none() {
                return Err(PipelineError::ingestion(
                    self.table,
                    format!("missing required column {}", spec.name),
                ));
            }
        }
        Ok(())
    }

    /// Attribute columns compared when collapsing duplicate rows (everything but the key).
    pub fn attribute_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.name != FILM_NAME)
            .map(|c| c.name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_columns_reports_missing_column() {
        let mut schema = Schema::default();
        schema.with_column(FILM_NAME.into(), DataType::String);
        let err = TOTAL_VIEWS_TABLE.check_columns(&schema).unwrap_err();
        match err {
            PipelineError::Ingestion { table, message } => {
                assert_eq!(table, "total views");
                assert!(message.contains(TOTAL_VIEWS));
            }
            other => panic!("unexpected error: {other}"),
        }

        schema.with_column(TOTAL_VIEWS.into(), DataType::Int64);
        assert!(TOTAL_VIEWS_TABLE.check_columns(&schema).is_ok());
    }

    #[test]
    fn test_attribute_columns_skip_key() {
        let cols = ATTRIBUTES.attribute_columns();
        assert!(!cols.contains(&FILM_NAME));
        assert_eq!(cols.len(), ATTRIBUTES.columns.len() - 1);
    }
}
