use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{table}: {message}")]
    Ingestion { table: String, message: String },

    #[error("{table}: unparseable date '{value}' in column {column}")]
    InvalidDate {
        table: String,
        column: String,
        value: String,
    },

    #[error("film '{film}' has conflicting attribute rows (column {column})")]
    JoinAmbiguity { film: String, column: String },

    #[error("matrix shape error: {0}")]
    Shape(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn ingestion(table: &str, message: impl Into<String>) -> Self {
        Self::Ingestion {
            table: table.to_string(),
            message: message.into(),
        }
    }

    /// Ingestion, date and join errors abort the run; everything else is a lower-level failure.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::Ingestion { .. } | Self::InvalidDate { .. } | Self::JoinAmbiguity { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
