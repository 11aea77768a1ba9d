//! User-facing error message formatting.
//!
//! Matches on typed errors (`PipelineError`, `PolarsError` variants, `io::ErrorKind`)
//! rather than parsing strings, so the binary can print one actionable line.

use crate::error::PipelineError;
use polars::prelude::PolarsError;
use std::io;

/// One-line message for any pipeline failure.
pub fn user_message(err: &PipelineError) -> String {
    match err {
        PipelineError::Ingestion { table, message } => {
            format!("Could not load the {} table: {}", table, message)
        }
        PipelineError::InvalidDate {
            table,
            column,
            value,
        } => format!(
            "The {} table has a date that could not be parsed: '{}' in column {}. Check the value or set [dates] format in the config.",
            table, value, column
        ),
        PipelineError::JoinAmbiguity { film, column } => format!(
            "Film '{}' appears more than once in the attributes table with different {} values. Fix the source or use --duplicate-policy first|last.",
            film, column
        ),
        PipelineError::Shape(msg) => format!("Could not build matrix: {}", msg),
        PipelineError::Polars(pe) => user_message_from_polars(pe),
        PipelineError::Io(io_err) => user_message_from_io(io_err, None),
        PipelineError::Json(e) => format!("Could not write JSON: {}", e),
    }
}

/// Format a PolarsError as a user-facing message by matching on its variant.
pub fn user_message_from_polars(err: &PolarsError) -> String {
    use polars::prelude::PolarsError as PE;

    match err {
        PE::ColumnNotFound(msg) => format!(
            "Column not found: {}. Check the header row of the input file.",
            msg
        ),
        PE::IO { error, msg } => {
            user_message_from_io(error.as_ref(), msg.as_ref().map(|m| m.as_ref()))
        }
        PE::NoData(msg) => format!("No data: {}", msg),
        PE::SchemaMismatch(msg) => format!("Schema mismatch: {}", msg),
        PE::InvalidOperation(msg) => format!("Operation not allowed: {}", msg),
        PE::ComputeError(msg) => format!("Computation failed: {}", msg),
        PE::Context { error, msg } => {
            let inner = user_message_from_polars(error);
            format!("{}: {}", msg, inner)
        }
        #[allow(unreachable_patterns)]
        _ => err.to_string(),
    }
}

/// Format an io::Error as a user-facing message by matching on ErrorKind.
pub fn user_message_from_io(err: &io::Error, context: Option<&str>) -> String {
    use std::io::ErrorKind;

    let base: String = match err.kind() {
        ErrorKind::NotFound => "File or directory not found.".to_string(),
        ErrorKind::PermissionDenied => "Permission denied. Check read access.".to_string(),
        ErrorKind::InvalidData | ErrorKind::InvalidInput => {
            "Invalid or corrupted data.".to_string()
        }
        ErrorKind::UnexpectedEof => "Unexpected end of file.".to_string(),
        ErrorKind::AlreadyExists => "File already exists.".to_string(),
        _ => err.to_string(),
    };

    match context {
        Some(ctx) if !ctx.is_empty() => format!("{} {}", base, ctx),
        _ => base,
    }
}

/// Format a color_eyre Report by downcasting to known error types along its cause chain.
pub fn user_message_from_report(report: &color_eyre::eyre::Report) -> String {
    for cause in report.chain() {
        if let Some(pe) = cause.downcast_ref::<PipelineError>() {
            return user_message(pe);
        }
        if let Some(pe) = cause.downcast_ref::<PolarsError>() {
            return user_message_from_polars(pe);
        }
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return user_message_from_io(io_err, None);
        }
    }

    // Fallback: first line of display to avoid long tracebacks
    let display = report.to_string();
    display
        .lines()
        .next()
        .map(str::trim)
        .unwrap_or("An error occurred")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_from_io_not_found() {
        let err = io::Error::new(io::ErrorKind::NotFound, "No such file");
        let msg = user_message_from_io(&err, None);
        assert!(
            msg.contains("not found"),
            "expected 'not found', got: {}",
            msg
        );
    }

    #[test]
    fn test_user_message_invalid_date() {
        let err = PipelineError::InvalidDate {
            table: "films".to_string(),
            column: "Release_Date".to_string(),
            value: "31/31/2020".to_string(),
        };
        let msg = user_message(&err);
        assert!(msg.contains("31/31/2020"), "got: {}", msg);
        assert!(msg.contains("Release_Date"), "got: {}", msg);
    }

    #[test]
    fn test_user_message_join_ambiguity() {
        let err = PipelineError::JoinAmbiguity {
            film: "Alpha".to_string(),
            column: "Category".to_string(),
        };
        let msg = user_message(&err);
        assert!(msg.contains("Alpha"));
        assert!(msg.contains("--duplicate-policy"));
    }

    #[test]
    fn test_user_message_from_report_finds_pipeline_error() {
        let err = PipelineError::Ingestion {
            table: "totals".to_string(),
            message: "missing required column Total_Views".to_string(),
        };
        let report = color_eyre::eyre::Report::new(err);
        let msg = user_message_from_report(&report);
        assert!(msg.starts_with("Could not load the totals table"), "got: {}", msg);
    }

    #[test]
    fn test_user_message_from_polars_column_not_found() {
        let err = PolarsError::ColumnNotFound("Film_Name".into());
        let msg = user_message_from_polars(&err);
        assert!(msg.contains("Film_Name"), "got: {}", msg);
        assert!(msg.contains("Column not found"), "got: {}", msg);
    }
}
