//! Film viewing analytics: normalizes four related tables, joins them on the film name
//! and derives the aggregates, matrices and rankings a dashboard renders.

pub mod aggregate;
pub mod calendar;
pub mod config;
pub mod correlation;
pub mod error;
pub mod error_display;
pub mod export;
pub mod join;
pub mod matrix;
pub mod normalize;
pub mod pipeline;
pub mod ranking;
pub mod schema;
pub mod tables;

pub use aggregate::{group_reduce, AggregateTable, Reduce, Reduction, SortBy};
pub use config::{AppConfig, ConfigManager};
pub use correlation::{correlate, CorrelationMatrix};
pub use error::{PipelineError, Result};
pub use export::{export_tables, ExportOptions};
pub use join::merge_views;
pub use matrix::{build_matrix, PivotMatrix};
pub use pipeline::{DerivedTables, Pipeline, PipelineInputs, PipelineSettings, SourceTables};
pub use ranking::{top_n, Filter, FilterValue};
pub use tables::{CompleteData, FilmAttributes, FilmViews, MonthlyViews, TotalViews};

pub use filmviews_cli::{Args, CompressionFormat, DuplicatePolicy, MonthWindow, OutputFormat};

/// Application name used for the config directory
pub const APP_NAME: &str = "filmviews";
