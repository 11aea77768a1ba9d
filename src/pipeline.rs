//! Explicit stages: load → normalize → join → derive.

use std::path::PathBuf;

use polars::prelude::*;
use tracing::{info, info_span};

use crate::aggregate::{self, AggregateTable};
use crate::config::{AppConfig, DEFAULT_TOP_N};
use crate::correlation::{correlate, CorrelationMatrix, DEFAULT_COLUMNS};
use crate::error::Result;
use crate::join::{merge_views, DuplicatePolicy};
use crate::matrix::{heatmap, PivotMatrix};
use crate::normalize::{
    normalize_attributes, normalize_films, normalize_monthly_views, normalize_total_views,
    scan_csv, CsvOptions, NormalizeOptions,
};
use crate::ranking::{latest_month, top_films, top_films_in_window, MonthWindow};
use crate::schema::{ATTRIBUTES, FILMS, MONTHLY_VIEWS_TABLE, TOTAL_VIEWS_TABLE};
use crate::tables::{CompleteData, FilmAttributes, FilmViews, MonthlyViews, TotalViews};
use filmviews_cli::Args;

/// Paths of the four input tables.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineInputs {
    pub films: PathBuf,
    pub monthly: PathBuf,
    pub totals: PathBuf,
    pub attributes: PathBuf,
}

impl PipelineInputs {
    /// `None` unless all four paths were given.
    pub fn from_args(args: &Args) -> Option<Self> {
        Some(Self {
            films: args.films.clone()?,
            monthly: args.monthly.clone()?,
            totals: args.totals.clone()?,
            attributes: args.attributes.clone()?,
        })
    }
}

/// The four normalized inputs.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub films: FilmViews,
    pub monthly: MonthlyViews,
    pub totals: TotalViews,
    pub attributes: FilmAttributes,
}

impl SourceTables {
    /// Normalize in-memory (or already scanned) frames.
    pub fn from_frames(
        films: LazyFrame,
        monthly: LazyFrame,
        totals: LazyFrame,
        attributes: LazyFrame,
        options: &NormalizeOptions,
    ) -> Result<Self> {
        Ok(Self {
            films: normalize_films(films, options)?,
            monthly: normalize_monthly_views(monthly, options)?,
            totals: normalize_total_views(totals, options)?,
            attributes: normalize_attributes(attributes, options)?,
        })
    }
}

/// Everything handed to the rendering layer.
#[derive(Debug, Clone)]
pub struct DerivedTables {
    pub complete: CompleteData,
    pub monthly_trend: AggregateTable,
    pub category_totals: AggregateTable,
    pub language_totals: AggregateTable,
    pub month_performance: AggregateTable,
    pub release_year_trend: AggregateTable,
    pub views_per_film: AggregateTable,
    pub rating_vs_views: DataFrame,
    pub heatmap: PivotMatrix,
    pub correlation: CorrelationMatrix,
    pub top_films: DataFrame,
    pub top_films_in_window: DataFrame,
    /// Month the windowed ranking covers; `None` only when there is no monthly data.
    pub window: Option<MonthWindow>,
}

impl DerivedTables {
    /// Every derived table as a frame, keyed by its export name.
    pub fn named_frames(&self) -> Result<Vec<(&'static str, DataFrame)>> {
        Ok(vec![
            ("complete_data", self.complete.frame().clone()),
            ("monthly_trend", self.monthly_trend.frame.clone()),
            ("category_totals", self.category_totals.frame.clone()),
            ("language_totals", self.language_totals.frame.clone()),
            ("month_performance", self.month_performance.frame.clone()),
            ("release_year_trend", self.release_year_trend.frame.clone()),
            ("views_per_film", self.views_per_film.frame.clone()),
            ("rating_vs_views", self.rating_vs_views.clone()),
            ("heatmap", self.heatmap.to_frame()?),
            ("correlation", self.correlation.to_frame()?),
            ("top_films", self.top_films.clone()),
            ("top_films_in_window", self.top_films_in_window.clone()),
        ])
    }
}

/// Knobs for one run, usually taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub csv: CsvOptions,
    pub normalize: NormalizeOptions,
    pub duplicate_policy: DuplicatePolicy,
    pub top_n: usize,
    pub window: Option<MonthWindow>,
    pub correlation_columns: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            csv: CsvOptions::default(),
            normalize: NormalizeOptions::default(),
            duplicate_policy: DuplicatePolicy::default(),
            top_n: DEFAULT_TOP_N,
            window: None,
            correlation_columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl From<&AppConfig> for PipelineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            csv: config.csv_options(),
            normalize: config.normalize_options(),
            duplicate_policy: config.duplicate_policy(),
            top_n: config.top_n(),
            window: config.window(),
            correlation_columns: config.correlation_columns(),
        }
    }
}

pub struct Pipeline {
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        Self { settings }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(PipelineSettings::from(config))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Scan and normalize the four CSV inputs.
    pub fn load(&self, inputs: &PipelineInputs) -> Result<SourceTables> {
        let _span = info_span!("load").entered();
        let csv = &self.settings.csv;
        let tables = SourceTables::from_frames(
            scan_csv(&inputs.films, FILMS.table, csv)?,
            scan_csv(&inputs.monthly, MONTHLY_VIEWS_TABLE.table, csv)?,
            scan_csv(&inputs.totals, TOTAL_VIEWS_TABLE.table, csv)?,
            scan_csv(&inputs.attributes, ATTRIBUTES.table, csv)?,
            &self.settings.normalize,
        )?;
        info!(
            films = tables.films.height(),
            monthly = tables.monthly.height(),
            totals = tables.totals.height(),
            attributes = tables.attributes.height(),
            "loaded inputs"
        );
        Ok(tables)
    }

    /// Join and derive every table. Pure over `sources`: running twice gives equal output.
    pub fn run(&self, sources: &SourceTables) -> Result<DerivedTables> {
        let complete = {
            let _span = info_span!("join").entered();
            merge_views(
                &sources.monthly,
                &sources.totals,
                &sources.attributes,
                self.settings.duplicate_policy,
            )?
        };

        let _span = info_span!("derive").entered();
        let films = &sources.films;
        let window = match self.settings.window {
            Some(w) => Some(w),
            None => latest_month(&complete)?,
        };
        let columns: Vec<&str> = self
            .settings
            .correlation_columns
            .iter()
            .map(String::as_str)
            .collect();

        let derived = DerivedTables {
            monthly_trend: aggregate::monthly_trend(&complete)?,
            category_totals: aggregate::category_totals(films)?,
            language_totals: aggregate::language_totals(films)?,
            month_performance: aggregate::month_performance(films)?,
            release_year_trend: aggregate::release_year_trend(films)?,
            views_per_film: aggregate::views_per_film(films)?,
            rating_vs_views: aggregate::rating_vs_views(films)?,
            heatmap: heatmap(films)?,
            correlation: correlate(complete.frame(), &columns)?,
            top_films: top_films(&sources.totals, self.settings.top_n)?,
            top_films_in_window: top_films_in_window(&complete, self.settings.top_n, window)?,
            window,
            complete,
        };
        info!(
            complete_rows = derived.complete.height(),
            months = derived.monthly_trend.height(),
            categories = derived.category_totals.height(),
            correlated = derived.correlation.len(),
            "derived tables"
        );
        Ok(derived)
    }
}
