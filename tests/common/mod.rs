#![allow(dead_code)]

use filmviews::schema::*;
use filmviews::PipelineInputs;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Four CSV inputs written into a temporary directory that lives as long as the fixture.
pub struct Fixture {
    pub dir: TempDir,
    pub inputs: PipelineInputs,
}

pub fn write_csv(dir: &Path, name: &str, df: &mut DataFrame) -> PathBuf {
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    path
}

pub fn films_frame() -> DataFrame {
    df!(
        FILM_NAME => &["A", "B", "C", "D", "E"],
        CATEGORY => &["Drama", "Comedy", "Drama", "Horror", "Comedy"],
        LANGUAGE => &["English", "Hindi", "English", "Korean", "Hindi"],
        VIEWER_RATE => &[8.5_f64, 6.0, 7.5, 5.0, 9.0],
        NUMBER_OF_VIEWS => &[100_i64, 40, 60, 100, 160],
        RELEASE_DATE => &["2020-01-10", "2020-01-20", "2021-03-01", "2019-12-24", "2021-03-05"],
        // 2025-01-06 is a Monday, 2025-02-03 a Monday, 2025-01-07 a Tuesday
        VIEWING_MONTH => &["2025-01-06", "2025-01-06", "2025-02-03", "2025-01-07", "2025-02-03"],
    )
    .unwrap()
}

/// Two films with three months each, plus one film with no totals or attributes.
pub fn monthly_frame() -> DataFrame {
    df!(
        FILM_NAME => &["A", "A", "A", "B", "B", "B", "Z"],
        VIEW_YEAR => &[2025_i64, 2025, 2025, 2025, 2025, 2025, 2025],
        VIEW_MONTH => &[10_i64, 11, 12, 10, 11, 12, 11],
        MONTHLY_VIEWS => &[10_i64, 20, 30, 5, 15, 40, 7],
    )
    .unwrap()
}

pub fn totals_frame() -> DataFrame {
    df!(
        FILM_NAME => &["A", "B", "C"],
        TOTAL_VIEWS => &[100_i64, 50, 200],
    )
    .unwrap()
}

/// Film A appears twice with different categories.
pub fn attributes_frame() -> DataFrame {
    df!(
        FILM_NAME => &["A", "B", "A", "C"],
        CATEGORY => &["Drama", "Comedy", "Thriller", "Drama"],
        LANGUAGE => &["English", "Hindi", "English", "English"],
        VIEWER_RATE => &[8.5_f64, 6.0, 8.5, 7.5],
        AVG_RATING_CATEGORY => &[7.0_f64, 6.5, 7.0, 7.0],
        AVG_RATING_LANGUAGE => &[7.2_f64, 6.8, 7.2, 7.2],
        RELEASE_DATE => &["2020-01-10", "2020-01-20", "2020-01-10", "2021-03-01"],
    )
    .unwrap()
}

pub fn write_fixture(
    films: &mut DataFrame,
    monthly: &mut DataFrame,
    totals: &mut DataFrame,
    attributes: &mut DataFrame,
) -> Fixture {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let inputs = PipelineInputs {
        films: write_csv(dir.path(), "films.csv", films),
        monthly: write_csv(dir.path(), "monthly.csv", monthly),
        totals: write_csv(dir.path(), "totals.csv", totals),
        attributes: write_csv(dir.path(), "attributes.csv", attributes),
    };
    Fixture { dir, inputs }
}

pub fn default_fixture() -> Fixture {
    write_fixture(
        &mut films_frame(),
        &mut monthly_frame(),
        &mut totals_frame(),
        &mut attributes_frame(),
    )
}

pub fn str_column(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

pub fn i64_column(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Int64)
        .unwrap()
        .i64()
        .unwrap()
        .iter()
        .collect()
}
