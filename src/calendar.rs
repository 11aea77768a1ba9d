//! Calendar axes and the one place calendar fields are derived from date columns.

use chrono::NaiveDate;
use polars::prelude::*;

use crate::schema::{
    RELEASE_MONTH, RELEASE_YEAR, VIEWING_DAY_NAME, VIEWING_MONTH_NAME, VIEWING_MONTH_NUM,
    VIEWING_WEEKDAY, VIEWING_YEAR,
};

/// Heatmap row axis, January first.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Heatmap column axis, Monday first.
pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Output names for the fields derived from one date column. `None` skips the field.
#[derive(Debug, Clone, Copy)]
pub struct CalendarFields {
    pub year: Option<&'static str>,
    pub month: Option<&'static str>,
    pub weekday: Option<&'static str>,
    pub month_name: Option<&'static str>,
    pub day_name: Option<&'static str>,
}

pub const RELEASE_FIELDS: CalendarFields = CalendarFields {
    year: Some(RELEASE_YEAR),
    month: Some(RELEASE_MONTH),
    weekday: None,
    month_name: None,
    day_name: None,
};

pub const VIEWING_FIELDS: CalendarFields = CalendarFields {
    year: Some(VIEWING_YEAR),
    month: Some(VIEWING_MONTH_NUM),
    weekday: Some(VIEWING_WEEKDAY),
    month_name: Some(VIEWING_MONTH_NAME),
    day_name: Some(VIEWING_DAY_NAME),
};

/// Expressions deriving `fields` from the Date column `source`.
///
/// Year, month and weekday are Int32 (weekday 1 = Monday … 7 = Sunday);
/// names are English strings matching [`MONTH_NAMES`] and [`DAY_NAMES`].
pub fn calendar_exprs(source: &str, fields: &CalendarFields) -> Vec<Expr> {
    let date = col(source);
    let mut exprs = Vec::new();
    if let Some(name) = fields.year {
        exprs.push(date.clone().dt().year().cast(DataType::Int32).alias(name));
    }
    if let Some(name) = fields.month {
        exprs.push(date.clone().dt().month().cast(DataType::Int32).alias(name));
    }
    if let Some(name) = fields.weekday {
        exprs.push(date.clone().dt().weekday().cast(DataType::Int32).alias(name));
    }
    if let Some(name) = fields.month_name {
        exprs.push(date.clone().dt().strftime("%B").alias(name));
    }
    if let Some(name) = fields.day_name {
        exprs.push(date.dt().strftime("%A").alias(name));
    }
    exprs
}

/// First day of the given month, `None` when the pair is not a calendar month.
pub fn month_start(year: i32, month: i32) -> Option<NaiveDate> {
    let month = u32::try_from(month).ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Days since 1970-01-01, the physical representation of a polars Date.
pub fn epoch_days(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    date.signed_duration_since(epoch).num_days() as i32
}
