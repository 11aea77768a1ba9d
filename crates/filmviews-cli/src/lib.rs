//! Shared CLI definitions for filmviews.
//!
//! Used by the main application and by the build script (manpage).

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// How duplicate attribute rows for one film are collapsed before joining.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Keep the first row seen for each film
    #[default]
    First,
    /// Keep the last row seen for each film
    Last,
    /// Fail when duplicate rows for a film disagree on any attribute
    Error,
}

impl DuplicatePolicy {
    /// Name as written in config files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
            Self::Error => "error",
        }
    }

    /// Parse a config value (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }
}

/// File format for exported tables.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Comma-separated values
    #[default]
    Csv,
    /// JSON array of row objects
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

/// Compression format for input and exported files
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Gzip compression (.gz)
    Gzip,
    /// Zstandard compression (.zst)
    Zstd,
}

impl CompressionFormat {
    /// Get file extension for this compression format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Zstd => "zst",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value, true).ok()
    }
}

/// A (year, month) viewing window, written `YYYY-MM` on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
}

/// clap value parser for `--window`.
pub fn parse_month_window(value: &str) -> Result<MonthWindow, String> {
    let (year, month) = value
        .split_once('-')
        .ok_or_else(|| format!("expected YYYY-MM, got '{}'", value))?;
    let year: i32 = year
        .trim()
        .parse()
        .map_err(|_| format!("invalid year in '{}'", value))?;
    let month: u32 = month
        .trim()
        .parse()
        .map_err(|_| format!("invalid month in '{}'", value))?;
    if !(1..=12).contains(&month) {
        return Err(format!("month must be 1-12, got {}", month));
    }
    Ok(MonthWindow { year, month })
}

/// Command-line arguments for filmviews
#[derive(Clone, Parser, Debug)]
#[command(
    name = "filmviews",
    version,
    about = "Film viewing analytics pipeline",
    long_about = include_str!("../long_about.txt")
)]
pub struct Args {
    /// Film table (Film_Name, Category, Language, Viewer_Rate, Number_of_Views, Release_Date, Viewing_Month)
    #[arg(long = "films", value_name = "PATH", required_unless_present = "generate_config")]
    pub films: Option<PathBuf>,

    /// Monthly views table (Film_Name, view_year, view_month, Monthly_Views)
    #[arg(long = "monthly", value_name = "PATH", required_unless_present = "generate_config")]
    pub monthly: Option<PathBuf>,

    /// Total views table (Film_Name, Total_Views)
    #[arg(long = "totals", value_name = "PATH", required_unless_present = "generate_config")]
    pub totals: Option<PathBuf>,

    /// Film attributes table (Film_Name, Category, Language, Viewer_Rate, Avg_Rating_Category, Avg_Rating_Language, Release_Date)
    #[arg(long = "attributes", value_name = "PATH", required_unless_present = "generate_config")]
    pub attributes: Option<PathBuf>,

    /// Read configuration from this file instead of ~/.config/filmviews/config.toml
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write every derived table into this directory
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Format of exported tables (overrides config [output] format)
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Compress exported tables
    #[arg(long = "compress", value_enum)]
    pub compress: Option<CompressionFormat>,

    /// Number of rows kept by rankings (overrides config [ranking] top_n)
    #[arg(long = "top-n", value_name = "N")]
    pub top_n: Option<usize>,

    /// Viewing window for the monthly ranking, e.g. 2025-12. Defaults to the latest month in the data
    #[arg(long = "window", value_name = "YYYY-MM", value_parser = parse_month_window)]
    pub window: Option<MonthWindow>,

    /// How duplicate film attribute rows are collapsed (overrides config [join] duplicate_policy)
    #[arg(long = "duplicate-policy", value_enum)]
    pub duplicate_policy: Option<DuplicatePolicy>,

    /// Strftime format of date columns, e.g. %Y-%m-%d. Inferred when omitted
    #[arg(long = "date-format", value_name = "FMT")]
    pub date_format: Option<String>,

    /// Specify the delimiter to use when reading the CSV inputs
    #[arg(long = "delimiter")]
    pub delimiter: Option<u8>,

    /// Generate default configuration file at ~/.config/filmviews/config.toml
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Force overwrite existing config file when using --generate-config
    #[arg(long = "force", requires = "generate_config", action)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month_window() {
        assert_eq!(
            parse_month_window("2025-12"),
            Ok(MonthWindow {
                year: 2025,
                month: 12
            })
        );
        assert_eq!(
            parse_month_window("2024-3"),
            Ok(MonthWindow {
                year: 2024,
                month: 3
            })
        );
        assert!(parse_month_window("2025-13").is_err());
        assert!(parse_month_window("2025").is_err());
        assert!(parse_month_window("abcd-01").is_err());
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(DuplicatePolicy::parse("first"), Some(DuplicatePolicy::First));
        assert_eq!(DuplicatePolicy::parse("LAST"), Some(DuplicatePolicy::Last));
        assert_eq!(DuplicatePolicy::parse("error"), Some(DuplicatePolicy::Error));
        assert_eq!(DuplicatePolicy::parse("random"), None);
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("parquet"), None);
    }

    #[test]
    fn test_args_require_inputs() {
        assert!(Args::try_parse_from(["filmviews"]).is_err());
        let args = Args::try_parse_from(["filmviews", "--generate-config"]).unwrap();
        assert!(args.generate_config);

        let args = Args::try_parse_from([
            "filmviews",
            "--films",
            "films.csv",
            "--monthly",
            "monthly.csv",
            "--totals",
            "totals.csv",
            "--attributes",
            "attributes.csv",
            "--window",
            "2025-12",
            "--duplicate-policy",
            "error",
        ])
        .unwrap();
        assert_eq!(args.films, Some(PathBuf::from("films.csv")));
        assert_eq!(args.duplicate_policy, Some(DuplicatePolicy::Error));
        assert_eq!(
            args.window,
            Some(MonthWindow {
                year: 2025,
                month: 12
            })
        );
    }
}
