use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::correlation::DEFAULT_COLUMNS;
use crate::normalize::{CsvOptions, NormalizeOptions};
use filmviews_cli::{Args, CompressionFormat, DuplicatePolicy, MonthWindow, OutputFormat};

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write the default template to `config.toml`; refuses to overwrite unless `force`.
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        let config_path = self.config_path("config.toml");

        if config_path.exists() && !force {
            return Err(eyre!(
                "Config file already exists at {}. Use --force to overwrite.",
                config_path.display()
            ));
        }

        self.ensure_config_dir()?;
        std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE)?;

        Ok(config_path)
    }
}

/// Rows kept by rankings when `[ranking] top_n` is unset.
pub const DEFAULT_TOP_N: usize = 10;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub csv: CsvConfig,
    pub dates: DatesConfig,
    pub join: JoinConfig,
    pub ranking: RankingConfig,
    pub correlation: CorrelationConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CsvConfig {
    pub delimiter: Option<u8>,
    pub has_header: Option<bool>,
    pub infer_schema_length: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatesConfig {
    /// strftime format shared by every date column; inferred when unset
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JoinConfig {
    /// "first" when unset
    pub duplicate_policy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RankingConfig {
    /// 10 when unset
    pub top_n: Option<usize>,
    pub window_year: Option<i32>,
    pub window_month: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Viewer_Rate, the two average ratings, Monthly_Views and Total_Views when unset
    pub columns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: Option<PathBuf>,
    /// "csv" when unset
    pub format: Option<String>,
    pub compression: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing-subscriber EnvFilter directive; RUST_LOG wins when set
    pub filter: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            csv: CsvConfig::default(),
            dates: DatesConfig::default(),
            join: JoinConfig::default(),
            ranking: RankingConfig::default(),
            correlation: CorrelationConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        Self::load_with(app_name, None)
    }

    /// Load default → user → `extra` (a `--config` file, which must exist).
    pub fn load_with(app_name: &str, extra: Option<&Path>) -> Result<Self> {
        let mut config = AppConfig::default();

        if let Ok(user_config) = Self::load_user_config(app_name) {
            config.merge(user_config);
        }
        if let Some(path) = extra {
            config.merge(Self::load_from_path(path)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load user configuration from ~/.config/filmviews/config.toml
    fn load_user_config(app_name: &str) -> Result<AppConfig> {
        let config_manager = ConfigManager::new(app_name)?;
        let config_path = config_manager.config_path("config.toml");

        if !config_path.exists() {
            return Ok(AppConfig::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn load_from_path(path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre!("Failed to read config file at {}: {}", path.display(), e))?;

        toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file at {}: {}", path.display(), e))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.csv.merge(other.csv);
        self.dates.merge(other.dates);
        self.join.merge(other.join);
        self.ranking.merge(other.ranking);
        self.correlation.merge(other.correlation);
        self.output.merge(other.output);
        self.logging.merge(other.logging);
    }

    /// Command-line flags are the last layer.
    pub fn apply_args(&mut self, args: &Args) {
        if args.delimiter.is_some() {
            self.csv.delimiter = args.delimiter;
        }
        if args.date_format.is_some() {
            self.dates.format = args.date_format.clone();
        }
        if let Some(policy) = args.duplicate_policy {
            self.join.duplicate_policy = Some(policy.as_str().to_string());
        }
        if let Some(top_n) = args.top_n {
            self.ranking.top_n = Some(top_n);
        }
        if let Some(window) = args.window {
            self.ranking.window_year = Some(window.year);
            self.ranking.window_month = Some(window.month);
        }
        if args.output_dir.is_some() {
            self.output.directory = args.output_dir.clone();
        }
        if let Some(format) = args.format {
            self.output.format = Some(format.as_str().to_string());
        }
        if let Some(compress) = args.compress {
            self.output.compression = Some(compress.extension().to_string());
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if let Some(policy) = &self.join.duplicate_policy {
            if DuplicatePolicy::parse(policy).is_none() {
                return Err(eyre!(
                    "Invalid duplicate_policy: {}. Must be 'first', 'last', or 'error'",
                    policy
                ));
            }
        }

        if self.ranking.top_n == Some(0) {
            return Err(eyre!("top_n must be greater than 0"));
        }

        match (self.ranking.window_year, self.ranking.window_month) {
            (Some(_), Some(month)) if !(1..=12).contains(&month) => {
                return Err(eyre!("window_month must be 1-12, got {}", month));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(eyre!(
                    "window_year and window_month must be set together"
                ));
            }
            _ => {}
        }

        if let Some(format) = &self.output.format {
            if OutputFormat::parse(format).is_none() {
                return Err(eyre!(
                    "Invalid output format: {}. Must be 'csv' or 'json'",
                    format
                ));
            }
        }

        if let Some(compression) = &self.output.compression {
            if CompressionFormat::parse(compression).is_none()
                && !matches!(compression.as_str(), "gz" | "zst")
            {
                return Err(eyre!(
                    "Invalid compression: {}. Must be 'gzip' or 'zstd'",
                    compression
                ));
            }
        }

        Ok(())
    }

    pub fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            delimiter: self.csv.delimiter,
            has_header: self.csv.has_header,
            infer_schema_length: self.csv.infer_schema_length,
        }
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            date_format: self.dates.format.clone(),
        }
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.join
            .duplicate_policy
            .as_deref()
            .and_then(DuplicatePolicy::parse)
            .unwrap_or_default()
    }

    pub fn top_n(&self) -> usize {
        self.ranking.top_n.unwrap_or(DEFAULT_TOP_N)
    }

    pub fn correlation_columns(&self) -> Vec<String> {
        match &self.correlation.columns {
            Some(columns) => columns.clone(),
            None => DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn window(&self) -> Option<MonthWindow> {
        match (self.ranking.window_year, self.ranking.window_month) {
            (Some(year), Some(month)) => Some(MonthWindow { year, month }),
            _ => None,
        }
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output
            .format
            .as_deref()
            .and_then(OutputFormat::parse)
            .unwrap_or_default()
    }

    pub fn compression(&self) -> Option<CompressionFormat> {
        self.output
            .compression
            .as_deref()
            .and_then(|c| match c {
                "gz" => Some(CompressionFormat::Gzip),
                "zst" => Some(CompressionFormat::Zstd),
                other => CompressionFormat::parse(other),
            })
    }
}

// Merge implementations for each config section
impl CsvConfig {
    pub fn merge(&mut self, other: Self) {
        if other.delimiter.is_some() {
            self.delimiter = other.delimiter;
        }
        if other.has_header.is_some() {
            self.has_header = other.has_header;
        }
        if other.infer_schema_length.is_some() {
            self.infer_schema_length = other.infer_schema_length;
        }
    }
}

impl DatesConfig {
    pub fn merge(&mut self, other: Self) {
        if other.format.is_some() {
            self.format = other.format;
        }
    }
}

impl JoinConfig {
    pub fn merge(&mut self, other: Self) {
        if other.duplicate_policy.is_some() {
            self.duplicate_policy = other.duplicate_policy;
        }
    }
}

impl RankingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.top_n.is_some() {
            self.top_n = other.top_n;
        }
        if other.window_year.is_some() {
            self.window_year = other.window_year;
        }
        if other.window_month.is_some() {
            self.window_month = other.window_month;
        }
    }
}

impl CorrelationConfig {
    pub fn merge(&mut self, other: Self) {
        if other.columns.is_some() {
            self.columns = other.columns;
        }
    }
}

impl OutputConfig {
    pub fn merge(&mut self, other: Self) {
        if other.directory.is_some() {
            self.directory = other.directory;
        }
        if other.format.is_some() {
            self.format = other.format;
        }
        if other.compression.is_some() {
            self.compression = other.compression;
        }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        if other.filter.is_some() {
            self.filter = other.filter;
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("../config/default.toml");
