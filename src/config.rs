use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::correspondent::DEFAULT_TOP_K;
use crate::error::{Result, WrappedError};
use crate::models::PeriodKind;
use crate::queries::{DEFAULT_TOP_SENDERS_LIMIT, DEFAULT_UNBALANCED_MIN_SENT};
use crate::timestamp::TimeBasis;
use crate::validation::InputValidator;

/// Prefix of environment overrides, e.g. `TXT_WRAPPED__ANALYSIS__YEAR=2023`
pub const ENV_PREFIX: &str = "TXT_WRAPPED";

/// Largest accepted `analysis.top_k`
pub const MAX_TOP_K: usize = 50;
/// Largest accepted `analysis.top_senders`
pub const MAX_TOP_SENDERS: usize = 100;

/// Application configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// What to compute
    pub analysis: AnalysisConfig,
    /// Where and how to log
    pub logging: LoggingConfig,
    /// How to write the result record
    pub output: OutputConfig,
}

/// `[analysis]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Target year; `None` picks the year of the newest self-sent message
    pub year: Option<i32>,
    /// `month` or `weekday`
    pub period: PeriodKind,
    /// `local` or `utc`
    pub time_basis: TimeBasis,
    /// Words and emoji kept per top friend
    pub top_k: usize,
    /// Rows in the top senders list
    pub top_senders: usize,
    /// Minimum self-sent messages for the unbalanced friend
    pub unbalanced_min_sent: u32,
    /// Additional stop words
    pub extra_stop_words: Vec<String>,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
    /// Console format
    pub format: String, // "json" or "text"
    /// Daily rolling JSON log file, if any
    pub file_path: Option<String>,
}

/// `[output]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Pretty-print the JSON record
    pub pretty: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            year: None,
            period: PeriodKind::Month,
            time_basis: TimeBasis::Local,
            top_k: DEFAULT_TOP_K,
            top_senders: DEFAULT_TOP_SENDERS_LIMIT,
            unbalanced_min_sent: DEFAULT_UNBALANCED_MIN_SENT,
            extra_stop_words: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file_path: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like [`AppConfig::load`], with `extra` layered above the standard files.
    pub fn load_from(extra: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false));

        if let Some(path) = extra {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("analysis.extra_stop_words"),
            )
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if let Some(year) = self.analysis.year {
            InputValidator::validate_year(year).map_err(|e| WrappedError::InvalidConfig(e.to_string()))?;
        }
        InputValidator::validate_limit("analysis.top_k", self.analysis.top_k, MAX_TOP_K)
            .map_err(|e| WrappedError::InvalidConfig(e.to_string()))?;
        InputValidator::validate_limit("analysis.top_senders", self.analysis.top_senders, MAX_TOP_SENDERS)
            .map_err(|e| WrappedError::InvalidConfig(e.to_string()))?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(WrappedError::InvalidConfig(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(WrappedError::InvalidConfig(format!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format, valid_formats
            )));
        }

        if let Some(path) = &self.logging.file_path {
            InputValidator::validate_file_path(Path::new(path))
                .map_err(|e| WrappedError::InvalidConfig(format!("logging.file_path: {e}")))?;
        }

        Ok(())
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// Whether console logs are JSON
    #[must_use]
    pub fn json_logs(&self) -> bool {
        self.logging.format == "json"
    }

    /// Configured log file, if any
    #[must_use]
    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging.file_path.as_ref().map(PathBuf::from)
    }
}
