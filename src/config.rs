//! Layered run configuration.
//!
//! Built-in defaults, then an optional config file, then `NCLIMGRID_*`
//! environment variables (nested keys joined by `__`), then CLI flags.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use validator::{Validate, ValidationError};

use crate::error::{ProcessingError, Result};
use crate::models::{MonthPeriod, Tolerance};
use crate::utils::constants::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the run at the first failed month
    Abort,
    /// Log the failed month and carry on
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Parquet,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FetchConfig {
    pub url_template: String,

    #[validate(range(min = 1))]
    pub timeout_secs: u64,

    #[validate(range(min = 1, max = 20))]
    pub max_attempts: u32,

    pub backoff_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_secs: DEFAULT_BACKOFF_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_pipeline"))]
pub struct PipelineConfig {
    pub boundary_path: Option<PathBuf>,
    pub state: Option<String>,
    pub state_field: String,
    pub zip_field: String,

    #[validate(range(min = 1951, max = 2100))]
    pub year_start: i32,

    #[validate(range(min = 1951, max = 2100))]
    pub year_stop: i32,

    #[validate(range(min = 1, max = 12))]
    pub month_stop_final: u32,

    pub variable: String,

    pub output_dir: PathBuf,
    pub output_file: String,
    pub output_format: OutputFormat,
    pub delimiter: char,
    pub compression: String,

    #[validate(nested)]
    pub join: Tolerance,

    #[validate(nested)]
    pub fetch: FetchConfig,

    pub on_error: ErrorPolicy,

    /// Threads for the spatial join, 0 = one per CPU
    pub max_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            boundary_path: None,
            state: Some(DEFAULT_STATE.to_string()),
            state_field: DEFAULT_STATE_FIELD.to_string(),
            zip_field: DEFAULT_ZIP_FIELD.to_string(),
            year_start: DEFAULT_YEAR_START,
            year_stop: DEFAULT_YEAR_STOP,
            month_stop_final: DEFAULT_MONTH_STOP_FINAL,
            variable: DEFAULT_VARIABLE.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            output_format: OutputFormat::Csv,
            delimiter: DEFAULT_DELIMITER,
            compression: COMPRESSION_SNAPPY.to_string(),
            join: Tolerance::default(),
            fetch: FetchConfig::default(),
            on_error: ErrorPolicy::Abort,
            max_workers: 0,
        }
    }
}

impl PipelineConfig {
    /// Merge defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = ::config::Config::try_from(&PipelineConfig::default())?;

        let mut builder = ::config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    pub fn worker_count(&self) -> usize {
        if self.max_workers == 0 {
            num_cpus::get()
        } else {
            self.max_workers
        }
    }

    /// Output file path; the default CSV name becomes `.parquet` for Parquet output
    pub fn output_path(&self) -> PathBuf {
        let path = crate::utils::output_path(&self.output_dir, &self.output_file);
        match self.output_format {
            OutputFormat::Parquet if self.output_file == DEFAULT_OUTPUT_FILE => {
                path.with_extension("parquet")
            }
            _ => path,
        }
    }

    pub fn boundary_path(&self) -> Result<&Path> {
        self.boundary_path.as_deref().ok_or_else(|| {
            ProcessingError::Config(
                "No boundary file given (--boundary or boundary_path)".to_string(),
            )
        })
    }

    /// Months to process, in order
    pub fn periods(&self) -> Vec<MonthPeriod> {
        MonthPeriod::range(self.year_start, self.year_stop, self.month_stop_final)
    }

    pub fn delimiter_byte(&self) -> u8 {
        // ASCII is enforced by validation
        self.delimiter as u8
    }
}

fn validation_error(code: &'static str, message: String) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::from(message));
    error
}

fn validate_pipeline(config: &PipelineConfig) -> std::result::Result<(), ValidationError> {
    if config.year_start > config.year_stop {
        return Err(validation_error(
            "year_range",
            format!(
                "year_start {} is after year_stop {}",
                config.year_start, config.year_stop
            ),
        ));
    }

    if !config.delimiter.is_ascii() || config.delimiter == '"' || config.delimiter == '\n' {
        return Err(validation_error(
            "delimiter",
            format!("Delimiter {:?} must be a single ASCII separator", config.delimiter),
        ));
    }

    let template = &config.fetch.url_template;
    if !template.contains(YEAR_PLACEHOLDER) || !template.contains(MONTH_PLACEHOLDER) {
        return Err(validation_error(
            "url_template",
            format!(
                "URL template '{}' must contain {} and {}",
                template, YEAR_PLACEHOLDER, MONTH_PLACEHOLDER
            ),
        ));
    }

    if !config.join.distance.is_finite() {
        return Err(validation_error(
            "join",
            format!("Join distance {} must be a finite number", config.join.distance),
        ));
    }

    if config.zip_field.trim().is_empty() {
        return Err(validation_error(
            "zip_field",
            "ZIP attribute name cannot be empty".to_string(),
        ));
    }

    Ok(())
}
