use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::density::{validate_bin_width, DensitySpec};
use crate::ingestion::{IngestMode, IngestSchema};
use crate::model::Bucketing;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("density.bin_width must be a positive finite number, got {0}")]
    InvalidBinWidth(f64),
    #[error("{section}.{field} must not be empty")]
    EmptyColumnName {
        section: &'static str,
        field: &'static str,
    },
}

/// Pipeline settings. Every field has a default, so an empty file (or no file) is valid.
///
/// ```toml
/// [ingest]
/// mode = "strict"
///
/// [stacked]
/// date_column = "Year"
/// category_column = "Format"
/// measure = "Value (Actual)"
///
/// [density]
/// date_column = "terrestrial_date"
/// primary = "max_temp"
/// secondary = "max_temp"
/// bin_width = 10.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub ingest: IngestConfig,
    pub stacked: StackedConfig,
    pub density: DensityConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    pub mode: IngestMode,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackedConfig {
    pub date_column: String,
    pub category_column: String,
    pub measure: String,
    pub bucketing: Bucketing,
}

impl Default for StackedConfig {
    fn default() -> Self {
        Self {
            date_column: "Year".to_string(),
            category_column: "Format".to_string(),
            measure: "Value (Actual)".to_string(),
            bucketing: Bucketing::Year,
        }
    }
}

impl StackedConfig {
    pub fn schema(&self) -> IngestSchema {
        IngestSchema::new(&self.date_column)
            .with_category(&self.category_column)
            .with_measure(&self.measure)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DensityConfig {
    pub date_column: String,
    pub primary: String,
    pub secondary: String,
    pub bin_width: f64,
    pub bucketing: Bucketing,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            date_column: "terrestrial_date".to_string(),
            primary: "max_temp".to_string(),
            secondary: "max_temp".to_string(),
            bin_width: 10.0,
            bucketing: Bucketing::MonthOfYear,
        }
    }
}

impl DensityConfig {
    /// Schema for the density and monthly-mean pipelines; no category column is needed.
    pub fn schema(&self) -> IngestSchema {
        IngestSchema::new(&self.date_column)
            .with_measure(&self.primary)
            .with_measure(&self.secondary)
    }

    pub fn spec(&self) -> DensitySpec {
        DensitySpec {
            bucketing: self.bucketing,
            primary: self.primary.clone(),
            secondary: self.secondary.clone(),
            bin_width: self.bin_width,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_bin_width(self.density.bin_width)
            .map_err(|_| ConfigError::InvalidBinWidth(self.density.bin_width))?;

        let names = [
            ("stacked", "date_column", &self.stacked.date_column),
            ("stacked", "category_column", &self.stacked.category_column),
            ("stacked", "measure", &self.stacked.measure),
            ("density", "date_column", &self.density.date_column),
            ("density", "primary", &self.density.primary),
            ("density", "secondary", &self.density.secondary),
        ];
        for (section, field, value) in names {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyColumnName { section, field });
            }
        }

        Ok(())
    }
}
