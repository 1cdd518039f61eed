use thiserror::Error;

use crate::config::ConfigError;
use crate::density::DensityError;
use crate::ingestion::IngestError;

/// Failure of a chart pipeline, labelled with the stage that stopped it.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration stage failed: {0}")]
    Config(#[from] ConfigError),

    #[error("ingestion stage failed: {0}")]
    Ingestion(#[from] IngestError),

    #[error("density stage failed: {0}")]
    Density(#[source] DensityError),

    #[error("monthly-mean stage failed: {0}")]
    Means(#[source] DensityError),

    #[error("export stage failed: {0}")]
    Export(#[from] polars::error::PolarsError),

    #[error("unknown pipeline '{0}'")]
    UnknownPipeline(String),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "configuration",
            PipelineError::Ingestion(_) => "ingestion",
            PipelineError::Density(_) => "density",
            PipelineError::Means(_) => "monthly-mean",
            PipelineError::Export(_) => "export",
            PipelineError::UnknownPipeline(_) => "dispatch",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
