use once_cell::sync::Lazy;
use polars::prelude::{DataFrame, PolarsResult};
use serde::Serialize;
use tracing::info;

use crate::config::PipelineConfig;
use crate::density::{self, DensityRow};
use crate::error::{PipelineError, Result};
use crate::frames;
use crate::ingestion::{self, IngestionBatch, MalformedRecord};
use crate::means::{self, PeriodMean};
use crate::stacked::{self, StackedBand};

/// Rows produced by one pipeline run, ready for serialization or a renderer frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartRows {
    Stacked(Vec<StackedBand>),
    Density(Vec<DensityRow>),
    Means(Vec<PeriodMean>),
}

impl ChartRows {
    pub fn len(&self) -> usize {
        match self {
            ChartRows::Stacked(rows) => rows.len(),
            ChartRows::Density(rows) => rows.len(),
            ChartRows::Means(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        match self {
            ChartRows::Stacked(rows) => frames::stacked_band_frame(rows),
            ChartRows::Density(rows) => frames::density_frame(rows),
            ChartRows::Means(rows) => frames::means_frame(rows),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub rows: ChartRows,
    /// Rows skipped by lenient ingestion.
    pub rejected: Vec<MalformedRecord>,
}

impl PipelineOutput {
    pub fn dataframe(&self) -> Result<DataFrame> {
        Ok(self.rows.to_frame()?)
    }
}

pub trait ChartPipeline: Send + Sync {
    fn code_identifier(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn run(&self, frame: &DataFrame, config: &PipelineConfig) -> Result<PipelineOutput>;
}

static PIPELINE_IMPLEMENTATIONS: Lazy<Vec<&'static dyn ChartPipeline>> = Lazy::new(|| {
    vec![
        &StackedSumPipeline as &dyn ChartPipeline,
        &RidgelineDensityPipeline as &dyn ChartPipeline,
        &MonthlyMeanPipeline as &dyn ChartPipeline,
    ]
});

pub fn all_pipelines() -> &'static [&'static dyn ChartPipeline] {
    PIPELINE_IMPLEMENTATIONS.as_slice()
}

pub fn find_pipeline(code: &str) -> Result<&'static dyn ChartPipeline> {
    all_pipelines()
        .iter()
        .copied()
        .find(|pipeline| pipeline.code_identifier() == code)
        .ok_or_else(|| PipelineError::UnknownPipeline(code.to_string()))
}

pub fn run_pipeline(code: &str, frame: &DataFrame, config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;
    let pipeline = find_pipeline(code)?;
    let output = pipeline.run(frame, config)?;
    info!(
        pipeline = code,
        rows = output.rows.len(),
        rejected = output.rejected.len(),
        "pipeline finished"
    );
    Ok(output)
}

pub struct StackedSumPipeline;

impl ChartPipeline for StackedSumPipeline {
    fn code_identifier(&self) -> &'static str {
        "stacked_sum"
    }

    fn description(&self) -> &'static str {
        "Sum of a measure per year and category, laid out as a centered stack"
    }

    fn run(&self, frame: &DataFrame, config: &PipelineConfig) -> Result<PipelineOutput> {
        let settings = &config.stacked;
        let IngestionBatch {
            observations,
            rejected,
        } = ingestion::normalize(frame, &settings.schema(), config.ingest.mode)?;

        let sums = stacked::aggregate(&observations, settings.bucketing, &settings.measure);
        let bands = stacked::center_stack(&sums);

        Ok(PipelineOutput {
            rows: ChartRows::Stacked(bands),
            rejected,
        })
    }
}

pub struct RidgelineDensityPipeline;

impl ChartPipeline for RidgelineDensityPipeline {
    fn code_identifier(&self) -> &'static str {
        "ridgeline_density"
    }

    fn description(&self) -> &'static str {
        "Per-period histogram of a measure on a shared, zero-filled bin grid"
    }

    fn run(&self, frame: &DataFrame, config: &PipelineConfig) -> Result<PipelineOutput> {
        let settings = &config.density;
        let IngestionBatch {
            observations,
            rejected,
        } = ingestion::normalize(frame, &settings.schema(), config.ingest.mode)?;

        let rows = density::build_density(&observations, &settings.spec())
            .map_err(PipelineError::Density)?;

        Ok(PipelineOutput {
            rows: ChartRows::Density(rows),
            rejected,
        })
    }
}

pub struct MonthlyMeanPipeline;

impl ChartPipeline for MonthlyMeanPipeline {
    fn code_identifier(&self) -> &'static str {
        "monthly_mean"
    }

    fn description(&self) -> &'static str {
        "Mean of the primary density measure per period, missing values excluded"
    }

    fn run(&self, frame: &DataFrame, config: &PipelineConfig) -> Result<PipelineOutput> {
        let settings = &config.density;
        let schema = ingestion::IngestSchema::new(&settings.date_column).with_measure(&settings.primary);
        let IngestionBatch {
            observations,
            rejected,
        } = ingestion::normalize(frame, &schema, config.ingest.mode)?;

        let rows = means::reduce_means(&observations, settings.bucketing, &settings.primary)
            .map_err(PipelineError::Means)?;

        Ok(PipelineOutput {
            rows: ChartRows::Means(rows),
            rejected,
        })
    }
}
