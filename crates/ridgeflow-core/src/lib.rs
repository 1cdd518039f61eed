pub mod config;
pub mod density;
pub mod error;
pub mod frames;
pub mod ingestion;
pub mod means;
pub mod model;
pub mod pipelines;
pub mod stacked;

pub use error::{PipelineError, Result};
pub use model::{Bucketing, Observation, TimeBucket};
