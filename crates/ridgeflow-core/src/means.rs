use serde::Serialize;
use tracing::debug;

use crate::density::{assign_periods, period_means, DensityError};
use crate::model::{Bucketing, Observation, TimeBucket};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodMean {
    pub period: TimeBucket,
    pub mean: Option<f64>,
    pub count: usize,
}

/// One mean of `measure` per observed period, in chronological period order.
///
/// Unlike the stacked sums, missing values are excluded rather than read as zero.
pub fn reduce_means(
    observations: &[Observation],
    bucketing: Bucketing,
    measure: &str,
) -> Result<Vec<PeriodMean>, DensityError> {
    if observations.is_empty() {
        return Err(DensityError::EmptyInput);
    }

    let assigned = assign_periods(observations, bucketing);
    let rows: Vec<PeriodMean> = period_means(&assigned, measure)
        .into_iter()
        .map(|(period, summary)| PeriodMean {
            period,
            mean: summary.mean,
            count: summary.count,
        })
        .collect();

    debug!(
        observations = observations.len(),
        periods = rows.len(),
        measure,
        "reduced period means"
    );

    Ok(rows)
}
