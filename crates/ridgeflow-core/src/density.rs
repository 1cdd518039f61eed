//! Ridgeline ("joyplot") density table.
//!
//! Observations are folded onto periods, a secondary measure is histogrammed with one
//! bin grid shared by every period, and each period is zero-filled so that all facets
//! span the same bins. Every stage is a separate function so it can be checked on its
//! own; [`build_density`] chains them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{Bucketing, Observation, TimeBucket};

// Quotients this close to an integer are treated as landing on a bin edge.
const EDGE_TOLERANCE: f64 = 1e-9;
// Bin indices stay within the range f64 represents exactly.
const MAX_BIN_INDEX: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DensityError {
    #[error("no observations to process")]
    EmptyInput,
    #[error("bin width must be a positive finite number, got {0}")]
    InvalidBinWidth(f64),
    #[error("value {value} is too far from the lowest value for bin width {width}")]
    BinIndexOverflow { value: f64, width: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensitySpec {
    pub bucketing: Bucketing,
    /// Averaged per period; carried on every row for coloring and ordering.
    pub primary: String,
    /// Histogrammed per period.
    pub secondary: String,
    pub bin_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityRow {
    pub period: TimeBucket,
    pub mean_primary: Option<f64>,
    pub bin_lo: f64,
    pub bin_hi: f64,
    pub count: u64,
}

/// Half-open interval `[lo, hi)`. Membership is decided by [`BinEdges::index_of`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub index: i64,
    pub lo: f64,
    pub hi: f64,
}

/// Bin grid anchored at `floor(min / width) * width`, shared by all periods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinEdges {
    floor: f64,
    width: f64,
}

impl BinEdges {
    pub fn new(floor: f64, width: f64) -> Result<Self, DensityError> {
        validate_bin_width(width)?;
        Ok(Self { floor, width })
    }

    /// Derives the grid from every value in play. `Ok(None)` when there are no values.
    pub fn from_values<I>(values: I, width: f64) -> Result<Option<Self>, DensityError>
    where
        I: IntoIterator<Item = f64>,
    {
        validate_bin_width(width)?;
        let min = values.into_iter().fold(None, |acc: Option<f64>, value| {
            Some(acc.map_or(value, |current| current.min(value)))
        });
        Ok(min.map(|min| Self {
            floor: snapped_floor(min / width) * width,
            width,
        }))
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Index of the bin holding `value`; lower edges are inclusive.
    pub fn index_of(&self, value: f64) -> Result<i64, DensityError> {
        let index = snapped_floor((value - self.floor) / self.width);
        if index.is_finite() && index.abs() <= MAX_BIN_INDEX {
            Ok(index as i64)
        } else {
            Err(DensityError::BinIndexOverflow {
                value,
                width: self.width,
            })
        }
    }

    pub fn bin(&self, index: i64) -> Bin {
        let lo = self.floor + index as f64 * self.width;
        Bin {
            index,
            lo,
            hi: lo + self.width,
        }
    }
}

fn snapped_floor(quotient: f64) -> f64 {
    let nearest = quotient.round();
    if (quotient - nearest).abs() < EDGE_TOLERANCE {
        nearest
    } else {
        quotient.floor()
    }
}

pub fn validate_bin_width(width: f64) -> Result<(), DensityError> {
    if width.is_finite() && width > 0.0 {
        Ok(())
    } else {
        Err(DensityError::InvalidBinWidth(width))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanSummary {
    pub mean: Option<f64>,
    /// Number of present values that went into `mean`.
    pub count: usize,
}

pub type BinCounts = BTreeMap<TimeBucket, BTreeMap<i64, u64>>;

pub fn assign_periods(
    observations: &[Observation],
    bucketing: Bucketing,
) -> Vec<(TimeBucket, &Observation)> {
    observations
        .iter()
        .map(|observation| (bucketing.bucket(observation.date), observation))
        .collect()
}

/// Mean of `measure` per period. Missing values are left out of both the sum and the
/// count; a period whose values are all missing has no mean.
pub fn period_means(
    assigned: &[(TimeBucket, &Observation)],
    measure: &str,
) -> BTreeMap<TimeBucket, MeanSummary> {
    let mut sums: BTreeMap<TimeBucket, (f64, usize)> = BTreeMap::new();
    for (period, observation) in assigned {
        let entry = sums.entry(*period).or_insert((0.0, 0));
        if let Some(value) = observation.measure(measure) {
            entry.0 += value;
            entry.1 += 1;
        }
    }

    sums.into_iter()
        .map(|(period, (sum, count))| {
            let mean = (count > 0).then(|| sum / count as f64);
            (period, MeanSummary { mean, count })
        })
        .collect()
}

/// Counts observations per observed (period, bin). Observations without a `measure`
/// value are not counted.
pub fn count_bins(
    assigned: &[(TimeBucket, &Observation)],
    measure: &str,
    edges: &BinEdges,
) -> Result<BinCounts, DensityError> {
    let mut counts = BinCounts::new();
    for (period, observation) in assigned {
        if let Some(value) = observation.measure(measure) {
            *counts
                .entry(*period)
                .or_default()
                .entry(edges.index_of(value)?)
                .or_insert(0) += 1;
        }
    }
    Ok(counts)
}

/// Gives every period in `periods` a count for every bin that is non-empty in at least
/// one period, inserting zeros where the period has none.
pub fn impute_zero_bins(counts: &BinCounts, periods: &[TimeBucket]) -> BinCounts {
    let domain: BTreeSet<i64> = counts
        .values()
        .flat_map(|bins| bins.iter())
        .filter(|(_, count)| **count > 0)
        .map(|(index, _)| *index)
        .collect();

    periods
        .iter()
        .chain(counts.keys())
        .map(|period| {
            let observed = counts.get(period);
            let bins = domain
                .iter()
                .map(|index| {
                    let count = observed
                        .and_then(|bins| bins.get(index))
                        .copied()
                        .unwrap_or(0);
                    (*index, count)
                })
                .collect();
            (*period, bins)
        })
        .collect()
}

/// Builds the row-per-(period, bin) table for a ridgeline chart, ordered by period then
/// by lower bin edge.
pub fn build_density(
    observations: &[Observation],
    spec: &DensitySpec,
) -> Result<Vec<DensityRow>, DensityError> {
    if observations.is_empty() {
        return Err(DensityError::EmptyInput);
    }
    validate_bin_width(spec.bin_width)?;

    let assigned = assign_periods(observations, spec.bucketing);
    let means = period_means(&assigned, &spec.primary);

    let secondary_values = assigned
        .iter()
        .filter_map(|(_, observation)| observation.measure(&spec.secondary));
    let Some(edges) = BinEdges::from_values(secondary_values, spec.bin_width)? else {
        debug!(
            observations = observations.len(),
            secondary = %spec.secondary,
            "no secondary values present; density table is empty"
        );
        return Ok(Vec::new());
    };

    let counts = count_bins(&assigned, &spec.secondary, &edges)?;
    let periods = spec
        .bucketing
        .canonical_periods(assigned.iter().map(|(period, _)| *period));
    let filled = impute_zero_bins(&counts, &periods);

    let mut rows = Vec::new();
    for (period, bins) in &filled {
        let mean_primary = means.get(period).and_then(|summary| summary.mean);
        for (index, count) in bins {
            let bin = edges.bin(*index);
            rows.push(DensityRow {
                period: *period,
                mean_primary,
                bin_lo: bin.lo,
                bin_hi: bin.hi,
                count: *count,
            });
        }
    }

    debug!(
        observations = observations.len(),
        periods = filled.len(),
        bins = filled.values().next().map_or(0, BTreeMap::len),
        floor = edges.floor(),
        width = edges.width(),
        rows = rows.len(),
        "built ridgeline density"
    );

    Ok(rows)
}
