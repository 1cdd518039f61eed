use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::model::{Bucketing, Observation, TimeBucket};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedSumRow {
    pub bucket: TimeBucket,
    pub category: String,
    pub value: f64,
}

/// A [`StackedSumRow`] placed in a stack centered on zero: `[y0, y1)` is the band it
/// occupies within its bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedBand {
    pub bucket: TimeBucket,
    pub category: String,
    pub value: f64,
    pub y0: f64,
    pub y1: f64,
}

/// Sums `measure` per (bucket, category). Missing measure values count as zero, so a
/// category that appears in a bucket always yields a row there. Absent (bucket,
/// category) pairs are not filled in.
///
/// Rows are ordered by bucket, then by the order in which each category first appears
/// in the input.
pub fn aggregate(
    observations: &[Observation],
    bucketing: Bucketing,
    measure: &str,
) -> Vec<StackedSumRow> {
    let mut category_order: Vec<String> = Vec::new();
    let mut category_rank: HashMap<&str, usize> = HashMap::new();
    let mut groups: BTreeMap<(TimeBucket, usize), Vec<f64>> = BTreeMap::new();

    for observation in observations {
        let label = observation.category_label();
        let rank = match category_rank.get(label) {
            Some(rank) => *rank,
            None => {
                let rank = category_order.len();
                category_order.push(label.to_string());
                category_rank.insert(label, rank);
                rank
            }
        };

        let bucket = bucketing.bucket(observation.date);
        groups
            .entry((bucket, rank))
            .or_default()
            .push(observation.measure(measure).unwrap_or(0.0));
    }

    let rows: Vec<StackedSumRow> = groups
        .into_iter()
        .map(|((bucket, rank), values)| StackedSumRow {
            bucket,
            category: category_order[rank].clone(),
            value: order_independent_sum(values),
        })
        .collect();

    debug!(
        observations = observations.len(),
        categories = category_order.len(),
        rows = rows.len(),
        bucketing = %bucketing,
        "aggregated stacked sums"
    );

    rows
}

/// Lays the rows of each bucket out as a stack centered on zero (the first category sits
/// lowest). Row order is preserved.
pub fn center_stack(rows: &[StackedSumRow]) -> Vec<StackedBand> {
    let mut totals: BTreeMap<TimeBucket, f64> = BTreeMap::new();
    for row in rows {
        *totals.entry(row.bucket).or_insert(0.0) += row.value;
    }

    let mut cursors: BTreeMap<TimeBucket, f64> = totals
        .iter()
        .map(|(bucket, total)| (*bucket, -total / 2.0))
        .collect();

    rows.iter()
        .map(|row| {
            let cursor = cursors.entry(row.bucket).or_insert(0.0);
            let y0 = *cursor;
            *cursor += row.value;
            StackedBand {
                bucket: row.bucket,
                category: row.category.clone(),
                value: row.value,
                y0,
                y1: *cursor,
            }
        })
        .collect()
}

// Summed in sorted order so the total does not depend on row order.
fn order_independent_sum(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.into_iter().sum()
}
