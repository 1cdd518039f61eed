//! DataFrame views of pipeline output for chart renderers.

use polars::df;
use polars::prelude::*;

use crate::density::DensityRow;
use crate::means::PeriodMean;
use crate::stacked::{StackedBand, StackedSumRow};

pub fn stacked_frame(rows: &[StackedSumRow]) -> PolarsResult<DataFrame> {
    df![
        "bucket" => rows.iter().map(|row| row.bucket.label()).collect::<Vec<_>>(),
        "bucket_order" => rows.iter().map(|row| row.bucket.ordinal()).collect::<Vec<_>>(),
        "category" => rows.iter().map(|row| row.category.as_str()).collect::<Vec<_>>(),
        "value" => rows.iter().map(|row| row.value).collect::<Vec<_>>(),
    ]
}

pub fn stacked_band_frame(bands: &[StackedBand]) -> PolarsResult<DataFrame> {
    df![
        "bucket" => bands.iter().map(|band| band.bucket.label()).collect::<Vec<_>>(),
        "bucket_order" => bands.iter().map(|band| band.bucket.ordinal()).collect::<Vec<_>>(),
        "category" => bands.iter().map(|band| band.category.as_str()).collect::<Vec<_>>(),
        "value" => bands.iter().map(|band| band.value).collect::<Vec<_>>(),
        "y0" => bands.iter().map(|band| band.y0).collect::<Vec<_>>(),
        "y1" => bands.iter().map(|band| band.y1).collect::<Vec<_>>(),
    ]
}

pub fn density_frame(rows: &[DensityRow]) -> PolarsResult<DataFrame> {
    df![
        "period" => rows.iter().map(|row| row.period.label()).collect::<Vec<_>>(),
        "period_order" => rows.iter().map(|row| row.period.ordinal()).collect::<Vec<_>>(),
        "mean_primary" => rows.iter().map(|row| row.mean_primary).collect::<Vec<_>>(),
        "bin_min" => rows.iter().map(|row| row.bin_lo).collect::<Vec<_>>(),
        "bin_max" => rows.iter().map(|row| row.bin_hi).collect::<Vec<_>>(),
        "count" => rows.iter().map(|row| row.count).collect::<Vec<_>>(),
    ]
}

pub fn means_frame(rows: &[PeriodMean]) -> PolarsResult<DataFrame> {
    df![
        "period" => rows.iter().map(|row| row.period.label()).collect::<Vec<_>>(),
        "period_order" => rows.iter().map(|row| row.period.ordinal()).collect::<Vec<_>>(),
        "mean" => rows.iter().map(|row| row.mean).collect::<Vec<_>>(),
        "count" => rows.iter().map(|row| row.count as u64).collect::<Vec<_>>(),
    ]
}
