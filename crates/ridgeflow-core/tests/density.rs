use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use ridgeflow_core::density::{build_density, DensityError, DensityRow, DensitySpec};
use ridgeflow_core::ingestion::{normalize, IngestMode};
use ridgeflow_core::config::DensityConfig;
use ridgeflow_core::{Bucketing, Observation, TimeBucket};
use ridgeflow_parser::parse_table;

fn fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../ridgeflow-parser/tests/data")
        .join(name);
    std::fs::read_to_string(path).expect("read fixture")
}

fn reading(row: usize, (y, m, d): (i32, u32, u32), temp: Option<f64>) -> Observation {
    Observation::new(row, NaiveDate::from_ymd_opt(y, m, d).unwrap()).with_measure("temp", temp)
}

fn monthly(bin_width: f64) -> DensitySpec {
    DensitySpec {
        bucketing: Bucketing::MonthOfYear,
        primary: "temp".to_string(),
        secondary: "temp".to_string(),
        bin_width,
    }
}

fn bins_by_period(rows: &[DensityRow]) -> BTreeMap<TimeBucket, Vec<u64>> {
    let mut out: BTreeMap<TimeBucket, Vec<u64>> = BTreeMap::new();
    for row in rows {
        out.entry(row.period).or_default().push(row.bin_lo.to_bits());
    }
    out
}

fn mars_rows() -> Vec<DensityRow> {
    let table = parse_table(&fixture("mars_weather.tsv")).expect("parse mars fixture");
    let config = DensityConfig::default();
    let batch = normalize(&table.df, &config.schema(), IngestMode::Strict).expect("normalize");
    build_density(&batch.observations, &config.spec()).expect("build density")
}

#[test]
fn imputes_zero_counts_across_periods() {
    let observations = vec![
        reading(0, (2013, 1, 5), Some(-5.0)),
        reading(1, (2014, 1, 9), Some(-5.0)),
        reading(2, (2013, 2, 1), Some(3.0)),
    ];

    let rows = build_density(&observations, &monthly(10.0)).expect("density");

    let jan = TimeBucket::MonthOfYear(1);
    let feb = TimeBucket::MonthOfYear(2);
    assert_eq!(
        rows[..4],
        [
            DensityRow { period: jan, mean_primary: Some(-5.0), bin_lo: -10.0, bin_hi: 0.0, count: 2 },
            DensityRow { period: jan, mean_primary: Some(-5.0), bin_lo: 0.0, bin_hi: 10.0, count: 0 },
            DensityRow { period: feb, mean_primary: Some(3.0), bin_lo: -10.0, bin_hi: 0.0, count: 0 },
            DensityRow { period: feb, mean_primary: Some(3.0), bin_lo: 0.0, bin_hi: 10.0, count: 1 },
        ]
    );

    // The remaining ten months are present with all-zero counts.
    assert_eq!(rows.len(), 24);
    assert!(rows[4..].iter().all(|row| row.count == 0 && row.mean_primary.is_none()));
}

#[test]
fn every_period_covers_the_same_bins() {
    let rows = mars_rows();
    let bins = bins_by_period(&rows);

    assert_eq!(bins.len(), 12);
    let first = bins.values().next().unwrap();
    assert!(bins.values().all(|period_bins| period_bins == first));
}

#[test]
fn bin_edges_share_floor_and_width() {
    let rows = mars_rows();

    let floors: BTreeSet<u64> = rows
        .iter()
        .map(|row| {
            let steps = (row.bin_lo - -10.0) / 10.0;
            assert_eq!(steps, steps.round(), "bin {} is off the grid", row.bin_lo);
            assert_eq!(row.bin_hi - row.bin_lo, 10.0);
            row.bin_lo.to_bits()
        })
        .collect();
    assert_eq!(floors.len(), 2);
}

#[test]
fn mars_fixture_counts_and_means() {
    let rows = mars_rows();

    let jan: Vec<&DensityRow> = rows
        .iter()
        .filter(|row| row.period == TimeBucket::MonthOfYear(1))
        .collect();
    assert_eq!(jan.iter().map(|row| row.count).collect::<Vec<_>>(), vec![3, 0]);
    let jan_mean = jan[0].mean_primary.unwrap();
    assert!((jan_mean - (-16.0 / 3.0)).abs() < 1e-12);

    // The NaN reading in February is neither counted nor averaged.
    let feb: Vec<&DensityRow> = rows
        .iter()
        .filter(|row| row.period == TimeBucket::MonthOfYear(2))
        .collect();
    assert_eq!(feb.iter().map(|row| row.count).collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(feb[0].mean_primary, Some(2.0));

    let periods: Vec<String> = rows.iter().step_by(2).map(|row| row.period.label()).collect();
    assert_eq!(
        periods,
        vec!["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"]
    );
}

#[test]
fn zero_variance_gives_one_bin_per_period() {
    let observations = vec![
        reading(0, (2020, 6, 1), Some(12.0)),
        reading(1, (2021, 6, 2), Some(12.0)),
    ];

    let rows = build_density(&observations, &monthly(5.0)).expect("density");

    assert_eq!(rows.len(), 12);
    assert!(rows.iter().all(|row| row.bin_lo == 10.0 && row.bin_hi == 15.0));
    let june = rows
        .iter()
        .find(|row| row.period == TimeBucket::MonthOfYear(6))
        .unwrap();
    assert_eq!(june.count, 2);
}

#[test]
fn empty_input_is_an_error() {
    assert_eq!(build_density(&[], &monthly(10.0)), Err(DensityError::EmptyInput));
    assert_eq!(build_density(&[], &monthly(0.0)), Err(DensityError::EmptyInput));
}

#[test]
fn non_positive_bin_width_is_rejected() {
    let observations = vec![reading(0, (2020, 1, 1), Some(1.0))];
    assert_eq!(
        build_density(&observations, &monthly(0.0)),
        Err(DensityError::InvalidBinWidth(0.0))
    );
    assert_eq!(
        build_density(&observations, &monthly(-1.0)),
        Err(DensityError::InvalidBinWidth(-1.0))
    );
}

#[test]
fn all_missing_secondary_yields_no_rows() {
    let observations = vec![reading(0, (2020, 1, 1), None)];
    assert_eq!(build_density(&observations, &monthly(10.0)), Ok(Vec::new()));
}

#[test]
fn primary_and_secondary_can_differ() {
    let observations = vec![
        Observation::new(0, NaiveDate::from_ymd_opt(2013, 3, 1).unwrap())
            .with_measure("min_temp", Some(-70.0))
            .with_measure("max_temp", Some(-1.0)),
        Observation::new(1, NaiveDate::from_ymd_opt(2013, 3, 2).unwrap())
            .with_measure("min_temp", None)
            .with_measure("max_temp", Some(4.0)),
    ];
    let spec = DensitySpec {
        bucketing: Bucketing::MonthOfYear,
        primary: "min_temp".to_string(),
        secondary: "max_temp".to_string(),
        bin_width: 10.0,
    };

    let rows = build_density(&observations, &spec).expect("density");
    let march: Vec<&DensityRow> = rows
        .iter()
        .filter(|row| row.period == TimeBucket::MonthOfYear(3))
        .collect();

    assert_eq!(march.len(), 2);
    assert!(march.iter().all(|row| row.mean_primary == Some(-70.0)));
    assert_eq!(march.iter().map(|row| row.count).sum::<u64>(), 2);
}

#[test]
fn yearly_periods_include_empty_years() {
    let observations = vec![
        reading(0, (2000, 5, 1), Some(1.0)),
        reading(1, (2002, 5, 1), Some(11.0)),
    ];
    let spec = DensitySpec {
        bucketing: Bucketing::Year,
        ..monthly(10.0)
    };

    let rows = build_density(&observations, &spec).expect("density");

    let periods: BTreeSet<TimeBucket> = rows.iter().map(|row| row.period).collect();
    assert_eq!(
        periods.into_iter().collect::<Vec<_>>(),
        vec![TimeBucket::Year(2000), TimeBucket::Year(2001), TimeBucket::Year(2002)]
    );
    assert_eq!(rows.len(), 6);
    assert!(rows
        .iter()
        .filter(|row| row.period == TimeBucket::Year(2001))
        .all(|row| row.count == 0));
}

#[test]
fn density_is_idempotent() {
    assert_eq!(mars_rows(), mars_rows());
}
