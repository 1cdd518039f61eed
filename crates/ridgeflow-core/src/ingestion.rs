use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::Observation;

const DATE_REASON: &str = "expected a year (YYYY) or a calendar date (YYYY-MM-DD)";
const MISSING_TOKENS: [&str; 5] = ["na", "n/a", "nan", "null", "-"];

/// Columns the normalizer reads from a raw frame.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSchema {
    pub date_column: String,
    pub category_column: Option<String>,
    pub measure_columns: Vec<String>,
}

impl IngestSchema {
    pub fn new(date_column: impl Into<String>) -> Self {
        Self {
            date_column: date_column.into(),
            category_column: None,
            measure_columns: Vec::new(),
        }
    }

    pub fn with_category(mut self, column: impl Into<String>) -> Self {
        self.category_column = Some(column.into());
        self
    }

    pub fn with_measure(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        if !self.measure_columns.contains(&column) {
            self.measure_columns.push(column);
        }
        self
    }

    fn required_columns(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.date_column.as_str())
            .chain(self.category_column.as_deref())
            .chain(self.measure_columns.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestMode {
    /// Skip malformed rows and report them alongside the accepted observations.
    #[default]
    Lenient,
    /// Fail the batch if any row is malformed.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MalformedRecord {
    pub row: usize,
    pub column: String,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row {} column '{}' value '{}': {}",
            self.row, self.column, self.value, self.reason
        )
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("required column '{column}' not found; available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },
    #[error("{} malformed record(s); first: {}", .records.len(), first_record(.records))]
    Malformed { records: Vec<MalformedRecord> },
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

fn first_record(records: &[MalformedRecord]) -> String {
    records
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}

#[derive(Debug, Clone, Default)]
pub struct IngestionBatch {
    pub observations: Vec<Observation>,
    pub rejected: Vec<MalformedRecord>,
}

impl IngestionBatch {
    pub fn rejected_rows(&self) -> usize {
        let mut rows: Vec<usize> = self.rejected.iter().map(|record| record.row).collect();
        rows.dedup();
        rows.len()
    }
}

enum MeasureValues {
    Text(StringChunked),
    Numeric(Float64Chunked),
}

impl MeasureValues {
    fn from_column(column: &Column) -> Result<Self, PolarsError> {
        if column.dtype() == &DataType::String {
            Ok(MeasureValues::Text(column.str()?.clone()))
        } else {
            let numeric = column.cast(&DataType::Float64)?;
            Ok(MeasureValues::Numeric(numeric.f64()?.clone()))
        }
    }

    fn get(&self, idx: usize) -> Result<Option<f64>, (String, &'static str)> {
        match self {
            MeasureValues::Numeric(values) => match values.get(idx) {
                Some(value) if value.is_nan() => Ok(None),
                Some(value) if value.is_infinite() => {
                    Err((value.to_string(), "measure value is not finite"))
                }
                other => Ok(other),
            },
            MeasureValues::Text(values) => match values.get(idx) {
                Some(raw) => parse_measure(raw).map_err(|reason| (raw.to_string(), reason)),
                None => Ok(None),
            },
        }
    }
}

/// Converts a raw frame into observations, one per accepted input row, in input order.
pub fn normalize(
    frame: &DataFrame,
    schema: &IngestSchema,
    mode: IngestMode,
) -> Result<IngestionBatch, IngestError> {
    let available: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    if let Some(missing) = schema
        .required_columns()
        .find(|column| !available.iter().any(|name| name == column))
    {
        return Err(IngestError::MissingColumn {
            column: missing.to_string(),
            available,
        });
    }

    let dates = frame
        .column(&schema.date_column)?
        .cast(&DataType::String)?;
    let dates = dates.str()?;

    let categories = match schema.category_column.as_deref() {
        Some(name) => Some(frame.column(name)?.cast(&DataType::String)?),
        None => None,
    };
    let categories = categories.as_ref().map(|column| column.str()).transpose()?;

    let mut measures = Vec::with_capacity(schema.measure_columns.len());
    for name in &schema.measure_columns {
        measures.push((name.as_str(), MeasureValues::from_column(frame.column(name)?)?));
    }

    let mut batch = IngestionBatch::default();

    for idx in 0..frame.height() {
        let mut problems = Vec::new();

        let date = match dates.get(idx) {
            Some(raw) => match parse_date(raw) {
                Some(date) => Some(date),
                None => {
                    problems.push(malformed(idx, &schema.date_column, raw, DATE_REASON));
                    None
                }
            },
            None => {
                problems.push(malformed(idx, &schema.date_column, "", "date is missing"));
                None
            }
        };

        let mut values = BTreeMap::new();
        for (name, column) in &measures {
            match column.get(idx) {
                Ok(value) => {
                    values.insert(name.to_string(), value);
                }
                Err((raw, reason)) => problems.push(malformed(idx, name, &raw, reason)),
            }
        }

        match date {
            Some(date) if problems.is_empty() => {
                let category = categories
                    .and_then(|column| column.get(idx))
                    .map(|label| label.trim().to_string());
                batch.observations.push(Observation {
                    row: idx,
                    date,
                    category,
                    measures: values,
                });
            }
            _ => batch.rejected.extend(problems),
        }
    }

    debug!(
        rows = frame.height(),
        accepted = batch.observations.len(),
        rejected = batch.rejected_rows(),
        date_column = %schema.date_column,
        "normalized observations"
    );

    if !batch.rejected.is_empty() {
        match mode {
            IngestMode::Strict => {
                return Err(IngestError::Malformed {
                    records: batch.rejected,
                })
            }
            IngestMode::Lenient => {
                warn!(
                    rejected = batch.rejected_rows(),
                    first = %batch.rejected[0],
                    "skipping malformed rows"
                );
            }
        }
    }

    Ok(batch)
}

fn malformed(row: usize, column: &str, value: &str, reason: &str) -> MalformedRecord {
    MalformedRecord {
        row,
        column: column.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Year-only values resolve to January 1st of that year; full dates and date-times are
/// truncated to day precision.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(year) = parse_year(trimmed) {
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }

    // Date-time values ("2013-01-03 00:00:00", "2013-01-03T12:00:00Z").
    match trimmed.get(..10) {
        Some(day) if matches!(trimmed.as_bytes().get(10), Some(b' ') | Some(b'T')) => {
            NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
        }
        _ => None,
    }
}

fn parse_year(value: &str) -> Option<i32> {
    let digits = value
        .strip_suffix(".0")
        .unwrap_or(value);
    if digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

fn parse_measure(raw: &str) -> Result<Option<f64>, &'static str> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || MISSING_TOKENS
            .iter()
            .any(|token| trimmed.eq_ignore_ascii_case(token))
    {
        return Ok(None);
    }

    let cleaned = if trimmed.contains(',') {
        strip_thousands_separators(trimmed).ok_or("measure value is not numeric")?
    } else {
        trimmed.to_string()
    };
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        Ok(_) => Err("measure value is not finite"),
        Err(_) => Err("measure value is not numeric"),
    }
}

/// Removes commas only when they group the integer part in threes ("1,246.4").
/// Anything else with a comma, such as a decimal comma ("3,5"), is not a number.
fn strip_thousands_separators(value: &str) -> Option<String> {
    let unsigned = value
        .strip_prefix('-')
        .or_else(|| value.strip_prefix('+'))
        .unwrap_or(value);
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut groups = integer.split(',');
    let head = groups.next()?;
    let head_ok = (1..=3).contains(&head.len()) && head.bytes().all(|b| b.is_ascii_digit());
    let tail_ok = groups.all(|group| group.len() == 3 && group.bytes().all(|b| b.is_ascii_digit()));
    let fraction_ok = fraction.map_or(true, |digits| {
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    });

    (head_ok && tail_ok && fraction_ok).then(|| value.replace(',', ""))
}
