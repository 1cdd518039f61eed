use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One ingested source row. Measures that were blank or `NaN` in the source are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub row: usize,
    pub date: NaiveDate,
    pub category: Option<String>,
    pub measures: BTreeMap<String, Option<f64>>,
}

impl Observation {
    pub fn new(row: usize, date: NaiveDate) -> Self {
        Self {
            row,
            date,
            category: None,
            measures: BTreeMap::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_measure(mut self, name: impl Into<String>, value: Option<f64>) -> Self {
        self.measures.insert(name.into(), value);
        self
    }

    /// Present value of a measure; `None` when the column is absent or the cell was missing.
    pub fn measure(&self, name: &str) -> Option<f64> {
        self.measures.get(name).copied().flatten()
    }

    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }
}

/// Discretized time key. Ordering is chronological within a bucketing rule, so month
/// buckets sort Jan..Dec regardless of how their labels would sort as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeBucket {
    Year(i32),
    /// Month number 1..=12 with the year folded away.
    MonthOfYear(u32),
}

impl TimeBucket {
    pub fn label(&self) -> String {
        self.to_string()
    }

    /// Numeric position usable as a renderer sort field.
    pub fn ordinal(&self) -> i64 {
        match self {
            TimeBucket::Year(year) => i64::from(*year),
            TimeBucket::MonthOfYear(month) => i64::from(*month),
        }
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBucket::Year(year) => write!(f, "{year}"),
            TimeBucket::MonthOfYear(month) => {
                let label = (*month as usize)
                    .checked_sub(1)
                    .and_then(|idx| MONTH_LABELS.get(idx))
                    .copied()
                    .unwrap_or("???");
                f.write_str(label)
            }
        }
    }
}

impl Serialize for TimeBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Rule mapping a date onto its [`TimeBucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucketing {
    Year,
    MonthOfYear,
}

impl Bucketing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucketing::Year => "year",
            Bucketing::MonthOfYear => "month_of_year",
        }
    }

    pub fn bucket(&self, date: NaiveDate) -> TimeBucket {
        match self {
            Bucketing::Year => TimeBucket::Year(date.year()),
            Bucketing::MonthOfYear => TimeBucket::MonthOfYear(date.month()),
        }
    }

    /// The fixed, gap-free period sequence a faceted chart expects: all twelve months, or
    /// every year between the first and last observed one.
    pub fn canonical_periods<I>(&self, observed: I) -> Vec<TimeBucket>
    where
        I: IntoIterator<Item = TimeBucket>,
    {
        match self {
            Bucketing::MonthOfYear => (1..=12).map(TimeBucket::MonthOfYear).collect(),
            Bucketing::Year => {
                let years: Vec<i32> = observed
                    .into_iter()
                    .filter_map(|bucket| match bucket {
                        TimeBucket::Year(year) => Some(year),
                        TimeBucket::MonthOfYear(_) => None,
                    })
                    .collect();
                match (years.iter().min(), years.iter().max()) {
                    (Some(&first), Some(&last)) => (first..=last).map(TimeBucket::Year).collect(),
                    _ => Vec::new(),
                }
            }
        }
    }
}

impl fmt::Display for Bucketing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
