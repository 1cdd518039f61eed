use std::fmt;

use thiserror::Error;

/// How a parser in the chain declined a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The header does not have this parser's layout.
    Mismatch(String),
    /// The layout matched but no data rows followed the header.
    NoRows,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserAttempt {
    pub parser: &'static str,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for ParserAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            AttemptOutcome::Mismatch(reason) => write!(f, "{} skipped ({reason})", self.parser),
            AttemptOutcome::NoRows => write!(f, "{} found no data rows", self.parser),
        }
    }
}

fn list_attempts(attempts: &[ParserAttempt]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{parser} format mismatch: {reason}")]
    FormatMismatch {
        parser: &'static str,
        reason: String,
    },

    #[error("{parser} header invalid: {message}")]
    InvalidHeader {
        parser: &'static str,
        message: String,
    },

    #[error("{parser} CSV error: {source}")]
    Csv {
        parser: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{parser} data row {line_index} has {found} fields, expected {expected}")]
    RaggedRow {
        parser: &'static str,
        line_index: usize,
        expected: usize,
        found: usize,
    },

    #[error("{parser} file did not contain any data rows")]
    EmptyData { parser: &'static str },

    #[error("cannot stack table '{source_label}': columns {found:?} differ from {expected:?}")]
    HeaderMismatch {
        source_label: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("failed to build table frame: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("no parser recognized this file: {}", list_attempts(.attempts))]
    NoMatchingParser { attempts: Vec<ParserAttempt> },
}
