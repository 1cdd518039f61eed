use std::collections::HashSet;

use csv::{ReaderBuilder, StringRecord, Trim};
use polars::prelude::*;

use crate::errors::ParserError;
use crate::model::RawTable;
use crate::registry::TableParser;

const UTF8_BOM: char = '\u{feff}';

/// Header-first delimited text (CSV, TSV, semicolon exports from spreadsheet tools).
#[derive(Debug, Clone, Copy)]
pub struct DelimitedParser {
    name: &'static str,
    delimiter: u8,
    /// The last parser in the chain accepts single-column files without seeing its delimiter.
    accepts_single_column: bool,
}

impl DelimitedParser {
    pub fn comma() -> Self {
        Self {
            name: "CSV",
            delimiter: b',',
            accepts_single_column: true,
        }
    }

    pub fn semicolon() -> Self {
        Self {
            name: "SEMICOLON_DELIMITED",
            delimiter: b';',
            accepts_single_column: false,
        }
    }

    pub fn tab() -> Self {
        Self {
            name: "TSV",
            delimiter: b'\t',
            accepts_single_column: false,
        }
    }

    fn check_header_line(&self, content: &str) -> Result<(), ParserError> {
        let header = content
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or(ParserError::EmptyData { parser: self.name })?;

        if header.as_bytes().contains(&self.delimiter) || self.accepts_single_column {
            Ok(())
        } else {
            Err(ParserError::FormatMismatch {
                parser: self.name,
                reason: format!(
                    "header line does not contain delimiter '{}'",
                    (self.delimiter as char).escape_default()
                ),
            })
        }
    }

    fn read_header(&self, record: &StringRecord) -> Result<Vec<String>, ParserError> {
        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(record.len());
        for (idx, raw) in record.iter().enumerate() {
            let name = raw.trim_start_matches(UTF8_BOM).trim();
            if name.is_empty() {
                return Err(ParserError::InvalidHeader {
                    parser: self.name,
                    message: format!("column {idx} has an empty name"),
                });
            }
            if !seen.insert(name.to_string()) {
                return Err(ParserError::InvalidHeader {
                    parser: self.name,
                    message: format!("duplicate column name '{name}'"),
                });
            }
            names.push(name.to_string());
        }
        Ok(names)
    }
}

impl TableParser for DelimitedParser {
    fn name(&self) -> &'static str {
        self.name
    }

    fn parse(&self, content: &str) -> Result<RawTable, ParserError> {
        self.check_header_line(content)?;

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(content.as_bytes());

        let header = reader
            .headers()
            .map_err(|source| ParserError::Csv {
                parser: self.name,
                source,
            })?
            .clone();
        let names = self.read_header(&header)?;

        let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];

        for result in reader.records() {
            let record = result.map_err(|source| ParserError::Csv {
                parser: self.name,
                source,
            })?;

            // Spreadsheet exports often end with blank separator-only lines.
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }

            if record.len() != names.len() {
                let line_index = record
                    .position()
                    .map(|pos| pos.line() as usize)
                    .unwrap_or_default();
                return Err(ParserError::RaggedRow {
                    parser: self.name,
                    line_index,
                    expected: names.len(),
                    found: record.len(),
                });
            }

            for (column, field) in columns.iter_mut().zip(record.iter()) {
                column.push((!field.is_empty()).then(|| field.to_string()));
            }
        }

        if columns.first().map_or(true, |column| column.is_empty()) {
            return Err(ParserError::EmptyData { parser: self.name });
        }

        let series: Vec<Column> = names
            .iter()
            .zip(columns)
            .map(|(name, values)| Series::new(name.as_str().into(), values).into())
            .collect();
        let df = DataFrame::new(series)?;

        Ok(RawTable {
            source: String::new(),
            parser: self.name,
            df,
        })
    }
}
