use polars::prelude::*;

use crate::errors::ParserError;

/// A loaded spreadsheet export: every column holds the raw cell text, with empty
/// cells stored as nulls. Typing is left to the ingestion stage of the pipeline.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub source: String,
    pub parser: &'static str,
    pub df: DataFrame,
}

impl RawTable {
    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Concatenates tables that share the same header, in the order given.
pub fn stack_tables(tables: Vec<RawTable>) -> Result<RawTable, ParserError> {
    let mut iter = tables.into_iter();
    let Some(mut combined) = iter.next() else {
        return Ok(RawTable {
            source: String::new(),
            parser: "empty",
            df: DataFrame::default(),
        });
    };

    let expected = combined.column_names();
    let mut sources = vec![combined.source.clone()];

    for table in iter {
        let found = table.column_names();
        if found != expected {
            return Err(ParserError::HeaderMismatch {
                source_label: table.source,
                expected,
                found,
            });
        }
        combined.df.vstack_mut(&table.df)?;
        sources.push(table.source);
    }

    combined.df.align_chunks();
    combined.source = sources.join("+");
    Ok(combined)
}
