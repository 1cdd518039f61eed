use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use polars::prelude::{AnyValue, DataFrame};
use ridgeflow_core::pipelines::{ChartRows, PipelineOutput};
use serde::Serialize;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Csv,
    Json,
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

pub fn write_rows(output: &PipelineOutput, format: OutputFormat, writer: &mut dyn Write) -> Result<()> {
    match format {
        OutputFormat::Table => {
            let frame = output.dataframe()?;
            writeln!(writer, "{}", frame_table(&frame)?)?;
        }
        OutputFormat::Csv => match &output.rows {
            ChartRows::Stacked(rows) => write_csv(rows, writer)?,
            ChartRows::Density(rows) => write_csv(rows, writer)?,
            ChartRows::Means(rows) => write_csv(rows, writer)?,
        },
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, &output.rows)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

fn write_csv<T: Serialize>(rows: &[T], writer: &mut dyn Write) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn frame_table(frame: &DataFrame) -> Result<Table> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(
        frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>(),
    );

    let columns = frame.get_columns();
    for index in 0..frame.height() {
        let mut cells = Vec::with_capacity(columns.len());
        for column in columns {
            cells.push(cell_text(column.get(index)?));
        }
        table.add_row(cells);
    }
    Ok(table)
}

fn cell_text(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(text) => text.to_string(),
        AnyValue::Float64(number) => number.to_string(),
        other => other.to_string(),
    }
}
