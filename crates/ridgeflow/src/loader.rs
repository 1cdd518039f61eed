use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use ridgeflow_parser::{parse_table, stack_tables, RawTable};
use tracing::debug;

/// Expands every pattern (in argument order, matches sorted within a pattern) and stacks
/// the parsed files into one table.
pub fn load_inputs(patterns: &[String]) -> Result<RawTable> {
    let paths = expand_patterns(patterns)?;

    let mut tables = Vec::with_capacity(paths.len());
    for path in &paths {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let table = parse_table(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?
            .with_source(path.display().to_string());
        debug!(path = %path.display(), rows = table.height(), parser = table.parser, "parsed input file");
        tables.push(table);
    }

    stack_tables(tables).context("input files do not share a header")
}

fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let mut matched: Vec<PathBuf> = glob::glob(pattern)
            .with_context(|| format!("invalid input pattern '{pattern}'"))?
            .collect::<Result<_, _>>()
            .with_context(|| format!("could not read a path matched by '{pattern}'"))?;
        matched.retain(|path| path.is_file());
        if matched.is_empty() {
            bail!("no input files matched '{pattern}'");
        }
        matched.sort();
        paths.extend(matched);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_pattern(name: &str) -> String {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../ridgeflow-parser/tests/data")
            .join(name)
            .display()
            .to_string()
    }

    #[test]
    fn loads_a_single_file() {
        let table = load_inputs(&[data_pattern("music_revenue.csv")]).expect("load");
        assert_eq!(table.height(), 10);
        assert!(table.source.ends_with("music_revenue.csv"));
    }

    #[test]
    fn stacks_repeated_inputs() {
        let path = data_pattern("mars_weather.tsv");
        let table = load_inputs(&[path.clone(), path]).expect("load");
        assert_eq!(table.height(), 12);
    }

    #[test]
    fn glob_without_matches_is_an_error() {
        let err = load_inputs(&[data_pattern("*.xlsx")]).expect_err("no xlsx fixtures");
        assert!(err.to_string().contains("no input files matched"));
    }

    #[test]
    fn mismatched_headers_are_an_error() {
        let err = load_inputs(&[data_pattern("music_revenue.csv"), data_pattern("mars_weather.tsv")])
            .expect_err("different headers");
        assert!(err.to_string().contains("do not share a header"));
    }
}
