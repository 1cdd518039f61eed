use std::fs;
use std::path::PathBuf;

use crate::errors::{AttemptOutcome, ParserError};
use crate::formats::DelimitedParser;
use crate::model::stack_tables;
use crate::parse_table;
use crate::registry::{parse_with_parsers, TableParser};

fn fixture(path: &str) -> String {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read_to_string(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

#[test]
fn parses_comma_separated_export() {
    let table = parse_table(&fixture("music_revenue.csv")).expect("csv parse failed");

    assert_eq!(table.parser, "CSV");
    assert_eq!(table.column_names(), vec!["Format", "Year", "Value (Actual)"]);
    assert_eq!(table.height(), 10);

    let values = table.df.column("Value (Actual)").unwrap().str().unwrap();
    assert_eq!(values.get(0), Some("1246.4"));
    assert_eq!(values.get(7), None, "empty cell should load as null");
}

#[test]
fn parses_tab_separated_export() {
    let table = parse_table(&fixture("mars_weather.tsv")).expect("tsv parse failed");

    assert_eq!(table.parser, "TSV");
    assert_eq!(table.height(), 6);
    let max_temp = table.df.column("max_temp").unwrap().str().unwrap();
    assert_eq!(max_temp.get(4), Some("NaN"));
}

#[test]
fn semicolon_file_is_not_claimed_by_comma_parser() {
    let table = parse_table(&fixture("semicolon.csv")).expect("semicolon parse failed");

    assert_eq!(table.parser, "SEMICOLON_DELIMITED");
    assert_eq!(table.column_names(), vec!["Year", "Format", "Value (Actual)"]);
    assert_eq!(table.height(), 3);
}

#[test]
fn ragged_row_reports_line() {
    let err = parse_table(&fixture("ragged.csv")).expect_err("ragged file should fail");
    match err {
        ParserError::RaggedRow {
            line_index,
            expected,
            found,
            ..
        } => {
            assert_eq!(line_index, 3);
            assert_eq!(expected, 3);
            assert_eq!(found, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn header_only_file_is_empty_data() {
    let err = parse_table("Year,Format,Value (Actual)\n").expect_err("no rows should fail");
    assert!(matches!(err, ParserError::EmptyData { parser: "CSV" }));
}

#[test]
fn duplicate_header_is_rejected() {
    let err = parse_table("Year,Year\n1,2\n").expect_err("duplicate header should fail");
    assert!(matches!(err, ParserError::InvalidHeader { .. }));
}

#[test]
fn mismatching_parsers_are_reported() {
    let tsv = DelimitedParser::tab();
    let parsers: [&dyn TableParser; 1] = [&tsv];
    let err = parse_with_parsers("Year,Format\n2000,A\n", &parsers).expect_err("tsv only");
    match err {
        ParserError::NoMatchingParser { attempts } => {
            assert_eq!(attempts.len(), 1);
            assert_eq!(attempts[0].parser, "TSV");
            assert!(matches!(attempts[0].outcome, AttemptOutcome::Mismatch(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn no_matching_parser_lists_every_attempt() {
    let tsv = DelimitedParser::tab();
    let semicolon = DelimitedParser::semicolon();
    let parsers: [&dyn TableParser; 2] = [&tsv, &semicolon];
    let err = parse_with_parsers("Year,Format\n2000,A\n", &parsers).expect_err("no comma parser");
    let message = err.to_string();
    assert!(message.contains("TSV skipped"), "{message}");
    assert!(message.contains("SEMICOLON_DELIMITED skipped"), "{message}");
}

#[test]
fn header_only_tsv_reports_the_matching_parser() {
    let err = parse_table("Year\tValue\n").expect_err("no rows should fail");
    assert!(matches!(err, ParserError::EmptyData { parser: "TSV" }));
}

#[test]
fn stacking_tables_keeps_order_and_sources() {
    let first = parse_table("Year,Value\n2000,1\n")
        .unwrap()
        .with_source("a.csv");
    let second = parse_table("Year,Value\n2001,2\n2002,3\n")
        .unwrap()
        .with_source("b.csv");

    let stacked = stack_tables(vec![first, second]).expect("stack failed");

    assert_eq!(stacked.height(), 3);
    assert_eq!(stacked.source, "a.csv+b.csv");
    let years = stacked.df.column("Year").unwrap().str().unwrap();
    assert_eq!(years.get(2), Some("2002"));
}

#[test]
fn stacking_rejects_different_headers() {
    let first = parse_table("Year,Value\n2000,1\n").unwrap();
    let second = parse_table("Year,Amount\n2001,2\n")
        .unwrap()
        .with_source("other.csv");

    let err = stack_tables(vec![first, second]).expect_err("headers differ");
    assert!(matches!(err, ParserError::HeaderMismatch { ref source_label, .. } if source_label == "other.csv"));
}
