use crate::errors::{AttemptOutcome, ParserAttempt, ParserError};
use crate::formats::DelimitedParser;
use crate::model::RawTable;

pub trait TableParser {
    fn name(&self) -> &'static str;
    fn parse(&self, content: &str) -> Result<RawTable, ParserError>;
}

/// Parses delimited text, trying tab, semicolon and comma separated layouts in turn.
pub fn parse_table(content: &str) -> Result<RawTable, ParserError> {
    let tsv = DelimitedParser::tab();
    let semicolon = DelimitedParser::semicolon();
    let csv = DelimitedParser::comma();
    let parsers: [&dyn TableParser; 3] = [&tsv, &semicolon, &csv];
    parse_with_parsers(content, &parsers)
}

/// Returns the first successful parse. Parsers that decline the file are recorded; if
/// one of them matched the layout but found no rows, that is reported as `EmptyData`.
pub fn parse_with_parsers(
    content: &str,
    parsers: &[&dyn TableParser],
) -> Result<RawTable, ParserError> {
    let mut attempts = Vec::with_capacity(parsers.len());

    for parser in parsers {
        let outcome = match parser.parse(content) {
            Ok(table) => return Ok(table),
            Err(ParserError::FormatMismatch { reason, .. }) => AttemptOutcome::Mismatch(reason),
            Err(ParserError::EmptyData { .. }) => AttemptOutcome::NoRows,
            Err(err) => return Err(err),
        };
        attempts.push(ParserAttempt {
            parser: parser.name(),
            outcome,
        });
    }

    match attempts
        .iter()
        .find(|attempt| attempt.outcome == AttemptOutcome::NoRows)
    {
        Some(attempt) => Err(ParserError::EmptyData {
            parser: attempt.parser,
        }),
        None => Err(ParserError::NoMatchingParser { attempts }),
    }
}
