pub mod errors;
pub mod formats;
pub mod model;
mod registry;

pub use errors::{AttemptOutcome, ParserAttempt, ParserError};
pub use model::{stack_tables, RawTable};
pub use registry::{parse_table, parse_with_parsers, TableParser};

#[cfg(test)]
mod tests;
