mod delimited;

pub use delimited::DelimitedParser;
