//! Statement parser
//!
//! Dispatches on the leading keywords to the per-statement parsers.

mod error;
mod parser;

pub use error::ParseError;
pub use parser::{parse, parse_with_default_db, Parser};
