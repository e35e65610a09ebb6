//! Lexers for statement values and for backend query text.
//!
//! [`value`] reads the literal forms allowed in INSERT/UPDATE/DELETE value
//! positions. [`Lexer`] tokenizes SELECT text so its shape can be inferred.

mod span;
mod token;
mod tokenizer;
pub mod value;

pub use span::Span;
pub use token::{Keyword, Token, TokenKind};
pub use tokenizer::Lexer;
pub use value::Literal;
