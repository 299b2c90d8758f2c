//! Token model and the lookahead stream the parser consumes
//!
//! Tokens are produced one at a time by [`crate::lexical::Lexer`] and handed to
//! the parser through [`TokenStream`], which holds exactly one token of
//! lookahead. Each [`Token`] keeps its raw lexeme next to its semantic value
//! (`"007"` lexes as `IntegerLiteral(7)`, `"\"hi\""` as `StringLiteral("hi")`)
//! plus the span of its first and last character.

pub mod token;
pub mod token_stream;

pub use token::{Symbol, Token, TokenKind};
pub use token_stream::TokenStream;

pub use crate::grammar::keywords::Keyword;
pub use crate::utils::{Position, SourceMap, Span};
