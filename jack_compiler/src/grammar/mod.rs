//! Jack grammar: AST node definitions and reserved words

pub mod ast;
pub mod keywords;

pub use ast::nodes::*;
pub use keywords::{is_reserved_word, Keyword};
