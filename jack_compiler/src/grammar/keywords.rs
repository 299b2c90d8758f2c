//! Reserved words of the Jack language
//!
//! Keywords are matched case-sensitively and only on a whole-word boundary,
//! so `classy` or `do_it` lex as identifiers.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    // === PROGRAM STRUCTURE ===
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,

    // === TYPES ===
    Int,
    Char,
    Boolean,
    Void,

    // === CONSTANTS ===
    True,
    False,
    Null,
    This,

    // === STATEMENTS ===
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

impl Keyword {
    /// Every keyword, in lexer match order
    pub const ALL: [Keyword; 21] = [
        Self::Class,
        Self::Constructor,
        Self::Function,
        Self::Method,
        Self::Field,
        Self::Static,
        Self::Var,
        Self::Int,
        Self::Char,
        Self::Boolean,
        Self::Void,
        Self::True,
        Self::False,
        Self::Null,
        Self::This,
        Self::Let,
        Self::Do,
        Self::If,
        Self::Else,
        Self::While,
        Self::Return,
    ];

    /// Exact spelling as it appears in source
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Constructor => "constructor",
            Self::Function => "function",
            Self::Method => "method",
            Self::Field => "field",
            Self::Static => "static",
            Self::Var => "var",
            Self::Int => "int",
            Self::Char => "char",
            Self::Boolean => "boolean",
            Self::Void => "void",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
            Self::This => "this",
            Self::Let => "let",
            Self::Do => "do",
            Self::If => "if",
            Self::Else => "else",
            Self::While => "while",
            Self::Return => "return",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kw| kw.as_str() == s)
    }

    /// Keywords that may appear where a type is expected
    pub fn is_primitive_type(self) -> bool {
        matches!(self, Self::Int | Self::Char | Self::Boolean)
    }

    /// Keywords that start a statement
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            Self::Let | Self::Do | Self::If | Self::While | Self::Return
        )
    }

    /// Keyword constants usable as expressions
    pub fn is_keyword_constant(self) -> bool {
        matches!(self, Self::True | Self::False | Self::Null | Self::This)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when `word` is reserved
pub fn is_reserved_word(word: &str) -> bool {
    Keyword::from_str(word).is_some()
}
