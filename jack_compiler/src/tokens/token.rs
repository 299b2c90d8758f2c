//! Token model: every token keeps its raw lexeme and its semantic value
use crate::grammar::keywords::Keyword;
use crate::utils::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operator and punctuation symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Dot,
    Comma,
    Semicolon,
    Plus,
    Minus,
    Multiply,
    Divide,
    And,
    Or,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Equals,
    Not,
}

impl Symbol {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LeftBrace => "{",
            Self::RightBrace => "}",
            Self::LeftParen => "(",
            Self::RightParen => ")",
            Self::LeftBracket => "[",
            Self::RightBracket => "]",
            Self::Dot => ".",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::And => "&",
            Self::Or => "|",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThanOrEqual => ">=",
            Self::Equals => "=",
            Self::Not => "~",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "{" => Self::LeftBrace,
            "}" => Self::RightBrace,
            "(" => Self::LeftParen,
            ")" => Self::RightParen,
            "[" => Self::LeftBracket,
            "]" => Self::RightBracket,
            "." => Self::Dot,
            "," => Self::Comma,
            ";" => Self::Semicolon,
            "+" => Self::Plus,
            "-" => Self::Minus,
            "*" => Self::Multiply,
            "/" => Self::Divide,
            "&" => Self::And,
            "|" => Self::Or,
            "<" => Self::LessThan,
            ">" => Self::GreaterThan,
            "<=" => Self::LessThanOrEqual,
            ">=" => Self::GreaterThanOrEqual,
            "=" => Self::Equals,
            "~" => Self::Not,
            _ => return None,
        })
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token kind carrying the semantic value where there is one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Keyword(Keyword),
    Symbol(Symbol),
    Identifier(String),
    /// Contents without the surrounding quotes
    StringLiteral(String),
    IntegerLiteral(u16),
}

impl TokenKind {
    /// Short description used in "expected X" messages
    pub fn describe(&self) -> String {
        match self {
            Self::Keyword(kw) => format!("keyword '{}'", kw),
            Self::Symbol(sym) => format!("symbol '{}'", sym),
            Self::Identifier(_) => "identifier".to_string(),
            Self::StringLiteral(_) => "string literal".to_string(),
            Self::IntegerLiteral(_) => "integer literal".to_string(),
        }
    }
}

/// A lexed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Lexeme exactly as written, quotes included for strings
    pub raw: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, raw: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            raw: raw.into(),
            span,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    pub fn is_symbol(&self, symbol: Symbol) -> bool {
        self.kind == TokenKind::Symbol(symbol)
    }

    pub fn as_keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(kw) => Some(kw),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<Symbol> {
        match self.kind {
            TokenKind::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
