//! Syntax errors raised while building the class AST

use crate::lexical::LexerError;
use crate::logging::{codes, Code};
use crate::utils::{Position, Span};

pub type SyntaxResult<T> = Result<T, SyntaxError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntaxError {
    #[error("Unexpected token: expected {expected}, found '{found}' at {span}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    #[error("Unexpected end of input at {position}: expected {expected}")]
    UnexpectedEndOfInput { expected: String, position: Position },

    #[error("Unexpected input after class body: '{found}' at {span}")]
    TrailingInput { found: String, span: Span },

    #[error("Maximum nesting depth exceeded at {span}")]
    MaxRecursionDepth { span: Span },

    #[error(transparent)]
    Lexical(#[from] LexerError),
}

impl SyntaxError {
    pub fn unexpected_token(expected: &str, found: &str, span: Span) -> Self {
        Self::UnexpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
            span,
        }
    }

    pub fn unexpected_end_of_input(expected: &str, position: Position) -> Self {
        Self::UnexpectedEndOfInput {
            expected: expected.to_string(),
            position,
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::UnexpectedToken { .. } => codes::syntax::UNEXPECTED_TOKEN,
            Self::UnexpectedEndOfInput { .. } => codes::syntax::UNEXPECTED_END_OF_INPUT,
            Self::TrailingInput { .. } => codes::syntax::TRAILING_INPUT,
            Self::MaxRecursionDepth { .. } => codes::syntax::MAX_RECURSION_DEPTH,
            Self::Lexical(err) => err.error_code(),
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnexpectedToken { span, .. }
            | Self::TrailingInput { span, .. }
            | Self::MaxRecursionDepth { span } => Some(*span),
            Self::UnexpectedEndOfInput { position, .. } => Some(Span::point(*position)),
            Self::Lexical(_) => None,
        }
    }

    pub fn severity(&self) -> &'static str {
        codes::get_severity(self.error_code().as_str()).as_str()
    }

    pub fn recommended_action(&self) -> &'static str {
        codes::get_action(self.error_code().as_str())
    }
}
