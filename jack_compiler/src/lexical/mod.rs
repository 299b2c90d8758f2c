//! Lexical analysis
//!
//! Converts Jack source into tokens through an ordered rule table, see
//! [`analyzer`] for the rules and their ordering constraints.

pub mod analyzer;

use crate::config::compile_time::lexical::*;
use crate::config::runtime::LexicalPreferences;

pub use analyzer::{tokenize, Lexer, LexerError, LexicalMetrics};

/// Lexer over a complete source with the given preferences
pub fn create_lexer_with_preferences(source: &str, preferences: LexicalPreferences) -> Lexer {
    Lexer::from_source_with_preferences(source, preferences)
}

/// Compile-time lexical limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexicalLimits {
    pub max_string_size: usize,
    pub max_identifier_length: usize,
    pub max_integer_literal: u16,
    pub max_token_count: usize,
}

pub fn get_lexical_limits() -> LexicalLimits {
    LexicalLimits {
        max_string_size: MAX_STRING_SIZE,
        max_identifier_length: MAX_IDENTIFIER_LENGTH,
        max_integer_literal: MAX_INTEGER_LITERAL,
        max_token_count: MAX_TOKEN_COUNT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_match_language() {
        let limits = get_lexical_limits();
        assert_eq!(limits.max_integer_literal, 32767);
        assert!(limits.max_identifier_length >= 64);
    }

    #[test]
    fn test_lexer_with_preferences() {
        let preferences = LexicalPreferences {
            collect_detailed_metrics: false,
        };
        let mut lexer = create_lexer_with_preferences("let x = 1;", preferences);
        while lexer.next_token().unwrap().is_some() {}
        assert_eq!(lexer.metrics().total_tokens, 5);
        assert_eq!(lexer.metrics().keyword_tokens, 0);
    }
}
