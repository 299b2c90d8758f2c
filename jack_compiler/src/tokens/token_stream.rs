//! Single-token lookahead over a lazily pulled lexer
//!
//! The stream never lexes ahead of the parser: one token is held as the
//! lookahead, and the next one is pulled from the lexer only when the
//! current one is consumed, and the lexer in turn reads its source only when
//! it has no complete token buffered.

use crate::lexical::{Lexer, LexerError};
use crate::tokens::token::*;
use crate::utils::{Position, Span};
use std::io::BufRead;

pub struct TokenStream {
    lexer: Lexer,
    lookahead: Option<Token>,
    consumed: usize,
    last_span: Span,
}

impl TokenStream {
    /// Wrap a lexer and pull the first lookahead token. The lexer must own
    /// its input, since nothing feeds it once the parser is running.
    pub fn new(mut lexer: Lexer) -> Result<Self, LexerError> {
        if !lexer.can_pull() {
            return Err(LexerError::NoInputSource);
        }
        let lookahead = lexer.next_token()?;
        Ok(Self {
            lexer,
            lookahead,
            consumed: 0,
            last_span: Span::default(),
        })
    }

    pub fn from_source(source: &str) -> Result<Self, LexerError> {
        Self::new(Lexer::from_source(source))
    }

    pub fn from_reader<R: BufRead + 'static>(reader: R) -> Result<Self, LexerError> {
        Self::new(Lexer::from_reader(reader))
    }

    /// Current lookahead token, `None` at end of input
    pub fn peek(&self) -> Option<&Token> {
        self.lookahead.as_ref()
    }

    /// Consume the lookahead and pull the next token
    pub fn advance(&mut self) -> Result<Option<Token>, LexerError> {
        let next = self.lexer.next_token()?;
        let current = std::mem::replace(&mut self.lookahead, next);
        if let Some(token) = &current {
            self.consumed += 1;
            self.last_span = token.span;
        }
        Ok(current)
    }

    pub fn check_keyword(&self, keyword: crate::grammar::keywords::Keyword) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    pub fn check_symbol(&self, symbol: Symbol) -> bool {
        self.peek().is_some_and(|t| t.is_symbol(symbol))
    }

    pub fn is_at_end(&self) -> bool {
        self.lookahead.is_none()
    }

    /// Span of the lookahead, or a point just past the last consumed token
    pub fn current_span(&self) -> Span {
        match &self.lookahead {
            Some(token) => token.span,
            None => Span::point(self.end_position()),
        }
    }

    pub fn last_span(&self) -> Span {
        self.last_span
    }

    /// Number of tokens consumed so far
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn end_position(&self) -> Position {
        self.lexer.position()
    }

    pub fn lexer(&self) -> &Lexer {
        &self.lexer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::keywords::Keyword;

    #[test]
    fn test_lookahead_and_advance() {
        let mut stream = TokenStream::from_source("let x;").unwrap();
        assert!(stream.check_keyword(Keyword::Let));

        let taken = stream.advance().unwrap().unwrap();
        assert!(taken.is_keyword(Keyword::Let));
        assert_eq!(stream.peek().and_then(Token::as_identifier), Some("x"));

        stream.advance().unwrap();
        assert!(stream.check_symbol(Symbol::Semicolon));
        stream.advance().unwrap();

        assert!(stream.is_at_end());
        assert_eq!(stream.consumed(), 3);
        assert!(stream.advance().unwrap().is_none());
        assert_eq!(stream.consumed(), 3);
    }

    #[test]
    fn test_lexer_errors_surface_lazily() {
        let mut stream = TokenStream::from_source("x $").unwrap();
        assert_eq!(stream.peek().and_then(Token::as_identifier), Some("x"));
        assert!(stream.advance().is_err());
    }

    #[test]
    fn test_fed_lexer_is_rejected() {
        assert!(matches!(
            TokenStream::new(Lexer::new()),
            Err(LexerError::NoInputSource)
        ));
    }

    #[test]
    fn test_chunked_source_matches_whole_source() {
        let source = "class A { /* two\nlines */ field int x; method int get() { return x <= 3; } }";
        let pieces: Vec<std::io::Result<String>> = source
            .as_bytes()
            .chunks(3)
            .map(|piece| Ok(String::from_utf8_lossy(piece).into_owned()))
            .collect();

        let drain = |mut stream: TokenStream| {
            let mut tokens = Vec::new();
            while let Some(token) = stream.advance().unwrap() {
                tokens.push(token);
            }
            tokens
        };
        let chunked = drain(TokenStream::new(Lexer::from_chunks(pieces)).unwrap());
        let whole = drain(TokenStream::from_source(source).unwrap());
        assert_eq!(chunked, whole);
        assert_eq!(whole.len(), 20);
    }

    #[test]
    fn test_span_past_end() {
        let mut stream = TokenStream::from_source("a\n").unwrap();
        stream.advance().unwrap();
        let span = stream.current_span();
        assert_eq!(span.start.line, 2);
        assert_eq!(stream.last_span().start.column, 1);
    }
}
