//! Rule-table lexer with chunked input
//!
//! The lexer pulls one token at a time out of a growing buffer. Input either
//! comes from a chunk source the lexer reads on demand ([`Lexer::from_reader`],
//! [`Lexer::from_chunks`]) or is pushed by the caller through [`Lexer::feed`].
//! A lexeme that reaches the end of the buffer, or a comment or string whose
//! terminator has not arrived, is held back until more input arrives or
//! end-of-input is reached, so tokens split across chunk boundaries
//! (`cla` + `ss`, `<` + `=`, `/` + `* ... */`) are never emitted in pieces.

use crate::config::compile_time::lexical::*;
use crate::config::runtime::LexicalPreferences;
use crate::grammar::keywords::Keyword;
use crate::logging::codes;
use crate::tokens::{Symbol, Token, TokenKind};
use crate::utils::{Position, Span};
use crate::{log_debug, log_error};
use std::io::{self, BufRead};

/// Lexical analysis errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexerError {
    #[error("Unexpected token: '{text}' at line {line}, column {column}")]
    UnrecognizedInput { text: String, line: u32, column: u32 },

    #[error("Unterminated string literal starting at line {line}, column {column}")]
    UnterminatedString { line: u32, column: u32 },

    #[error("Unterminated block comment starting at line {line}, column {column}")]
    UnterminatedComment { line: u32, column: u32 },

    #[error("Integer literal '{text}' at line {line}, column {column} exceeds {MAX_INTEGER_LITERAL}")]
    IntegerOutOfRange { text: String, line: u32, column: u32 },

    #[error("Identifier too long: {length} characters (max {MAX_IDENTIFIER_LENGTH}) at line {line}")]
    IdentifierTooLong { length: usize, line: u32 },

    #[error("String literal too large: {size} bytes (max {MAX_STRING_SIZE}) at line {line}")]
    StringTooLarge { size: usize, line: u32 },

    #[error("Too many tokens: {count} (max {MAX_TOKEN_COUNT})")]
    TooManyTokens { count: usize },

    #[error("Source is not valid UTF-8 at line {line}")]
    InvalidEncoding { line: u32 },

    #[error("Failed to read source at line {line}: {message}")]
    ReadFailed { message: String, line: u32 },

    #[error("Input fed after end-of-input was signalled")]
    InputClosed,

    #[error("Lexer has neither a chunk source nor finished input to pull from")]
    NoInputSource,
}

impl LexerError {
    pub fn error_code(&self) -> crate::logging::Code {
        match self {
            LexerError::UnrecognizedInput { .. } => codes::lexical::UNRECOGNIZED_INPUT,
            LexerError::UnterminatedString { .. } => codes::lexical::UNTERMINATED_STRING,
            LexerError::UnterminatedComment { .. } => codes::lexical::UNTERMINATED_COMMENT,
            LexerError::IntegerOutOfRange { .. } => codes::lexical::INTEGER_OUT_OF_RANGE,
            LexerError::IdentifierTooLong { .. } => codes::lexical::IDENTIFIER_TOO_LONG,
            LexerError::StringTooLarge { .. } => codes::lexical::STRING_TOO_LARGE,
            LexerError::TooManyTokens { .. } => codes::lexical::TOO_MANY_TOKENS,
            LexerError::InvalidEncoding { .. } => codes::file_processing::INVALID_ENCODING,
            LexerError::ReadFailed { .. } => codes::file_processing::IO_ERROR,
            LexerError::InputClosed | LexerError::NoInputSource => codes::system::INTERNAL_ERROR,
        }
    }

    /// Line the error points at, when it has one
    pub fn line(&self) -> Option<u32> {
        match self {
            LexerError::UnrecognizedInput { line, .. }
            | LexerError::UnterminatedString { line, .. }
            | LexerError::UnterminatedComment { line, .. }
            | LexerError::IntegerOutOfRange { line, .. }
            | LexerError::IdentifierTooLong { line, .. }
            | LexerError::StringTooLarge { line, .. }
            | LexerError::InvalidEncoding { line }
            | LexerError::ReadFailed { line, .. } => Some(*line),
            LexerError::TooManyTokens { .. }
            | LexerError::InputClosed
            | LexerError::NoInputSource => None,
        }
    }

    pub fn column(&self) -> Option<u32> {
        match self {
            LexerError::UnrecognizedInput { column, .. }
            | LexerError::UnterminatedString { column, .. }
            | LexerError::UnterminatedComment { column, .. }
            | LexerError::IntegerOutOfRange { column, .. } => Some(*column),
            _ => None,
        }
    }
}

/// What a matched rule produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleAction {
    /// Consumed, no token
    Skip,
    Comment,
    Keyword,
    Symbol,
    Identifier,
    StringLiteral,
    IntegerLiteral,
}

/// Result of trying one rule anchored at the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Match {
    No,
    /// Length in bytes of the lexeme
    Len(usize),
    /// The rule owns this input but its terminator has not arrived yet
    Open,
}

impl Match {
    fn non_empty(len: usize) -> Self {
        if len > 0 {
            Match::Len(len)
        } else {
            Match::No
        }
    }
}

struct Rule {
    name: &'static str,
    matcher: fn(&str) -> Match,
    action: RuleAction,
}

/// Ordered rule table. The first rule that matches at the cursor wins.
///
/// Ordering constraints:
/// 1. `//` and `/* */` comments come before symbols, otherwise `/` would
///    lex as a division operator. An unclosed `/*` is [`Match::Open`], which
///    stops the search, so it never falls through to the symbol rule.
/// 2. Keywords come before identifiers. Both match the same word shape;
///    the keyword rule only accepts a whole word that is reserved.
/// 3. Within symbols, `<=` and `>=` are tried before `<` and `>`.
/// 4. Integer literals are digits only, so they never collide with
///    identifiers, which cannot start with a digit.
const RULES: &[Rule] = &[
    Rule { name: "whitespace", matcher: match_whitespace, action: RuleAction::Skip },
    Rule { name: "line_comment", matcher: match_line_comment, action: RuleAction::Comment },
    Rule { name: "block_comment", matcher: match_block_comment, action: RuleAction::Comment },
    Rule { name: "keyword", matcher: match_keyword, action: RuleAction::Keyword },
    Rule { name: "symbol", matcher: match_symbol, action: RuleAction::Symbol },
    Rule { name: "identifier", matcher: match_word, action: RuleAction::Identifier },
    Rule { name: "string", matcher: match_string, action: RuleAction::StringLiteral },
    Rule { name: "integer", matcher: match_digits, action: RuleAction::IntegerLiteral },
];

fn match_whitespace(input: &str) -> Match {
    Match::non_empty(
        input
            .find(|c: char| !c.is_ascii_whitespace())
            .unwrap_or(input.len()),
    )
}

fn match_line_comment(input: &str) -> Match {
    if !input.starts_with("//") {
        return Match::No;
    }
    Match::Len(input.find('\n').unwrap_or(input.len()))
}

fn match_block_comment(input: &str) -> Match {
    if !input.starts_with("/*") {
        return Match::No;
    }
    match input[2..].find("*/") {
        Some(end) => Match::Len(end + 4),
        None => Match::Open,
    }
}

fn word_len(input: &str) -> usize {
    let mut chars = input.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
        .map(|(i, _)| i)
        .unwrap_or(input.len())
}

fn match_word(input: &str) -> Match {
    Match::non_empty(word_len(input))
}

fn match_keyword(input: &str) -> Match {
    let len = word_len(input);
    if len > 0 && Keyword::from_str(&input[..len]).is_some() {
        Match::Len(len)
    } else {
        Match::No
    }
}

fn match_symbol(input: &str) -> Match {
    if input.starts_with("<=") || input.starts_with(">=") {
        return Match::Len(2);
    }
    match input.chars().next() {
        Some(first) if "{}()[].,;+-*/&|<>=~".contains(first) => Match::Len(1),
        _ => Match::No,
    }
}

/// A newline before the closing quote is no match; the caller reports it
fn match_string(input: &str) -> Match {
    let Some(body) = input.strip_prefix('"') else {
        return Match::No;
    };
    match body.find(|c: char| c == '"' || c == '\n') {
        Some(end) if body.as_bytes()[end] == b'"' => Match::Len(end + 2),
        Some(_) => Match::No,
        None => Match::Open,
    }
}

fn match_digits(input: &str) -> Match {
    Match::non_empty(
        input
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(input.len()),
    )
}

/// Token and size statistics for one lexer run
#[derive(Debug, Default, Clone)]
pub struct LexicalMetrics {
    pub total_tokens: usize,
    pub keyword_tokens: usize,
    pub symbol_tokens: usize,
    pub identifier_tokens: usize,
    pub string_literals: usize,
    pub integer_literals: usize,
    pub comment_count: usize,
    pub max_string_length: usize,
    pub max_identifier_length: usize,
}

impl LexicalMetrics {
    pub(crate) fn record_token(&mut self, kind: &TokenKind, preferences: &LexicalPreferences) {
        self.total_tokens += 1;
        if !preferences.collect_detailed_metrics {
            return;
        }

        match kind {
            TokenKind::Keyword(_) => self.keyword_tokens += 1,
            TokenKind::Symbol(_) => self.symbol_tokens += 1,
            TokenKind::Identifier(name) => {
                self.identifier_tokens += 1;
                self.max_identifier_length = self.max_identifier_length.max(name.len());
            }
            TokenKind::StringLiteral(value) => {
                self.string_literals += 1;
                self.max_string_length = self.max_string_length.max(value.len());
            }
            TokenKind::IntegerLiteral(_) => self.integer_literals += 1,
        }
    }
}

/// Outcome of one attempt to match at the cursor
enum Scan {
    Token(Token),
    Skipped,
    NeedInput,
    End,
}

type ChunkSource = Box<dyn Iterator<Item = io::Result<String>>>;

/// Chunks of `reader`, one line each, newline included
fn line_chunks<R: BufRead>(mut reader: R) -> impl Iterator<Item = io::Result<String>> {
    std::iter::from_fn(move || {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(Ok(line)),
            Err(err) => Some(Err(err)),
        }
    })
}

/// Pull-based lexer over a buffer that may grow between calls
pub struct Lexer {
    source: Option<ChunkSource>,
    buffer: String,
    cursor: usize,
    position: Position,
    finished: bool,
    metrics: LexicalMetrics,
    preferences: LexicalPreferences,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexer {
    /// Empty lexer expecting input through [`Lexer::feed`]
    pub fn new() -> Self {
        Self::with_preferences(LexicalPreferences::default())
    }

    pub fn with_preferences(preferences: LexicalPreferences) -> Self {
        Self {
            source: None,
            buffer: String::new(),
            cursor: 0,
            position: Position::start(),
            finished: false,
            metrics: LexicalMetrics::default(),
            preferences,
        }
    }

    /// Lexer over a complete source text; end-of-input is already signalled
    pub fn from_source(source: &str) -> Self {
        Self::from_source_with_preferences(source, LexicalPreferences::default())
    }

    pub fn from_source_with_preferences(source: &str, preferences: LexicalPreferences) -> Self {
        let mut lexer = Self::with_preferences(preferences);
        lexer.buffer.push_str(source);
        lexer.finished = true;
        lexer
    }

    /// Lexer that reads `chunks` one at a time, only when its buffer runs dry
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = io::Result<String>>,
        I::IntoIter: 'static,
    {
        Self::new().with_chunks(chunks)
    }

    /// Lexer that reads `reader` a line at a time
    pub fn from_reader<R: BufRead + 'static>(reader: R) -> Self {
        Self::from_chunks(line_chunks(reader))
    }

    pub fn with_chunks<I>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = io::Result<String>>,
        I::IntoIter: 'static,
    {
        self.source = Some(Box::new(chunks.into_iter()));
        self
    }

    /// Append a chunk and return every token that is now complete
    pub fn feed(&mut self, chunk: &str) -> Result<Vec<Token>, LexerError> {
        if self.finished {
            return Err(LexerError::InputClosed);
        }
        self.append(chunk);
        self.drain_tokens()
    }

    /// Signal end-of-input and return the tokens held back so far
    pub fn finish(&mut self) -> Result<Vec<Token>, LexerError> {
        self.source = None;
        self.finished = true;
        self.drain_tokens()
    }

    /// Next complete token, pulling from the chunk source as needed.
    ///
    /// `None` is end-of-input, except for a lexer driven by [`Lexer::feed`],
    /// where it also means the fed input has run dry.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexerError> {
        loop {
            match self.scan()? {
                Scan::Token(token) => return Ok(Some(token)),
                Scan::Skipped => {}
                Scan::NeedInput => {
                    if !self.pull()? {
                        return Ok(None);
                    }
                }
                Scan::End => return Ok(None),
            }
        }
    }

    /// Whether `None` from [`Lexer::next_token`] can only mean end-of-input
    pub fn can_pull(&self) -> bool {
        self.finished || self.source.is_some()
    }

    /// True once end-of-input is signalled and everything is consumed
    pub fn is_exhausted(&self) -> bool {
        self.finished && self.cursor >= self.buffer.len()
    }

    /// Lines consumed so far, counting a last line without a newline
    pub fn lines_read(&self) -> usize {
        let Position { line, column, .. } = self.position;
        (line as usize - 1) + usize::from(column > 1)
    }

    /// Position of the cursor in the whole input
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn metrics(&self) -> &LexicalMetrics {
        &self.metrics
    }

    fn append(&mut self, chunk: &str) {
        self.buffer.drain(..self.cursor);
        self.cursor = 0;
        self.buffer.push_str(chunk);
    }

    /// Read one chunk into the buffer; `false` when there is no source
    fn pull(&mut self) -> Result<bool, LexerError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(false);
        };
        match source.next() {
            Some(Ok(chunk)) => self.append(&chunk),
            Some(Err(err)) => {
                self.source = None;
                let line = self.position.line;
                let err = match err.kind() {
                    io::ErrorKind::InvalidData => LexerError::InvalidEncoding { line },
                    _ => LexerError::ReadFailed {
                        message: err.to_string(),
                        line,
                    },
                };
                return Err(self.report(err));
            }
            None => {
                self.source = None;
                self.finished = true;
            }
        }
        Ok(true)
    }

    fn drain_tokens(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn scan(&mut self) -> Result<Scan, LexerError> {
        let rest = &self.buffer[self.cursor..];
        if rest.is_empty() {
            return Ok(if self.finished { Scan::End } else { Scan::NeedInput });
        }

        let mut matched = None;
        for rule in RULES {
            match (rule.matcher)(rest) {
                Match::No => {}
                Match::Len(len) => {
                    matched = Some((rule, len));
                    break;
                }
                Match::Open if self.finished => {
                    return Err(self.report(unmatched_error(rest, self.position)));
                }
                Match::Open => return Ok(Scan::NeedInput),
            }
        }
        let Some((rule, len)) = matched else {
            return Err(self.report(unmatched_error(rest, self.position)));
        };

        // A match touching the end of the buffer could still grow
        if len == rest.len() && !self.finished {
            return Ok(Scan::NeedInput);
        }

        let lexeme = rest[..len].to_string();
        let start = self.position;
        let end = start.advance_str(&lexeme);

        let kind = match classify(rule.action, &lexeme, start) {
            Ok(kind) => kind,
            Err(err) => return Err(self.report(err)),
        };

        self.cursor += len;
        self.position = end;

        let Some(kind) = kind else {
            if rule.action == RuleAction::Comment {
                self.metrics.comment_count += 1;
            }
            return Ok(Scan::Skipped);
        };

        self.metrics.record_token(&kind, &self.preferences);
        if self.metrics.total_tokens > MAX_TOKEN_COUNT {
            return Err(self.report(LexerError::TooManyTokens {
                count: self.metrics.total_tokens,
            }));
        }

        log_debug!("Token matched",
            "rule" => rule.name,
            "lexeme" => lexeme.as_str(),
            "at" => start
        );

        Ok(Scan::Token(Token::new(kind, lexeme, Span::new(start, end))))
    }

    fn report(&self, err: LexerError) -> LexerError {
        log_error!(err.error_code(), &err.to_string(),
            span = Span::point(self.position),
            "offset" => self.position.offset
        );
        err
    }
}

/// Apply a rule's value transform to its lexeme
fn classify(
    action: RuleAction,
    lexeme: &str,
    start: Position,
) -> Result<Option<TokenKind>, LexerError> {
    let kind = match action {
        RuleAction::Skip | RuleAction::Comment => return Ok(None),
        RuleAction::Keyword => Keyword::from_str(lexeme).map(TokenKind::Keyword),
        RuleAction::Symbol => Symbol::from_str(lexeme).map(TokenKind::Symbol),
        RuleAction::Identifier => {
            if lexeme.len() > MAX_IDENTIFIER_LENGTH {
                return Err(LexerError::IdentifierTooLong {
                    length: lexeme.len(),
                    line: start.line,
                });
            }
            Some(TokenKind::Identifier(lexeme.to_string()))
        }
        RuleAction::StringLiteral => {
            let value = &lexeme[1..lexeme.len() - 1];
            if value.len() > MAX_STRING_SIZE {
                return Err(LexerError::StringTooLarge {
                    size: value.len(),
                    line: start.line,
                });
            }
            Some(TokenKind::StringLiteral(value.to_string()))
        }
        RuleAction::IntegerLiteral => {
            let value = lexeme
                .parse::<u64>()
                .ok()
                .filter(|v| *v <= u64::from(MAX_INTEGER_LITERAL))
                .ok_or_else(|| LexerError::IntegerOutOfRange {
                    text: lexeme.to_string(),
                    line: start.line,
                    column: start.column,
                })?;
            Some(TokenKind::IntegerLiteral(value as u16))
        }
    };

    // Matchers and transforms agree on the lexeme shape
    Ok(Some(kind.ok_or_else(|| LexerError::UnrecognizedInput {
        text: lexeme.to_string(),
        line: start.line,
        column: start.column,
    })?))
}

fn unmatched_error(rest: &str, at: Position) -> LexerError {
    if rest.starts_with('"') {
        return LexerError::UnterminatedString {
            line: at.line,
            column: at.column,
        };
    }
    if rest.starts_with("/*") {
        return LexerError::UnterminatedComment {
            line: at.line,
            column: at.column,
        };
    }

    let text: String = rest
        .chars()
        .take_while(|c| !c.is_whitespace())
        .take(16)
        .collect();
    LexerError::UnrecognizedInput {
        text,
        line: at.line,
        column: at.column,
    }
}

/// Lex a complete source text
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexerError> {
    let mut lexer = Lexer::from_source(source);
    lexer.drain_tokens()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keyword_before_identifier() {
        assert_eq!(
            kinds("class classy do_it"),
            vec![
                TokenKind::Keyword(Keyword::Class),
                TokenKind::Identifier("classy".into()),
                TokenKind::Identifier("do_it".into()),
            ]
        );
    }

    #[test]
    fn test_two_char_relational_symbols() {
        assert_eq!(
            kinds("a<=b>c"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Symbol(Symbol::LessThanOrEqual),
                TokenKind::Identifier("b".into()),
                TokenKind::Symbol(Symbol::GreaterThan),
                TokenKind::Identifier("c".into()),
            ]
        );
    }

    #[test]
    fn test_comments_and_whitespace_are_dropped() {
        let source = "// line\n/** doc\n comment */ let x = 1; /* tail */";
        let tokens = tokenize(source).unwrap();
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0].span.start.line, 3);
        assert_eq!(tokens[0].span.start.column, 13);
    }

    #[test]
    fn test_literal_values_and_raw_text() {
        let tokens = tokenize("\"hi there\" 007").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral("hi there".into()));
        assert_eq!(tokens[0].raw, "\"hi there\"");
        assert_eq!(tokens[1].kind, TokenKind::IntegerLiteral(7));
        assert_eq!(tokens[1].raw, "007");
    }

    #[test]
    fn test_integer_limit() {
        assert_eq!(kinds("32767"), vec![TokenKind::IntegerLiteral(32767)]);
        assert_matches!(
            tokenize("32768"),
            Err(LexerError::IntegerOutOfRange { line: 1, column: 1, .. })
        );
    }

    #[test]
    fn test_unrecognized_input() {
        let err = tokenize("let x = #y;").unwrap_err();
        assert_matches!(&err, LexerError::UnrecognizedInput { text, column: 9, .. } if text == "#y;");
        assert_eq!(err.error_code(), codes::lexical::UNRECOGNIZED_INPUT);
    }

    #[test]
    fn test_unterminated_forms() {
        assert_matches!(
            tokenize("let s = \"open\nx"),
            Err(LexerError::UnterminatedString { line: 1, column: 9 })
        );
        assert_matches!(
            tokenize("/* never closed"),
            Err(LexerError::UnterminatedComment { .. })
        );
    }

    #[test]
    fn test_token_split_across_chunks() {
        let mut lexer = Lexer::new();
        let first = lexer.feed("cla").unwrap();
        assert!(first.is_empty());

        let second = lexer.feed("ss Main { x <").unwrap();
        let second: Vec<_> = second.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            second,
            vec![
                TokenKind::Keyword(Keyword::Class),
                TokenKind::Identifier("Main".into()),
                TokenKind::Symbol(Symbol::LeftBrace),
                TokenKind::Identifier("x".into()),
            ]
        );

        let third = lexer.feed("= \"a b").unwrap();
        assert_eq!(third[0].kind, TokenKind::Symbol(Symbol::LessThanOrEqual));
        assert_eq!(third.len(), 1);

        let rest = lexer.feed("\" }").unwrap();
        assert_eq!(rest[0].kind, TokenKind::StringLiteral("a b".into()));

        let tail = lexer.finish().unwrap();
        assert_eq!(tail.len(), 1);
        assert!(tail[0].is_symbol(Symbol::RightBrace));
        assert!(lexer.is_exhausted());
    }

    #[test]
    fn test_error_surfaces_only_at_end_of_input() {
        let mut lexer = Lexer::new();
        assert!(lexer.feed("let s = \"abc").unwrap().len() == 3);
        assert_matches!(
            lexer.finish(),
            Err(LexerError::UnterminatedString { .. })
        );
    }

    /// Everything `pieces` lexes to when fed one piece at a time
    fn fed(pieces: &[&str]) -> Result<Vec<TokenKind>, LexerError> {
        let mut lexer = Lexer::new();
        let mut tokens = Vec::new();
        for piece in pieces {
            tokens.extend(lexer.feed(piece)?);
        }
        tokens.extend(lexer.finish()?);
        Ok(tokens.into_iter().map(|t| t.kind).collect())
    }

    #[test]
    fn test_comments_split_across_chunks() {
        let cases: &[&[&str]] = &[
            &["class A { /* note", " here */ }"],
            &["class A { /", "* note */ }"],
            &["class A { /* note *", "/ }"],
            &["class A { // no", "te", "\n}"],
            &["class A { /", "/ note\n}"],
            &["class A { /** doc ", "still doc ", "*/ }"],
        ];
        let expected = vec![
            TokenKind::Keyword(Keyword::Class),
            TokenKind::Identifier("A".into()),
            TokenKind::Symbol(Symbol::LeftBrace),
            TokenKind::Symbol(Symbol::RightBrace),
        ];
        for pieces in cases {
            assert_eq!(fed(pieces).unwrap(), expected, "pieces {:?}", pieces);
            assert_eq!(kinds(&pieces.concat()), expected);
        }
    }

    #[test]
    fn test_split_slash_stays_division() {
        assert_eq!(
            fed(&["a /", " b"]).unwrap(),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::Symbol(Symbol::Divide),
                TokenKind::Identifier("b".into()),
            ]
        );
    }

    #[test]
    fn test_unclosed_block_comment() {
        assert_matches!(
            tokenize("class A { /* never closed }"),
            Err(LexerError::UnterminatedComment { line: 1, column: 11 })
        );

        let mut lexer = Lexer::new();
        assert_eq!(lexer.feed("x /* still").unwrap().len(), 1);
        assert!(lexer.feed(" open").unwrap().is_empty());
        assert_matches!(
            lexer.finish(),
            Err(LexerError::UnterminatedComment { line: 1, column: 3 })
        );
    }

    #[test]
    fn test_chunk_source_is_pulled_on_demand() {
        use std::cell::Cell;
        use std::rc::Rc;

        let pulled = Rc::new(Cell::new(0));
        let counter = Rc::clone(&pulled);
        let chunks = ["let x", " = 1;", " /* c", " */\n"].into_iter().map(move |chunk| {
            counter.set(counter.get() + 1);
            Ok(chunk.to_string())
        });
        let mut lexer = Lexer::from_chunks(chunks);
        assert!(lexer.can_pull());

        assert!(lexer.next_token().unwrap().unwrap().is_keyword(Keyword::Let));
        assert_eq!(pulled.get(), 1);
        assert_eq!(lexer.next_token().unwrap().unwrap().as_identifier(), Some("x"));
        assert_eq!(pulled.get(), 2);

        let rest: Vec<_> = std::iter::from_fn(|| lexer.next_token().unwrap()).collect();
        assert_eq!(rest.len(), 3);
        assert_eq!(pulled.get(), 4);
        assert!(lexer.is_exhausted());
        assert_eq!(lexer.metrics().comment_count, 1);
        assert_eq!(lexer.lines_read(), 1);
    }

    #[test]
    fn test_reader_source() {
        let source = "class Main {\n  /* a\n  b */ field int x;\n}";
        let mut lexer = Lexer::from_reader(std::io::Cursor::new(source.to_string()));
        let tokens: Vec<_> = std::iter::from_fn(|| lexer.next_token().unwrap()).collect();
        assert_eq!(tokens, tokenize(source).unwrap());
        assert_eq!(lexer.lines_read(), 4);

        let mut bad = Lexer::from_reader(std::io::Cursor::new(vec![b'x', b' ', 0xff, b'\n']));
        assert_matches!(bad.next_token(), Err(LexerError::InvalidEncoding { line: 1 }));
    }

    #[test]
    fn test_feed_after_finish() {
        let mut lexer = Lexer::from_source("x");
        assert_matches!(lexer.feed("y"), Err(LexerError::InputClosed));
        assert!(lexer.can_pull());
        assert!(!Lexer::new().can_pull());
    }

    #[test]
    fn test_metrics() {
        let mut lexer = Lexer::from_source("class A { field int x; } // end");
        while lexer.next_token().unwrap().is_some() {}
        let metrics = lexer.metrics();
        assert_eq!(metrics.total_tokens, 8);
        assert_eq!(metrics.keyword_tokens, 3);
        assert_eq!(metrics.comment_count, 1);
    }
}
