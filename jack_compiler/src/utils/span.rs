//! Source locations for tokens, AST nodes and diagnostics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Line and column are 1-based; `offset` counts bytes from the start of the file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(offset: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    pub fn start() -> Self {
        Self::new(0, 1, 1)
    }

    /// Position after a whole lexeme, counting newlines inside it
    pub fn advance_str(self, lexeme: &str) -> Self {
        let mut next = self;
        for ch in lexeme.chars() {
            next.offset += ch.len_utf8();
            if ch == '\n' {
                next.line += 1;
                next.column = 1;
            } else {
                next.column += 1;
            }
        }
        next
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open `[start, end)` range of source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(start.offset <= end.offset, "span ends before it starts");
        Self { start, end }
    }

    /// Zero-width span, used for end of input
    pub fn point(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// Smallest span covering both
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "{}:{}-{}",
                self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A `.jack` file indexed by line, for rendering compile errors with context
#[derive(Debug, Clone)]
pub struct SourceMap {
    name: String,
    source: String,
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(name: impl Into<String>, source: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(at, _)| at + 1))
            .collect();
        Self {
            name: name.into(),
            source,
            line_starts,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Text of a 1-based line without its terminator
    pub fn line(&self, number: u32) -> Option<&str> {
        let index = (number as usize).checked_sub(1)?;
        let start = *self.line_starts.get(index)?;
        let end = self
            .line_starts
            .get(index + 1)
            .map_or(self.source.len(), |next| next - 1);
        Some(self.source[start..end].trim_end_matches('\r'))
    }

    /// `file:line:col` header, the source line, and a caret run under `span`
    pub fn render(&self, span: Span, message: &str) -> String {
        let mut out = format!(
            "error: {}\n  --> {}:{}\n",
            message, self.name, span.start
        );

        let Some(text) = self.line(span.start.line) else {
            return out;
        };
        let gutter = span.start.line.to_string();
        let pad = " ".repeat(gutter.len());
        let indent = span.start.column.saturating_sub(1) as usize;
        let width = if span.start.line == span.end.line {
            span.end.column.saturating_sub(span.start.column) as usize
        } else {
            text.chars().count().saturating_sub(indent)
        };

        out.push_str(&format!("{} |\n{} | {}\n", pad, gutter, text));
        out.push_str(&format!(
            "{} | {}{}\n",
            pad,
            " ".repeat(indent),
            "^".repeat(width.max(1))
        ));
        out
    }
}
