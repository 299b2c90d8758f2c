//! Log events and their rendered forms

use super::codes::{self, Code};
use crate::utils::Span;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Ordered from most to least severe, so `level <= min` means "emit"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(level: &str) -> Result<Self, Self::Err> {
        match level.trim().to_ascii_lowercase().as_str() {
            "error" | "0" => Ok(LogLevel::Error),
            "warn" | "warning" | "1" => Ok(LogLevel::Warning),
            "info" | "2" => Ok(LogLevel::Info),
            "debug" | "3" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub code: Code,
    pub message: String,
    pub span: Option<Span>,
    /// Source file being compiled when the event was raised
    pub file: Option<PathBuf>,
    pub context: BTreeMap<String, String>,
}

/// Shape of one JSON log line
#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: &'a DateTime<Utc>,
    level: LogLevel,
    code: &'static str,
    category: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    span: Option<&'a Span>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    context: &'a BTreeMap<String, String>,
}

impl LogEvent {
    pub fn new(level: LogLevel, code: Code, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            code,
            message: message.into(),
            span: None,
            file: None,
            context: BTreeMap::new(),
        }
    }

    pub fn error(code: Code, message: &str) -> Self {
        Self::new(LogLevel::Error, code, message)
    }

    pub fn success(code: Code, message: &str) -> Self {
        Self::new(LogLevel::Info, code, message)
    }

    pub fn warning(message: &str) -> Self {
        Self::new(LogLevel::Warning, Code::new("W000"), message)
    }

    pub fn info(message: &str) -> Self {
        Self::new(LogLevel::Info, Code::new("I000"), message)
    }

    pub fn debug(message: &str) -> Self {
        Self::new(LogLevel::Debug, Code::new("D000"), message)
    }

    pub fn with_span(self, span: Span) -> Self {
        Self {
            span: Some(span),
            ..self
        }
    }

    pub fn with_file(self, file: PathBuf) -> Self {
        Self {
            file: Some(file),
            ..self
        }
    }

    pub fn with_context(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }

    pub fn is_warning(&self) -> bool {
        self.level == LogLevel::Warning
    }

    pub fn category(&self) -> &'static str {
        codes::get_category(self.code.as_str())
    }

    pub fn recommended_action(&self) -> &'static str {
        codes::get_action(self.code.as_str())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&JsonLine {
            timestamp: &self.timestamp,
            level: self.level,
            code: self.code.as_str(),
            category: self.category(),
            message: &self.message,
            file: self.file.as_ref().map(|f| f.display().to_string()),
            span: self.span.as_ref(),
            context: &self.context,
        })
    }
}

/// `[LEVEL] CODE - message at line:col (k=v, ...)`
impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} - {}", self.level.as_str(), self.code, self.message)?;
        if let Some(span) = &self.span {
            write!(f, " at {}", span.start)?;
        }
        if let Some(file) = &self.file {
            write!(f, " in {}", file.display())?;
        }
        if !self.context.is_empty() {
            let pairs: Vec<String> = self
                .context
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect();
            write!(f, " ({})", pairs.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Position;

    #[test]
    fn test_level_parsing_and_order() {
        assert_eq!("ERROR".parse(), Ok(LogLevel::Error));
        assert_eq!(" warn ".parse(), Ok(LogLevel::Warning));
        assert_eq!("2".parse(), Ok(LogLevel::Info));
        assert_eq!("debug".parse(), Ok(LogLevel::Debug));
        assert!("verbose".parse::<LogLevel>().is_err());
        assert!(LogLevel::Error < LogLevel::Debug);
    }

    #[test]
    fn test_display_includes_span_file_and_context() {
        let span = Span::new(Position::new(10, 2, 5), Position::new(11, 2, 6));
        let event = LogEvent::error(codes::lexical::UNRECOGNIZED_INPUT, "Unexpected token: #")
            .with_span(span)
            .with_file(PathBuf::from("Main.jack"))
            .with_context("text", '#');

        assert!(event.is_error());
        assert_eq!(event.category(), "Lexical");
        assert_eq!(
            event.to_string(),
            "[ERROR] E020 - Unexpected token: # at 2:5 in Main.jack (text=#)"
        );
    }

    #[test]
    fn test_json_line() {
        let event = LogEvent::success(codes::success::CODE_GENERATION_COMPLETE, "done")
            .with_context("commands", 12);

        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["level"], "info");
        assert_eq!(json["code"], "I060");
        assert_eq!(json["context"]["commands"], "12");
        assert!(json.get("span").is_none());
        assert!(json.get("file").is_none());
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }
}
