//! Text to commands: one command per line, `//` comments, blank lines skipped

use crate::command::{check_access, AccessViolation, ArithmeticOp, Command, Segment};
use crate::logging::{codes, log_vm_error};
use jack_compiler::logging::Code;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmParseError {
    #[error("line {line}: unknown command '{text}'")]
    UnknownCommand { line: usize, text: String },

    #[error("line {line}: unknown segment '{segment}'")]
    UnknownSegment { line: usize, segment: String },

    #[error("line {line}: invalid number '{text}'")]
    InvalidIndex { line: usize, text: String },

    #[error("line {line}: {violation}")]
    IllegalAccess {
        line: usize,
        violation: AccessViolation,
    },

    #[error("line {line}: invalid symbol '{name}'")]
    InvalidName { line: usize, name: String },
}

impl VmParseError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::UnknownCommand { .. } => codes::UNKNOWN_COMMAND,
            Self::UnknownSegment { .. } => codes::INVALID_SEGMENT,
            Self::InvalidIndex { .. } | Self::IllegalAccess { .. } => codes::INVALID_INDEX,
            Self::InvalidName { .. } => codes::INVALID_NAME,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::UnknownCommand { line, .. }
            | Self::UnknownSegment { line, .. }
            | Self::InvalidIndex { line, .. }
            | Self::IllegalAccess { line, .. }
            | Self::InvalidName { line, .. } => *line,
        }
    }
}

fn command_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?:(?P<stack>push|pop)\s+(?P<segment>\S+)\s+(?P<index>\S+)|(?P<flow>label|goto|if-goto)\s+(?P<label>\S+)|(?P<def>function|call)\s+(?P<name>\S+)\s+(?P<count>\S+)|(?P<bare>\S+))$",
        )
        .unwrap_or_else(|e| unreachable!("command pattern: {}", e))
    })
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_.:$][A-Za-z0-9_.:$]*$")
            .unwrap_or_else(|e| unreachable!("name pattern: {}", e))
    })
}

/// Parse a whole `.vm` text, stopping at the first bad line
pub fn parse_program(text: &str) -> Result<Vec<Command>, VmParseError> {
    let mut commands = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        if let Some(command) = parse_line(raw, index + 1)? {
            commands.push(command);
        }
    }
    Ok(commands)
}

/// `None` for blank and comment-only lines
pub fn parse_line(raw: &str, line: usize) -> Result<Option<Command>, VmParseError> {
    let text = match raw.find("//") {
        Some(at) => &raw[..at],
        None => raw,
    }
    .trim();

    if text.is_empty() {
        return Ok(None);
    }

    parse_command(text, line).map(Some).map_err(|err| {
        log_vm_error(err.error_code(), &err.to_string(), &[("text", text)]);
        err
    })
}

fn parse_command(text: &str, line: usize) -> Result<Command, VmParseError> {
    let unknown = || VmParseError::UnknownCommand {
        line,
        text: text.to_string(),
    };
    let captures = command_pattern().captures(text).ok_or_else(unknown)?;

    if let Some(stack) = captures.name("stack") {
        let segment_text = &captures["segment"];
        let segment = Segment::from_str(segment_text).ok_or_else(|| VmParseError::UnknownSegment {
            line,
            segment: segment_text.to_string(),
        })?;
        let index = parse_number(&captures["index"], line)?;
        let is_pop = stack.as_str() == "pop";

        check_access(segment, index, is_pop)
            .map_err(|violation| VmParseError::IllegalAccess { line, violation })?;

        return Ok(if is_pop {
            Command::Pop(segment, index)
        } else {
            Command::Push(segment, index)
        });
    }

    if let Some(flow) = captures.name("flow") {
        let label = parse_name(&captures["label"], line)?;
        return Ok(match flow.as_str() {
            "label" => Command::Label(label),
            "goto" => Command::Goto(label),
            _ => Command::IfGoto(label),
        });
    }

    if let Some(def) = captures.name("def") {
        let name = parse_name(&captures["name"], line)?;
        let count = parse_number(&captures["count"], line)?;
        return Ok(match def.as_str() {
            "function" => Command::Function {
                name,
                n_locals: count,
            },
            _ => Command::Call {
                name,
                n_args: count,
            },
        });
    }

    match &captures["bare"] {
        "return" => Ok(Command::Return),
        other => ArithmeticOp::from_str(other)
            .map(Command::Arithmetic)
            .ok_or_else(unknown),
    }
}

fn parse_number(text: &str, line: usize) -> Result<u16, VmParseError> {
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VmParseError::InvalidIndex {
            line,
            text: text.to_string(),
        });
    }
    text.parse().map_err(|_| VmParseError::InvalidIndex {
        line,
        text: text.to_string(),
    })
}

fn parse_name(text: &str, line: usize) -> Result<String, VmParseError> {
    if name_pattern().is_match(text) {
        Ok(text.to_string())
    } else {
        Err(VmParseError::InvalidName {
            line,
            name: text.to_string(),
        })
    }
}
