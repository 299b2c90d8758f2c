//! Assembly lines to instructions
//!
//! Whitespace anywhere in a line is ignored, as is everything after `//`.

use crate::error::AssemblerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Constant(u16),
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `@value` or `@symbol`
    Address(Operand),
    /// `dest=comp;jump`
    Compute {
        dest: Option<String>,
        comp: String,
        jump: Option<String>,
    },
    /// `(NAME)`, binds to the next instruction's address
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub line: usize,
    pub instruction: Instruction,
}

pub const MAX_ADDRESS: u16 = 0x7FFF;

pub fn is_symbol(text: &str) -> bool {
    let mut chars = text.chars();
    let valid = |c: char| c.is_ascii_alphanumeric() || "_.$:".contains(c);
    matches!(chars.next(), Some(first) if valid(first) && !first.is_ascii_digit())
        && chars.all(valid)
}

pub fn parse_source(text: &str) -> Result<Vec<SourceLine>, AssemblerError> {
    let mut lines = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        if let Some(instruction) = parse_line(raw, index + 1)? {
            lines.push(SourceLine {
                line: index + 1,
                instruction,
            });
        }
    }
    Ok(lines)
}

pub fn parse_line(raw: &str, line: usize) -> Result<Option<Instruction>, AssemblerError> {
    let code = raw.split("//").next().unwrap_or_default();
    let text: String = code.chars().filter(|c| !c.is_whitespace()).collect();

    if text.is_empty() {
        return Ok(None);
    }

    if let Some(rest) = text.strip_prefix('(') {
        return match rest.strip_suffix(')') {
            Some(name) if is_symbol(name) => Ok(Some(Instruction::Label(name.to_string()))),
            _ => Err(AssemblerError::MalformedLabel {
                line,
                text: text.clone(),
            }),
        };
    }

    if let Some(value) = text.strip_prefix('@') {
        return parse_address(value, line).map(Some);
    }

    parse_compute(&text, line).map(Some)
}

fn parse_address(value: &str, line: usize) -> Result<Instruction, AssemblerError> {
    if value.starts_with(|c: char| c.is_ascii_digit()) {
        let number = value
            .parse::<u32>()
            .map_err(|_| AssemblerError::MalformedInstruction {
                line,
                text: format!("@{}", value),
            })?;
        return match u16::try_from(number) {
            Ok(n) if n <= MAX_ADDRESS => Ok(Instruction::Address(Operand::Constant(n))),
            _ => Err(AssemblerError::ConstantOutOfRange {
                line,
                value: value.to_string(),
            }),
        };
    }

    if is_symbol(value) {
        Ok(Instruction::Address(Operand::Symbol(value.to_string())))
    } else {
        Err(AssemblerError::MalformedInstruction {
            line,
            text: format!("@{}", value),
        })
    }
}

fn parse_compute(text: &str, line: usize) -> Result<Instruction, AssemblerError> {
    let (dest, rest) = match text.split_once('=') {
        Some((dest, rest)) => (Some(dest), rest),
        None => (None, text),
    };
    let (comp, jump) = match rest.split_once(';') {
        Some((comp, jump)) => (comp, Some(jump)),
        None => (rest, None),
    };

    if comp.is_empty() || dest == Some("") || jump == Some("") {
        return Err(AssemblerError::MalformedInstruction {
            line,
            text: text.to_string(),
        });
    }

    Ok(Instruction::Compute {
        dest: dest.map(str::to_string),
        comp: comp.to_string(),
        jump: jump.map(str::to_string),
    })
}
