//! Stack-machine command model
//!
//! `Display` renders the exact one-command-per-line text format consumed by
//! the VM translator: single-space separated fields, lowercase command and
//! segment names.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    Argument,
    Local,
    Static,
    Constant,
    This,
    That,
    Pointer,
    Temp,
}

impl Segment {
    pub const ALL: [Segment; 8] = [
        Self::Argument,
        Self::Local,
        Self::Static,
        Self::Constant,
        Self::This,
        Self::That,
        Self::Pointer,
        Self::Temp,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Argument => "argument",
            Self::Local => "local",
            Self::Static => "static",
            Self::Constant => "constant",
            Self::This => "this",
            Self::That => "that",
            Self::Pointer => "pointer",
            Self::Temp => "temp",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|seg| seg.as_str() == s)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
}

impl ArithmeticOp {
    pub const ALL: [ArithmeticOp; 9] = [
        Self::Add,
        Self::Sub,
        Self::Neg,
        Self::Eq,
        Self::Gt,
        Self::Lt,
        Self::And,
        Self::Or,
        Self::Not,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Neg => "neg",
            Self::Eq => "eq",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.as_str() == s)
    }

    /// Operands popped from the stack
    pub fn arity(self) -> usize {
        match self {
            Self::Neg | Self::Not => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VmCommand {
    Push(Segment, u16),
    Pop(Segment, u16),
    Arithmetic(ArithmeticOp),
    Label(String),
    Goto(String),
    IfGoto(String),
    Function { name: String, n_locals: u16 },
    Call { name: String, n_args: u16 },
    Return,
}

impl VmCommand {
    pub fn push(segment: Segment, index: u16) -> Self {
        Self::Push(segment, index)
    }

    pub fn pop(segment: Segment, index: u16) -> Self {
        Self::Pop(segment, index)
    }

    pub fn call(name: impl Into<String>, n_args: u16) -> Self {
        Self::Call {
            name: name.into(),
            n_args,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function { .. })
    }
}

impl fmt::Display for VmCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push(segment, index) => write!(f, "push {} {}", segment, index),
            Self::Pop(segment, index) => write!(f, "pop {} {}", segment, index),
            Self::Arithmetic(op) => write!(f, "{}", op),
            Self::Label(label) => write!(f, "label {}", label),
            Self::Goto(label) => write!(f, "goto {}", label),
            Self::IfGoto(label) => write!(f, "if-goto {}", label),
            Self::Function { name, n_locals } => write!(f, "function {} {}", name, n_locals),
            Self::Call { name, n_args } => write!(f, "call {} {}", name, n_args),
            Self::Return => f.write_str("return"),
        }
    }
}

/// One command per line, newline-terminated
pub fn render(commands: &[VmCommand]) -> String {
    let mut text = String::with_capacity(commands.len() * 16);
    for command in commands {
        text.push_str(&command.to_string());
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_format() {
        let commands = vec![
            VmCommand::Function {
                name: "Main.main".into(),
                n_locals: 2,
            },
            VmCommand::push(Segment::Constant, 7),
            VmCommand::pop(Segment::Pointer, 1),
            VmCommand::Arithmetic(ArithmeticOp::Not),
            VmCommand::IfGoto("WHILE_END_0".into()),
            VmCommand::call("Math.multiply", 2),
            VmCommand::Return,
        ];
        assert_eq!(
            render(&commands),
            "function Main.main 2\npush constant 7\npop pointer 1\nnot\n\
             if-goto WHILE_END_0\ncall Math.multiply 2\nreturn\n"
        );
    }

    #[test]
    fn test_names_round_trip() {
        for segment in Segment::ALL {
            assert_eq!(Segment::from_str(segment.as_str()), Some(segment));
        }
        for op in ArithmeticOp::ALL {
            assert_eq!(ArithmeticOp::from_str(op.as_str()), Some(op));
        }
        assert_eq!(Segment::from_str("Local"), None);
        assert_eq!(ArithmeticOp::Neg.arity(), 1);
    }
}
