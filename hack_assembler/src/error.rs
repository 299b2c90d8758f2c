use jack_compiler::logging::codes::assembler as codes;
use jack_compiler::logging::codes::file_processing;
use jack_compiler::logging::Code;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblerError {
    #[error("line {line}: unknown comp '{mnemonic}'")]
    UnknownComp { line: usize, mnemonic: String },

    #[error("line {line}: unknown dest '{mnemonic}'")]
    UnknownDest { line: usize, mnemonic: String },

    #[error("line {line}: unknown jump '{mnemonic}'")]
    UnknownJump { line: usize, mnemonic: String },

    #[error("line {line}: malformed label '{text}'")]
    MalformedLabel { line: usize, text: String },

    #[error("line {line}: malformed instruction '{text}'")]
    MalformedInstruction { line: usize, text: String },

    #[error("line {line}: constant {value} does not fit in 15 bits")]
    ConstantOutOfRange { line: usize, value: String },

    #[error("line {line}: label '{label}' already defined")]
    DuplicateLabel { line: usize, label: String },

    #[error("program has {count} instructions, ROM holds 32768")]
    ProgramTooLarge { count: usize },

    #[error("{}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl AssemblerError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::UnknownComp { .. } | Self::UnknownDest { .. } | Self::UnknownJump { .. } => {
                codes::UNKNOWN_MNEMONIC
            }
            Self::MalformedLabel { .. } | Self::MalformedInstruction { .. } => {
                codes::MALFORMED_INSTRUCTION
            }
            Self::ConstantOutOfRange { .. } => codes::CONSTANT_OUT_OF_RANGE,
            Self::DuplicateLabel { .. } => codes::DUPLICATE_LABEL,
            Self::ProgramTooLarge { .. } => codes::PROGRAM_TOO_LARGE,
            Self::Io { .. } => file_processing::IO_ERROR,
        }
    }

    /// Source line, when the error comes from one
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::UnknownComp { line, .. }
            | Self::UnknownDest { line, .. }
            | Self::UnknownJump { line, .. }
            | Self::MalformedLabel { line, .. }
            | Self::MalformedInstruction { line, .. }
            | Self::ConstantOutOfRange { line, .. }
            | Self::DuplicateLabel { line, .. } => Some(*line),
            Self::ProgramTooLarge { .. } | Self::Io { .. } => None,
        }
    }
}
