use crate::config::compile_time::codegen::MAX_COMMANDS_PER_CLASS;
use crate::logging::{codes, Code};
use crate::utils::Span;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodeGenError {
    #[error("Unresolved identifier '{name}' in {subroutine} at {span}")]
    UnresolvedIdentifier {
        name: String,
        subroutine: String,
        span: Span,
    },

    #[error("Cannot lower {description} at {span}")]
    UnsupportedNode { description: String, span: Span },

    #[error("Class {class} exceeds {MAX_COMMANDS_PER_CLASS} commands")]
    CommandLimitExceeded { class: String },
}

impl CodeGenError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::UnresolvedIdentifier { .. } => codes::codegen::UNRESOLVED_IDENTIFIER,
            Self::UnsupportedNode { .. } => codes::codegen::UNSUPPORTED_NODE,
            Self::CommandLimitExceeded { .. } => codes::codegen::COMMAND_LIMIT_EXCEEDED,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnresolvedIdentifier { span, .. } | Self::UnsupportedNode { span, .. } => {
                Some(*span)
            }
            Self::CommandLimitExceeded { .. } => None,
        }
    }
}
