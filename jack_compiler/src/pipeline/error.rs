use crate::codegen::CodeGenError;
use crate::file_processor::FileProcessorError;
use crate::lexical::LexerError;
use crate::logging::{codes, Code};
use crate::syntax::SyntaxError;
use crate::utils::{Position, Span};

/// First failure of any stage; compilation of the class stops there
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("File processing failed: {0}")]
    FileProcessing(#[from] FileProcessorError),

    #[error("Lexical analysis failed: {0}")]
    LexicalAnalysis(#[from] LexerError),

    #[error("Syntax analysis failed: {0}")]
    SyntaxAnalysis(SyntaxError),

    #[error("Code generation failed: {0}")]
    CodeGeneration(#[from] CodeGenError),

    #[error("Pipeline error: {message}")]
    Pipeline { message: String },
}

/// Lexer errors surfacing through the parser are reported as lexical
impl From<SyntaxError> for PipelineError {
    fn from(error: SyntaxError) -> Self {
        match error {
            SyntaxError::Lexical(lexer_error) => Self::LexicalAnalysis(lexer_error),
            other => Self::SyntaxAnalysis(other),
        }
    }
}

impl PipelineError {
    pub fn pipeline_error(message: &str) -> Self {
        Self::Pipeline {
            message: message.to_string(),
        }
    }

    pub fn error_code(&self) -> Code {
        match self {
            Self::FileProcessing(e) => e.error_code(),
            Self::LexicalAnalysis(e) => e.error_code(),
            Self::SyntaxAnalysis(e) => e.error_code(),
            Self::CodeGeneration(e) => e.error_code(),
            Self::Pipeline { .. } => codes::system::INTERNAL_ERROR,
        }
    }

    /// Whether this failure should stop the rest of a batch run
    pub fn requires_halt(&self) -> bool {
        codes::requires_halt(self.error_code().as_str())
    }

    /// Where in the source the failure points, if anywhere
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::LexicalAnalysis(e) => e
                .line()
                .map(|line| Span::point(Position::new(0, line, e.column().unwrap_or(1)))),
            Self::SyntaxAnalysis(e) => e.span(),
            Self::CodeGeneration(e) => e.span(),
            Self::FileProcessing(_) | Self::Pipeline { .. } => None,
        }
    }

    /// Stage name for summaries
    pub fn stage(&self) -> &'static str {
        match self {
            Self::FileProcessing(_) => "file",
            Self::LexicalAnalysis(_) => "lexical",
            Self::SyntaxAnalysis(_) => "syntax",
            Self::CodeGeneration(_) => "codegen",
            Self::Pipeline { .. } => "pipeline",
        }
    }
}
