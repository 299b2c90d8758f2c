use crate::codegen::VmCommand;
use crate::file_processor::FileMetadata;
use crate::log_success;
use crate::logging::codes;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileMetrics {
    pub token_count: usize,
    /// Source lines read by the lexer
    pub line_count: usize,
    pub subroutine_count: usize,
    pub command_count: usize,
    pub duration: Duration,
}

/// One class lowered to VM commands
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledClass {
    pub class_name: String,
    pub commands: Vec<VmCommand>,
    /// Rendered command text, one command per line
    pub text: String,
    pub metrics: CompileMetrics,
}

impl CompiledClass {
    pub fn function_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_function()).count()
    }
}

/// A source file compiled and written out
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub file_metadata: FileMetadata,
    pub output_path: PathBuf,
    pub compiled: CompiledClass,
    pub processing_duration: Duration,
}

impl PipelineResult {
    pub fn log_success(&self, file_path: &str) {
        let seconds = self.processing_duration.as_secs_f64();
        log_success!(
            codes::success::FILE_PROCESSING_SUCCESS,
            "Compilation succeeded",
            "file" => file_path,
            "class" => self.compiled.class_name.as_str(),
            "output" => self.output_path.display(),
            "duration_ms" => format!("{:.2}", seconds * 1000.0),
            "tokens_per_sec" => format!("{:.0}",
                self.compiled.metrics.token_count as f64 / seconds.max(f64::EPSILON))
        );
    }
}
