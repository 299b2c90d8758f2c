//! Jack source to Hack binary in one run
//!
//! A `.jack` file builds `<stem>.vm`, `<stem>.asm` and `<stem>.hack` beside
//! it. A directory compiles every class in parallel, then translates the
//! directory with the bootstrap into `<dir>/<dirname>.asm` and assembles it.

use crate::assembler::assemble_file;
use crate::error::AssemblerError;
use jack_compiler::batch::{process_directory_with_config, BatchConfig, BatchError};
use jack_compiler::pipeline::{self, PipelineError};
use jack_compiler::{log_info, log_success, logging::codes};
use jack_vm::project::{translate_and_write, ProjectError};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("compile: {0}")]
    Compile(#[from] PipelineError),

    #[error("compile: {0}")]
    Batch(#[from] BatchError),

    #[error("{failed} of {total} classes failed to compile")]
    ClassesFailed { failed: usize, total: usize },

    #[error("translate: {0}")]
    Translate(#[from] ProjectError),

    #[error("assemble: {0}")]
    Assemble(#[from] AssemblerError),

    #[error("not a .jack file or directory: {}", .0.display())]
    InvalidInput(PathBuf),
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub vm_files: Vec<PathBuf>,
    pub asm_file: PathBuf,
    pub hack_file: PathBuf,
    pub duration: Duration,
}

/// Worker threads for directory builds
pub fn default_threads() -> usize {
    num_cpus::get().max(1)
}

pub fn build(path: &Path, threads: usize) -> Result<BuildReport, BuildError> {
    let start = Instant::now();

    let vm_files = if path.is_dir() {
        compile_directory(path, threads)?
    } else if jack_compiler::file_processor::is_jack_source(path) {
        vec![pipeline::process_file(path)?.output_path]
    } else {
        return Err(BuildError::InvalidInput(path.to_path_buf()));
    };

    let vm_input = if path.is_dir() {
        path.to_path_buf()
    } else {
        path.with_extension(jack_vm::project::VM_EXTENSION)
    };
    let asm_file = translate_and_write(&vm_input, true)?;
    let hack_file = assemble_file(&asm_file)?;

    let report = BuildReport {
        vm_files,
        asm_file,
        hack_file,
        duration: start.elapsed(),
    };
    log_success!(
        codes::success::OUTPUT_WRITTEN,
        "Build complete",
        "input" => path.display(),
        "output" => report.hack_file.display(),
        "duration_ms" => report.duration.as_millis()
    );
    Ok(report)
}

fn compile_directory(dir: &Path, threads: usize) -> Result<Vec<PathBuf>, BuildError> {
    let config = BatchConfig {
        max_threads: threads,
        ..BatchConfig::default()
    };
    log_info!("Compiling directory", "path" => dir.display(), "threads" => threads);

    let results = process_directory_with_config(dir, &config)?;
    if results.failure_count() > 0 {
        return Err(BuildError::ClassesFailed {
            failed: results.failure_count(),
            total: results.files_discovered,
        });
    }

    Ok(results
        .successful_files
        .into_iter()
        .map(|(_, result)| result.output_path)
        .collect())
}
