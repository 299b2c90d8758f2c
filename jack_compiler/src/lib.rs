//! Compiler from Jack classes to stack-machine commands
//!
//! Stages, each pulling from the one before it:
//! [`lexical`] tokens, [`syntax`] class AST, [`symbols`] scopes,
//! [`codegen`] commands. [`pipeline`] runs them over one file and
//! [`batch`] over a directory.

pub mod batch;
pub mod codegen;
pub mod config;
pub mod file_processor;
pub mod grammar;
pub mod lexical;
#[macro_use]
pub mod logging;
pub mod pipeline;
pub mod symbols;
pub mod syntax;
pub mod tokens;
pub mod utils;

pub use batch::{BatchConfig, BatchError, BatchResults};
pub use codegen::{compile_class, CodeGenError, VmCommand};
pub use pipeline::{compile_source, CompiledClass, PipelineError, PipelineResult};
