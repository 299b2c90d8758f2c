//! Code generation: class AST to stack-machine commands

pub mod command;
pub mod error;
pub mod generator;

use crate::grammar::ast::nodes::ClassDecl;
use crate::log_success;
use crate::logging::codes;
use crate::symbols::StorageKind;

pub use command::{render, ArithmeticOp, Segment, VmCommand};
pub use error::CodeGenError;
pub use generator::CodeGenerator;

/// Lower one class. Stops at the first error; nothing is returned for a
/// class that fails part way.
pub fn compile_class(class: &ClassDecl) -> Result<Vec<VmCommand>, CodeGenError> {
    let generator = CodeGenerator::new(class);

    let table = generator.class_table();
    log_success!(
        codes::success::SYMBOL_TABLES_BUILT,
        "Class scope built",
        "class" => class.name.as_str(),
        "fields" => table.count(StorageKind::Field),
        "statics" => table.count(StorageKind::Static)
    );

    let commands = generator.generate()?;

    log_success!(
        codes::success::CODE_GENERATION_COMPLETE,
        "VM code generated",
        "class" => class.name.as_str(),
        "functions" => commands.iter().filter(|c| c.is_function()).count(),
        "commands" => commands.len()
    );

    Ok(commands)
}
