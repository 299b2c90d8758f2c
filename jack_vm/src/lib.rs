//! Stack-machine tooling for compiled Jack
//!
//! [`parser`] reads `.vm` text into [`Command`]s, [`translator`] lowers them
//! to Hack assembly and [`interpreter`] executes them directly. [`project`]
//! drives translation of a file or a directory.

pub mod command;
pub mod interpreter;
pub mod logging;
pub mod parser;
pub mod project;
pub mod translator;

#[cfg(test)]
mod roundtrip;

pub use command::{ArithmeticOp, Command, Segment};
pub use interpreter::{run_sources, Execution, Interpreter, InterpreterError, Program};
pub use parser::{parse_program, VmParseError};
pub use project::{translate_and_write, translate_path, ProjectError, VmFile};
pub use translator::{bootstrap, TranslateError, Translator};
