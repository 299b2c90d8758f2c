//! Hack assembler and the end-to-end toolchain driver

pub mod assembler;
pub mod encoder;
pub mod error;
pub mod parser;
pub mod symbols;
pub mod toolchain;

pub use assembler::{assemble, assemble_file, Assembly};
pub use error::AssemblerError;
pub use symbols::SymbolTable;
pub use toolchain::{build, BuildError, BuildReport};
