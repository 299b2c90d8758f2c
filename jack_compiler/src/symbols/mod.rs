//! Two-level symbol resolution: subroutine scope shadows class scope
//!
//! The class table is filled once before any subroutine is compiled and is
//! read-only afterwards. A fresh subroutine table is built for each
//! subroutine and dropped when that subroutine is done.

pub mod collector;
pub mod table;

pub use collector::{collect_class_symbols, collect_subroutine_symbols};
pub use table::{ScopeLevel, StorageKind, SymbolEntry, SymbolTable};

/// The pair of tables visible inside one subroutine
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    class: &'a SymbolTable,
    subroutine: &'a SymbolTable,
}

impl<'a> Scope<'a> {
    pub fn new(class: &'a SymbolTable, subroutine: &'a SymbolTable) -> Self {
        Self { class, subroutine }
    }

    /// Subroutine table first, then class table
    pub fn resolve(&self, name: &str) -> Option<&'a SymbolEntry> {
        self.subroutine
            .lookup(name)
            .or_else(|| self.class.lookup(name))
    }
}
