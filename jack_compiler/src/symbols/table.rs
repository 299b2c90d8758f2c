//! Scope tables mapping identifiers to memory segment slots

use crate::codegen::command::Segment;
use crate::grammar::ast::nodes::{Identifier, TypeName};
use crate::log_warning;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a variable lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StorageKind {
    Static,
    Field,
    Parameter,
    Local,
}

impl StorageKind {
    /// Memory segment that holds variables of this kind
    pub fn segment(self) -> Segment {
        match self {
            Self::Static => Segment::Static,
            Self::Field => Segment::This,
            Self::Parameter => Segment::Argument,
            Self::Local => Segment::Local,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Field => "field",
            Self::Parameter => "parameter",
            Self::Local => "local",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub name: Identifier,
    pub kind: StorageKind,
    pub declared_type: TypeName,
    /// Slot within `kind`, in declaration order from 0
    pub index: u16,
}

impl SymbolEntry {
    pub fn segment(&self) -> Segment {
        self.kind.segment()
    }
}

/// Which of the two nested scopes a table represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeLevel {
    Class,
    Subroutine,
}

/// One scope. Slot counters run independently per storage kind.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    level: ScopeLevel,
    entries: HashMap<Identifier, SymbolEntry>,
    counters: HashMap<StorageKind, u16>,
}

impl SymbolTable {
    pub fn new(level: ScopeLevel) -> Self {
        Self {
            level,
            entries: HashMap::new(),
            counters: HashMap::new(),
        }
    }

    pub fn level(&self) -> ScopeLevel {
        self.level
    }

    /// Add a variable at the next slot of its kind. A repeated name takes
    /// the new slot; the earlier slot stays allocated.
    pub fn define(&mut self, name: &str, declared_type: TypeName, kind: StorageKind) -> &SymbolEntry {
        let counter = self.counters.entry(kind).or_insert(0);
        let index = *counter;
        *counter = counter.saturating_add(1);

        let entry = SymbolEntry {
            name: name.to_string(),
            kind,
            declared_type,
            index,
        };

        if let Some(previous) = self.entries.get(name) {
            log_warning!("Variable declared twice in the same scope",
                "name" => name,
                "previous_kind" => previous.kind.as_str(),
                "previous_index" => previous.index,
                "new_index" => index
            );
        }

        self.entries.insert(name.to_string(), entry);
        &self.entries[name]
    }

    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.get(name)
    }

    /// Slots allocated for `kind` so far
    pub fn count(&self, kind: StorageKind) -> u16 {
        self.counters.get(&kind).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by kind then slot
    pub fn entries(&self) -> Vec<&SymbolEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by_key(|e| (e.kind, e.index));
        entries
    }
}
