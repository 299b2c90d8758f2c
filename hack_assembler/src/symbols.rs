use std::collections::HashMap;

pub const VARIABLE_BASE: u16 = 16;
pub const SCREEN: u16 = 16384;
pub const KBD: u16 = 24576;

/// Labels, variables and the predefined registers
#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbols: HashMap<String, u16>,
    next_variable: u16,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut symbols: HashMap<String, u16> = [
            ("SP", 0),
            ("LCL", 1),
            ("ARG", 2),
            ("THIS", 3),
            ("THAT", 4),
            ("SCREEN", SCREEN),
            ("KBD", KBD),
        ]
        .into_iter()
        .map(|(name, address)| (name.to_string(), address))
        .collect();
        for register in 0..16 {
            symbols.insert(format!("R{}", register), register);
        }

        Self {
            symbols,
            next_variable: VARIABLE_BASE,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<u16> {
        self.symbols.get(name).copied()
    }

    /// `false` when the name is already bound
    pub fn define(&mut self, name: &str, address: u16) -> bool {
        if self.contains(name) {
            return false;
        }
        self.symbols.insert(name.to_string(), address);
        true
    }

    /// Address of `name`, binding it to the next free variable slot if new
    pub fn resolve_or_allocate(&mut self, name: &str) -> u16 {
        if let Some(address) = self.get(name) {
            return address;
        }
        let address = self.next_variable;
        self.next_variable = self.next_variable.saturating_add(1);
        self.symbols.insert(name.to_string(), address);
        address
    }

    pub fn variable_count(&self) -> usize {
        (self.next_variable - VARIABLE_BASE) as usize
    }
}
