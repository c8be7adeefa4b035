//! Symbol tables
//!
//! Method signatures and global variable names are interned into dense
//! integer symbols. The tables are owned by the VM and live as long as it.

use rustc_hash::FxHashMap;

/// Interned names, indexed by symbol
#[derive(Debug, Default)]
pub struct SymbolTable {
    names: Vec<String>,
    index: FxHashMap<String, u32>,
}

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the symbol for `name`, adding it if missing
    pub fn ensure(&mut self, name: &str) -> u32 {
        if let Some(&symbol) = self.index.get(name) {
            return symbol;
        }
        let symbol = self.names.len() as u32;
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), symbol);
        symbol
    }

    /// Look up an existing symbol
    pub fn find(&self, name: &str) -> Option<u32> {
        self.index.get(name).copied()
    }

    /// Name of a symbol
    pub fn name(&self, symbol: u32) -> Option<&str> {
        self.names.get(symbol as usize).map(String::as_str)
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_is_stable() {
        let mut table = SymbolTable::new();
        let a = table.ensure("call ");
        let b = table.ensure("call  ");
        assert_ne!(a, b);
        assert_eq!(table.ensure("call "), a);
        assert_eq!(table.find("call  "), Some(b));
        assert_eq!(table.find("missing"), None);
        assert_eq!(table.name(b), Some("call  "));
        assert_eq!(table.len(), 2);
    }
}
