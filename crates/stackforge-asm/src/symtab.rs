//! Predefined symbols and fresh-variable allocation for the resolve pass
//! (§4.6).

use std::collections::HashMap;

/// Address 16 is the first free RAM cell after the predefined registers
/// and the four virtual segment pointers; everything below it is
/// reserved.
const FIRST_VARIABLE_ADDRESS: u16 = 16;

pub(crate) struct SymbolTable {
    addresses: HashMap<String, u16>,
    next_variable: u16,
}

impl SymbolTable {
    pub(crate) fn new() -> Self {
        let mut addresses = HashMap::new();
        addresses.insert("SP".to_owned(), 0);
        addresses.insert("LCL".to_owned(), 1);
        addresses.insert("ARG".to_owned(), 2);
        addresses.insert("THIS".to_owned(), 3);
        addresses.insert("THAT".to_owned(), 4);
        addresses.insert("SCREEN".to_owned(), 16384);
        addresses.insert("KBD".to_owned(), 24576);
        for i in 0..16u16 {
            addresses.insert(format!("R{i}"), i);
        }
        Self { addresses, next_variable: FIRST_VARIABLE_ADDRESS }
    }

    /// Binds a label to an address, failing if already bound (labels are
    /// the only symbols a program can define twice by mistake; variables
    /// and predefined names are never rebound once seen).
    pub(crate) fn bind_label(&mut self, name: &str, address: u16) -> Result<(), ()> {
        if self.addresses.contains_key(name) {
            return Err(());
        }
        self.addresses.insert(name.to_owned(), address);
        Ok(())
    }

    /// Resolves a symbol, allocating the next free RAM address for it if
    /// it hasn't been seen as a predefined name, label, or variable yet.
    pub(crate) fn resolve(&mut self, name: &str) -> u16 {
        if let Some(address) = self.addresses.get(name) {
            return *address;
        }
        let address = self.next_variable;
        self.addresses.insert(name.to_owned(), address);
        self.next_variable += 1;
        address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predefined_symbols_resolve_without_consuming_a_variable_slot() {
        let mut table = SymbolTable::new();
        assert_eq!(table.resolve("SCREEN"), 16384);
        assert_eq!(table.resolve("R3"), 3);
        assert_eq!(table.next_variable, FIRST_VARIABLE_ADDRESS);
    }

    #[test]
    fn fresh_variables_are_allocated_in_first_use_order() {
        let mut table = SymbolTable::new();
        assert_eq!(table.resolve("i"), 16);
        assert_eq!(table.resolve("sum"), 17);
        assert_eq!(table.resolve("i"), 16);
    }

    #[test]
    fn rebinding_a_label_is_rejected() {
        let mut table = SymbolTable::new();
        table.bind_label("LOOP", 10).unwrap();
        assert!(table.bind_label("LOOP", 20).is_err());
    }
}
