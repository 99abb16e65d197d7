//! Class- and subroutine-level symbol tables (§4.3).

use indexmap::IndexMap;

/// The storage kind of a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Static,
    Field,
    Arg,
    Var,
}

/// A single resolved symbol: its declared type, kind and index within
/// that kind's running count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub ty: String,
    pub kind: SymbolKind,
    pub index: u16,
}

/// Tracks declarations of one kind and hands out the next free index.
#[derive(Debug, Clone, Default)]
struct Counters {
    static_count: u16,
    field_count: u16,
    arg_count: u16,
    var_count: u16,
}

impl Counters {
    fn next(&mut self, kind: SymbolKind) -> u16 {
        let counter = match kind {
            SymbolKind::Static => &mut self.static_count,
            SymbolKind::Field => &mut self.field_count,
            SymbolKind::Arg => &mut self.arg_count,
            SymbolKind::Var => &mut self.var_count,
        };
        let index = *counter;
        *counter += 1;
        index
    }

    fn count(&self, kind: SymbolKind) -> u16 {
        match kind {
            SymbolKind::Static => self.static_count,
            SymbolKind::Field => self.field_count,
            SymbolKind::Arg => self.arg_count,
            SymbolKind::Var => self.var_count,
        }
    }
}

/// A single level of scope: either the class scope (static/field) or a
/// subroutine scope (arg/var), reset at the start of each subroutine.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: IndexMap<String, Symbol>,
    counters: Counters,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.counters = Counters::default();
    }

    /// Declares `name` with the given type and kind, returning the symbol
    /// assigned. Re-declaring a name in the same table overwrites it, as
    /// the parser only ever calls this once per declared name.
    pub fn define(&mut self, name: impl Into<String>, ty: impl Into<String>, kind: SymbolKind) -> Symbol {
        let index = self.counters.next(kind);
        let symbol = Symbol { ty: ty.into(), kind, index };
        self.entries.insert(name.into(), symbol.clone());
        symbol
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    pub fn var_count(&self, kind: SymbolKind) -> u16 {
        self.counters.count(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_increment_per_kind() {
        let mut table = SymbolTable::new();
        table.define("x", "int", SymbolKind::Field);
        table.define("y", "int", SymbolKind::Field);
        table.define("count", "int", SymbolKind::Static);

        assert_eq!(table.lookup("x").unwrap().index, 0);
        assert_eq!(table.lookup("y").unwrap().index, 1);
        assert_eq!(table.lookup("count").unwrap().index, 0);
        assert_eq!(table.var_count(SymbolKind::Field), 2);
    }

    #[test]
    fn reset_clears_entries_and_counters() {
        let mut table = SymbolTable::new();
        table.define("a", "int", SymbolKind::Arg);
        table.reset();
        assert!(table.lookup("a").is_none());
        assert_eq!(table.var_count(SymbolKind::Arg), 0);
    }
}
