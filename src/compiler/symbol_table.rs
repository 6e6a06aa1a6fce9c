// Xn Symbol Table
// Nested scopes; resolution promotes captured outer locals into free symbols

use rustc_hash::FxHashMap;

/// Where a resolved name lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    Global,
    Local,
    Free,
    Builtin,
}

/// One named binding
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
    pub is_const: bool,
}

/// A lexical scope. Function scopes own a slot counter and the free-symbol
/// list; block scopes (for-in headers, catch clauses) borrow slots from the
/// nearest enclosing function scope so their hidden bindings never collide
/// with real locals.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    outer: Option<Box<SymbolTable>>,
    store: FxHashMap<String, Symbol>,
    pub num_definitions: usize,
    pub free_symbols: Vec<Symbol>,
    is_block: bool,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_enclosed(outer: SymbolTable) -> Self {
        Self {
            outer: Some(Box::new(outer)),
            ..Self::default()
        }
    }

    pub fn new_block(outer: SymbolTable) -> Self {
        Self {
            outer: Some(Box::new(outer)),
            is_block: true,
            ..Self::default()
        }
    }

    /// Tear down this scope, returning the enclosing one
    pub fn into_outer(self) -> Option<SymbolTable> {
        self.outer.map(|o| *o)
    }

    pub fn is_block(&self) -> bool {
        self.is_block
    }

    pub fn define(&mut self, name: &str) -> Symbol {
        self.define_with(name, false)
    }

    pub fn define_const(&mut self, name: &str) -> Symbol {
        self.define_with(name, true)
    }

    fn define_with(&mut self, name: &str, is_const: bool) -> Symbol {
        let (scope, index) = self.allocate_slot();
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index,
            is_const,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Slot allocation happens on the nearest function scope; the root scope
    /// hands out global slots, every other function scope hands out locals.
    fn allocate_slot(&mut self) -> (SymbolScope, usize) {
        if self.is_block {
            return self
                .outer
                .as_mut()
                .expect("block scope always has an enclosing scope")
                .allocate_slot();
        }
        let scope = if self.outer.is_none() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let index = self.num_definitions;
        self.num_definitions += 1;
        (scope, index)
    }

    /// Builtins do not count toward `num_definitions`
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
            is_const: false,
        };
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Resolve a name, promoting outer-function locals into free symbols of
    /// the innermost function scope on the way down.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.store.get(name) {
            return Some(symbol.clone());
        }

        let outer = self.outer.as_mut()?;
        let symbol = outer.resolve(name)?;

        match symbol.scope {
            SymbolScope::Global | SymbolScope::Builtin => Some(symbol),
            SymbolScope::Local | SymbolScope::Free => {
                if self.is_block {
                    // same frame, no capture needed
                    Some(symbol)
                } else {
                    Some(self.define_free(symbol))
                }
            }
        }
    }

    fn define_free(&mut self, original: Symbol) -> Symbol {
        self.free_symbols.push(original.clone());
        let symbol = Symbol {
            name: original.name.clone(),
            scope: SymbolScope::Free,
            index: self.free_symbols.len() - 1,
            is_const: original.is_const,
        };
        self.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    /// Every Global binding of this scope, for the module export walk
    pub fn global_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self
            .store
            .values()
            .filter(|s| s.scope == SymbolScope::Global)
            .cloned()
            .collect();
        symbols.sort_by_key(|s| s.index);
        symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_resolve_global() {
        let mut table = SymbolTable::new();
        let a = table.define("a");
        assert_eq!(a.scope, SymbolScope::Global);
        assert_eq!(a.index, 0);

        let b = table.define("b");
        assert_eq!(b.index, 1);
        assert_eq!(table.num_definitions, 2);

        assert_eq!(table.resolve("a").unwrap(), a);
        assert_eq!(table.resolve("b").unwrap(), b);
        assert!(table.resolve("c").is_none());
    }

    #[test]
    fn test_resolve_local() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut local = SymbolTable::new_enclosed(global);
        let c = local.define("c");
        assert_eq!(c.scope, SymbolScope::Local);
        assert_eq!(c.index, 0);

        let a = local.resolve("a").unwrap();
        assert_eq!(a.scope, SymbolScope::Global);
    }

    #[test]
    fn test_resolve_free() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut outer = SymbolTable::new_enclosed(global);
        outer.define("c");

        let mut inner = SymbolTable::new_enclosed(outer);
        inner.define("e");

        let c = inner.resolve("c").unwrap();
        assert_eq!(c.scope, SymbolScope::Free);
        assert_eq!(c.index, 0);
        assert_eq!(inner.free_symbols.len(), 1);
        assert_eq!(inner.free_symbols[0].name, "c");
        assert_eq!(inner.free_symbols[0].scope, SymbolScope::Local);

        // globals are never captured
        let a = inner.resolve("a").unwrap();
        assert_eq!(a.scope, SymbolScope::Global);
        assert_eq!(inner.free_symbols.len(), 1);
    }

    #[test]
    fn test_resolve_nested_free() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut first = SymbolTable::new_enclosed(global);
        first.define("b");

        let mut second = SymbolTable::new_enclosed(first);
        let b = second.resolve("b").unwrap();
        assert_eq!(b.scope, SymbolScope::Free);

        let mut third = SymbolTable::new_enclosed(second);
        let b = third.resolve("b").unwrap();
        assert_eq!(b.scope, SymbolScope::Free);
        // the original recorded for the capture is second's Free symbol
        assert_eq!(third.free_symbols[0].scope, SymbolScope::Free);
    }

    #[test]
    fn test_builtin_resolution() {
        let mut global = SymbolTable::new();
        global.define_builtin(3, "len");

        let mut local = SymbolTable::new_enclosed(global);
        let len = local.resolve("len").unwrap();
        assert_eq!(len.scope, SymbolScope::Builtin);
        assert_eq!(len.index, 3);
        assert!(local.free_symbols.is_empty());
    }

    #[test]
    fn test_const_flag() {
        let mut table = SymbolTable::new();
        let pi = table.define_const("pi");
        assert!(pi.is_const);
        assert!(!table.define("e").is_const);
    }

    #[test]
    fn test_block_scope_shares_slots() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut fn_scope = SymbolTable::new_enclosed(global);
        fn_scope.define("p");

        let mut block = SymbolTable::new_block(fn_scope);
        let hidden = block.define("__for_iter");
        assert_eq!(hidden.scope, SymbolScope::Local);
        assert_eq!(hidden.index, 1); // continues after 'p'

        let fn_scope = block.into_outer().unwrap();
        assert_eq!(fn_scope.num_definitions, 2);
    }

    #[test]
    fn test_block_scope_at_top_level_defines_globals() {
        let mut global = SymbolTable::new();
        global.define("xs");

        let mut block = SymbolTable::new_block(global);
        let hidden = block.define("__for_iter");
        assert_eq!(hidden.scope, SymbolScope::Global);
        assert_eq!(hidden.index, 1);
    }

    #[test]
    fn test_block_scope_does_not_capture() {
        let mut global = SymbolTable::new();
        global.define("a");

        let mut fn_scope = SymbolTable::new_enclosed(global);
        fn_scope.define("x");

        let mut block = SymbolTable::new_block(fn_scope);
        let x = block.resolve("x").unwrap();
        assert_eq!(x.scope, SymbolScope::Local);

        let fn_scope = block.into_outer().unwrap();
        assert!(fn_scope.free_symbols.is_empty());
    }
}
