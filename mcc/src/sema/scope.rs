use indexmap::IndexMap;

use super::types::Type;
use crate::error::SemError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Global,
    Local,
    Param,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub storage: Storage,
    pub depth: usize,
}

/// Stack of lexical scopes. The global scope sits at depth 0 and is never
/// popped; a new scope is pushed on entering a block or function body.
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<IndexMap<String, Symbol>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![IndexMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Declare a name in the current scope. Shadowing an outer scope's name
    /// is legal; a collision within the current scope is not.
    pub fn declare(&mut self, name: &str, ty: Type, storage: Storage) -> Result<(), SemError> {
        let depth = self.depth();
        let scope = &mut self.scopes[depth];
        if scope.contains_key(name) {
            return Err(SemError::Redeclaration(name.to_string()));
        }
        scope.insert(
            name.to_string(),
            Symbol {
                name: name.to_string(),
                ty,
                storage,
                depth,
            },
        );
        Ok(())
    }

    /// Resolve a name, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
