//! Lexical scopes and typed identifiers.
//!
//! Scopes form a tree addressed by index into an arena, so a child scope
//! (a vertex stage chained on top of a fragment stage) can outlive the
//! pass that built it without ownership cycles. Identifiers live in a
//! parallel arena and are referenced by handle from AST nodes.

use crate::types::Type;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentId(pub u32);

/// An identifier bound to exactly one declared name and type.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub ty: Type,
    pub scope: ScopeId,
}

#[derive(Debug, Clone, Default)]
struct Scope {
    parent: Option<ScopeId>,
    names: HashMap<String, IdentId>,
}

/// Arena owning every scope and identifier of one program. Append-only:
/// declarations are never removed, and scopes stay alive as long as the
/// arena does.
#[derive(Debug, Clone)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
    idents: Vec<Identifier>,
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeArena {
    /// Create an arena holding just the root scope.
    pub fn new() -> Self {
        ScopeArena {
            scopes: vec![Scope::default()],
            idents: Vec::new(),
        }
    }

    pub fn root() -> ScopeId {
        ScopeId(0)
    }

    /// Open a new scope under `parent`.
    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            names: HashMap::new(),
        });
        id
    }

    /// Declare `name` in `scope`. Returns None if the same scope already
    /// declares that name; shadowing an outer scope is fine.
    pub fn declare(&mut self, scope: ScopeId, name: &str, ty: Type) -> Option<IdentId> {
        if self.scopes[scope.0 as usize].names.contains_key(name) {
            return None;
        }
        let id = IdentId(self.idents.len() as u32);
        self.idents.push(Identifier {
            name: name.to_string(),
            ty,
            scope,
        });
        self.scopes[scope.0 as usize].names.insert(name.to_string(), id);
        Some(id)
    }

    /// Resolve `name` starting at `scope` and walking the parent chain.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<IdentId> {
        let mut current = Some(scope);
        while let Some(sid) = current {
            let s = &self.scopes[sid.0 as usize];
            if let Some(&id) = s.names.get(name) {
                return Some(id);
            }
            current = s.parent;
        }
        None
    }

    pub fn ident(&self, id: IdentId) -> &Identifier {
        &self.idents[id.0 as usize]
    }
}
