//! Symbol tables and the scope stack.
//!
//! `SymbolTable` binds names to LIR components and to types, with lexical
//! lookup through an optional parent (the global scope is shared across
//! per-function tables). `ScopeStack` tracks loop/method scopes for the
//! semantic pre-checks.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Span, Type};
use crate::lir::LlComponent;

/// Per-function symbol table: variable bindings and type bindings, with an
/// optional parent for lexical nesting. Lookup walks to the parent on miss.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    name: String,
    vars: HashMap<String, LlComponent>,
    types: HashMap<String, Type>,
    parent: Option<Rc<SymbolTable>>,
}

impl SymbolTable {
    pub fn new(name: impl Into<String>) -> Self {
        SymbolTable {
            name: name.into(),
            ..SymbolTable::default()
        }
    }

    pub fn with_parent(name: impl Into<String>, parent: Rc<SymbolTable>) -> Self {
        SymbolTable {
            name: name.into(),
            parent: Some(parent),
            ..SymbolTable::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn define_var(&mut self, name: impl Into<String>, value: LlComponent) {
        self.vars.insert(name.into(), value);
    }

    pub fn var(&self, name: &str) -> Option<&LlComponent> {
        match self.vars.get(name) {
            Some(v) => Some(v),
            None => self.parent.as_ref().and_then(|p| p.var(name)),
        }
    }

    pub fn define_type(&mut self, name: impl Into<String>, ty: Type) {
        self.types.insert(name.into(), ty);
    }

    pub fn type_of(&self, name: &str) -> Option<&Type> {
        match self.types.get(name) {
            Some(t) => Some(t),
            None => self.parent.as_ref().and_then(|p| p.type_of(name)),
        }
    }

    /// Resolve a type through typedef aliases and named-type indirection.
    pub fn resolve_type<'a>(&'a self, ty: &'a Type) -> &'a Type {
        match ty {
            Type::Typedef { aliased, .. } => self.resolve_type(aliased),
            Type::Named(id) => match self.type_of(&id.name) {
                Some(target) if target != ty => self.resolve_type(target),
                _ => ty,
            },
            _ => ty,
        }
    }

    pub fn vars(&self) -> &HashMap<String, LlComponent> {
        &self.vars
    }
}

#[derive(Debug, Default)]
struct Scope {
    symbols: HashMap<String, Span>,
    is_loop: bool,
    return_type: Option<Type>,
}

/// Stack of lexical scopes tagged with loop/return-type markers.
///
/// Entered and left around compound statements, loops, and functions;
/// queried by the semantic pre-checks for `break`/`continue` legality and
/// return-type consistency.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack::default()
    }

    pub fn enter_block(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn enter_method(&mut self, return_type: Type) {
        self.scopes.push(Scope {
            return_type: Some(return_type),
            ..Scope::default()
        });
    }

    pub fn enter_loop(&mut self) {
        self.scopes.push(Scope {
            is_loop: true,
            ..Scope::default()
        });
    }

    pub fn leave(&mut self) {
        self.scopes.pop();
    }

    pub fn define(&mut self, name: impl Into<String>, span: Span) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.symbols.insert(name.into(), span);
        }
    }

    pub fn exists_in_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|s| s.symbols.contains_key(name))
    }

    pub fn exists_at_any_scope(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|s| s.symbols.contains_key(name))
    }

    /// Is the current position inside a loop scope?
    pub fn in_loop(&self) -> bool {
        self.scopes.iter().rev().any(|s| s.is_loop)
    }

    /// Return type of the nearest enclosing function scope.
    pub fn return_type(&self) -> Option<&Type> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.return_type.as_ref())
    }
}
