//! Scoped symbol table used while translating the parse tree into the
//! attributed syntax tree.
//!
//! Resolution failures never abort the compilation: both redeclaration and
//! lookup misses record a formatted diagnostic and hand back a tagged error
//! symbol, so the enclosing stage keeps building the tree and every
//! independent error gets reported.

use std::rc::Rc;

use hashbrown::HashMap;

use crate::{ast::Position, middle::ty::Type};

/// An immutable binding of a name to a type, created once at declaration time.
///
/// Symbols compare and hash by *identity*, not by content: the same name
/// declared in two scopes yields two distinct symbols, and the lowering pass
/// keys its local-variable map on exactly the symbol a reference resolved to.
#[derive(Debug, Clone)]
pub struct Symbol(Rc<SymbolData>);

#[derive(Debug)]
struct SymbolData {
    name: String,
    kind: SymbolKind,
}

#[derive(Debug)]
enum SymbolKind {
    Value(Type),
    /// A binding that failed to resolve or declare, carrying its diagnostic tag
    Error(&'static str),
}

impl Symbol {
    pub fn new(name: &str, ty: Type) -> Self {
        Symbol(Rc::new(SymbolData {
            name: name.to_owned(),
            kind: SymbolKind::Value(ty),
        }))
    }

    fn new_error(name: &str, tag: &'static str) -> Self {
        Symbol(Rc::new(SymbolData {
            name: name.to_owned(),
            kind: SymbolKind::Error(tag),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The bound type. Error symbols report [`Type::Error`] so that whatever
    /// operation consumes them produces another error instead of crashing the
    /// traversal.
    pub fn ty(&self) -> Type {
        match &self.0.kind {
            SymbolKind::Value(ty) => ty.clone(),
            SymbolKind::Error(_) => Type::Error(format!("unresolved name {}", self.0.name)),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.0.kind, SymbolKind::Error(_))
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl core::hash::Hash for Symbol {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state);
    }
}

impl core::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0.kind {
            SymbolKind::Value(ty) => write!(f, "Symbol({}:{ty})", self.0.name),
            SymbolKind::Error(tag) => write!(f, "Symbol({}:{tag})", self.0.name),
        }
    }
}

/// An explicit stack of name scopes, traversed innermost-first on lookup.
///
/// The bottom scope is the global scope and is pre-populated with the built-in
/// I/O functions. One table is owned by one tree-building traversal; there is
/// no ambient state.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<HashMap<String, Symbol>>,
    diagnostics: Vec<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut global = HashMap::new();

        for (name, ty) in [
            ("readInt", Type::func(vec![], Type::Int)),
            ("readChar", Type::func(vec![], Type::Int)),
            ("printBool", Type::func(vec![Type::Bool], Type::Void)),
            ("printInt", Type::func(vec![Type::Int], Type::Void)),
            ("printChar", Type::func(vec![Type::Int], Type::Void)),
            ("println", Type::func(vec![], Type::Void)),
        ] {
            global.insert(name.to_owned(), Symbol::new(name, ty));
        }

        SymbolTable {
            scopes: vec![global],
            diagnostics: Vec::new(),
        }
    }

    /// Opens a new innermost scope.
    pub fn enter(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Closes the innermost scope. The global scope is never popped.
    pub fn exit(&mut self) {
        assert!(
            self.scopes.len() > 1,
            "attempted to exit the global scope"
        );
        self.scopes.pop();
    }

    /// Binds `name` in the innermost scope. Redeclaring a name within its own
    /// scope records a diagnostic and yields a tagged error symbol.
    pub fn add(&mut self, position: Position, name: &str, ty: Type) -> Symbol {
        let current = self.scopes.last_mut().unwrap();

        if current.contains_key(name) {
            self.diagnostics
                .push(format!("DeclarationError{position}[{name} already declared.]"));
            return Symbol::new_error(name, "DeclarationError");
        }

        let symbol = Symbol::new(name, ty);
        current.insert(name.to_owned(), symbol.clone());
        symbol
    }

    /// Resolves `name` against the scope stack, innermost scope first. An
    /// unresolved name records a diagnostic and yields a tagged error symbol.
    pub fn lookup(&mut self, position: Position, name: &str) -> Symbol {
        match self.find(name) {
            Some(symbol) => symbol.clone(),
            None => {
                self.diagnostics
                    .push(format!("ResolveSymbolError{position}[Could not find {name}.]"));
                Symbol::new_error(name, "ResolveSymbolError")
            }
        }
    }

    fn find(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
