//! Symbol table and scope tracking
//!
//! The table is a read-only index derived from a [`Program`](crate::ast::Program):
//! one [`Scope`] per block (the program, each function, each loop body) with parent
//! links for outward lookup. It is rebuilt for every compilation and never mutates the
//! tree.
//!
//! Every fragment site records the scope it sits in and the declaration sequence number
//! current at that point, so "visible at this site" means "declared in this scope or an
//! ancestor, before the site".

mod builder;

pub use builder::build;

use crate::ast::{CodexType, NodeId, Signature};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Index of a scope in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

impl ScopeId {
    /// The program (outermost) scope
    pub const PROGRAM: ScopeId = ScopeId(0);
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeKind {
    Program,
    Function(Signature),
    Loop(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Variable,
    Function,
    Parameter,
    LoopVariable,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Variable => write!(f, "variable"),
            SymbolKind::Function => write!(f, "function"),
            SymbolKind::Parameter => write!(f, "parameter"),
            SymbolKind::LoopVariable => write!(f, "loop variable"),
        }
    }
}

/// A declared name
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    /// Declared type, absent for untyped parameters and generated loop variables
    pub ty: Option<CodexType>,
    pub kind: SymbolKind,
    /// The declaring node
    pub decl: NodeId,
    pub line: u32,
    /// Global declaration sequence number
    pub seq: u32,
}

/// A scope contains symbol bindings in declaration order
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    symbols: Vec<Symbol>,
    index: HashMap<String, usize>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            symbols: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Symbols declared directly in this scope, in declaration order
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.index.get(name).map(|&i| &self.symbols[i])
    }

    fn insert(&mut self, symbol: Symbol) -> Result<(), &Symbol> {
        if let Some(&existing) = self.index.get(&symbol.name) {
            return Err(&self.symbols[existing]);
        }
        self.index.insert(symbol.name.clone(), self.symbols.len());
        self.symbols.push(symbol);
        Ok(())
    }
}

/// Where a fragment sits: its scope and the declaration count at that point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Site {
    pub scope: ScopeId,
    pub seq: u32,
}

/// Result of a successful lookup
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub symbol: &'a Symbol,
    pub scope: ScopeId,
}

impl<'a> Resolved<'a> {
    pub fn ty(&self) -> Option<&'a CodexType> {
        self.symbol.ty.as_ref()
    }
}

/// How a loop walks its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopIteration {
    /// Fixed number of iterations
    Count(u64),
    /// Count up to the value of a numeric symbol, truncating a `fractional` one first
    Range { bound: String, fractional: bool },
    /// Walk the elements of a symbol
    Elements(String),
    /// Walk the keys of a map symbol
    Keys(String),
    /// Walk the elements of a generated expression
    Generated,
}

/// The loop variable and iteration strategy chosen for a loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopPlan {
    pub binding: String,
    pub iteration: LoopIteration,
}

/// Derived index over all scopes of one program
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    sites: HashMap<NodeId, Site>,
    loops: HashMap<NodeId, LoopPlan>,
}

impl SymbolTable {
    fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Program, None)],
            sites: HashMap::new(),
            loops: HashMap::new(),
        }
    }

    fn push_scope(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope::new(kind, Some(parent)));
        ScopeId(self.scopes.len() - 1)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Iterate from `from` to the program scope
    fn chain(&self, from: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(from), move |id| self.scopes[id.0].parent)
    }

    /// Look up `name` starting at `from` and walking outward. First match wins.
    pub fn resolve(&self, name: &str, from: ScopeId) -> Option<Resolved<'_>> {
        self.chain(from).find_map(|id| {
            self.scope(id)
                .get(name)
                .map(|symbol| Resolved { symbol, scope: id })
        })
    }

    /// Like [`SymbolTable::resolve`], but only considers symbols declared before `site`
    pub fn resolve_visible(&self, name: &str, site: Site) -> Option<Resolved<'_>> {
        self.chain(site.scope).find_map(|id| {
            self.scope(id)
                .get(name)
                .filter(|symbol| symbol.seq < site.seq)
                .map(|symbol| Resolved { symbol, scope: id })
        })
    }

    /// Every symbol visible at `site`: innermost scope first, declaration order within a
    /// scope, shadowed names omitted
    pub fn visible_symbols(&self, site: Site) -> Vec<&Symbol> {
        let mut seen: Vec<&str> = Vec::new();
        let mut visible = Vec::new();

        for id in self.chain(site.scope) {
            for symbol in self.scope(id).symbols() {
                if symbol.seq >= site.seq || seen.contains(&symbol.name.as_str()) {
                    continue;
                }
                seen.push(&symbol.name);
                visible.push(symbol);
            }
        }

        visible
    }

    /// The fragment site recorded for a node
    pub fn site(&self, id: NodeId) -> Option<Site> {
        self.sites.get(&id).copied()
    }

    /// The iteration plan chosen for a loop
    pub fn loop_plan(&self, id: NodeId) -> Option<&LoopPlan> {
        self.loops.get(&id)
    }

    /// Signature of the innermost function enclosing `scope`
    pub fn enclosing_signature(&self, scope: ScopeId) -> Option<&Signature> {
        self.chain(scope).find_map(|id| match &self.scope(id).kind {
            ScopeKind::Function(sig) => Some(sig),
            _ => None,
        })
    }
}
