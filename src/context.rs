//! Context extraction
//!
//! For every natural-language fragment in a program this module computes the context
//! payload sent to the generator alongside the instruction: the symbols visible at the
//! fragment (or exactly the hinted ones), the enclosing function signature, and the
//! declared type the fragment should produce.
//!
//! Extraction is a pure function of the program and its symbol table.

use crate::ast::*;
use crate::scope::{Site, SymbolKind, SymbolTable};
use log::debug;
use serde::Serialize;
use thiserror::Error;

/// Errors found while resolving names used by fragments and imports
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScopeError {
    #[error("line {line}: `{name}` is not declared before this point")]
    Undeclared { name: String, line: u32 },

    #[error("line {line}: cannot loop over `{name}`, a bool is neither a count nor a collection")]
    NotIterable { name: String, line: u32 },

    #[error("line {line}: unknown module `{module}`")]
    UnknownModule { module: String, line: u32 },

    #[error("line {line}: module `{module}` is not available for {target}")]
    UnsupportedModule {
        module: String,
        target: String,
        line: u32,
    },
}

impl ScopeError {
    pub fn line(&self) -> u32 {
        match self {
            ScopeError::Undeclared { line, .. }
            | ScopeError::NotIterable { line, .. }
            | ScopeError::UnknownModule { line, .. }
            | ScopeError::UnsupportedModule { line, .. } => *line,
        }
    }
}

/// One symbol as presented to the generator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContextSymbol {
    pub name: String,
    pub ty: Option<CodexType>,
    pub kind: SymbolKind,
}

/// Everything the generator is told about a fragment's surroundings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Default)]
pub struct ContextPayload {
    /// Visible symbols, innermost scope first; exactly the hinted symbols when hints exist
    pub symbols: Vec<ContextSymbol>,
    /// Signature of the enclosing function
    pub signature: Option<Signature>,
    /// The explicit hint list, verbatim
    pub hints: Option<Vec<String>>,
    /// Declared type the fragment must produce
    pub site_type: Option<CodexType>,
}

/// What a fragment fills in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FragmentKind {
    /// Expression initializing the named variable
    Initializer { name: String },
    /// One or more statements
    Action,
    /// A whole function body
    FunctionBody,
    /// An iterable expression for a loop header
    LoopSource,
}

/// A fragment together with its extracted context
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FragmentSite {
    pub id: NodeId,
    pub line: u32,
    pub kind: FragmentKind,
    pub instruction: String,
    pub payload: ContextPayload,
}

/// Extract the context for every fragment in the program.
///
/// All sites are visited even after an error, so the result carries every
/// [`ScopeError`] in source order.
pub fn extract(program: &Program, table: &SymbolTable) -> Result<Vec<FragmentSite>, Vec<ScopeError>> {
    let mut extractor = Extractor {
        table,
        sites: Vec::new(),
        errors: Vec::new(),
    };

    for item in &program.items {
        match item {
            Item::Using(_) => {}
            Item::Function(f) => extractor.visit_fn(f),
            Item::Stmt(stmt) => extractor.visit_stmt(stmt),
        }
    }

    if extractor.errors.is_empty() {
        debug!("extracted {} fragment site(s)", extractor.sites.len());
        Ok(extractor.sites)
    } else {
        Err(extractor.errors)
    }
}

struct Extractor<'t> {
    table: &'t SymbolTable,
    sites: Vec<FragmentSite>,
    errors: Vec<ScopeError>,
}

impl<'t> Extractor<'t> {
    fn site_of(&self, id: NodeId) -> Option<Site> {
        let site = self.table.site(id);
        if site.is_none() {
            debug!("node {} has no recorded site", id);
        }
        site
    }

    fn visit_fn(&mut self, f: &FnDef) {
        match &f.body {
            FnBody::Described(prompt) => {
                self.fragment(
                    f.id,
                    f.line,
                    FragmentKind::FunctionBody,
                    prompt,
                    f.return_type.clone(),
                );
            }
            FnBody::Block(block) => self.visit_block(block),
        }
    }

    fn visit_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(v) => {
                if let Initializer::Described(prompt) = &v.init {
                    self.fragment(
                        v.id,
                        v.line,
                        FragmentKind::Initializer {
                            name: v.name.name.clone(),
                        },
                        prompt,
                        Some(v.ty.clone()),
                    );
                }
            }
            Stmt::Action(a) => {
                self.fragment(a.id, a.line, FragmentKind::Action, &a.prompt, None);
            }
            Stmt::Loop(l) => {
                self.visit_loop_source(l);
                self.visit_block(&l.body);
            }
        }
    }

    fn visit_loop_source(&mut self, l: &LoopStmt) {
        let Some(site) = self.site_of(l.id) else {
            return;
        };
        match &l.source {
            IterationSource::Count(_) => {}
            IterationSource::Symbol(sym) => {
                match self.table.resolve_visible(&sym.name, site) {
                    None => self.errors.push(ScopeError::Undeclared {
                        name: sym.name.clone(),
                        line: l.line,
                    }),
                    Some(resolved) if resolved.ty() == Some(&CodexType::Bool) => {
                        self.errors.push(ScopeError::NotIterable {
                            name: sym.name.clone(),
                            line: l.line,
                        })
                    }
                    Some(_) => {}
                }
            }
            IterationSource::Described(text) => {
                let payload = self.payload(site, None, None, l.line);
                if let Some(payload) = payload {
                    self.sites.push(FragmentSite {
                        id: l.id,
                        line: l.line,
                        kind: FragmentKind::LoopSource,
                        instruction: text.clone(),
                        payload,
                    });
                }
            }
        }
    }

    fn fragment(
        &mut self,
        id: NodeId,
        line: u32,
        kind: FragmentKind,
        prompt: &Prompt,
        site_type: Option<CodexType>,
    ) {
        let Some(site) = self.site_of(id) else {
            return;
        };
        if let Some(payload) = self.payload(site, prompt.hints.as_deref(), site_type, line) {
            self.sites.push(FragmentSite {
                id,
                line,
                kind,
                instruction: prompt.text.clone(),
                payload,
            });
        }
    }

    /// Build the payload for a site, recording any undeclared hints
    fn payload(
        &mut self,
        site: Site,
        hints: Option<&[Ident]>,
        site_type: Option<CodexType>,
        line: u32,
    ) -> Option<ContextPayload> {
        let signature = self.table.enclosing_signature(site.scope).cloned();

        let symbols = match hints {
            Some(hints) => {
                let mut symbols = Vec::with_capacity(hints.len());
                let mut ok = true;
                for hint in hints {
                    match self.table.resolve_visible(&hint.name, site) {
                        Some(resolved) => symbols.push(ContextSymbol {
                            name: resolved.symbol.name.clone(),
                            ty: resolved.symbol.ty.clone(),
                            kind: resolved.symbol.kind,
                        }),
                        None => {
                            ok = false;
                            self.errors.push(ScopeError::Undeclared {
                                name: hint.name.clone(),
                                line,
                            });
                        }
                    }
                }
                if !ok {
                    return None;
                }
                symbols
            }
            None => self
                .table
                .visible_symbols(site)
                .into_iter()
                .map(|symbol| ContextSymbol {
                    name: symbol.name.clone(),
                    ty: symbol.ty.clone(),
                    kind: symbol.kind,
                })
                .collect(),
        };

        Some(ContextPayload {
            symbols,
            signature,
            hints: hints.map(|hints| hints.iter().map(|h| h.name.clone()).collect()),
            site_type,
        })
    }
}
