//! Building the symbol table from a parsed program

use super::{LoopIteration, LoopPlan, ScopeId, ScopeKind, Site, Symbol, SymbolKind, SymbolTable};
use crate::ast::*;
use crate::parser::SyntaxError;
use log::debug;

const COUNTERS: [&str; 3] = ["i", "j", "k"];

/// Build the symbol table for a program.
///
/// Duplicate declarations within one scope are reported as
/// [`SyntaxError::DuplicateDeclaration`]; the first declaration is kept.
pub fn build(program: &Program) -> (SymbolTable, Vec<SyntaxError>) {
    let mut builder = ScopeBuilder {
        table: SymbolTable::new(),
        current: ScopeId::PROGRAM,
        seq: 0,
        counting_depth: 0,
        element_depth: 0,
        errors: Vec::new(),
    };

    for item in &program.items {
        match item {
            Item::Using(_) => {}
            Item::Function(f) => builder.visit_fn(f),
            Item::Stmt(stmt) => builder.visit_stmt(stmt),
        }
    }

    debug!(
        "built {} scope(s) with {} declaration(s)",
        builder.table.scope_count(),
        builder.seq
    );
    (builder.table, builder.errors)
}

struct ScopeBuilder {
    table: SymbolTable,
    current: ScopeId,
    seq: u32,
    counting_depth: usize,
    element_depth: usize,
    errors: Vec<SyntaxError>,
}

impl ScopeBuilder {
    fn site(&self) -> Site {
        Site {
            scope: self.current,
            seq: self.seq,
        }
    }

    fn record_site(&mut self, id: NodeId) {
        let site = self.site();
        self.table.sites.insert(id, site);
    }

    fn declare(
        &mut self,
        name: &str,
        ty: Option<CodexType>,
        kind: SymbolKind,
        decl: NodeId,
        line: u32,
    ) {
        let symbol = Symbol {
            name: name.to_string(),
            ty,
            kind,
            decl,
            line,
            seq: self.seq,
        };
        let scope = &mut self.table.scopes[self.current.0];
        match scope.insert(symbol) {
            Ok(()) => self.seq += 1,
            Err(previous) => {
                let previous = previous.line;
                self.errors.push(SyntaxError::DuplicateDeclaration {
                    name: name.to_string(),
                    line,
                    previous,
                });
            }
        }
    }

    fn enter_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let outer = self.current;
        self.current = self.table.push_scope(kind, outer);
        outer
    }

    fn leave_scope(&mut self, outer: ScopeId) {
        self.current = outer;
    }

    fn visit_fn(&mut self, f: &FnDef) {
        self.declare(
            &f.name.name,
            f.return_type.clone(),
            SymbolKind::Function,
            f.id,
            f.line,
        );

        let outer = self.enter_scope(ScopeKind::Function(f.signature()));
        for param in &f.params {
            self.declare(
                &param.name.name,
                param.ty.clone(),
                SymbolKind::Parameter,
                f.id,
                f.line,
            );
        }
        self.record_site(f.id);
        if let FnBody::Block(block) = &f.body {
            self.visit_block(block);
        }
        self.leave_scope(outer);
    }

    fn visit_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(v) => {
                self.record_site(v.id);
                self.declare(
                    &v.name.name,
                    Some(v.ty.clone()),
                    SymbolKind::Variable,
                    v.id,
                    v.line,
                );
            }
            Stmt::Action(a) => self.record_site(a.id),
            Stmt::Loop(l) => self.visit_loop(l),
        }
    }

    fn visit_loop(&mut self, l: &LoopStmt) {
        self.record_site(l.id);
        let site = self.site();

        let (iteration, element_ty) = match &l.source {
            IterationSource::Count(n) => (LoopIteration::Count(*n), Some(CodexType::Int)),
            IterationSource::Symbol(sym) => {
                let ty = self
                    .table
                    .resolve_visible(&sym.name, site)
                    .and_then(|r| r.ty().cloned());
                let name = sym.name.clone();
                match ty {
                    // bool bounds are rejected during context extraction
                    Some(CodexType::Int) | Some(CodexType::Bool) => (
                        LoopIteration::Range {
                            bound: name,
                            fractional: false,
                        },
                        Some(CodexType::Int),
                    ),
                    Some(CodexType::Float) => (
                        LoopIteration::Range {
                            bound: name,
                            fractional: true,
                        },
                        Some(CodexType::Int),
                    ),
                    Some(CodexType::Map(key, _)) => (LoopIteration::Keys(name), known(*key)),
                    Some(CodexType::Array(elem)) => (LoopIteration::Elements(name), known(*elem)),
                    Some(CodexType::String) => {
                        (LoopIteration::Elements(name), Some(CodexType::String))
                    }
                    _ => (LoopIteration::Elements(name), None),
                }
            }
            IterationSource::Described(_) => (LoopIteration::Generated, None),
        };

        let counting = matches!(
            iteration,
            LoopIteration::Count(_) | LoopIteration::Range { .. }
        );
        let depth = if counting {
            self.counting_depth
        } else {
            self.element_depth
        };
        let mut taken = declared_names(&l.body);
        if let IterationSource::Symbol(sym) = &l.source {
            taken.push(sym.name.clone());
        }
        let table = &self.table;
        let binding = binding_name(counting, depth, |name| {
            taken.iter().any(|t| t == name) || table.resolve_visible(name, site).is_some()
        });

        let outer = self.enter_scope(ScopeKind::Loop(l.id));
        self.declare(&binding, element_ty, SymbolKind::LoopVariable, l.id, l.line);

        if counting {
            self.counting_depth += 1;
        } else {
            self.element_depth += 1;
        }
        self.visit_block(&l.body);
        if counting {
            self.counting_depth -= 1;
        } else {
            self.element_depth -= 1;
        }

        self.leave_scope(outer);
        self.table.loops.insert(l.id, LoopPlan { binding, iteration });
    }
}

fn known(ty: CodexType) -> Option<CodexType> {
    match ty {
        CodexType::Unknown => None,
        ty => Some(ty),
    }
}

/// Every name a `var` declares anywhere inside `block`, nested loops included
fn declared_names(block: &Block) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in &block.stmts {
        match stmt {
            Stmt::Var(v) => names.push(v.name.name.clone()),
            Stmt::Loop(l) => names.extend(declared_names(&l.body)),
            Stmt::Action(_) => {}
        }
    }
    names
}

/// Pick the loop variable name for a loop at `depth`, skipping every name `is_taken` rejects
fn binding_name(counting: bool, depth: usize, is_taken: impl Fn(&str) -> bool) -> String {
    (depth..)
        .map(|n| match (counting, n) {
            (true, n) if n < COUNTERS.len() => COUNTERS[n].to_string(),
            (true, n) => format!("i{}", n + 1),
            (false, 0) => "item".to_string(),
            (false, n) => format!("item{}", n + 1),
        })
        .find(|name| !is_taken(name))
        .unwrap_or_else(|| "item".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn scope_errors(source: &str) -> Vec<SyntaxError> {
        let (program, errors) = parse(source);
        assert!(errors.is_empty(), "Parse errors: {:?}", errors);
        build(&program).1
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        let errors = scope_errors("fn f() >\n    var int x: one\n    var int x: two");
        assert_eq!(
            errors,
            vec![SyntaxError::DuplicateDeclaration {
                name: "x".to_string(),
                line: 3,
                previous: 2
            }]
        );
    }

    #[test]
    fn test_duplicate_parameter() {
        let errors = scope_errors("fn f(int a, string a): nonsense");
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], SyntaxError::DuplicateDeclaration { name, .. } if name == "a"));
    }

    #[test]
    fn test_duplicate_function() {
        let errors = scope_errors("fn f(): one\nfn f(): two");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_shadowing_across_scopes_is_allowed() {
        let errors = scope_errors("var int x: one\nfn f() >\n    var int x: two\n    for 2: again >\n        var int x: three");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_binding_names() {
        let free = |_: &str| false;
        assert_eq!(binding_name(true, 0, free), "i");
        assert_eq!(binding_name(true, 2, free), "k");
        assert_eq!(binding_name(true, 3, free), "i4");
        assert_eq!(binding_name(false, 0, free), "item");
        assert_eq!(binding_name(false, 1, free), "item2");
        assert_eq!(binding_name(true, 0, |name| name == "i" || name == "j"), "k");
    }

    fn bindings(source: &str) -> Vec<String> {
        let (program, errors) = parse(source);
        assert!(errors.is_empty(), "Parse errors: {:?}", errors);
        let (table, errors) = build(&program);
        assert!(errors.is_empty(), "Scope errors: {:?}", errors);
        let mut plans: Vec<(NodeId, String)> = table
            .loops
            .iter()
            .map(|(id, plan)| (*id, plan.binding.clone()))
            .collect();
        plans.sort();
        plans.into_iter().map(|(_, binding)| binding).collect()
    }

    #[test]
    fn test_binding_skips_the_bound_and_visible_names() {
        assert_eq!(bindings("var int i = 3\nfor [i]: i times >\n    !: act"), vec!["j"]);
        assert_eq!(bindings("fn f(int i) >\n    for 2: twice >\n        !: act"), vec!["j"]);
        assert_eq!(
            bindings("var array[int] item = [1]\nfor [item]: each >\n    !: act"),
            vec!["item2"]
        );
    }

    #[test]
    fn test_binding_skips_names_declared_in_nested_blocks() {
        let source = "for 2: twice >\n    for 3: thrice >\n        var int i = 0\n";
        assert_eq!(bindings(source), vec!["j", "k"]);
    }

    #[test]
    fn test_loop_iteration_by_source_type() {
        let source = "\
var float x = 2.5
var map[string, int] ages = {}
for [x]: a few times >
    !: act
for [ages]: each person >
    !: greet
";
        let (program, _) = parse(source);
        let (table, errors) = build(&program);
        assert!(errors.is_empty());
        assert_eq!(
            table.loop_plan(2).map(|p| &p.iteration),
            Some(&LoopIteration::Range {
                bound: "x".to_string(),
                fractional: true
            })
        );
        let keys = table.loop_plan(4).expect("plan");
        assert_eq!(keys.iteration, LoopIteration::Keys("ages".to_string()));
        let item = table
            .resolve_visible("item", table.site(5).expect("site"))
            .expect("item");
        assert_eq!(item.ty(), Some(&CodexType::String));
    }
}
