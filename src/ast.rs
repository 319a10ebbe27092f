//! Abstract Syntax Tree (AST) for Codex
//!
//! The AST represents the structure of a Codex program after parsing. Every region
//! whose code is produced by generation is an explicit node ([`Initializer::Described`],
//! [`ActionStmt`], [`FnBody::Described`], [`IterationSource::Described`]) carrying the
//! instruction text and hint list verbatim.

use crate::span::{Span, Spanned};
use serde::Serialize;
use std::fmt;

/// A unique identifier for declaration and statement nodes.
///
/// Ids are assigned in source order, so comparing ids compares declaration order.
pub type NodeId = u32;

/// A complete Codex program (compilation unit)
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub items: Vec<Item>,
    pub span: Span,
}

impl Program {
    /// Iterate over every `using` directive
    pub fn usings(&self) -> impl Iterator<Item = &UsingDirective> {
        self.items.iter().filter_map(|item| match item {
            Item::Using(u) => Some(u),
            _ => None,
        })
    }
}

/// Top-level items in a Codex program
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// Module import: `using math`
    Using(UsingDirective),

    /// Function definition: `fn add(int a, int b) -> int: the sum of a and b`
    Function(FnDef),

    /// A statement at the top level (global variable, action, or loop)
    Stmt(Stmt),
}

impl Spanned for Item {
    fn span(&self) -> Span {
        match self {
            Item::Using(u) => u.span,
            Item::Function(f) => f.span,
            Item::Stmt(s) => s.span(),
        }
    }
}

impl Item {
    /// Line the item starts on
    pub fn line(&self) -> u32 {
        match self {
            Item::Using(u) => u.line,
            Item::Function(f) => f.line,
            Item::Stmt(s) => s.line(),
        }
    }
}

/// A name as written in source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// `using <module>`
#[derive(Debug, Clone, PartialEq)]
pub struct UsingDirective {
    pub module: Ident,
    pub line: u32,
    pub span: Span,
}

// ============ Types ============

/// A Codex type annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodexType {
    Unknown,
    Bool,
    Int,
    Float,
    String,
    /// `array[T]`
    Array(Box<CodexType>),
    /// `map[K, V]`
    Map(Box<CodexType>, Box<CodexType>),
    /// Any other type name, passed through to the target
    Named(String),
}

impl CodexType {
    /// Resolve a base type name with its generic arguments.
    ///
    /// Missing generic arguments are filled with [`CodexType::Unknown`]. Returns an
    /// error message if too many arguments are given.
    pub fn from_parts(name: &str, mut args: Vec<CodexType>) -> Result<Self, String> {
        let arity = match name {
            "array" => 1,
            "map" => 2,
            _ => 0,
        };
        if args.len() > arity {
            return Err(if arity == 0 {
                format!("type `{}` does not take type arguments", name)
            } else {
                format!(
                    "type `{}` takes {} type argument(s), found {}",
                    name,
                    arity,
                    args.len()
                )
            });
        }
        args.resize(arity, CodexType::Unknown);
        let mut args = args.into_iter().map(Box::new);

        Ok(match name {
            "unknown" => CodexType::Unknown,
            "bool" => CodexType::Bool,
            "int" => CodexType::Int,
            "float" => CodexType::Float,
            "string" => CodexType::String,
            "array" => CodexType::Array(args.next().unwrap_or_default()),
            "map" => {
                let key = args.next().unwrap_or_default();
                let value = args.next().unwrap_or_default();
                CodexType::Map(key, value)
            }
            other => CodexType::Named(other.to_string()),
        })
    }

    /// Whether a loop over a value of this type walks its elements rather than counting
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            CodexType::Array(_) | CodexType::Map(_, _) | CodexType::String | CodexType::Named(_)
        )
    }
}

impl Default for CodexType {
    fn default() -> Self {
        CodexType::Unknown
    }
}

impl fmt::Display for CodexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodexType::Unknown => write!(f, "unknown"),
            CodexType::Bool => write!(f, "bool"),
            CodexType::Int => write!(f, "int"),
            CodexType::Float => write!(f, "float"),
            CodexType::String => write!(f, "string"),
            CodexType::Array(elem) if **elem == CodexType::Unknown => write!(f, "array"),
            CodexType::Array(elem) => write!(f, "array[{}]", elem),
            CodexType::Map(k, v) if **k == CodexType::Unknown && **v == CodexType::Unknown => {
                write!(f, "map")
            }
            CodexType::Map(k, v) => write!(f, "map[{}, {}]", k, v),
            CodexType::Named(name) => write!(f, "{}", name),
        }
    }
}

// ============ Prompts ============

/// A natural-language description plus its optional hint list
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    /// Description text, verbatim (continuation lines joined with `\n`)
    pub text: String,
    /// Explicit context hints: `[a, b]`
    pub hints: Option<Vec<Ident>>,
    pub span: Span,
}

impl Prompt {
    /// Hint names in source order, if a hint list was given
    pub fn hint_names(&self) -> Option<Vec<&str>> {
        self.hints
            .as_ref()
            .map(|hints| hints.iter().map(|h| h.name.as_str()).collect())
    }
}

// ============ Definitions ============

/// Function definition
#[derive(Debug, Clone, PartialEq)]
pub struct FnDef {
    pub id: NodeId,
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_type: Option<CodexType>,
    pub body: FnBody,
    pub line: u32,
    pub span: Span,
}

impl FnDef {
    pub fn signature(&self) -> Signature {
        Signature {
            name: self.name.name.clone(),
            params: self
                .params
                .iter()
                .map(|p| SignatureParam {
                    name: p.name.name.clone(),
                    ty: p.ty.clone(),
                })
                .collect(),
            return_type: self.return_type.clone(),
        }
    }
}

/// Function parameter. The type is absent for the untyped `fn f(a, b)` form.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: Option<CodexType>,
    pub span: Span,
}

/// Function body
#[derive(Debug, Clone, PartialEq)]
pub enum FnBody {
    /// Whole body described in natural language
    Described(Prompt),
    /// Indented block of statements
    Block(Block),
}

/// A function's name, parameters, and return type, detached from the tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Signature {
    pub name: String,
    pub params: Vec<SignatureParam>,
    pub return_type: Option<CodexType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SignatureParam {
    pub name: String,
    pub ty: Option<CodexType>,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match &param.ty {
                Some(ty) => write!(f, "{} {}", ty, param.name)?,
                None => write!(f, "{}", param.name)?,
            }
        }
        write!(f, ")")?;
        if let Some(ret) = &self.return_type {
            write!(f, " -> {}", ret)?;
        }
        Ok(())
    }
}

/// An indented block of statements
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

// ============ Statements ============

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var <type> <name>: <description>` or `var <type> <name> = <expr>`
    Var(VarDecl),
    /// `!: <description>`
    Action(ActionStmt),
    /// `for <source>: <summary> >`
    Loop(LoopStmt),
}

impl Stmt {
    pub fn id(&self) -> NodeId {
        match self {
            Stmt::Var(v) => v.id,
            Stmt::Action(a) => a.id,
            Stmt::Loop(l) => l.id,
        }
    }

    pub fn line(&self) -> u32 {
        match self {
            Stmt::Var(v) => v.line,
            Stmt::Action(a) => a.line,
            Stmt::Loop(l) => l.line,
        }
    }
}

impl Spanned for Stmt {
    fn span(&self) -> Span {
        match self {
            Stmt::Var(v) => v.span,
            Stmt::Action(a) => a.span,
            Stmt::Loop(l) => l.span,
        }
    }
}

/// Variable declaration
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub id: NodeId,
    pub ty: CodexType,
    pub name: Ident,
    pub init: Initializer,
    pub line: u32,
    pub span: Span,
}

/// Variable initializer
#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    /// Target-language expression copied verbatim: `= 42`
    Expr(String),
    /// Generated from a description: `: a random number`
    Described(Prompt),
}

/// Action statement
#[derive(Debug, Clone, PartialEq)]
pub struct ActionStmt {
    pub id: NodeId,
    pub prompt: Prompt,
    pub line: u32,
    pub span: Span,
}

/// Loop statement
#[derive(Debug, Clone, PartialEq)]
pub struct LoopStmt {
    pub id: NodeId,
    pub source: IterationSource,
    /// Natural-language summary of what one iteration does
    pub summary: String,
    pub body: Block,
    pub line: u32,
    pub span: Span,
}

/// What a loop iterates over
#[derive(Debug, Clone, PartialEq)]
pub enum IterationSource {
    /// `for 10: ...`
    Count(u64),
    /// `for [turns]: ...` or `for turns: ...`
    Symbol(Ident),
    /// `for each line of the input: ...`, generated as an iterable expression
    Described(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_from_parts() {
        assert_eq!(CodexType::from_parts("int", vec![]), Ok(CodexType::Int));
        assert_eq!(
            CodexType::from_parts("array", vec![]),
            Ok(CodexType::Array(Box::new(CodexType::Unknown)))
        );
        assert_eq!(
            CodexType::from_parts("map", vec![CodexType::String]),
            Ok(CodexType::Map(
                Box::new(CodexType::String),
                Box::new(CodexType::Unknown)
            ))
        );
        assert_eq!(
            CodexType::from_parts("Player", vec![]),
            Ok(CodexType::Named("Player".to_string()))
        );
        assert!(CodexType::from_parts("int", vec![CodexType::Int]).is_err());
        assert!(CodexType::from_parts("array", vec![CodexType::Int, CodexType::Int]).is_err());
    }

    #[test]
    fn test_type_display() {
        let ty = CodexType::Map(
            Box::new(CodexType::String),
            Box::new(CodexType::Array(Box::new(CodexType::Int))),
        );
        assert_eq!(ty.to_string(), "map[string, array[int]]");
        assert_eq!(
            CodexType::Array(Box::new(CodexType::Unknown)).to_string(),
            "array"
        );
    }

    #[test]
    fn test_signature_display() {
        let sig = Signature {
            name: "add".to_string(),
            params: vec![
                SignatureParam {
                    name: "a".to_string(),
                    ty: Some(CodexType::Int),
                },
                SignatureParam {
                    name: "b".to_string(),
                    ty: None,
                },
            ],
            return_type: Some(CodexType::Int),
        };
        assert_eq!(sig.to_string(), "fn add(int a, b) -> int");
    }
}
