//! Target languages
//!
//! Each target declares a small set of emission rules: how to spell types, declarations,
//! function and loop skeletons, comments, imports, and statement termination. The
//! assembler is written purely against [`EmissionRules`].

mod python;
pub mod stdlib;
mod typescript;

pub use python::Python;
pub use stdlib::{resolve_imports, ImportPlan, StdModule, Warning, STANDARD_MODULES};
pub use typescript::TypeScript;

use crate::ast::{CodexType, Signature};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The languages Codex can compile to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetLanguage {
    #[default]
    Python,
    TypeScript,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("unknown target language `{0}` (expected one of: python3, typescript)")]
pub struct UnknownTarget(pub String);

impl TargetLanguage {
    pub const ALL: [TargetLanguage; 2] = [TargetLanguage::Python, TargetLanguage::TypeScript];

    /// Canonical name, as accepted on the command line
    pub fn name(&self) -> &'static str {
        match self {
            TargetLanguage::Python => "python3",
            TargetLanguage::TypeScript => "typescript",
        }
    }

    /// Emission rules for this target
    pub fn rules(&self) -> &'static dyn EmissionRules {
        match self {
            TargetLanguage::Python => &Python,
            TargetLanguage::TypeScript => &TypeScript,
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetLanguage {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python3" | "python" | "py" => Ok(TargetLanguage::Python),
            "typescript" | "ts" => Ok(TargetLanguage::TypeScript),
            _ => Err(UnknownTarget(s.to_string())),
        }
    }
}

impl TryFrom<String> for TargetLanguage {
    type Error = UnknownTarget;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetLanguage> for String {
    fn from(target: TargetLanguage) -> Self {
        target.name().to_string()
    }
}

/// How a target provides a standard module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleSupport {
    /// Needs this import line in the output header
    Import(String),
    /// Available without an import
    Builtin,
    /// Cannot be used with this target
    Unsupported,
}

/// Loop header shape handed to [`EmissionRules::loop_open`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopHeader<'a> {
    /// `n` iterations
    Count(u64),
    /// As many iterations as the value of the named symbol, truncated when `fractional`
    Range { bound: &'a str, fractional: bool },
    /// Each element of an iterable expression
    Elements(&'a str),
    /// Each key of a map
    Keys(&'a str),
}

/// Per-target emission rules
pub trait EmissionRules: Send + Sync {
    fn target(&self) -> TargetLanguage;

    fn display_name(&self) -> &'static str;

    fn file_extension(&self) -> &'static str;

    /// One-line summary shown by `codexc languages`
    fn description(&self) -> &'static str;

    fn indent_unit(&self) -> &'static str {
        "    "
    }

    /// Line comment marker, without trailing space
    fn line_comment(&self) -> &'static str;

    /// Comment out `text`, one comment line per text line
    fn comment(&self, text: &str) -> String {
        text.lines()
            .map(|line| format!("{} {}", self.line_comment(), line).trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Characters that open and close a string literal
    fn string_delimiters(&self) -> &'static [char];

    /// Whether tripled delimiters open a string that may span lines
    fn triple_quoted_strings(&self) -> bool {
        false
    }

    /// Delimiters whose strings may span lines without being tripled
    fn multiline_delimiters(&self) -> &'static [char] {
        &[]
    }

    /// Type annotation for a Codex type. `None` leaves the annotation out.
    fn type_expr(&self, ty: &CodexType) -> Option<String>;

    fn module_support(&self, module: &StdModule) -> ModuleSupport;

    /// A complete variable declaration with its initial value
    fn variable_decl(&self, name: &str, ty: &CodexType, value: &str) -> String;

    /// The line opening a function definition
    fn function_open(&self, signature: &Signature) -> String;

    fn function_close(&self) -> Option<&'static str>;

    /// The line opening a loop, or `None` if the target cannot express it
    fn loop_open(&self, binding: &str, header: LoopHeader<'_>) -> Option<String>;

    fn loop_close(&self) -> Option<&'static str>;

    /// Filler for a block with no statements
    fn empty_block(&self) -> Option<&'static str>;

    /// Apply the statement-separator convention to one emitted line
    fn terminate(&self, line: &str) -> String {
        line.to_string()
    }
}
