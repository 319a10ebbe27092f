//! Standard modules and import resolution
//!
//! `using <module>` names a Codex standard module. Each target decides whether the
//! module needs an import line, is built in, or is unavailable.

use super::{ModuleSupport, TargetLanguage};
use crate::ast::Program;
use crate::context::ScopeError;
use log::{debug, warn};
use serde::Serialize;
use std::fmt;

/// A module in the `using` namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StdModule {
    pub name: &'static str,
    pub description: &'static str,
    /// Words in a description that suggest the module is needed. Case-insensitive.
    pub keywords: &'static [&'static str],
    /// Imported whether or not the program asks for it
    pub default: bool,
}

pub const STANDARD_MODULES: [StdModule; 6] = [
    StdModule {
        name: "array",
        description: "Provides a generic array type.",
        keywords: &["array", "vector", "list"],
        default: true,
    },
    StdModule {
        name: "math",
        description: "Provides math functions.",
        keywords: &["math", "sqrt", "cos", "sin", "tan", "cosine", "sine", "tangent"],
        default: true,
    },
    StdModule {
        name: "fs",
        description: "Provides functions for reading and writing to files.",
        keywords: &[],
        default: false,
    },
    StdModule {
        name: "json",
        description: "Provides functions for reading and writing JSON.",
        keywords: &["json"],
        default: false,
    },
    StdModule {
        name: "random",
        description: "Provides functions for generating random numbers.",
        keywords: &["random", "rand", "randomize"],
        default: false,
    },
    StdModule {
        name: "linalg",
        description: "Provides functions for linear algebra and matrix operations.",
        keywords: &["matrix", "2d array", "nd array"],
        default: false,
    },
];

/// Find a standard module by name
pub fn lookup(name: &str) -> Option<&'static StdModule> {
    STANDARD_MODULES.iter().find(|m| m.name == name)
}

/// A non-fatal diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub line: u32,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// The modules a program uses and the import lines they need
#[derive(Debug, Clone, PartialEq)]
pub struct ImportPlan {
    modules: Vec<&'static StdModule>,
    imports: Vec<String>,
    warnings: Vec<Warning>,
}

impl ImportPlan {
    /// Modules in resolution order, defaults first
    pub fn modules(&self) -> &[&'static StdModule] {
        &self.modules
    }

    /// Import lines for the output header
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn includes(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name == name)
    }

    /// Warn about descriptions that mention a keyword of a module that was not imported.
    /// At most one warning per module per fragment.
    pub fn keyword_warnings(&self, line: u32, text: &str) -> Vec<Warning> {
        let lower = text.to_lowercase();
        STANDARD_MODULES
            .iter()
            .filter(|m| !m.default && !self.includes(m.name))
            .filter_map(|m| {
                let keyword = m.keywords.iter().find(|k| mentions(&lower, k))?;
                Some(Warning {
                    line,
                    message: format!(
                        "description mentions `{}`; did you mean to add `using {}`?",
                        keyword, m.name
                    ),
                })
            })
            .collect()
    }
}

/// Whole-word, case-folded containment
fn mentions(haystack: &str, keyword: &str) -> bool {
    haystack.match_indices(keyword).any(|(start, _)| {
        let end = start + keyword.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.map_or(false, char::is_alphanumeric) && !after.map_or(false, char::is_alphanumeric)
    })
}

/// Resolve every `using` directive for a target.
///
/// Unknown and unsupported modules are errors; redundant imports are warnings.
pub fn resolve_imports(
    program: &Program,
    target: TargetLanguage,
) -> Result<ImportPlan, Vec<ScopeError>> {
    let rules = target.rules();
    let mut plan = ImportPlan {
        modules: STANDARD_MODULES.iter().filter(|m| m.default).collect(),
        imports: Vec::new(),
        warnings: Vec::new(),
    };
    let mut errors = Vec::new();

    for using in program.usings() {
        let name = using.module.name.as_str();
        let Some(module) = lookup(name) else {
            errors.push(ScopeError::UnknownModule {
                module: name.to_string(),
                line: using.line,
            });
            continue;
        };

        if rules.module_support(module) == ModuleSupport::Unsupported {
            errors.push(ScopeError::UnsupportedModule {
                module: name.to_string(),
                target: rules.display_name().to_string(),
                line: using.line,
            });
            continue;
        }

        if plan.includes(name) {
            let message = if module.default {
                format!("module `{}` is included by default", name)
            } else {
                format!("module `{}` is already imported", name)
            };
            warn!("line {}: {}", using.line, message);
            plan.warnings.push(Warning {
                line: using.line,
                message,
            });
            continue;
        }

        plan.modules.push(module);
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    plan.imports = plan
        .modules
        .iter()
        .filter_map(|m| match rules.module_support(m) {
            ModuleSupport::Import(line) => Some(line),
            _ => None,
        })
        .collect();
    debug!(
        "resolved {} module(s), {} import line(s) for {}",
        plan.modules.len(),
        plan.imports.len(),
        target
    );
    Ok(plan)
}
