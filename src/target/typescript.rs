//! TypeScript emission rules

use super::{EmissionRules, LoopHeader, ModuleSupport, StdModule, TargetLanguage};
use crate::ast::{CodexType, Signature};

/// Largest integer a JavaScript number holds exactly
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Leading words of lines that never take a trailing `;`
const CONTROL_WORDS: [&str; 9] = [
    "if", "for", "while", "else", "do", "try", "switch", "function", "class",
];

pub struct TypeScript;

impl EmissionRules for TypeScript {
    fn target(&self) -> TargetLanguage {
        TargetLanguage::TypeScript
    }

    fn display_name(&self) -> &'static str {
        "TypeScript"
    }

    fn file_extension(&self) -> &'static str {
        "ts"
    }

    fn description(&self) -> &'static str {
        "JavaScript with static types. Runs anywhere JavaScript runs once compiled with tsc."
    }

    fn line_comment(&self) -> &'static str {
        "//"
    }

    fn string_delimiters(&self) -> &'static [char] {
        &['"', '\'', '`']
    }

    fn multiline_delimiters(&self) -> &'static [char] {
        &['`']
    }

    /// Generic types with an unknown argument are left unannotated
    fn type_expr(&self, ty: &CodexType) -> Option<String> {
        Some(match ty {
            CodexType::Unknown => return None,
            CodexType::Bool => "boolean".to_string(),
            CodexType::Int | CodexType::Float => "number".to_string(),
            CodexType::String => "string".to_string(),
            CodexType::Array(elem) => format!("Array<{}>", self.type_expr(elem)?),
            CodexType::Map(key, value) => {
                format!("Map<{}, {}>", self.type_expr(key)?, self.type_expr(value)?)
            }
            CodexType::Named(name) => name.clone(),
        })
    }

    fn module_support(&self, module: &StdModule) -> ModuleSupport {
        match module.name {
            "fs" => ModuleSupport::Import("import * as fs from \"fs\";".to_string()),
            "linalg" => ModuleSupport::Unsupported,
            _ => ModuleSupport::Builtin,
        }
    }

    fn variable_decl(&self, name: &str, ty: &CodexType, value: &str) -> String {
        match self.type_expr(ty) {
            Some(ty) => format!("let {}: {} = {}", name, ty, value),
            None => format!("let {} = {}", name, value),
        }
    }

    fn function_open(&self, signature: &Signature) -> String {
        let params: Vec<String> = signature
            .params
            .iter()
            .map(|p| match p.ty.as_ref().and_then(|ty| self.type_expr(ty)) {
                Some(ty) => format!("{}: {}", p.name, ty),
                None => p.name.clone(),
            })
            .collect();
        let ret = signature
            .return_type
            .as_ref()
            .and_then(|ty| self.type_expr(ty))
            .map(|ty| format!(": {}", ty))
            .unwrap_or_default();
        format!("function {}({}){} {{", signature.name, params.join(", "), ret)
    }

    fn function_close(&self) -> Option<&'static str> {
        Some("}")
    }

    fn loop_open(&self, binding: &str, header: LoopHeader<'_>) -> Option<String> {
        match header {
            LoopHeader::Count(n) if n > MAX_SAFE_INTEGER => None,
            LoopHeader::Count(n) => Some(format!(
                "for (let {b} = 0; {b} < {n}; {b}++) {{",
                b = binding,
                n = n
            )),
            LoopHeader::Range { bound, fractional } => Some(format!(
                "for (let {b} = 0; {b} < {n}; {b}++) {{",
                b = binding,
                n = if fractional {
                    format!("Math.trunc({})", bound)
                } else {
                    bound.to_string()
                }
            )),
            LoopHeader::Elements(iterable) => {
                Some(format!("for (const {} of {}) {{", binding, iterable))
            }
            LoopHeader::Keys(map) => Some(format!("for (const {} of {}.keys()) {{", binding, map)),
        }
    }

    fn loop_close(&self) -> Option<&'static str> {
        Some("}")
    }

    fn empty_block(&self) -> Option<&'static str> {
        None
    }

    fn terminate(&self, line: &str) -> String {
        let trimmed = line.trim();
        let first_word = trimmed
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .next()
            .unwrap_or("");
        let needs_separator = !trimmed.is_empty()
            && !trimmed.starts_with("//")
            && !trimmed.starts_with('}')
            && !CONTROL_WORDS.contains(&first_word)
            && trimmed
                .chars()
                .last()
                .map_or(false, |c| c.is_alphanumeric() || "_)]\"'`".contains(c));

        if needs_separator {
            format!("{};", line.trim_end())
        } else {
            line.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_expr() {
        let rules = TypeScript;
        assert_eq!(rules.type_expr(&CodexType::Float).as_deref(), Some("number"));
        assert_eq!(
            rules
                .type_expr(&CodexType::Map(
                    Box::new(CodexType::String),
                    Box::new(CodexType::Bool)
                ))
                .as_deref(),
            Some("Map<string, boolean>")
        );
        assert_eq!(
            rules.type_expr(&CodexType::Array(Box::new(CodexType::Unknown))),
            None
        );
    }

    #[test]
    fn test_terminate() {
        let rules = TypeScript;
        assert_eq!(rules.terminate("console.log(a)"), "console.log(a);");
        assert_eq!(rules.terminate("x = 1;"), "x = 1;");
        assert_eq!(rules.terminate("if (a > b) {"), "if (a > b) {");
        assert_eq!(rules.terminate("} else"), "} else");
        assert_eq!(rules.terminate("// note"), "// note");
        assert_eq!(rules.terminate("let s = \"hi\""), "let s = \"hi\";");
    }

    #[test]
    fn test_loop_open() {
        assert_eq!(
            TypeScript
                .loop_open(
                    "i",
                    LoopHeader::Range {
                        bound: "turns",
                        fractional: false
                    }
                )
                .as_deref(),
            Some("for (let i = 0; i < turns; i++) {")
        );
        assert_eq!(
            TypeScript
                .loop_open(
                    "i",
                    LoopHeader::Range {
                        bound: "x",
                        fractional: true
                    }
                )
                .as_deref(),
            Some("for (let i = 0; i < Math.trunc(x); i++) {")
        );
        assert_eq!(
            TypeScript.loop_open("item", LoopHeader::Keys("ages")).as_deref(),
            Some("for (const item of ages.keys()) {")
        );
        assert_eq!(
            TypeScript.loop_open("item", LoopHeader::Elements("xs")).as_deref(),
            Some("for (const item of xs) {")
        );
        assert_eq!(TypeScript.loop_open("i", LoopHeader::Count(u64::MAX)), None);
    }
}
