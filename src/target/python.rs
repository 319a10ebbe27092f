//! Python 3 emission rules

use super::{EmissionRules, LoopHeader, ModuleSupport, StdModule, TargetLanguage};
use crate::ast::{CodexType, Signature};

pub struct Python;

impl EmissionRules for Python {
    fn target(&self) -> TargetLanguage {
        TargetLanguage::Python
    }

    fn display_name(&self) -> &'static str {
        "Python 3"
    }

    fn file_extension(&self) -> &'static str {
        "py"
    }

    fn description(&self) -> &'static str {
        "A popular, high-level, general-purpose language. Generation quality is highest for Python, so it is the default target."
    }

    fn line_comment(&self) -> &'static str {
        "#"
    }

    fn string_delimiters(&self) -> &'static [char] {
        &['"', '\'']
    }

    fn triple_quoted_strings(&self) -> bool {
        true
    }

    fn type_expr(&self, ty: &CodexType) -> Option<String> {
        Some(match ty {
            CodexType::Unknown => return None,
            CodexType::Bool => "bool".to_string(),
            CodexType::Int => "int".to_string(),
            CodexType::Float => "float".to_string(),
            CodexType::String => "str".to_string(),
            CodexType::Array(elem) => match self.type_expr(elem) {
                Some(elem) => format!("list[{}]", elem),
                None => "list".to_string(),
            },
            CodexType::Map(key, value) => match (self.type_expr(key), self.type_expr(value)) {
                (Some(k), Some(v)) => format!("dict[{}, {}]", k, v),
                _ => "dict".to_string(),
            },
            CodexType::Named(name) => name.clone(),
        })
    }

    fn module_support(&self, module: &StdModule) -> ModuleSupport {
        match module.name {
            "math" => ModuleSupport::Import("import math".to_string()),
            "json" => ModuleSupport::Import("import json".to_string()),
            "random" => ModuleSupport::Import("import random".to_string()),
            "linalg" => ModuleSupport::Import("import numpy".to_string()),
            _ => ModuleSupport::Builtin,
        }
    }

    fn variable_decl(&self, name: &str, ty: &CodexType, value: &str) -> String {
        match self.type_expr(ty) {
            Some(ty) => format!("{}: {} = {}", name, ty, value),
            None => format!("{} = {}", name, value),
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
            .map(|ty| format!(" -> {}", ty))
            .unwrap_or_default();
        format!("def {}({}){}:", signature.name, params.join(", "), ret)
    }

    fn function_close(&self) -> Option<&'static str> {
        None
    }

    fn loop_open(&self, binding: &str, header: LoopHeader<'_>) -> Option<String> {
        Some(match header {
            LoopHeader::Count(n) => format!("for {} in range({}):", binding, n),
            LoopHeader::Range {
                bound,
                fractional: false,
            } => format!("for {} in range({}):", binding, bound),
            LoopHeader::Range {
                bound,
                fractional: true,
            } => format!("for {} in range(int({})):", binding, bound),
            LoopHeader::Elements(iterable) | LoopHeader::Keys(iterable) => {
                format!("for {} in {}:", binding, iterable)
            }
        })
    }

    fn loop_close(&self) -> Option<&'static str> {
        None
    }

    fn empty_block(&self) -> Option<&'static str> {
        Some("pass")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SignatureParam;

    #[test]
    fn test_type_expr() {
        let rules = Python;
        assert_eq!(rules.type_expr(&CodexType::String).as_deref(), Some("str"));
        assert_eq!(
            rules
                .type_expr(&CodexType::Map(
                    Box::new(CodexType::String),
                    Box::new(CodexType::Array(Box::new(CodexType::Int)))
                ))
                .as_deref(),
            Some("dict[str, list[int]]")
        );
        assert_eq!(
            rules
                .type_expr(&CodexType::Array(Box::new(CodexType::Unknown)))
                .as_deref(),
            Some("list")
        );
        assert_eq!(rules.type_expr(&CodexType::Unknown), None);
    }

    #[test]
    fn test_function_open() {
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
        assert_eq!(Python.function_open(&sig), "def add(a: int, b) -> int:");
    }

    #[test]
    fn test_loop_open() {
        assert_eq!(
            Python
                .loop_open(
                    "i",
                    LoopHeader::Range {
                        bound: "turns",
                        fractional: false
                    }
                )
                .as_deref(),
            Some("for i in range(turns):")
        );
        assert_eq!(
            Python
                .loop_open(
                    "i",
                    LoopHeader::Range {
                        bound: "x",
                        fractional: true
                    }
                )
                .as_deref(),
            Some("for i in range(int(x)):")
        );
        assert_eq!(
            Python.loop_open("item", LoopHeader::Keys("ages")).as_deref(),
            Some("for item in ages:")
        );
        assert_eq!(
            Python.loop_open("item", LoopHeader::Elements("names")).as_deref(),
            Some("for item in names:")
        );
    }

    #[test]
    fn test_variable_decl() {
        assert_eq!(Python.variable_decl("a", &CodexType::Int, "4"), "a: int = 4");
        assert_eq!(Python.variable_decl("a", &CodexType::Unknown, "4"), "a = 4");
    }
}
