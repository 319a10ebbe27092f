//! Prompt rendering for chat-style backends

use super::GenerationRequest;
use crate::context::{ContextSymbol, FragmentKind};
use crate::scope::SymbolKind;

/// System message for a target
pub fn system_message(request: &GenerationRequest) -> String {
    let rules = request.target().rules();
    format!(
        "You write {} code. Reply with code only: no explanations, no Markdown.",
        rules.display_name()
    )
}

fn describe_symbol(symbol: &ContextSymbol) -> String {
    let ty = symbol
        .ty
        .as_ref()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    match symbol.kind {
        SymbolKind::Function => format!("- function `{}` returning {}", symbol.name, ty),
        kind => format!("- {} `{}`: {}", kind, symbol.name, ty),
    }
}

/// Render the user message for a request
pub fn render(request: &GenerationRequest) -> String {
    let rules = request.target().rules();
    let language = rules.display_name();
    let context = request.context();
    let mut out = String::new();

    out.push_str(&format!("Language: {}\n", language));

    if let Some(sig) = &context.signature {
        out.push_str(&format!("Inside function: {}\n", sig));
    }

    if context.symbols.is_empty() {
        out.push_str("No variables are in scope.\n");
    } else {
        if context.hints.is_some() {
            out.push_str("Use only these symbols:\n");
        } else {
            out.push_str("Symbols in scope:\n");
        }
        for symbol in &context.symbols {
            out.push_str(&describe_symbol(symbol));
            out.push('\n');
        }
    }

    let required = context
        .site_type
        .as_ref()
        .and_then(|ty| rules.type_expr(ty).map(|expr| (ty, expr)));

    out.push('\n');
    match request.kind() {
        FragmentKind::Initializer { name } => {
            out.push_str(&format!(
                "Write a single {} expression for the initial value of `{}`",
                language, name
            ));
            if let Some((ty, expr)) = &required {
                out.push_str(&format!(" (type {}, written `{}`)", ty, expr));
            }
            out.push_str(". Do not write the assignment itself.\n");
        }
        FragmentKind::Action => {
            out.push_str(&format!(
                "Write {} statements that do the following.\n",
                language
            ));
        }
        FragmentKind::FunctionBody => {
            out.push_str(&format!(
                "Write the statements of the function body in {}, without the signature",
                language
            ));
            if let Some((ty, _)) = &required {
                out.push_str(&format!("; it must return a value of type {}", ty));
            }
            out.push_str(".\n");
        }
        FragmentKind::LoopSource => {
            out.push_str(&format!(
                "Write a single {} expression that evaluates to an iterable of the following.\n",
                language
            ));
        }
    }

    out.push_str(&format!("{}\n", rules.comment(request.instruction())));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CodexType;
    use crate::context::ContextPayload;
    use crate::target::TargetLanguage;

    #[test]
    fn test_render_initializer() {
        let request = GenerationRequest::new(
            "a random number from 1 to 10",
            TargetLanguage::Python,
            FragmentKind::Initializer {
                name: "a".to_string(),
            },
            ContextPayload {
                site_type: Some(CodexType::Int),
                ..Default::default()
            },
        );
        let prompt = render(&request);
        assert!(prompt.starts_with("Language: Python 3\n"));
        assert!(prompt.contains("No variables are in scope."));
        assert!(prompt.contains("initial value of `a` (type int, written `int`)"));
        assert!(prompt.ends_with("# a random number from 1 to 10\n"));
    }

    #[test]
    fn test_render_hinted_action() {
        let request = GenerationRequest::new(
            "print a",
            TargetLanguage::TypeScript,
            FragmentKind::Action,
            ContextPayload {
                symbols: vec![ContextSymbol {
                    name: "a".to_string(),
                    ty: Some(CodexType::Int),
                    kind: SymbolKind::Variable,
                }],
                hints: Some(vec!["a".to_string()]),
                ..Default::default()
            },
        );
        let prompt = render(&request);
        assert!(prompt.contains("Use only these symbols:\n- variable `a`: int\n"));
        assert!(prompt.ends_with("// print a\n"));
        assert!(system_message(&request).contains("TypeScript"));
    }
}
