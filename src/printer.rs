//! Canonical Codex source printer
//!
//! Renders a [`Program`] back into Codex source with 4-space indentation, canonical
//! type spelling and `[a, b]` hint lists. Parsing the output yields the same items in
//! the same order.

use crate::ast::*;

const INDENT: &str = "    ";

/// Print a program as canonical Codex source
pub fn print_program(program: &Program) -> String {
    let mut output = String::new();

    for item in &program.items {
        match item {
            Item::Using(u) => output.push_str(&format!("using {}\n", u.module)),
            Item::Function(f) => print_fn(&mut output, f),
            Item::Stmt(stmt) => print_stmt(&mut output, stmt, 0),
        }
    }

    output
}

fn print_fn(output: &mut String, f: &FnDef) {
    output.push_str(&format!("fn {}(", f.name));
    for (i, param) in f.params.iter().enumerate() {
        if i > 0 {
            output.push_str(", ");
        }
        match &param.ty {
            Some(ty) => output.push_str(&format!("{} {}", ty, param.name)),
            None => output.push_str(&param.name.name),
        }
    }
    output.push(')');
    if let Some(ret) = &f.return_type {
        output.push_str(&format!(" -> {}", ret));
    }

    match &f.body {
        FnBody::Described(prompt) => {
            output.push_str(": ");
            push_description(output, &prompt.text, 0);
        }
        FnBody::Block(block) => {
            output.push_str(" >\n");
            print_block(output, block, 1);
        }
    }
}

fn print_block(output: &mut String, block: &Block, depth: usize) {
    for stmt in &block.stmts {
        print_stmt(output, stmt, depth);
    }
}

fn print_stmt(output: &mut String, stmt: &Stmt, depth: usize) {
    output.push_str(&INDENT.repeat(depth));
    match stmt {
        Stmt::Var(v) => {
            output.push_str(&format!("var {} {}", v.ty, v.name));
            match &v.init {
                Initializer::Expr(expr) => output.push_str(&format!(" = {}\n", expr)),
                Initializer::Described(prompt) => {
                    push_hints(output, prompt, true);
                    output.push_str(": ");
                    push_description(output, &prompt.text, depth);
                }
            }
        }
        Stmt::Action(a) => {
            output.push('!');
            push_hints(output, &a.prompt, false);
            output.push_str(": ");
            push_description(output, &a.prompt.text, depth);
        }
        Stmt::Loop(l) => {
            let source = match &l.source {
                IterationSource::Count(n) => n.to_string(),
                IterationSource::Symbol(sym) => format!("[{}]", sym),
                IterationSource::Described(text) => text.clone(),
            };
            output.push_str(&format!("for {}: {} >\n", source, l.summary));
            print_block(output, &l.body, depth + 1);
        }
    }
}

fn push_hints(output: &mut String, prompt: &Prompt, leading_space: bool) {
    if let Some(hints) = &prompt.hints {
        let names: Vec<&str> = hints.iter().map(|h| h.name.as_str()).collect();
        if leading_space {
            output.push(' ');
        }
        output.push_str(&format!("[{}]", names.join(", ")));
    }
}

/// Continuation lines go one level deeper than the statement
fn push_description(output: &mut String, text: &str, depth: usize) {
    let mut lines = text.lines();
    if let Some(first) = lines.next() {
        output.push_str(first);
    }
    output.push('\n');
    for line in lines {
        output.push_str(&INDENT.repeat(depth + 1));
        output.push_str(line);
        output.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn shape(program: &Program) -> Vec<String> {
        fn walk(stmts: &[Stmt], out: &mut Vec<String>) {
            for stmt in stmts {
                match stmt {
                    Stmt::Var(v) => out.push(format!("var {}", v.name)),
                    Stmt::Action(a) => out.push(format!("action {}", a.prompt.text)),
                    Stmt::Loop(l) => {
                        out.push(format!("loop {}", l.summary));
                        walk(&l.body.stmts, out);
                        out.push("end".to_string());
                    }
                }
            }
        }

        let mut out = Vec::new();
        for item in &program.items {
            match item {
                Item::Using(u) => out.push(format!("using {}", u.module)),
                Item::Function(f) => {
                    out.push(format!("fn {}", f.signature()));
                    if let FnBody::Block(b) = &f.body {
                        walk(&b.stmts, &mut out);
                        out.push("end".to_string());
                    }
                }
                Item::Stmt(s) => walk(std::slice::from_ref(s), &mut out),
            }
        }
        out
    }

    #[test]
    fn test_print_canonical() {
        let source = "using   math\nvar   array[ int ]  xs [ a ,b ]:   numbers\n";
        let (program, errors) = parse(source);
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(
            print_program(&program),
            "using math\nvar array[int] xs [a, b]: numbers\n"
        );
    }

    #[test]
    fn test_reparse_preserves_declaration_order() {
        let source = "\
using random
var int turns: a random number from 1 to 10
fn roll(int sides) -> int: roll a die with the given number of sides
fn main() >
\tfor [turns]: once for each turn >
\t\t![turns]: print the turn
\t\t\tand a separator
\tvar string name = \"x\"
for 3: thrice >
    !: say hi";
        let (first, errors) = parse(source);
        assert!(errors.is_empty(), "{:?}", errors);

        let printed = print_program(&first);
        let (second, errors) = parse(&printed);
        assert!(errors.is_empty(), "{:?}\n{}", errors, printed);

        assert_eq!(shape(&first), shape(&second));
        assert_eq!(print_program(&second), printed);
    }
}
