//! Code assembly
//!
//! Walks the program in declaration order and interleaves literal structure
//! (declarations, function and loop skeletons, imports) with generated fragments.
//! Indentation and statement termination are applied here, so fragments stay opaque
//! text up to this point.

use crate::ast::{Block, FnBody, FnDef, Initializer, Item, LoopStmt, NodeId, Program, Stmt, VarDecl};
use crate::generate::validate::statement_ends;
use crate::generate::FragmentMap;
use crate::scope::{LoopIteration, SymbolTable};
use crate::target::{EmissionRules, ImportPlan, LoopHeader, TargetLanguage};
use log::debug;
use thiserror::Error;

/// Internal inconsistency between the analyzed program and what can be emitted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssemblyError {
    #[error("line {line}: {target} has no emission rule for {construct}")]
    MissingEmissionRule {
        construct: String,
        target: TargetLanguage,
        line: u32,
    },

    #[error("line {line}: no generated code for this fragment")]
    MissingFragment { line: u32 },

    #[error("line {line}: loop was not planned")]
    MissingLoopPlan { line: u32 },
}

impl AssemblyError {
    pub fn line(&self) -> u32 {
        match self {
            AssemblyError::MissingEmissionRule { line, .. }
            | AssemblyError::MissingFragment { line }
            | AssemblyError::MissingLoopPlan { line } => *line,
        }
    }
}

type AssemblyResult<T> = Result<T, AssemblyError>;

/// Produce the complete target-language program.
///
/// Every fragment site of `program` must have an entry in `fragments`.
pub fn assemble(
    program: &Program,
    table: &SymbolTable,
    imports: &ImportPlan,
    fragments: &FragmentMap,
    target: TargetLanguage,
) -> AssemblyResult<String> {
    let mut asm = Assembler {
        table,
        fragments,
        rules: target.rules(),
        lines: Vec::new(),
    };

    for import in imports.imports() {
        asm.lines.push(import.clone());
    }
    if !asm.lines.is_empty() {
        asm.lines.push(String::new());
    }

    for item in &program.items {
        match item {
            Item::Using(_) => {}
            Item::Function(f) => asm.function(f, 0)?,
            Item::Stmt(stmt) => asm.stmt(stmt, 0)?,
        }
    }

    debug!("assembled {} line(s) of {}", asm.lines.len(), target);
    let mut output = asm.lines.join("\n");
    output.push('\n');
    Ok(output)
}

struct Assembler<'a> {
    table: &'a SymbolTable,
    fragments: &'a FragmentMap,
    rules: &'static dyn EmissionRules,
    lines: Vec<String>,
}

impl<'a> Assembler<'a> {
    fn indent(&self, depth: usize) -> String {
        self.rules.indent_unit().repeat(depth)
    }

    fn missing_rule(&self, construct: &str, line: u32) -> AssemblyError {
        AssemblyError::MissingEmissionRule {
            construct: construct.to_string(),
            target: self.rules.target(),
            line,
        }
    }

    /// Structural line, emitted as is
    fn emit(&mut self, depth: usize, line: &str) {
        let indent = self.indent(depth);
        self.lines.push(format!("{}{}", indent, line));
    }

    /// Statement code, one or more lines; each line ending a statement is terminated
    /// per target
    fn emit_code(&mut self, depth: usize, code: &str) {
        let indent = self.indent(depth);
        let ends = statement_ends(code, self.rules);
        for (i, line) in code.lines().enumerate() {
            if line.trim().is_empty() {
                self.lines.push(String::new());
            } else if ends.get(i).copied().unwrap_or(false) {
                self.lines
                    .push(format!("{}{}", indent, self.rules.terminate(line)));
            } else {
                self.lines.push(format!("{}{}", indent, line));
            }
        }
    }

    fn emit_comment(&mut self, depth: usize, text: &str) {
        let comment = self.rules.comment(text);
        for line in comment.lines() {
            self.emit(depth, line);
        }
    }

    fn fragment(&self, id: NodeId, line: u32) -> AssemblyResult<&'a str> {
        self.fragments
            .get(&id)
            .map(|f| f.code.as_str())
            .ok_or(AssemblyError::MissingFragment { line })
    }

    fn function(&mut self, f: &FnDef, depth: usize) -> AssemblyResult<()> {
        let open = self.rules.function_open(&f.signature());
        self.emit(depth, &open);
        match &f.body {
            FnBody::Described(prompt) => {
                let code = self.fragment(f.id, f.line)?;
                self.emit_comment(depth + 1, &prompt.text);
                self.emit_code(depth + 1, code);
            }
            FnBody::Block(block) => self.block(block, depth + 1)?,
        }
        if let Some(close) = self.rules.function_close() {
            self.emit(depth, close);
        }
        Ok(())
    }

    fn block(&mut self, block: &Block, depth: usize) -> AssemblyResult<()> {
        if block.stmts.is_empty() {
            if let Some(filler) = self.rules.empty_block() {
                self.emit(depth, filler);
            }
        }
        for stmt in &block.stmts {
            self.stmt(stmt, depth)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt, depth: usize) -> AssemblyResult<()> {
        match stmt {
            Stmt::Var(v) => self.var(v, depth),
            Stmt::Action(a) => {
                let code = self.fragment(a.id, a.line)?;
                self.emit_comment(depth, &a.prompt.text);
                self.emit_code(depth, code);
                Ok(())
            }
            Stmt::Loop(l) => self.for_loop(l, depth),
        }
    }

    fn var(&mut self, v: &VarDecl, depth: usize) -> AssemblyResult<()> {
        let value = match &v.init {
            Initializer::Expr(expr) => expr.as_str(),
            Initializer::Described(prompt) => {
                let code = self.fragment(v.id, v.line)?;
                self.emit_comment(depth, &prompt.text);
                code
            }
        };
        let decl = self.rules.variable_decl(&v.name.name, &v.ty, value);
        self.emit_code(depth, &decl);
        Ok(())
    }

    fn for_loop(&mut self, l: &LoopStmt, depth: usize) -> AssemblyResult<()> {
        let plan = self
            .table
            .loop_plan(l.id)
            .ok_or(AssemblyError::MissingLoopPlan { line: l.line })?;

        let generated: String;
        let header = match &plan.iteration {
            LoopIteration::Count(n) => LoopHeader::Count(*n),
            LoopIteration::Range { bound, fractional } => LoopHeader::Range {
                bound,
                fractional: *fractional,
            },
            LoopIteration::Elements(iterable) => LoopHeader::Elements(iterable),
            LoopIteration::Keys(map) => LoopHeader::Keys(map),
            LoopIteration::Generated => {
                let code = self.fragment(l.id, l.line)?;
                generated = code
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                LoopHeader::Elements(&generated)
            }
        };
        let open = self
            .rules
            .loop_open(&plan.binding, header)
            .ok_or_else(|| self.missing_rule("this loop header", l.line))?;

        self.emit_comment(depth, &l.summary);
        self.emit(depth, &open);
        self.block(&l.body, depth + 1)?;
        if let Some(close) = self.rules.loop_close() {
            self.emit(depth, close);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{self, FragmentSite};
    use crate::generate::GeneratedFragment;
    use crate::parser::parse;
    use crate::scope;
    use crate::target::resolve_imports;

    fn assemble_with(
        source: &str,
        target: TargetLanguage,
        code: impl Fn(&FragmentSite) -> String,
    ) -> AssemblyResult<String> {
        let (program, errors) = parse(source);
        assert!(errors.is_empty(), "syntax errors: {:?}", errors);
        let (table, errors) = scope::build(&program);
        assert!(errors.is_empty(), "scope errors: {:?}", errors);
        let imports = resolve_imports(&program, target).unwrap();
        let sites = context::extract(&program, &table).unwrap();
        let fragments: FragmentMap = sites
            .iter()
            .map(|site| {
                (
                    site.id,
                    GeneratedFragment {
                        code: code(site),
                        target,
                    },
                )
            })
            .collect();
        assemble(&program, &table, &imports, &fragments, target)
    }

    fn by_instruction(site: &FragmentSite) -> String {
        match site.instruction.as_str() {
            "a random number from 1 to 10" => "random.randint(1, 10)".to_string(),
            "print a" => "print(a)".to_string(),
            "print the turn" => "print(i)".to_string(),
            other => panic!("unexpected fragment: {}", other),
        }
    }

    #[test]
    fn test_described_initializer_and_action() {
        let output = assemble_with(
            "var int a: a random number from 1 to 10\n!: print a\n",
            TargetLanguage::Python,
            by_instruction,
        )
        .unwrap();
        assert_eq!(
            output,
            "\
import math

# a random number from 1 to 10
a: int = random.randint(1, 10)
# print a
print(a)
"
        );
    }

    #[test]
    fn test_symbol_bounded_loop_python() {
        let source = "var int turns = 3\nfor [turns]: once for each turn >\n    !: print the turn\n";
        let output = assemble_with(source, TargetLanguage::Python, by_instruction).unwrap();
        assert_eq!(
            output,
            "\
import math

turns: int = 3
# once for each turn
for i in range(turns):
    # print the turn
    print(i)
"
        );
    }

    #[test]
    fn test_symbol_bounded_loop_typescript() {
        let source = "var int turns = 3\nfor [turns]: once for each turn >\n    !: print the turn\n";
        let output = assemble_with(source, TargetLanguage::TypeScript, |_| {
            "console.log(i)".to_string()
        })
        .unwrap();
        assert_eq!(
            output,
            "\
let turns: number = 3;
// once for each turn
for (let i = 0; i < turns; i++) {
    // print the turn
    console.log(i);
}
"
        );
    }

    #[test]
    fn test_functions() {
        let source = "\
fn add(int a, int b) -> int: the sum of a and b
fn greet(name) >
    !: say hello to name
";
        let output = assemble_with(source, TargetLanguage::TypeScript, |site| {
            match site.instruction.as_str() {
                "the sum of a and b" => "const total = a + b\nreturn total".to_string(),
                _ => "console.log(`hello ${name}`)".to_string(),
            }
        })
        .unwrap();
        assert_eq!(
            output,
            "\
function add(a: number, b: number): number {
    // the sum of a and b
    const total = a + b;
    return total;
}
function greet(name) {
    // say hello to name
    console.log(`hello ${name}`);
}
"
        );
    }

    #[test]
    fn test_generated_loop_source() {
        let source = "for each line of stdin: every line >\n    !: echo the line\n";
        let output = assemble_with(source, TargetLanguage::Python, |site| {
            match site.instruction.as_str() {
                "each line of stdin" => "sys.stdin".to_string(),
                _ => "print(item)".to_string(),
            }
        })
        .unwrap();
        assert!(output.contains("# every line\nfor item in sys.stdin:\n    # echo the line\n    print(item)\n"));
    }

    #[test]
    fn test_multiline_typescript_expressions_terminate_once() {
        let source = "var array[int] xs: the first primes\n!: double and sum the primes\n";
        let output = assemble_with(source, TargetLanguage::TypeScript, |site| {
            match site.instruction.as_str() {
                "the first primes" => "[\n    2,\n    3,\n    5,\n]".to_string(),
                _ => "const total = xs\n    .map((x) => x * 2)\n    .reduce((a, b) => a + b)\nconsole.log(total)".to_string(),
            }
        })
        .unwrap();
        assert_eq!(
            output,
            "\
// the first primes
let xs: Array<number> = [
    2,
    3,
    5,
];
// double and sum the primes
const total = xs
    .map((x) => x * 2)
    .reduce((a, b) => a + b);
console.log(total);
"
        );
    }

    #[test]
    fn test_loop_counter_never_hides_the_bound() {
        let source = "var int i = 3\nfor [i]: i times >\n    !: print the turn\n";
        let typescript = assemble_with(source, TargetLanguage::TypeScript, |_| {
            "console.log(j)".to_string()
        })
        .unwrap();
        assert!(
            typescript.contains("let i: number = 3;\n// i times\nfor (let j = 0; j < i; j++) {\n"),
            "{}",
            typescript
        );

        let python = assemble_with(source, TargetLanguage::Python, |_| "print(j)".to_string())
            .unwrap();
        assert!(python.contains("for j in range(i):\n    # print the turn\n    print(j)\n"));
    }

    #[test]
    fn test_float_bound_and_map_keys() {
        let source = |ages: &str| {
            format!(
                "var float x = 2.5\nvar map[string, int] ages = {}\nfor [x]: a few times >\n    !: print the turn\nfor [ages]: each person >\n    !: print the turn\n",
                ages
            )
        };

        let output = assemble_with(&source("new Map()"), TargetLanguage::TypeScript, |_| {
            "console.log(i)".to_string()
        })
        .unwrap();
        assert!(output.contains("for (let i = 0; i < Math.trunc(x); i++) {"), "{}", output);
        assert!(output.contains("for (const item of ages.keys()) {"), "{}", output);

        let output = assemble_with(&source("{}"), TargetLanguage::Python, |_| {
            "print(i)".to_string()
        })
        .unwrap();
        assert!(output.contains("for i in range(int(x)):"), "{}", output);
        assert!(output.contains("for item in ages:"), "{}", output);
    }

    #[test]
    fn test_missing_fragment_is_an_error() {
        let (program, _) = parse("!: print hi");
        let (table, _) = scope::build(&program);
        let imports = resolve_imports(&program, TargetLanguage::Python).unwrap();
        let err = assemble(
            &program,
            &table,
            &imports,
            &FragmentMap::new(),
            TargetLanguage::Python,
        )
        .unwrap_err();
        assert_eq!(err, AssemblyError::MissingFragment { line: 1 });
    }

    #[test]
    fn test_literal_structure_reparses_in_order() {
        let source = "var int turns = 3\nfn add(int a, int b) -> int: the sum\nvar string name = \"x\"\n";
        let output = assemble_with(source, TargetLanguage::Python, |_| "return a + b".to_string())
            .unwrap();
        let order: Vec<&str> = output
            .lines()
            .filter(|l| !l.starts_with(' ') && !l.starts_with('#') && !l.starts_with("import"))
            .filter(|l| !l.is_empty())
            .collect();
        assert_eq!(
            order,
            vec!["turns: int = 3", "def add(a: int, b: int) -> int:", "name: str = \"x\""]
        );
    }
}
