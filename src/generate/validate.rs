//! Normalization and shape checks for generated code
//!
//! Validation is a sanity check, not a compile: the fragment must be non-empty, its
//! brackets must balance outside strings and comments, every string literal must be
//! closed, and expression fragments must be a single expression.

use crate::context::FragmentKind;
use crate::target::EmissionRules;

/// Clean up raw backend output before validation.
///
/// Strips Markdown code fences, surrounding blank lines, trailing whitespace and common
/// indentation. For initializers a repeated `name = ` (or `let name: T = `) prefix is
/// removed; expression fragments lose a trailing statement separator.
pub fn normalize(raw: &str, kind: &FragmentKind) -> String {
    let text = raw.replace("\r\n", "\n");
    let text = strip_fences(&text);

    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    let start = lines
        .iter()
        .position(|l| !l.is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(start, |i| i + 1);
    let lines = &lines[start..end];

    let indent = lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    let code = lines
        .iter()
        .map(|l| if l.is_empty() { "" } else { &l[indent..] })
        .collect::<Vec<_>>()
        .join("\n");

    match kind {
        FragmentKind::Initializer { name } => {
            let code = strip_assignment(&code, name);
            code.trim_end_matches(';').trim_end().to_string()
        }
        FragmentKind::LoopSource => code.trim_end_matches(';').trim_end().to_string(),
        FragmentKind::Action | FragmentKind::FunctionBody => code,
    }
}

/// Keep only the contents of the first fenced block, if there is one
fn strip_fences(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let Some(open) = lines.iter().position(|l| l.trim_start().starts_with("```")) else {
        return text.to_string();
    };
    let close = lines[open + 1..]
        .iter()
        .position(|l| l.trim_start().starts_with("```"))
        .map_or(lines.len(), |i| open + 1 + i);
    lines[open + 1..close].join("\n")
}

/// `name = expr`, `let name = expr`, `name: T = expr` become `expr`
fn strip_assignment(code: &str, name: &str) -> String {
    let original = code.trim_start();
    let mut rest = original;
    for keyword in ["let ", "const ", "var "] {
        if let Some(stripped) = rest.strip_prefix(keyword) {
            rest = stripped.trim_start();
            break;
        }
    }

    let Some(after_name) = rest.strip_prefix(name) else {
        return code.to_string();
    };
    if after_name.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
        return code.to_string();
    }

    let mut after = after_name.trim_start();
    if let Some(annotated) = after.strip_prefix(':') {
        // skip the annotation up to the assignment
        match find_assignment(annotated) {
            Some(eq) => after = &annotated[eq..],
            None => return code.to_string(),
        }
    }

    match after.strip_prefix('=') {
        Some(value) if !value.starts_with('=') => value.trim_start().to_string(),
        _ => code.to_string(),
    }
}

/// Byte index of the first `=` that is not part of `==`, `=>`, `<=`, `>=` or `!=`
fn find_assignment(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    (0..bytes.len()).find(|&i| {
        bytes[i] == b'='
            && bytes.get(i + 1).map_or(true, |&b| b != b'=' && b != b'>')
            && (i == 0 || !matches!(bytes[i - 1], b'=' | b'<' | b'>' | b'!'))
    })
}

/// Check a normalized fragment against minimal shape expectations
pub fn validate(code: &str, kind: &FragmentKind, rules: &dyn EmissionRules) -> Result<(), String> {
    if code.trim().is_empty() {
        return Err("the fragment is empty".to_string());
    }

    check_delimiters(code, rules)?;

    let expression = matches!(
        kind,
        FragmentKind::Initializer { .. } | FragmentKind::LoopSource
    );
    if expression {
        let ends = statement_ends(code, rules);
        let last = ends.iter().rposition(|&end| end);
        if let Some(early) = ends.iter().position(|&end| end).filter(|&i| Some(i) != last) {
            return Err(format!(
                "expected a single expression, but a statement ends on line {}",
                early + 1
            ));
        }
    }

    Ok(())
}

/// What the scanner reports while walking code outside strings and comments
enum Lexeme {
    Open(char),
    Close(char),
    /// End of a physical line; `in_string` when a multi-line string is still open
    LineEnd { in_string: bool },
    /// A string literal that never closes
    Unterminated,
}

fn starts_with_at(chars: &[char], at: usize, pattern: &str) -> bool {
    let mut i = at;
    for p in pattern.chars() {
        if chars.get(i) != Some(&p) {
            return false;
        }
        i += 1;
    }
    true
}

/// Walk `code` with the target's string and comment rules, reporting brackets and line
/// ends to `visit` along with the line they occur on. The last line always gets a
/// `LineEnd`.
fn scan(
    code: &str,
    rules: &dyn EmissionRules,
    mut visit: impl FnMut(Lexeme, u32) -> Result<(), String>,
) -> Result<(), String> {
    let chars: Vec<char> = code.chars().collect();
    let comment = rules.line_comment();
    let mut line = 1u32;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            visit(Lexeme::LineEnd { in_string: false }, line)?;
            line += 1;
            i += 1;
            continue;
        }

        if starts_with_at(&chars, i, comment) {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        if rules.string_delimiters().contains(&c) {
            let start_line = line;
            let triple = rules.triple_quoted_strings()
                && chars.get(i + 1) == Some(&c)
                && chars.get(i + 2) == Some(&c);
            let multiline = triple || rules.multiline_delimiters().contains(&c);
            let width = if triple { 3 } else { 1 };
            i += width;

            loop {
                match chars.get(i) {
                    None => return visit(Lexeme::Unterminated, start_line),
                    Some('\\') => i += 2,
                    Some('\n') if !multiline => return visit(Lexeme::Unterminated, start_line),
                    Some('\n') => {
                        visit(Lexeme::LineEnd { in_string: true }, line)?;
                        line += 1;
                        i += 1;
                    }
                    Some(&d) if d == c && (!triple || starts_with_at(&chars, i, &c.to_string().repeat(3))) => {
                        i += width;
                        break;
                    }
                    Some(_) => i += 1,
                }
            }
            continue;
        }

        match c {
            '(' | '[' | '{' => visit(Lexeme::Open(c), line)?,
            ')' | ']' | '}' => visit(Lexeme::Close(c), line)?,
            _ => {}
        }
        i += 1;
    }

    visit(Lexeme::LineEnd { in_string: false }, line)
}

fn check_delimiters(code: &str, rules: &dyn EmissionRules) -> Result<(), String> {
    let mut stack: Vec<(char, u32)> = Vec::new();

    scan(code, rules, |lexeme, line| match lexeme {
        Lexeme::Open(c) => {
            stack.push((c, line));
            Ok(())
        }
        Lexeme::Close(c) => {
            let expected = match c {
                ')' => '(',
                ']' => '[',
                _ => '{',
            };
            match stack.pop() {
                Some((open, _)) if open == expected => Ok(()),
                _ => Err(format!("unbalanced `{}` on line {}", c, line)),
            }
        }
        Lexeme::LineEnd { .. } => Ok(()),
        Lexeme::Unterminated => Err(format!(
            "unterminated string literal starting on line {}",
            line
        )),
    })?;

    match stack.last() {
        Some((open, opened)) => Err(format!("unclosed `{}` opened on line {}", open, opened)),
        None => Ok(()),
    }
}

/// Tokens that, at the start of a line, continue the expression of the line before
const LEADING_CONTINUATIONS: [&str; 16] = [
    ".", "?", ":", ")", "]", "}", ",", "*", "/", "%", "&", "|", "^", "=", "<", ">",
];

/// Characters that, at the end of a line, leave the expression open
const TRAILING_CONTINUATIONS: &str = "\\,([{.?:+-*/%&|^=<>";

fn continues_previous(line: &str, comment: &str) -> bool {
    if line.starts_with(comment) {
        return false;
    }
    let binary_sign = |sign: &str| {
        line.strip_prefix(sign)
            .map_or(false, |rest| !rest.starts_with(sign))
    };
    LEADING_CONTINUATIONS.iter().any(|t| line.starts_with(t))
        || binary_sign("+")
        || binary_sign("-")
}

/// For each line of `code`, whether a statement ends on it.
///
/// A statement ends on a non-blank line when every bracket opened so far is closed, no
/// multi-line string is open, the line does not end in an operator or separator, and
/// the next non-blank line does not start by continuing it. Code that fails to scan
/// ends a statement only on its last non-blank line.
pub fn statement_ends(code: &str, rules: &dyn EmissionRules) -> Vec<bool> {
    let comment = rules.line_comment();
    let lines: Vec<&str> = code.lines().map(str::trim).collect();

    let mut open = Vec::with_capacity(lines.len());
    let mut depth = 0usize;
    let scanned = scan(code, rules, |lexeme, _| {
        match lexeme {
            Lexeme::Open(_) => depth += 1,
            Lexeme::Close(_) => depth = depth.saturating_sub(1),
            Lexeme::LineEnd { in_string } => open.push(depth > 0 || in_string),
            Lexeme::Unterminated => return Err(String::new()),
        }
        Ok(())
    });

    let significant = |line: &str| !line.is_empty() && !line.starts_with(comment);
    let last = lines.iter().rposition(|l| significant(*l));
    if scanned.is_err() {
        return (0..lines.len()).map(|i| Some(i) == last).collect();
    }

    (0..lines.len())
        .map(|i| {
            let line = lines[i];
            if !significant(line) || open.get(i).copied().unwrap_or(false) {
                return false;
            }
            let code_end = line.trim_end_matches(|c: char| c == ';').trim_end();
            let trailing = code_end
                .chars()
                .last()
                .map_or(false, |c| TRAILING_CONTINUATIONS.contains(c))
                && !code_end.ends_with("++")
                && !code_end.ends_with("--");
            let next = lines[i + 1..].iter().find(|l| significant(**l));
            !trailing && !next.map_or(false, |next| continues_previous(next, comment))
        })
        .collect()
}
