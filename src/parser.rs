//! Parser for Codex
//!
//! Codex is parsed one logical line at a time. The structural prefix of each line is
//! read with the lazy token stream from [`crate::lexer::Lexer`]; everything after the
//! description separator is taken verbatim. Blocks opened with `>` are tracked on an
//! explicit indentation stack, so a dedent must land exactly on an enclosing level.
//!
//! The parser recovers from errors by skipping the offending line together with any
//! lines nested under it, so a single run reports every independent syntax error.

use crate::ast::*;
use crate::lexer::{layout, Lexer, LexerError, LogicalLine};
use crate::span::{SourceMap, Span};
use crate::token::{Token, TokenKind};
use thiserror::Error;

/// Syntax errors, each naming the offending line
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        line: u32,
    },

    #[error("line {line}: expected {expected}, found end of line")]
    UnexpectedEol { expected: String, line: u32 },

    #[error("line {line}: unexpected character `{ch}`")]
    UnexpectedChar { ch: char, line: u32 },

    #[error("line {line}: {message}")]
    Indentation { message: String, line: u32 },

    #[error("line {line}: `{name}` is already declared in this scope (first declared on line {previous})")]
    DuplicateDeclaration {
        name: String,
        line: u32,
        previous: u32,
    },

    #[error("line {line}: {message}")]
    Custom { message: String, line: u32 },
}

impl SyntaxError {
    pub fn line(&self) -> u32 {
        match self {
            SyntaxError::UnexpectedToken { line, .. }
            | SyntaxError::UnexpectedEol { line, .. }
            | SyntaxError::UnexpectedChar { line, .. }
            | SyntaxError::Indentation { line, .. }
            | SyntaxError::DuplicateDeclaration { line, .. }
            | SyntaxError::Custom { line, .. } => *line,
        }
    }

    fn custom(message: impl Into<String>, line: u32) -> Self {
        SyntaxError::Custom {
            message: message.into(),
            line,
        }
    }

    fn from_lexer(err: &LexerError, line: u32) -> Self {
        match err {
            LexerError::UnexpectedChar { ch, .. } => SyntaxError::UnexpectedChar { ch: *ch, line },
            LexerError::MixedIndentation { line, .. } => SyntaxError::Indentation {
                message: err.to_string(),
                line: *line,
            },
        }
    }
}

/// Parse result
pub type ParseResult<T> = Result<T, SyntaxError>;

/// Token cursor over the structural prefix of one line
struct LineCursor<'src> {
    line: LogicalLine<'src>,
    lexer: Lexer<'src>,
}

impl<'src> LineCursor<'src> {
    fn new(line: LogicalLine<'src>) -> Self {
        Self {
            line,
            lexer: Lexer::with_offset(line.text, line.start),
        }
    }

    fn eof(&self) -> Token {
        let end = self.line.span().end;
        Token::new(TokenKind::Eof, Span::new(end, end))
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.lexer.peek().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn check(&mut self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> Token {
        let eof = self.eof();
        self.lexer.next_token().unwrap_or(eof)
    }

    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    fn unexpected(&mut self, expected: &str) -> SyntaxError {
        let line = self.line.number;
        match self.peek_kind() {
            TokenKind::Eof => SyntaxError::UnexpectedEol {
                expected: expected.to_string(),
                line,
            },
            found => SyntaxError::UnexpectedToken {
                expected: expected.to_string(),
                found,
                line,
            },
        }
    }

    /// Source text of a token
    fn text(&self, token: &Token) -> &'src str {
        let start = token.span.start - self.line.start;
        let end = token.span.end - self.line.start;
        &self.line.text[start..end]
    }

    /// Everything after `token`, trimmed, with the absolute offset where it starts
    fn rest_after(&self, token: &Token) -> (&'src str, usize) {
        let after = &self.line.text[token.span.end - self.line.start..];
        let trimmed = after.trim_start();
        let offset = token.span.end + (after.len() - trimmed.len());
        (trimmed, offset)
    }

    fn ident(&mut self, what: &str) -> ParseResult<Ident> {
        let kind = self.peek_kind();
        if kind.is_keyword() {
            let token = self.advance();
            return Err(SyntaxError::custom(
                format!(
                    "`{}` is a keyword and cannot be used as {}",
                    self.text(&token),
                    what
                ),
                self.line.number,
            ));
        }
        if kind != TokenKind::Ident {
            return Err(self.unexpected(what));
        }
        let token = self.advance();
        Ok(Ident::new(self.text(&token), token.span))
    }

    /// The first character the lexer could not recognize, if any
    fn lex_error(&self) -> Option<SyntaxError> {
        self.lexer
            .errors()
            .first()
            .map(|e| SyntaxError::from_lexer(e, self.line.number))
    }
}

/// The structural part of a line, before any nested lines are consumed
enum Header<'src> {
    Using(Ident),
    Var {
        ty: CodexType,
        name: Ident,
        hints: Option<Vec<Ident>>,
        init: HeaderInit<'src>,
    },
    Fn {
        name: Ident,
        params: Vec<Param>,
        return_type: Option<CodexType>,
        description: Option<(&'src str, usize)>,
    },
    Action {
        hints: Option<Vec<Ident>>,
        description: (&'src str, usize),
    },
    Loop {
        source: IterationSource,
        summary: String,
    },
}

enum HeaderInit<'src> {
    Expr(&'src str),
    Described(&'src str, usize),
}

/// The parser for Codex
pub struct Parser<'src> {
    lines: Vec<LogicalLine<'src>>,
    pos: usize,
    /// Widths of the enclosing blocks, outermost first
    indents: Vec<usize>,
    next_id: NodeId,
    source_len: usize,
    errors: Vec<SyntaxError>,
}

impl<'src> Parser<'src> {
    /// Create a new parser over a normalized source
    pub fn new(map: &'src SourceMap) -> Self {
        let (lines, lex_errors) = layout(map);
        let errors = lex_errors
            .iter()
            .map(|e| SyntaxError::from_lexer(e, 0))
            .collect();

        Self {
            lines,
            pos: 0,
            indents: vec![0],
            next_id: 0,
            source_len: map.source().len(),
            errors,
        }
    }

    /// Get parse errors
    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    /// Consume the parser, returning its errors sorted by line
    pub fn into_errors(mut self) -> Vec<SyntaxError> {
        self.errors.sort_by_key(|e| e.line());
        self.errors
    }

    fn current_line(&self) -> Option<LogicalLine<'src>> {
        self.lines.get(self.pos).copied()
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Skip the line at `index` and every line nested under it
    fn skip_from(&mut self, index: usize) {
        let indent = self.lines[index].indent;
        self.pos = index + 1;
        while let Some(line) = self.current_line() {
            if line.indent <= indent {
                break;
            }
            self.pos += 1;
        }
    }

    // ============ Top-level parsing ============

    /// Parse a complete program
    pub fn parse_program(&mut self) -> Program {
        let items = self.parse_lines(0, true);
        Program {
            items,
            span: Span::new(0, self.source_len),
        }
    }

    /// Parse consecutive lines at exactly `width`, stopping at a valid dedent
    fn parse_lines(&mut self, width: usize, top_level: bool) -> Vec<Item> {
        let mut items = Vec::new();

        while let Some(line) = self.current_line() {
            if line.indent < width {
                if self.indents.contains(&line.indent) {
                    break;
                }
                self.errors.push(SyntaxError::Indentation {
                    message: "unindent does not match any outer indentation level".to_string(),
                    line: line.number,
                });
                self.skip_from(self.pos);
                continue;
            }

            if line.indent > width {
                self.errors.push(SyntaxError::Indentation {
                    message: format!(
                        "unexpected indentation (expected {} column(s), found {})",
                        width, line.indent
                    ),
                    line: line.number,
                });
                self.skip_from(self.pos);
                continue;
            }

            let index = self.pos;
            match self.parse_line(line, top_level) {
                Ok(item) => items.push(item),
                Err(e) => {
                    self.errors.push(e);
                    self.skip_from(index);
                }
            }
        }

        items
    }

    /// Parse the line under the cursor along with its description continuation or block
    fn parse_line(&mut self, line: LogicalLine<'src>, top_level: bool) -> ParseResult<Item> {
        let mut cursor = LineCursor::new(line);
        let header = self.parse_header(&mut cursor, top_level);
        if let Some(err) = cursor.lex_error() {
            return Err(err);
        }
        let header = header?;
        self.pos += 1;

        let line_span = line.span();
        match header {
            Header::Using(module) => Ok(Item::Using(UsingDirective {
                module,
                line: line.number,
                span: line_span,
            })),

            Header::Var {
                ty,
                name,
                hints,
                init,
            } => {
                let id = self.fresh_id();
                let (init, span) = match init {
                    HeaderInit::Expr(expr) => (Initializer::Expr(expr.to_string()), line_span),
                    HeaderInit::Described(text, offset) => {
                        let prompt = self.prompt(&line, text, offset, hints)?;
                        let span = line_span.merge(prompt.span);
                        (Initializer::Described(prompt), span)
                    }
                };
                Ok(Item::Stmt(Stmt::Var(VarDecl {
                    id,
                    ty,
                    name,
                    init,
                    line: line.number,
                    span,
                })))
            }

            Header::Action { hints, description } => {
                let id = self.fresh_id();
                let prompt = self.prompt(&line, description.0, description.1, hints)?;
                Ok(Item::Stmt(Stmt::Action(ActionStmt {
                    id,
                    span: line_span.merge(prompt.span),
                    prompt,
                    line: line.number,
                })))
            }

            Header::Fn {
                name,
                params,
                return_type,
                description,
            } => {
                let id = self.fresh_id();
                let body = match description {
                    Some((text, _)) if ends_with_block_marker(text) => {
                        return Err(SyntaxError::custom(
                            "a function with a described body cannot also open a block",
                            line.number,
                        ));
                    }
                    Some((text, offset)) => FnBody::Described(self.prompt(&line, text, offset, None)?),
                    None => FnBody::Block(self.parse_block(&line)?),
                };
                let span = match &body {
                    FnBody::Described(prompt) => line_span.merge(prompt.span),
                    FnBody::Block(block) => line_span.merge(block.span),
                };
                Ok(Item::Function(FnDef {
                    id,
                    name,
                    params,
                    return_type,
                    body,
                    line: line.number,
                    span,
                }))
            }

            Header::Loop { source, summary } => {
                let id = self.fresh_id();
                let body = self.parse_block(&line)?;
                Ok(Item::Stmt(Stmt::Loop(LoopStmt {
                    id,
                    source,
                    summary,
                    span: line_span.merge(body.span),
                    body,
                    line: line.number,
                })))
            }
        }
    }

    /// Parse the block that follows a line ending in `>`
    fn parse_block(&mut self, opener: &LogicalLine<'src>) -> ParseResult<Block> {
        let width = match self.current_line() {
            Some(next) if next.indent > opener.indent => next.indent,
            _ => {
                return Err(SyntaxError::Indentation {
                    message: "expected an indented block after `>`".to_string(),
                    line: opener.number,
                })
            }
        };

        self.indents.push(width);
        let items = self.parse_lines(width, false);
        self.indents.pop();

        let stmts: Vec<Stmt> = items
            .into_iter()
            .filter_map(|item| match item {
                Item::Stmt(stmt) => Some(stmt),
                _ => None,
            })
            .collect();

        let span = stmts
            .iter()
            .fold(opener.span(), |span, stmt| span.merge(crate::span::Spanned::span(stmt)));
        Ok(Block { stmts, span })
    }

    /// Build a prompt from the first description line plus any deeper continuation lines
    fn prompt(
        &mut self,
        line: &LogicalLine<'src>,
        first: &'src str,
        offset: usize,
        hints: Option<Vec<Ident>>,
    ) -> ParseResult<Prompt> {
        let mut text = first.to_string();
        let mut span = Span::new(offset, offset + first.len());

        while let Some(next) = self.current_line() {
            if next.indent <= line.indent {
                break;
            }
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(next.text);
            span = span.merge(next.span());
            self.pos += 1;
        }

        if text.trim().is_empty() {
            return Err(SyntaxError::UnexpectedEol {
                expected: "a description".to_string(),
                line: line.number,
            });
        }

        Ok(Prompt { text, hints, span })
    }

    // ============ Line headers ============

    fn parse_header(
        &mut self,
        cursor: &mut LineCursor<'src>,
        top_level: bool,
    ) -> ParseResult<Header<'src>> {
        let line = cursor.line.number;
        match cursor.peek_kind() {
            TokenKind::Using => {
                if !top_level {
                    return Err(SyntaxError::custom(
                        "`using` is only allowed at the top level",
                        line,
                    ));
                }
                cursor.advance();
                let module = cursor.ident("a module name")?;
                cursor.expect(TokenKind::Eof)?;
                Ok(Header::Using(module))
            }
            TokenKind::Fn => {
                if !top_level {
                    return Err(SyntaxError::custom(
                        "functions can only be defined at the top level",
                        line,
                    ));
                }
                self.parse_fn_header(cursor)
            }
            TokenKind::Var => self.parse_var_header(cursor),
            TokenKind::Bang => {
                cursor.advance();
                let hints = self.parse_hints_opt(cursor)?;
                let colon = cursor.expect(TokenKind::Colon)?;
                Ok(Header::Action {
                    hints,
                    description: cursor.rest_after(&colon),
                })
            }
            TokenKind::For => self.parse_loop_header(cursor),
            _ => Err(cursor.unexpected("a declaration or statement")),
        }
    }

    fn parse_var_header(&mut self, cursor: &mut LineCursor<'src>) -> ParseResult<Header<'src>> {
        cursor.expect(TokenKind::Var)?;
        let ty = self.parse_type(cursor)?;
        let name = cursor.ident("a variable name")?;
        let hints = self.parse_hints_opt(cursor)?;

        if cursor.check(TokenKind::Eq) {
            let eq = cursor.advance();
            if hints.is_some() {
                return Err(SyntaxError::custom(
                    "a literal initializer cannot take a hint list",
                    cursor.line.number,
                ));
            }
            let (expr, _) = cursor.rest_after(&eq);
            if expr.is_empty() {
                return Err(SyntaxError::UnexpectedEol {
                    expected: "an expression".to_string(),
                    line: cursor.line.number,
                });
            }
            return Ok(Header::Var {
                ty,
                name,
                hints,
                init: HeaderInit::Expr(expr),
            });
        }

        if !cursor.check(TokenKind::Colon) {
            return Err(cursor.unexpected("`:` or `=`"));
        }
        let colon = cursor.advance();
        let (text, offset) = cursor.rest_after(&colon);
        Ok(Header::Var {
            ty,
            name,
            hints,
            init: HeaderInit::Described(text, offset),
        })
    }

    fn parse_fn_header(&mut self, cursor: &mut LineCursor<'src>) -> ParseResult<Header<'src>> {
        cursor.expect(TokenKind::Fn)?;
        let name = cursor.ident("a function name")?;
        cursor.expect(TokenKind::LParen)?;

        let mut params = Vec::new();
        if !cursor.check(TokenKind::RParen) {
            loop {
                params.push(self.parse_param(cursor)?);
                if !cursor.consume(TokenKind::Comma) {
                    break;
                }
            }
        }
        cursor.expect(TokenKind::RParen)?;

        let return_type = if cursor.consume(TokenKind::Arrow) {
            Some(self.parse_type(cursor)?)
        } else {
            None
        };

        if cursor.consume(TokenKind::Gt) {
            cursor.expect(TokenKind::Eof)?;
            return Ok(Header::Fn {
                name,
                params,
                return_type,
                description: None,
            });
        }

        if !cursor.check(TokenKind::Colon) {
            return Err(cursor.unexpected("`:` or `>`"));
        }
        let colon = cursor.advance();
        Ok(Header::Fn {
            name,
            params,
            return_type,
            description: Some(cursor.rest_after(&colon)),
        })
    }

    /// `<type> <name>` or the untyped `<name>`
    fn parse_param(&mut self, cursor: &mut LineCursor<'src>) -> ParseResult<Param> {
        let first = cursor.ident("a parameter")?;

        if cursor.check(TokenKind::LBracket) {
            let args = self.parse_type_args(cursor)?;
            let ty = CodexType::from_parts(&first.name, args)
                .map_err(|msg| SyntaxError::custom(msg, cursor.line.number))?;
            let name = cursor.ident("a parameter name")?;
            return Ok(Param {
                span: first.span.merge(name.span),
                name,
                ty: Some(ty),
            });
        }

        if cursor.check(TokenKind::Ident) {
            let ty = CodexType::from_parts(&first.name, Vec::new())
                .map_err(|msg| SyntaxError::custom(msg, cursor.line.number))?;
            let name = cursor.ident("a parameter name")?;
            return Ok(Param {
                span: first.span.merge(name.span),
                name,
                ty: Some(ty),
            });
        }

        Ok(Param {
            span: first.span,
            name: first,
            ty: None,
        })
    }

    fn parse_loop_header(&mut self, cursor: &mut LineCursor<'src>) -> ParseResult<Header<'src>> {
        let line = cursor.line.number;
        let keyword = cursor.expect(TokenKind::For)?;
        let (rest, offset) = cursor.rest_after(&keyword);

        let colon = rest.find(':').ok_or_else(|| SyntaxError::UnexpectedEol {
            expected: "`:` after the loop source".to_string(),
            line,
        })?;
        let raw_source = rest[..colon].trim_end();
        if raw_source.is_empty() {
            return Err(SyntaxError::UnexpectedToken {
                expected: "an iteration source".to_string(),
                found: TokenKind::Colon,
                line,
            });
        }

        let summary = rest[colon + 1..].trim();
        let summary = match summary.strip_suffix('>') {
            Some(s) if s.is_empty() || s.ends_with(char::is_whitespace) => s.trim_end(),
            _ => {
                return Err(SyntaxError::UnexpectedEol {
                    expected: "` >` after the loop summary".to_string(),
                    line,
                })
            }
        };
        if summary.is_empty() {
            return Err(SyntaxError::custom("loop summary must not be empty", line));
        }

        let source = classify_source(raw_source, offset, line)?;
        Ok(Header::Loop {
            source,
            summary: summary.to_string(),
        })
    }

    // ============ Types and hints ============

    fn parse_type(&mut self, cursor: &mut LineCursor<'src>) -> ParseResult<CodexType> {
        let name = cursor.ident("a type")?;
        let args = if cursor.check(TokenKind::LBracket) {
            self.parse_type_args(cursor)?
        } else {
            Vec::new()
        };
        CodexType::from_parts(&name.name, args)
            .map_err(|msg| SyntaxError::custom(msg, cursor.line.number))
    }

    /// `[T]` or `[K, V]`
    fn parse_type_args(&mut self, cursor: &mut LineCursor<'src>) -> ParseResult<Vec<CodexType>> {
        cursor.expect(TokenKind::LBracket)?;
        let mut args = vec![self.parse_type(cursor)?];
        while cursor.consume(TokenKind::Comma) {
            args.push(self.parse_type(cursor)?);
        }
        cursor.expect(TokenKind::RBracket)?;
        Ok(args)
    }

    /// Optional `[a, b, ...]` hint list. Repeated names are kept once.
    fn parse_hints_opt(
        &mut self,
        cursor: &mut LineCursor<'src>,
    ) -> ParseResult<Option<Vec<Ident>>> {
        if !cursor.consume(TokenKind::LBracket) {
            return Ok(None);
        }
        if cursor.check(TokenKind::RBracket) {
            return Err(SyntaxError::custom(
                "hint list must name at least one symbol",
                cursor.line.number,
            ));
        }

        let mut hints: Vec<Ident> = Vec::new();
        loop {
            let hint = cursor.ident("a symbol name")?;
            if !hints.iter().any(|h| h.name == hint.name) {
                hints.push(hint);
            }
            if !cursor.consume(TokenKind::Comma) {
                break;
            }
        }
        cursor.expect(TokenKind::RBracket)?;
        Ok(Some(hints))
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_keyword(text: &str) -> bool {
    matches!(text, "using" | "var" | "fn" | "for")
}

fn ends_with_block_marker(text: &str) -> bool {
    let text = text.trim_end();
    match text.strip_suffix('>') {
        Some(rest) => rest.is_empty() || rest.ends_with(char::is_whitespace),
        None => false,
    }
}

/// Decide what a loop iterates over from its raw source text
fn classify_source(raw: &str, offset: usize, line: u32) -> ParseResult<IterationSource> {
    let span = Span::new(offset, offset + raw.len());

    if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        let name = inner.trim();
        if !is_identifier(name) || is_keyword(name) {
            return Err(SyntaxError::custom(
                format!("expected a symbol name inside `[...]`, found `{}`", name),
                line,
            ));
        }
        return Ok(IterationSource::Symbol(Ident::new(name, span)));
    }

    if raw.starts_with(|c: char| c.is_ascii_digit())
        && raw.chars().all(|c| c.is_ascii_digit() || c == '_')
    {
        let digits: String = raw.chars().filter(|c| *c != '_').collect();
        return digits
            .parse::<u64>()
            .map(IterationSource::Count)
            .map_err(|_| SyntaxError::custom(format!("loop count `{}` is out of range", raw), line));
    }

    if is_identifier(raw) && !is_keyword(raw) {
        return Ok(IterationSource::Symbol(Ident::new(raw, span)));
    }

    Ok(IterationSource::Described(raw.to_string()))
}

/// Helper function to parse source code
pub fn parse(source: &str) -> (Program, Vec<SyntaxError>) {
    let map = SourceMap::new(source);
    let mut parser = Parser::new(&map);
    let program = parser.parse_program();
    (program, parser.into_errors())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        let (program, errors) = parse(source);
        assert!(errors.is_empty(), "Parse errors: {:?}", errors);
        program
    }

    fn parse_err(source: &str) -> Vec<SyntaxError> {
        let (_, errors) = parse(source);
        assert!(!errors.is_empty(), "expected parse errors");
        errors
    }

    fn stmt(item: &Item) -> &Stmt {
        match item {
            Item::Stmt(s) => s,
            other => panic!("Expected statement, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_program() {
        let program = parse_ok("");
        assert!(program.items.is_empty());
        let program = parse_ok("// only a comment\n\n");
        assert!(program.items.is_empty());
    }

    #[test]
    fn test_using() {
        let program = parse_ok("using math\nusing json");
        let modules: Vec<_> = program.usings().map(|u| u.module.name.as_str()).collect();
        assert_eq!(modules, vec!["math", "json"]);
    }

    #[test]
    fn test_described_variable() {
        let program = parse_ok("var int a: a random number from 1 to 10");
        if let Stmt::Var(v) = stmt(&program.items[0]) {
            assert_eq!(v.ty, CodexType::Int);
            assert_eq!(v.name.name, "a");
            match &v.init {
                Initializer::Described(p) => {
                    assert_eq!(p.text, "a random number from 1 to 10");
                    assert!(p.hints.is_none());
                }
                other => panic!("Expected described initializer, got {:?}", other),
            }
        } else {
            panic!("Expected variable");
        }
    }

    #[test]
    fn test_description_whitespace_is_verbatim() {
        let program = parse_ok("!: print  a,   then b: done");
        if let Stmt::Action(a) = stmt(&program.items[0]) {
            assert_eq!(a.prompt.text, "print  a,   then b: done");
        } else {
            panic!("Expected action");
        }
    }

    #[test]
    fn test_variable_with_hints_and_generic_type() {
        let program = parse_ok("var array[int] xs [a, b, a]: the numbers between a and b");
        if let Stmt::Var(v) = stmt(&program.items[0]) {
            assert_eq!(v.ty, CodexType::Array(Box::new(CodexType::Int)));
            if let Initializer::Described(p) = &v.init {
                assert_eq!(p.hint_names(), Some(vec!["a", "b"]));
            } else {
                panic!("Expected described initializer");
            }
        } else {
            panic!("Expected variable");
        }
    }

    #[test]
    fn test_literal_variable() {
        let program = parse_ok("var map[string, int] counts = {}");
        if let Stmt::Var(v) = stmt(&program.items[0]) {
            assert_eq!(v.init, Initializer::Expr("{}".to_string()));
            assert_eq!(v.ty.to_string(), "map[string, int]");
        } else {
            panic!("Expected variable");
        }
    }

    #[test]
    fn test_action_with_hints() {
        let program = parse_ok("![a, b]: print a and b");
        if let Stmt::Action(a) = stmt(&program.items[0]) {
            assert_eq!(a.prompt.hint_names(), Some(vec!["a", "b"]));
            assert_eq!(a.prompt.text, "print a and b");
        } else {
            panic!("Expected action");
        }
    }

    #[test]
    fn test_described_function() {
        let program = parse_ok("fn add(int a, int b) -> int: the sum of a and b");
        if let Item::Function(f) = &program.items[0] {
            assert_eq!(f.name.name, "add");
            assert_eq!(f.params.len(), 2);
            assert_eq!(f.params[0].ty, Some(CodexType::Int));
            assert_eq!(f.return_type, Some(CodexType::Int));
            assert!(matches!(&f.body, FnBody::Described(p) if p.text == "the sum of a and b"));
        } else {
            panic!("Expected function");
        }
    }

    #[test]
    fn test_untyped_parameters() {
        let program = parse_ok("fn greet(name, times): greet name several times");
        if let Item::Function(f) = &program.items[0] {
            assert!(f.params.iter().all(|p| p.ty.is_none()));
            assert!(f.return_type.is_none());
            assert_eq!(f.signature().to_string(), "fn greet(name, times)");
        } else {
            panic!("Expected function");
        }
    }

    #[test]
    fn test_block_function() {
        let source = "\
fn main() >
    var int a: a random number
    !: print a
!: done";
        let program = parse_ok(source);
        assert_eq!(program.items.len(), 2);
        if let Item::Function(f) = &program.items[0] {
            match &f.body {
                FnBody::Block(block) => assert_eq!(block.stmts.len(), 2),
                other => panic!("Expected block body, got {:?}", other),
            }
        } else {
            panic!("Expected function");
        }
    }

    #[test]
    fn test_loop_sources() {
        let source = "\
for [turns]: once for each turn >
    !: play a turn
for rounds: each round >
    !: play a round
for 10: ten times >
    !: say hi
for each line of stdin: every line >
    !: echo the line";
        let program = parse_ok(source);
        let sources: Vec<_> = program
            .items
            .iter()
            .map(|item| match stmt(item) {
                Stmt::Loop(l) => l.source.clone(),
                other => panic!("Expected loop, got {:?}", other),
            })
            .collect();

        assert!(matches!(&sources[0], IterationSource::Symbol(i) if i.name == "turns"));
        assert!(matches!(&sources[1], IterationSource::Symbol(i) if i.name == "rounds"));
        assert_eq!(sources[2], IterationSource::Count(10));
        assert_eq!(
            sources[3],
            IterationSource::Described("each line of stdin".to_string())
        );
    }

    #[test]
    fn test_nested_blocks_and_dedent() {
        let source = "\
fn run() >
    for 3: outer >
        for 2: inner >
            !: step
        !: after inner
    !: after outer
!: top";
        let program = parse_ok(source);
        assert_eq!(program.items.len(), 2);
        let Item::Function(f) = &program.items[0] else {
            panic!("Expected function");
        };
        let FnBody::Block(body) = &f.body else {
            panic!("Expected block body");
        };
        assert_eq!(body.stmts.len(), 2);
        let Stmt::Loop(outer) = &body.stmts[0] else {
            panic!("Expected loop");
        };
        assert_eq!(outer.summary, "outer");
        assert_eq!(outer.body.stmts.len(), 2);
    }

    #[test]
    fn test_tab_indentation() {
        let program = parse_ok("for 2: twice >\n\t!: hello\n");
        let Stmt::Loop(l) = stmt(&program.items[0]) else {
            panic!("Expected loop");
        };
        assert_eq!(l.body.stmts.len(), 1);
    }

    #[test]
    fn test_multiline_description() {
        let source = "\
!: print a table of
    the first ten squares
var int x = 1";
        let program = parse_ok(source);
        assert_eq!(program.items.len(), 2);
        if let Stmt::Action(a) = stmt(&program.items[0]) {
            assert_eq!(a.prompt.text, "print a table of\nthe first ten squares");
        } else {
            panic!("Expected action");
        }
    }

    #[test]
    fn test_node_ids_follow_source_order() {
        let source = "\
var int a: one
fn f() >
    !: two
for 2: loop >
    !: three";
        let program = parse_ok(source);
        let mut ids = Vec::new();
        for item in &program.items {
            match item {
                Item::Function(f) => {
                    ids.push(f.id);
                    if let FnBody::Block(b) = &f.body {
                        ids.extend(b.stmts.iter().map(|s| s.id()));
                    }
                }
                Item::Stmt(Stmt::Loop(l)) => {
                    ids.push(l.id);
                    ids.extend(l.body.stmts.iter().map(|s| s.id()));
                }
                Item::Stmt(s) => ids.push(s.id()),
                Item::Using(_) => {}
            }
        }
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_using_inside_block_is_rejected() {
        let errors = parse_err("fn f() >\n    using math\n    !: ok");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line(), 2);
    }

    #[test]
    fn test_unmatched_dedent() {
        let errors = parse_err("fn f() >\n    !: a\n  !: b");
        assert!(matches!(
            &errors[0],
            SyntaxError::Indentation { message, line: 3 } if message.contains("unindent")
        ));
    }

    #[test]
    fn test_unexpected_indentation() {
        let errors = parse_err("var int x = 1\n    !: b");
        assert!(matches!(&errors[0], SyntaxError::Indentation { line: 2, .. }));
    }

    #[test]
    fn test_missing_block() {
        let (program, errors) = parse("for 3: thrice >\n!: after");
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], SyntaxError::Indentation { line: 1, .. }));
        assert_eq!(program.items.len(), 1);
    }

    #[test]
    fn test_loop_requires_block_marker() {
        let errors = parse_err("for 3: thrice\n    !: hi");
        assert!(matches!(&errors[0], SyntaxError::UnexpectedEol { line: 1, .. }));
    }

    #[test]
    fn test_described_function_cannot_open_block() {
        let errors = parse_err("fn f(): does things >\n    !: hi");
        assert!(matches!(&errors[0], SyntaxError::Custom { line: 1, .. }));
    }

    #[test]
    fn test_empty_hint_list() {
        let errors = parse_err("![]: print");
        assert!(matches!(&errors[0], SyntaxError::Custom { message, .. } if message.contains("hint")));
    }

    #[test]
    fn test_empty_description() {
        let errors = parse_err("var int a:");
        assert!(matches!(&errors[0], SyntaxError::UnexpectedEol { line: 1, .. }));
    }

    #[test]
    fn test_unexpected_character() {
        let errors = parse_err("var int $a: one");
        assert_eq!(errors[0], SyntaxError::UnexpectedChar { ch: '$', line: 1 });
    }

    #[test]
    fn test_keyword_as_name() {
        let errors = parse_err("var int for: one");
        assert!(
            matches!(&errors[0], SyntaxError::Custom { message, .. } if message.contains("keyword"))
        );
    }

    #[test]
    fn test_mixed_indentation() {
        let errors = parse_err("for 2: twice >\n \t!: hi");
        assert!(errors
            .iter()
            .any(|e| matches!(e, SyntaxError::Indentation { message, line: 2 } if message.contains("mixed"))));
    }

    #[test]
    fn test_error_recovery_reports_every_error() {
        let source = "\
var int a: ok
var 3 b: bad type
!: fine
fn g() -> int
!: fine again
using";
        let (program, errors) = parse(source);
        let lines: Vec<_> = errors.iter().map(|e| e.line()).collect();
        assert_eq!(lines, vec![2, 4, 6]);
        assert_eq!(program.items.len(), 3);
    }
}
