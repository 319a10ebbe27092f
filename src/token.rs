//! Token definitions for Codex
//!
//! Only the structural prefix of a line is tokenized. Description text after the
//! `:` separator and literal expressions after `=` are taken verbatim from the
//! source by the parser and never pass through the lexer.

use crate::span::Span;
use logos::Logos;
use std::fmt;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Get the text of this token from source
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.text(source)
    }
}

/// All possible structural tokens in Codex
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\f]+")]
pub enum TokenKind {
    // ============ Keywords ============

    #[token("using")]
    Using,
    #[token("var")]
    Var,
    #[token("fn")]
    Fn,
    #[token("for")]
    For,

    // ============ Punctuation ============

    /// Action statement marker
    #[token("!")]
    Bang,
    #[token("->")]
    Arrow,
    /// Block marker
    #[token(">")]
    Gt,
    /// Description separator
    #[token(":")]
    Colon,
    /// Literal initializer separator
    #[token("=")]
    Eq,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // ============ Literals and names ============

    #[regex(r"[0-9][0-9_]*", priority = 3)]
    IntLiteral,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    /// End of the lexed region
    Eof,
}

impl TokenKind {
    /// Check if this token starts a line-level construct
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Using | TokenKind::Var | TokenKind::Fn | TokenKind::For
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Using => "`using`",
            TokenKind::Var => "`var`",
            TokenKind::Fn => "`fn`",
            TokenKind::For => "`for`",
            TokenKind::Bang => "`!`",
            TokenKind::Arrow => "`->`",
            TokenKind::Gt => "`>`",
            TokenKind::Colon => "`:`",
            TokenKind::Eq => "`=`",
            TokenKind::Comma => "`,`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::IntLiteral => "integer",
            TokenKind::Ident => "identifier",
            TokenKind::Eof => "end of line",
        };
        write!(f, "{}", s)
    }
}
