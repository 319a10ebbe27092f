//! Lexer for Codex
//!
//! Codex is line-oriented. Lexing happens in two layers:
//!
//! - [`layout`] splits the source into logical lines, measuring each line's
//!   indentation and dropping blank lines and `//` comments.
//! - [`Lexer`] tokenizes the structural prefix of a single line on demand, using the
//!   `logos` crate. It is lazy so that the parser can stop at the description
//!   separator and take the rest of the line verbatim.

use crate::span::{SourceMap, Span};
use crate::token::{Token, TokenKind};
use logos::Logos;
use thiserror::Error;

/// Lexer errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexerError {
    #[error("unexpected character `{ch}`")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("mixed indentation: line starts with {first} but also contains {other}")]
    MixedIndentation {
        first: &'static str,
        other: &'static str,
        line: u32,
    },
}

/// A non-blank, non-comment source line with its indentation measured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalLine<'src> {
    /// Line number (1-indexed)
    pub number: u32,
    /// Indentation width, counted in spaces OR tabs
    pub indent: usize,
    /// Byte offset of the first non-indentation character
    pub start: usize,
    /// Line text without indentation and without trailing whitespace
    pub text: &'src str,
}

impl<'src> LogicalLine<'src> {
    /// Span of the trimmed line text
    pub fn span(&self) -> Span {
        Span::new(self.start, self.start + self.text.len())
    }
}

/// Measure the indentation of a line.
///
/// Returns the indentation width and the remainder of the line. Mixing spaces and tabs
/// within one line's indentation is rejected.
pub fn measure_indent(text: &str, line: u32) -> Result<(usize, &str), LexerError> {
    let mut first: Option<char> = None;
    let mut width = 0;

    for ch in text.chars() {
        match ch {
            ' ' | '\t' => {
                match first {
                    None => first = Some(ch),
                    Some(f) if f != ch => {
                        let (first, other) = if f == ' ' {
                            ("spaces", "tabs")
                        } else {
                            ("tabs", "spaces")
                        };
                        return Err(LexerError::MixedIndentation { first, other, line });
                    }
                    Some(_) => {}
                }
                width += 1;
            }
            _ => break,
        }
    }

    Ok((width, &text[width..]))
}

/// Split normalized source into logical lines.
///
/// Blank lines and comment lines are skipped. Lines with mixed indentation are reported
/// and skipped.
pub fn layout(map: &SourceMap) -> (Vec<LogicalLine<'_>>, Vec<LexerError>) {
    let mut lines = Vec::new();
    let mut errors = Vec::new();

    for line in map.lines() {
        if line.text.trim().is_empty() {
            continue;
        }
        let (indent, rest) = match measure_indent(line.text, line.number) {
            Ok(measured) => measured,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };
        if rest.starts_with("//") {
            continue;
        }
        lines.push(LogicalLine {
            number: line.number,
            indent,
            start: line.start + indent,
            text: rest.trim_end(),
        });
    }

    (lines, errors)
}

/// The lexer for the structural part of one Codex line
pub struct Lexer<'src> {
    source: &'src str,
    /// Offset of `source` within the whole file
    base: usize,
    inner: logos::Lexer<'src, TokenKind>,
    peeked: Option<Token>,
    errors: Vec<LexerError>,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given text
    pub fn new(source: &'src str) -> Self {
        Self::with_offset(source, 0)
    }

    /// Create a lexer whose spans are shifted by `base` bytes
    pub fn with_offset(source: &'src str, base: usize) -> Self {
        Self {
            source,
            base,
            inner: TokenKind::lexer(source),
            peeked: None,
            errors: Vec::new(),
        }
    }

    /// Get any errors that occurred during lexing
    pub fn errors(&self) -> &[LexerError] {
        &self.errors
    }

    /// Peek at the next token without consuming it
    pub fn peek(&mut self) -> Option<&Token> {
        if self.peeked.is_none() {
            self.peeked = self.next_token();
        }
        self.peeked.as_ref()
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Option<Token> {
        if let Some(token) = self.peeked.take() {
            return Some(token);
        }

        loop {
            match self.inner.next() {
                Some(Ok(kind)) => {
                    let span = self.inner.span();
                    return Some(Token::new(
                        kind,
                        Span::new(self.base + span.start, self.base + span.end),
                    ));
                }
                Some(Err(())) => {
                    let span = self.inner.span();
                    let ch = self.source[span.start..].chars().next().unwrap_or('?');
                    self.errors.push(LexerError::UnexpectedChar {
                        ch,
                        offset: self.base + span.start,
                    });
                    continue;
                }
                None => {
                    let pos = self.base + self.source.len();
                    return Some(Token::new(TokenKind::Eof, Span::new(pos, pos)));
                }
            }
        }
    }

    /// Collect all tokens into a vector
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexerError>) {
        let mut tokens = Vec::new();

        loop {
            match self.next_token() {
                Some(token) if token.kind == TokenKind::Eof => {
                    tokens.push(token);
                    break;
                }
                Some(token) => tokens.push(token),
                None => break,
            }
        }

        (tokens, self.errors)
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token()?;
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

/// Helper function to lex a fragment of structural text
pub fn lex(source: &str) -> (Vec<Token>, Vec<LexerError>) {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, _) = lex(source);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(token_kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_keywords() {
        let kinds = token_kinds("using var fn for");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Using,
                TokenKind::Var,
                TokenKind::Fn,
                TokenKind::For,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let kinds = token_kinds("variable format");
        assert_eq!(kinds, vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn test_variable_header() {
        let kinds = token_kinds("var int total [a, b]:");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Var,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::LBracket,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Ident,
                TokenKind::RBracket,
                TokenKind::Colon,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_function_header() {
        let kinds = token_kinds("fn add(int a, int b) -> int >");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Fn,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Comma,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::RParen,
                TokenKind::Arrow,
                TokenKind::Ident,
                TokenKind::Gt,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_action_markers() {
        assert_eq!(
            token_kinds("!:"),
            vec![TokenKind::Bang, TokenKind::Colon, TokenKind::Eof]
        );
        assert_eq!(
            token_kinds("![x]:"),
            vec![
                TokenKind::Bang,
                TokenKind::LBracket,
                TokenKind::Ident,
                TokenKind::RBracket,
                TokenKind::Colon,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_unexpected_char() {
        let (tokens, errors) = lex("var $x");
        assert_eq!(tokens.len(), 3);
        assert_eq!(
            errors,
            vec![LexerError::UnexpectedChar { ch: '$', offset: 4 }]
        );
    }

    #[test]
    fn test_span_offset() {
        let (tokens, _) = Lexer::with_offset("var int a", 10).tokenize();
        assert_eq!(tokens[1].span, Span::new(14, 17));
    }

    #[test]
    fn test_lexing_is_lazy() {
        let source = "!: it's 50% done";
        let mut lexer = Lexer::new(source);
        assert_eq!(lexer.next_token().map(|t| t.kind), Some(TokenKind::Bang));
        assert_eq!(lexer.next_token().map(|t| t.kind), Some(TokenKind::Colon));
        assert!(lexer.errors().is_empty());
    }

    #[test]
    fn test_measure_indent() {
        assert_eq!(measure_indent("    !: x", 1), Ok((4, "!: x")));
        assert_eq!(measure_indent("\t\t!: x", 1), Ok((2, "!: x")));
        assert!(matches!(
            measure_indent(" \t!: x", 3),
            Err(LexerError::MixedIndentation { line: 3, .. })
        ));
    }

    #[test]
    fn test_layout_skips_blank_and_comment_lines() {
        let map = SourceMap::new("// header\n\nvar int a: one\n  \n    // note\n!: print a\n");
        let (lines, errors) = layout(&map);
        assert!(errors.is_empty());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 3);
        assert_eq!(lines[0].text, "var int a: one");
        assert_eq!(lines[1].number, 6);
        assert_eq!(lines[1].indent, 0);
    }
}
