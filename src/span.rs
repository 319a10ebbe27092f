//! Source code location tracking
//!
//! Spans are byte ranges into the normalized source text. Codex is a line-oriented
//! language, so most diagnostics are reported by line; [`SourceMap`] converts between
//! the two.

use ropey::Rope;
use std::fmt;

/// A span representing a range in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    /// Start position (byte offset)
    pub start: usize,
    /// End position (byte offset, exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Get the length of the span
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Merge two spans into one that covers both
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Get the source text for this span
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Trait for anything that has a span
pub trait Spanned {
    fn span(&self) -> Span;
}

/// One physical line of source, without its line terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'src> {
    /// Line number (1-indexed)
    pub number: u32,
    /// Byte offset of the first character of the line
    pub start: usize,
    /// Line text, excluding the trailing newline
    pub text: &'src str,
}

/// Line index over a source file.
///
/// Line endings are normalized to `\n` on construction; every span handed out by the
/// lexer and parser refers to the normalized text returned by [`SourceMap::source`].
#[derive(Debug, Clone)]
pub struct SourceMap {
    source: String,
    rope: Rope,
}

impl SourceMap {
    pub fn new(source: &str) -> Self {
        let source = source.replace("\r\n", "\n");
        let rope = Rope::from_str(&source);
        Self { source, rope }
    }

    /// The normalized source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of lines, counting a trailing empty line after a final newline
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Get a line by its 1-indexed number
    pub fn line(&self, number: u32) -> Option<SourceLine<'_>> {
        let idx = (number as usize).checked_sub(1)?;
        if idx >= self.rope.len_lines() {
            return None;
        }
        let start = self.rope.line_to_byte(idx);
        let end = if idx + 1 < self.rope.len_lines() {
            self.rope.line_to_byte(idx + 1)
        } else {
            self.rope.len_bytes()
        };
        let text = self.source[start..end].trim_end_matches('\n');
        Some(SourceLine { number, start, text })
    }

    /// Iterate over every line in order
    pub fn lines(&self) -> impl Iterator<Item = SourceLine<'_>> + '_ {
        (1..=self.line_count() as u32).filter_map(move |n| self.line(n))
    }
}
