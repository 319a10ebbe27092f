//! Codex Compiler
//!
//! Codex programs are mostly natural-language descriptions hung on a thin structural
//! skeleton of variables, functions and loops. The compiler keeps the skeleton, asks a
//! code generator to fill in each described fragment with the surrounding scope as
//! context, and splices the results into one program in the target language.
//!
//! # Architecture
//!
//! ```text
//! Source Code (.codex)
//!       │
//!       ▼
//! ┌─────────────┐
//! │   Parser    │  → Program (lexer runs per line)
//! └─────────────┘
//!       │
//!       ▼
//! ┌─────────────┐
//! │ Symbol Table│  → Scopes, declaration sites, loop plans
//! └─────────────┘
//!       │
//!       ▼
//! ┌─────────────┐
//! │   Context   │  → Fragment sites with their context payloads
//! └─────────────┘
//!       │
//!       ▼
//! ┌─────────────┐
//! │  Generation │  → Validated fragments (concurrent, fail-fast)
//! └─────────────┘
//!       │
//!       ▼
//! ┌─────────────┐
//! │  Assembly   │  → Target-language source
//! └─────────────┘
//! ```

pub mod assemble;
pub mod ast;
pub mod compiler;
pub mod config;
pub mod context;
pub mod generate;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod scope;
pub mod span;
pub mod target;
pub mod token;

// Re-exports for convenience
pub use compiler::{analyze, Analysis, Compilation, CompileError, Compiler};
pub use config::CompilerConfig;
pub use generate::{CodeGenerator, FakeGenerator, OpenAiGenerator};
pub use lexer::Lexer;
pub use span::Span;
pub use target::TargetLanguage;
pub use token::{Token, TokenKind};

/// Compiler version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// File extension for Codex source files
pub const FILE_EXTENSION: &str = "codex";
