//! Code generation
//!
//! A [`GenerationRequest`] is built once per fragment from its instruction, the target
//! language and the extracted context, and never changes afterwards. A
//! [`CodeGenerator`] turns a request into raw code text; the [`Orchestrator`] wraps a
//! generator with retries, normalization, validation, caching and bounded concurrency.

mod fake;
mod openai;
mod orchestrator;
pub mod prompt;
pub mod validate;

pub use fake::FakeGenerator;
pub use openai::OpenAiGenerator;
pub use orchestrator::Orchestrator;

use crate::ast::NodeId;
use crate::context::{ContextPayload, FragmentKind, FragmentSite};
use crate::target::TargetLanguage;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Failure reported by a backend for a single call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Worth retrying (network trouble, rate limiting, server errors)
    #[error("{0}")]
    Transient(String),
    /// Retrying will not help (bad credentials, malformed response)
    #[error("{0}")]
    Fatal(String),
}

/// Failure to obtain usable code for a fragment
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("line {line}: code generation unavailable after {attempts} attempt(s): {reason}")]
    Unavailable {
        line: u32,
        attempts: u32,
        reason: String,
    },

    #[error("line {line}: generated code rejected: {reason}")]
    Invalid {
        line: u32,
        reason: String,
        fragment: String,
    },

    #[error("generation task failed: {0}")]
    TaskFailed(String),
}

impl GenerationError {
    pub fn line(&self) -> Option<u32> {
        match self {
            GenerationError::Unavailable { line, .. } | GenerationError::Invalid { line, .. } => {
                Some(*line)
            }
            GenerationError::TaskFailed(_) => None,
        }
    }
}

/// Everything a generator needs to produce one fragment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GenerationRequest {
    instruction: String,
    target: TargetLanguage,
    kind: FragmentKind,
    context: ContextPayload,
}

impl GenerationRequest {
    pub fn new(
        instruction: impl Into<String>,
        target: TargetLanguage,
        kind: FragmentKind,
        context: ContextPayload,
    ) -> Self {
        Self {
            instruction: instruction.into(),
            target,
            kind,
            context,
        }
    }

    pub fn from_site(site: &FragmentSite, target: TargetLanguage) -> Self {
        Self::new(
            site.instruction.clone(),
            target,
            site.kind.clone(),
            site.payload.clone(),
        )
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn target(&self) -> TargetLanguage {
        self.target
    }

    pub fn kind(&self) -> &FragmentKind {
        &self.kind
    }

    pub fn context(&self) -> &ContextPayload {
        &self.context
    }
}

/// Validated code for one fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFragment {
    pub code: String,
    pub target: TargetLanguage,
}

/// Generated fragments keyed by the node they belong to
pub type FragmentMap = std::collections::HashMap<NodeId, GeneratedFragment>;

/// A source of generated code
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Produce raw code for a request
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError>;
}
