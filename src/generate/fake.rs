//! Scripted generator for tests and offline runs

use super::{BackendError, CodeGenerator, GenerationRequest};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

type Responder = dyn Fn(&GenerationRequest) -> Result<String, BackendError> + Send + Sync;

/// A generator that answers from a closure and records every request it receives
pub struct FakeGenerator {
    respond: Box<Responder>,
    requests: Mutex<Vec<GenerationRequest>>,
    delay: Option<Duration>,
}

impl FakeGenerator {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&GenerationRequest) -> Result<String, BackendError> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Always answer with the same code
    pub fn constant(code: impl Into<String>) -> Self {
        let code = code.into();
        Self::new(move |_| Ok(code.clone()))
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn log(&self) -> MutexGuard<'_, Vec<GenerationRequest>> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.log().clone()
    }

    pub fn call_count(&self) -> usize {
        self.log().len()
    }
}

#[async_trait]
impl CodeGenerator for FakeGenerator {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        self.log().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextPayload, FragmentKind};
    use crate::target::TargetLanguage;

    fn request(instruction: &str) -> GenerationRequest {
        GenerationRequest::new(
            instruction,
            TargetLanguage::Python,
            FragmentKind::Action,
            ContextPayload::default(),
        )
    }

    #[tokio::test]
    async fn test_records_requests() {
        let fake = FakeGenerator::new(|req| Ok(format!("print({:?})", req.instruction())));
        assert_eq!(
            fake.generate(&request("hi")).await.unwrap(),
            "print(\"hi\")"
        );
        fake.generate(&request("there")).await.unwrap();

        assert_eq!(fake.call_count(), 2);
        assert_eq!(fake.requests()[1].instruction(), "there");
    }

    #[tokio::test]
    async fn test_constant_errors_pass_through() {
        let fake = FakeGenerator::new(|_| Err(BackendError::Fatal("nope".to_string())));
        assert_eq!(
            fake.generate(&request("x")).await,
            Err(BackendError::Fatal("nope".to_string()))
        );
    }
}
