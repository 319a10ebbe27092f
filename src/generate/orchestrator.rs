//! Retry, validation, caching and bounded concurrency around a [`CodeGenerator`]

use super::validate::{normalize, validate};
use super::{
    BackendError, CodeGenerator, FragmentMap, GeneratedFragment, GenerationError,
    GenerationRequest,
};
use crate::config::GenerationPolicy;
use crate::context::FragmentSite;
use crate::target::TargetLanguage;
use dashmap::DashMap;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Drives a generator over the fragment sites of a program
#[derive(Clone)]
pub struct Orchestrator {
    generator: Arc<dyn CodeGenerator>,
    target: TargetLanguage,
    policy: GenerationPolicy,
    cache: Arc<DashMap<GenerationRequest, GeneratedFragment>>,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn CodeGenerator>,
        target: TargetLanguage,
        policy: GenerationPolicy,
    ) -> Self {
        Self {
            generator,
            target,
            policy,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Number of cached fragments
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << (attempt.saturating_sub(1)).min(16);
        Duration::from_millis(self.policy.backoff_ms.saturating_mul(factor))
    }

    /// Generate, normalize and validate the code for one site
    pub async fn generate(&self, site: &FragmentSite) -> Result<GeneratedFragment, GenerationError> {
        let request = GenerationRequest::from_site(site, self.target);

        if self.policy.cache {
            if let Some(hit) = self.cache.get(&request) {
                debug!("line {}: reusing cached fragment", site.line);
                return Ok(hit.clone());
            }
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;
        let raw = loop {
            attempt += 1;
            match self.generator.generate(&request).await {
                Ok(raw) => break raw,
                Err(BackendError::Transient(reason)) if attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "line {}: {} failed (attempt {}/{}): {}; retrying in {}ms",
                        site.line,
                        self.generator.name(),
                        attempt,
                        max_attempts,
                        reason,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    return Err(GenerationError::Unavailable {
                        line: site.line,
                        attempts: attempt,
                        reason: err.to_string(),
                    })
                }
            }
        };

        let code = normalize(&raw, &site.kind);
        if let Err(reason) = validate(&code, &site.kind, self.target.rules()) {
            return Err(GenerationError::Invalid {
                line: site.line,
                reason,
                fragment: code,
            });
        }

        debug!("line {}: generated {} line(s)", site.line, code.lines().count());
        let fragment = GeneratedFragment {
            code,
            target: self.target,
        };
        if self.policy.cache {
            self.cache.insert(request, fragment.clone());
        }
        Ok(fragment)
    }

    /// Generate every site, at most `max_concurrency` at a time.
    ///
    /// The first failure cancels all outstanding work and is returned.
    pub async fn generate_all(&self, sites: &[FragmentSite]) -> Result<FragmentMap, GenerationError> {
        let permits = Arc::new(Semaphore::new(self.policy.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for site in sites.iter().cloned() {
            let this = self.clone();
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| GenerationError::TaskFailed(e.to_string()))?;
                let fragment = this.generate(&site).await?;
                Ok::<_, GenerationError>((site.id, fragment))
            });
        }

        let mut fragments = FragmentMap::with_capacity(sites.len());
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| GenerationError::TaskFailed(e.to_string()));
            match outcome.and_then(|result| result) {
                Ok((id, fragment)) => {
                    fragments.insert(id, fragment);
                }
                Err(err) => {
                    tasks.abort_all();
                    return Err(err);
                }
            }
        }

        Ok(fragments)
    }
}
