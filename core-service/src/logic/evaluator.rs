//! Evaluation Orchestrator
//!
//! cache check -> render -> extract (+ reputation in parallel) -> assemble
//! -> classify -> cache store.
//!
//! The owner of a URL's reservation is the only caller that runs the
//! pipeline. Everyone else returns immediately with what the cache holds.
//! Every failure inside the pipeline, panics included, ends in `fail`, so a
//! reserved key never stays Pending.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;

use super::cache::{CacheError, CacheStatus, EvaluationResult, ResultCache};
use super::config::EvaluatorConfig;
use super::features::assembler::failed_family;
use super::features::{
    dynamic, static_dom, Assembler, FeatureVector, PageContext, SignalError, SignalFamily, SignalSet,
    StaticDocument,
};
use super::model::{Classifier, ClassifierError};
use super::render::{RenderError, Renderer};
use super::reputation::{Lookups, ReputationResolver};

// ============================================================================
// TYPES
// ============================================================================

/// What callers get back for one URL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub url: String,
    pub is_phishing: bool,
    pub confidence: f32,
    /// Another caller is still evaluating this URL
    pub pending: bool,
}

impl Verdict {
    fn new(url: &str, result: EvaluationResult, pending: bool) -> Self {
        Self {
            url: url.to_string(),
            is_phishing: result.is_phishing,
            confidence: result.confidence,
            pending,
        }
    }
}

/// Failures that reach the top-level boundary
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("evaluation panicked: {0}")]
    Panicked(String),
}

// ============================================================================
// EXTRACTION PIPELINE
// ============================================================================

/// Everything a feature extraction run needs, shared by the evaluator and
/// the offline collector
pub struct Pipeline {
    renderer: Arc<dyn Renderer>,
    resolver: ReputationResolver,
    assembler: Assembler,
    config: EvaluatorConfig,
}

impl Pipeline {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        lookups: Arc<dyn Lookups>,
        assembler: Assembler,
        config: EvaluatorConfig,
    ) -> Self {
        Self {
            renderer,
            resolver: ReputationResolver::new(lookups),
            assembler,
            config,
        }
    }

    pub fn assembler(&self) -> &Assembler {
        &self.assembler
    }

    /// Render `url` and build its feature vector.
    ///
    /// Reputation lookups run on a worker thread while this thread renders.
    /// Only a render failure is returned as an error, and it is returned
    /// without waiting for the worker; signal and lookup failures become
    /// slot defaults.
    pub fn extract_features(&self, url: &str) -> Result<FeatureVector, RenderError> {
        let resolver = self.resolver.clone();
        let target = url.to_string();
        let worker = std::thread::Builder::new()
            .name("reputation".to_string())
            .spawn(move || resolver.resolve(&target));

        // dropping the handle on this path detaches the worker
        let (statics, dynamics) = self.render_signals(url)?;

        let reputation = match worker {
            Ok(handle) => handle.join().unwrap_or_else(|_| {
                log::warn!("Reputation worker panicked for {}, defaulting all reputation signals", url);
                failed_family(
                    self.assembler.schema(),
                    SignalFamily::Reputation,
                    SignalError::Unavailable("reputation worker panicked"),
                )
            }),
            Err(e) => {
                log::warn!("Could not start reputation worker for {}: {}", url, e);
                self.resolver.resolve(url)
            }
        };

        Ok(self.assembler.assemble(&statics, &dynamics, &reputation))
    }

    /// Static and dynamic families from one render session; the session is
    /// dropped before this returns on every path
    fn render_signals(&self, url: &str) -> Result<(SignalSet, SignalSet), RenderError> {
        let session = self.renderer.render(url, self.config.render_timeout)?;

        let source = session.page_source()?;
        let document = StaticDocument::parse(&source);
        let statics = static_dom::extract(&document, &PageContext::new(url));
        let dynamics = dynamic::extract(session.as_ref(), self.config.load_wait);

        Ok((statics, dynamics))
    }
}

// ============================================================================
// EVALUATOR
// ============================================================================

pub struct Evaluator {
    cache: Arc<ResultCache>,
    pipeline: Pipeline,
    classifier: Arc<dyn Classifier>,
}

impl Evaluator {
    /// The pipeline assembles vectors in the classifier's schema
    pub fn new(
        cache: Arc<ResultCache>,
        renderer: Arc<dyn Renderer>,
        lookups: Arc<dyn Lookups>,
        classifier: Arc<dyn Classifier>,
        config: EvaluatorConfig,
    ) -> Self {
        let assembler = Assembler::new(classifier.schema());
        Self {
            cache,
            pipeline: Pipeline::new(renderer, lookups, assembler, config),
            classifier,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Never fails: a scored result, or the conservative default
    pub fn evaluate(&self, url: &str) -> Verdict {
        if let Some(verdict) = self.cached(url) {
            return verdict;
        }

        if !self.cache.reserve(url) {
            // lost the race between get and reserve
            return self
                .cached(url)
                .unwrap_or_else(|| Verdict::new(url, EvaluationResult::conservative(), true));
        }

        log::info!("Evaluating {}", url);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(url)))
            .unwrap_or_else(|payload| Err(EvaluationError::Panicked(panic_message(&*payload))));

        match outcome {
            Ok(result) => {
                log::info!(
                    "Evaluated {}: phishing={} confidence={:.3}",
                    url,
                    result.is_phishing,
                    result.confidence
                );
                Verdict::new(url, result, false)
            }
            Err(err) => {
                log::warn!("Evaluation of {} failed: {}", url, err);
                if let Err(cache_err) = self.cache.fail(url) {
                    log::error!("Could not mark {} as failed: {}", url, cache_err);
                }
                Verdict::new(url, EvaluationResult::conservative(), false)
            }
        }
    }

    fn cached(&self, url: &str) -> Option<Verdict> {
        self.cache.get(url).map(|entry| {
            Verdict::new(url, entry.result, entry.status == CacheStatus::Pending)
        })
    }

    fn run(&self, url: &str) -> Result<EvaluationResult, EvaluationError> {
        let vector = self.pipeline.extract_features(url)?;
        let prediction = self.classifier.predict(&vector)?;

        let result = EvaluationResult::new(prediction.is_phishing(), prediction.confidence());
        self.cache.resolve(url, result)?;
        Ok(result)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

// ============================================================================
// TESTS
// ============================================================================
