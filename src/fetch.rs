// SPDX-License-Identifier: MIT OR Apache-2.0

//! Debounced, generation-tagged fetching of graph data.
//!
//! Every call to [`FetchCoordinator::submit`] starts a new request
//! generation. A request waits out the debounce period and then checks that
//! no newer submission has arrived; after its response comes back it checks
//! again. Superseded requests resolve to [`FetchOutcome::Discarded`], so a
//! slow response can never overwrite the result of a newer one.
//!
//! When the primary source reports [`FlowError::Backend`], the coordinator
//! answers from the fallback (sample) source instead and tags the outcome
//! with [`DataMode::Sample`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::GraphSource;
use crate::config::FlowConfig;
use crate::error::{FlowError, Result};
use crate::graph::GraphData;

/// Where the current graph data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataMode {
    /// Live responses from the text-analysis backend.
    #[default]
    Backend,
    /// Bundled sample data; the backend is unavailable.
    Sample,
}

/// Result of one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Data for the most recent submission.
    Fresh {
        /// Generation of the submission.
        generation: u64,
        /// The graph data.
        data: GraphData,
        /// Which source answered.
        mode: DataMode,
    },
    /// A newer submission superseded this one; drop it.
    Discarded {
        /// Generation of the superseded submission.
        generation: u64,
    },
    /// Blank text; nothing was fetched.
    Skipped,
}

/// Result of probing the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    /// Backend reachable; it serves these models.
    Available(Vec<String>),
    /// Backend unreachable; carries the failure message.
    Unavailable(String),
}

/// Serializes fetches so only the newest submission's response survives.
#[derive(Clone)]
pub struct FetchCoordinator {
    primary: Arc<dyn GraphSource>,
    fallback: Arc<dyn GraphSource>,
    generation: Arc<AtomicU64>,
    debounce: Duration,
    fallback_models: Arc<[String]>,
}

impl FetchCoordinator {
    /// Coordinate fetches from `primary`, falling back to `fallback`, with
    /// a quiet period of `debounce` before each request.
    pub fn new(
        primary: Arc<dyn GraphSource>,
        fallback: Arc<dyn GraphSource>,
        debounce: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            generation: Arc::new(AtomicU64::new(0)),
            debounce,
            fallback_models: Arc::from(Vec::new()),
        }
    }

    /// Coordinator using the debounce and fallback model list of `config`.
    pub fn from_config(
        primary: Arc<dyn GraphSource>,
        fallback: Arc<dyn GraphSource>,
        config: &FlowConfig,
    ) -> Self {
        Self::new(primary, fallback, config.debounce)
            .with_fallback_models(config.fallback_models.clone())
    }

    /// Models to report when a reachable backend lists none.
    #[must_use]
    pub fn with_fallback_models(mut self, models: Vec<String>) -> Self {
        self.fallback_models = Arc::from(models);
        self
    }

    /// Generation of the most recent submission.
    #[must_use]
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Invalidate every outstanding submission (e.g. on a model switch).
    /// Returns the new generation.
    pub fn invalidate(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Submit `text` for `model`.
    ///
    /// Resolves once the debounce period has elapsed and the response is in,
    /// or as soon as the submission is known to be superseded.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Backend`] only if both the primary and the
    /// fallback source fail, and [`FlowError::Json`] / [`FlowError::Shape`]
    /// if the current response is malformed. Errors from superseded
    /// submissions are discarded, not returned.
    pub async fn submit(&self, text: String, model: String) -> Result<FetchOutcome> {
        let generation = self.invalidate();
        if text.trim().is_empty() {
            return Ok(FetchOutcome::Skipped);
        }

        tokio::time::sleep(self.debounce).await;
        if let Err(stale) = self.ensure_current(generation) {
            tracing::debug!(%stale, "submission coalesced by a newer one");
            return Ok(FetchOutcome::Discarded { generation });
        }

        let result = match run_blocking(Arc::clone(&self.primary), text.clone(), model.clone()).await {
            Ok(data) => Ok((data, DataMode::Backend)),
            Err(FlowError::Backend(reason)) => {
                tracing::warn!(%reason, model = %model, "backend unavailable, using sample data");
                run_blocking(Arc::clone(&self.fallback), text, model)
                    .await
                    .map(|data| (data, DataMode::Sample))
            }
            Err(e) => Err(e),
        };

        if let Err(stale) = self.ensure_current(generation) {
            tracing::debug!(%stale, "discarding late response");
            return Ok(FetchOutcome::Discarded { generation });
        }
        let (data, mode) = result?;
        Ok(FetchOutcome::Fresh {
            generation,
            data,
            mode,
        })
    }

    /// Probe the primary source by listing its models.
    ///
    /// A reachable backend that lists no models is reported with the
    /// configured fallback model list instead.
    pub async fn check_backend(&self) -> BackendStatus {
        let primary = Arc::clone(&self.primary);
        let probe = tokio::task::spawn_blocking(move || primary.models()).await;
        match probe {
            Ok(Ok(models)) if models.is_empty() => {
                tracing::debug!("backend listed no models, using fallback list");
                BackendStatus::Available(self.fallback_models.to_vec())
            }
            Ok(Ok(models)) => BackendStatus::Available(models),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "backend health check failed");
                BackendStatus::Unavailable(e.to_string())
            }
            Err(e) => BackendStatus::Unavailable(format!("health check task failed: {e}")),
        }
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        let current = self.current_generation();
        if current == generation {
            Ok(())
        } else {
            Err(FlowError::StaleResponse {
                generation,
                current,
            })
        }
    }
}

/// Run a blocking source call on the blocking thread pool.
async fn run_blocking(source: Arc<dyn GraphSource>, text: String, model: String) -> Result<GraphData> {
    tokio::task::spawn_blocking(move || source.process(&text, &model))
        .await
        .map_err(|e| FlowError::Backend(format!("fetch task failed: {e}")))?
}
