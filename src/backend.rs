// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graph data sources.
//!
//! [`GraphSource`] is the seam to the text-analysis service that runs a
//! model and returns [`GraphData`]. Two implementations ship with the crate:
//!
//! - [`HttpGraphSource`]: the `POST /process` / `GET /models` HTTP backend
//!   (feature: `http`).
//! - [`SampleGraphSource`]: bundled static samples, one per model, used
//!   when the backend is unreachable.

use std::path::Path;

use crate::error::{FlowError, Result};
use crate::graph::GraphData;

// ---------------------------------------------------------------------------
// GraphSource trait
// ---------------------------------------------------------------------------

/// A producer of attention graph data.
///
/// Calls are blocking; async callers go through
/// [`FetchCoordinator`](crate::FetchCoordinator), which runs them on the
/// blocking thread pool.
pub trait GraphSource: Send + Sync {
    /// Run `model` on `text` and return its attention graph.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Backend`] if the service fails or is unreachable,
    /// and [`FlowError::Json`] / [`FlowError::Shape`] if the payload is
    /// malformed.
    fn process(&self, text: &str, model: &str) -> Result<GraphData>;

    /// Models the source can run.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Backend`] if the service fails or is unreachable.
    fn models(&self) -> Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// SampleGraphSource
// ---------------------------------------------------------------------------

/// Samples compiled into the crate: `(model, json)`.
const BUNDLED: &[(&str, &str)] = &[
    (
        "gpt2-small",
        include_str!("../data/sample-attention-gpt2-small.json"),
    ),
    (
        "pythia-2.8b",
        include_str!("../data/sample-attention-pythia-2.8b.json"),
    ),
];

/// Static per-model sample data.
///
/// Requests for a model without a sample are answered with the first
/// sample instead; the returned data's `model_name` says which one.
#[derive(Debug, Clone, Default)]
pub struct SampleGraphSource {
    samples: Vec<(String, GraphData)>,
}

impl SampleGraphSource {
    /// The samples bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Json`] if a bundled sample fails to parse.
    pub fn bundled() -> Result<Self> {
        let mut source = Self::default();
        for (model, json) in BUNDLED {
            let data: GraphData = serde_json::from_str(json)?;
            source.insert(model, data);
        }
        Ok(source)
    }

    /// Load every `sample-attention-{model}.json` file in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Io`] if the directory or a file cannot be read,
    /// and [`FlowError::Json`] if a file fails to parse.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
        entries.sort_by_key(std::fs::DirEntry::file_name);

        let mut source = Self::default();
        for entry in entries {
            let file_name = entry.file_name();
            let Some(model) = file_name
                .to_str()
                .and_then(|name| name.strip_prefix("sample-attention-"))
                .and_then(|name| name.strip_suffix(".json"))
            else {
                continue;
            };
            let data: GraphData = serde_json::from_str(&std::fs::read_to_string(entry.path())?)?;
            source.insert(model, data);
        }
        Ok(source)
    }

    /// Add or replace the sample for `model`.
    pub fn insert(&mut self, model: &str, mut data: GraphData) {
        data.model_name = Some(model.to_owned());
        match self.samples.iter_mut().find(|(m, _)| m == model) {
            Some(slot) => slot.1 = data,
            None => self.samples.push((model.to_owned(), data)),
        }
    }

    /// Sample for `model`, or the first sample if `model` has none.
    #[must_use]
    pub fn sample(&self, model: &str) -> Option<&GraphData> {
        self.samples
            .iter()
            .find(|(m, _)| m == model)
            .or_else(|| self.samples.first())
            .map(|(_, data)| data)
    }

    /// Whether no samples are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl GraphSource for SampleGraphSource {
    fn process(&self, _text: &str, model: &str) -> Result<GraphData> {
        self.sample(model)
            .cloned()
            .ok_or_else(|| FlowError::Backend("no sample data available".into()))
    }

    fn models(&self) -> Result<Vec<String>> {
        Ok(self.samples.iter().map(|(m, _)| m.clone()).collect())
    }
}

// ---------------------------------------------------------------------------
// HttpGraphSource
// ---------------------------------------------------------------------------

/// HTTP client for the text-analysis backend.
///
/// - `POST {api_url}/process` with `{"text", "model_name"}` → [`GraphData`]
/// - `GET {api_url}/models` → `{"models": [...]}`
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpGraphSource {
    api_url: String,
    agent: ureq::Agent,
}

#[cfg(feature = "http")]
impl HttpGraphSource {
    /// Client for the backend at `api_url`, with a per-request `timeout`.
    #[must_use]
    pub fn new(api_url: &str, timeout: std::time::Duration) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_owned(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    /// Client configured from a [`FlowConfig`](crate::FlowConfig).
    #[must_use]
    pub fn from_config(config: &crate::FlowConfig) -> Self {
        Self::new(&config.api_url, config.request_timeout)
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

/// Map a ureq failure to [`FlowError::Backend`], keeping status and body.
#[cfg(feature = "http")]
fn backend_error(err: ureq::Error) -> FlowError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            if body.is_empty() {
                FlowError::Backend(format!("status {status}"))
            } else {
                FlowError::Backend(format!("status {status}: {body}"))
            }
        }
        ureq::Error::Transport(transport) => FlowError::Backend(transport.to_string()),
    }
}

/// Read a response body; a connection dropped mid-body is a backend fault.
#[cfg(feature = "http")]
fn read_body(response: ureq::Response) -> Result<String> {
    response
        .into_string()
        .map_err(|e| FlowError::Backend(format!("reading response: {e}")))
}

#[cfg(feature = "http")]
impl GraphSource for HttpGraphSource {
    fn process(&self, text: &str, model: &str) -> Result<GraphData> {
        let url = format!("{}/process", self.api_url);
        tracing::debug!(url = %url, model, "requesting attention data");
        let response = self
            .agent
            .post(&url)
            .send_json(serde_json::json!({ "text": text, "model_name": model }))
            .map_err(backend_error)?;
        let body = read_body(response)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn models(&self) -> Result<Vec<String>> {
        #[derive(serde::Deserialize)]
        struct ModelList {
            #[serde(default)]
            models: Vec<String>,
        }

        let url = format!("{}/models", self.api_url);
        let response = self.agent.get(&url).call().map_err(backend_error)?;
        let list: ModelList = serde_json::from_str(&read_body(response)?)?;
        Ok(list.models)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
