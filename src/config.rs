// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime configuration and JSON config parsing.
//!
//! [`FlowConfig`] collects the knobs that sit around the graph engine: where
//! the text-analysis backend lives, how long to wait for typing to settle,
//! and the initial threshold and model.
//!
//! # Usage
//!
//! ```
//! use headflow::FlowConfig;
//!
//! let json = serde_json::json!({"api_url": "http://localhost:9000", "debounce_ms": 250});
//! let config = FlowConfig::from_json(&json).unwrap();
//! assert_eq!(config.api_url, "http://localhost:9000");
//! assert_eq!(config.default_model, "gpt2-small");
//! ```

use std::time::Duration;

use serde_json::Value;

use crate::error::{FlowError, Result};

/// Environment variable overriding [`FlowConfig::api_url`].
pub const API_URL_ENV: &str = "HEADFLOW_API_URL";

/// Default backend address.
pub const DEFAULT_API_URL: &str = "http://0.0.0.0:8000";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowConfig {
    /// Base URL of the text-analysis backend.
    pub api_url: String,
    /// Quiet period before a text submission is fetched.
    pub debounce: Duration,
    /// Per-request timeout for backend calls.
    pub request_timeout: Duration,
    /// Initial edge weight threshold.
    pub default_threshold: f32,
    /// Model selected at startup.
    pub default_model: String,
    /// Models offered when the backend cannot list its own.
    pub fallback_models: Vec<String>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            debounce: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(60),
            default_threshold: 0.4,
            default_model: "gpt2-small".to_owned(),
            fallback_models: vec!["gpt2-small".to_owned(), "pythia-2.8b".to_owned()],
        }
    }
}

impl FlowConfig {
    /// Parse a config object; absent keys take their defaults.
    ///
    /// Recognised keys: `api_url`, `debounce_ms`, `request_timeout_ms`,
    /// `default_threshold`, `default_model`, `fallback_models`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Config`] if the value is not an object, a key
    /// has the wrong type, or the threshold lies outside `[0, 1]`.
    pub fn from_json(config: &Value) -> Result<Self> {
        if !config.is_object() {
            return Err(FlowError::Config("config must be a JSON object".into()));
        }
        let defaults = Self::default();

        let default_threshold = get_f64_or(config, "default_threshold", 0.4)?;
        if !(0.0..=1.0).contains(&default_threshold) {
            return Err(FlowError::Config(format!(
                "default_threshold {default_threshold} outside [0, 1]"
            )));
        }

        let fallback_models = match config.get("fallback_models") {
            None => defaults.fallback_models,
            Some(Value::Array(models)) => models
                .iter()
                .map(|m| {
                    m.as_str().map(str::to_owned).ok_or_else(|| {
                        FlowError::Config("'fallback_models' must contain strings".into())
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(FlowError::Config(
                    "'fallback_models' must be an array".into(),
                ))
            }
        };

        Ok(Self {
            api_url: get_str_or(config, "api_url", &defaults.api_url)?,
            debounce: Duration::from_millis(get_u64_or(config, "debounce_ms", 1000)?),
            request_timeout: Duration::from_millis(get_u64_or(
                config,
                "request_timeout_ms",
                60_000,
            )?),
            #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
            // CAST: threshold is range-checked to [0, 1] above
            default_threshold: default_threshold as f32,
            default_model: get_str_or(config, "default_model", &defaults.default_model)?,
            fallback_models,
        })
    }

    /// Defaults, with [`API_URL_ENV`] applied if set.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                config.api_url = url.trim().to_owned();
            }
        }
        config
    }

    /// API URL to use from a page served over `page_scheme`.
    ///
    /// An `http:` backend is upgraded to `https:` when the page itself is
    /// served over `https`, since browsers block mixed content.
    #[must_use]
    pub fn api_url_for_scheme(&self, page_scheme: &str) -> String {
        if page_scheme.eq_ignore_ascii_case("https") {
            if let Some(rest) = self.api_url.strip_prefix("http:") {
                return format!("https:{rest}");
            }
        }
        self.api_url.clone()
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Read a string field, falling back to `default` when absent.
fn get_str_or(config: &Value, key: &str, default: &str) -> Result<String> {
    match config.get(key) {
        None => Ok(default.to_owned()),
        Some(v) => v
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| FlowError::Config(format!("field '{key}' must be a string"))),
    }
}

/// Read a non-negative integer field, falling back to `default` when absent.
fn get_u64_or(config: &Value, key: &str, default: u64) -> Result<u64> {
    match config.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_u64()
            .ok_or_else(|| FlowError::Config(format!("field '{key}' must be a non-negative integer"))),
    }
}

/// Read a numeric field, falling back to `default` when absent.
fn get_f64_or(config: &Value, key: &str, default: f64) -> Result<f64> {
    match config.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_f64()
            .ok_or_else(|| FlowError::Config(format!("field '{key}' must be a number"))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let config = FlowConfig::from_json(&serde_json::json!({})).unwrap();
        assert_eq!(config, FlowConfig::default());
    }

    #[test]
    fn overrides_apply() {
        let config = FlowConfig::from_json(&serde_json::json!({
            "api_url": "http://example.org",
            "debounce_ms": 10,
            "request_timeout_ms": 500,
            "default_threshold": 0.25,
            "default_model": "pythia-2.8b",
            "fallback_models": ["pythia-2.8b"]
        }))
        .unwrap();
        assert_eq!(config.api_url, "http://example.org");
        assert_eq!(config.debounce, Duration::from_millis(10));
        assert_eq!(config.request_timeout, Duration::from_millis(500));
        assert_eq!(config.default_threshold, 0.25);
        assert_eq!(config.default_model, "pythia-2.8b");
        assert_eq!(config.fallback_models, vec!["pythia-2.8b".to_owned()]);
    }

    #[test]
    fn bad_types_rejected() {
        for bad in [
            serde_json::json!([]),
            serde_json::json!({"api_url": 3}),
            serde_json::json!({"debounce_ms": -1}),
            serde_json::json!({"default_threshold": 2.0}),
            serde_json::json!({"fallback_models": "gpt2-small"}),
            serde_json::json!({"fallback_models": [1]}),
        ] {
            assert!(
                matches!(FlowConfig::from_json(&bad), Err(FlowError::Config(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn https_pages_upgrade_http_backends() {
        let config = FlowConfig::default();
        assert_eq!(config.api_url_for_scheme("https"), "https://0.0.0.0:8000");
        assert_eq!(config.api_url_for_scheme("http"), "http://0.0.0.0:8000");
    }
}
