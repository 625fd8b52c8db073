// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for headflow.

use crate::head::HeadRef;

/// Errors that can occur while building or editing an attention flow graph.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// Malformed attention tensor or graph data.
    #[error("shape error: {0}")]
    Shape(String),

    /// Selection input that matches no known pattern.
    #[error("invalid format: {0}")]
    Format(String),

    /// Selection index outside the graph bounds.
    #[error("{what} must be 0-{max}, got {value}")]
    Range {
        /// Which field was out of range (`"Layer"` or `"Head"`).
        what: &'static str,
        /// The rejected value.
        value: i64,
        /// Largest valid value (inclusive).
        max: i64,
    },

    /// A bulk selection that would add nothing.
    #[error("{0}")]
    NoOp(String),

    /// Exact-pair selection of a head that already belongs to a group.
    #[error("head {head} is already part of group {group}")]
    AlreadyGrouped {
        /// The head that was requested.
        head: HeadRef,
        /// Id of the group that owns it.
        group: usize,
    },

    /// Exact-pair selection of a head that is already individually selected.
    #[error("head {0} is already selected")]
    AlreadySelected(HeadRef),

    /// Group name collides (case-insensitively) with an existing group.
    #[error("a group named '{0}' already exists")]
    DuplicateName(String),

    /// Group name is empty or whitespace-only.
    #[error("group name is required")]
    EmptyName,

    /// Command addressed a group id that does not exist.
    #[error("no group with id {0}")]
    UnknownGroup(usize),

    /// Backend fetch failure (non-2xx status or transport fault).
    #[error("backend error: {0}")]
    Backend(String),

    /// A response arrived for a request that has since been superseded.
    #[error("stale response for generation {generation} (current {current})")]
    StaleResponse {
        /// Generation the response was issued for.
        generation: u64,
        /// Generation that is current now.
        current: u64,
    },

    /// Configuration parsing error.
    #[error("config error: {0}")]
    Config(String),

    /// Tensor extraction error (wraps candle).
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// JSON (de)serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FlowError {
    /// Whether the error is a user-input problem that leaves state untouched
    /// and should be shown next to the control that produced it.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Format(_)
                | Self::Range { .. }
                | Self::NoOp(_)
                | Self::AlreadyGrouped { .. }
                | Self::AlreadySelected(_)
                | Self::DuplicateName(_)
                | Self::EmptyName
                | Self::UnknownGroup(_)
        )
    }
}

/// Result type alias for headflow operations.
pub type Result<T> = std::result::Result<T, FlowError>;
