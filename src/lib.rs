// SPDX-License-Identifier: MIT OR Apache-2.0

//! # headflow
//!
//! Attention-head information flow graphs for transformer language models.
//!
//! A model's attention patterns, shaped `[layers][heads][dest][src]`, become
//! a layered graph: one node per `(layer, token)` position, one edge per
//! attention weight. On top of that graph the crate keeps the user's head
//! selection (individual heads and named groups), filters edges by weight
//! threshold, and assembles a renderable view model.
//!
//! ## Pieces
//!
//! - [`AttentionTensor`] / [`tensor_to_edges`]: ingest and flatten patterns
//!   (nested vectors or candle tensors).
//! - [`GraphData`]: the wire format exchanged with the analysis backend.
//! - [`SelectionState`] / [`GroupStore`]: head selection and grouping,
//!   driven by the `layer,head` selection syntax of [`HeadPattern`].
//! - [`ViewModel`]: nodes, colored links, and legend for rendering.
//! - [`Session`]: the reducer tying it all together.
//! - [`FetchCoordinator`]: debounced backend fetching with sample fallback.

#![warn(missing_docs)]

pub mod backend;
pub mod catalogue;
pub mod color;
pub mod config;
pub mod error;
pub mod fetch;
pub mod graph;
pub mod head;
pub mod selection;
pub mod session;
pub mod tensor;
pub mod view;

#[cfg(feature = "http")]
pub use backend::HttpGraphSource;
pub use backend::{GraphSource, SampleGraphSource};
pub use color::{Color, ColorAssigner};
pub use config::FlowConfig;
pub use error::{FlowError, Result};
pub use fetch::{BackendStatus, DataMode, FetchCoordinator, FetchOutcome};
pub use graph::{tensor_to_edges, AttentionEdge, GraphData, ModelInfo};
pub use head::{HeadBounds, HeadRef};
pub use selection::{GroupId, GroupStore, HeadGroup, HeadPattern, SelectionState};
pub use session::{Command, Session};
pub use tensor::AttentionTensor;
pub use view::{LegendEntry, LegendKind, Link, Node, ViewModel};
