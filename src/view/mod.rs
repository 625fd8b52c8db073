// SPDX-License-Identifier: MIT OR Apache-2.0

//! Visibility filtering and view-model assembly.
//!
//! - [`filter_edges`]: threshold plus visible-head filtering.
//! - [`ViewModel`]: nodes, colored links, and legend for a renderer.

mod filter;
mod model;

pub use filter::{filter_edges, ungrouped_individual, visible_heads, VisibleEdge};
pub use model::{node_id, LegendEntry, LegendKind, Link, Node, ViewModel};
