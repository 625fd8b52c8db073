// SPDX-License-Identifier: MIT OR Apache-2.0

//! Renderer-facing view model: node grid, colored links, and legend.

use serde::Serialize;

use crate::color::Color;
use crate::graph::GraphData;
use crate::head::HeadRef;
use crate::selection::{GroupId, SelectionState};
use crate::view::filter::{filter_edges, ungrouped_individual};

/// One `(layer, token)` position of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    /// `"{layer}-{token}"`.
    pub id: String,
    /// Layer index.
    pub layer: usize,
    /// Token position.
    pub token: usize,
    /// Token text, or `T{token}` when unknown.
    pub label: String,
}

/// A visible edge, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// Source node id.
    pub source: String,
    /// Target node id. For edges of the last layer this is
    /// `"{num_layers}-{token}"`, an output-row id with no entry in
    /// [`ViewModel::nodes`]; see [`output`](Self::output).
    pub target: String,
    /// Whether `target` lies in the output row past the last layer.
    pub output: bool,
    /// Attention weight.
    pub weight: f32,
    /// Head index within the source layer.
    pub head: usize,
    /// Owning group id, `-1` for an ungrouped head.
    pub group_id: i64,
    /// Stroke color.
    pub color: Color,
}

/// What a legend entry stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LegendKind {
    /// A head group.
    Group {
        /// Group id.
        id: GroupId,
        /// Group name.
        name: String,
    },
    /// An ungrouped, individually selected head.
    Head {
        /// The head.
        head: HeadRef,
    },
}

/// One row of the legend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegendEntry {
    /// What the row stands for.
    pub kind: LegendKind,
    /// Display text.
    pub label: String,
    /// Swatch color.
    pub color: Color,
    /// Optional description (group tooltips).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewModel {
    /// Full `num_layers × num_tokens` grid, layer-major.
    pub nodes: Vec<Node>,
    /// Filtered, annotated links in edge order.
    pub links: Vec<Link>,
    /// Groups in store order, then ungrouped individual heads in selection
    /// order.
    pub legend: Vec<LegendEntry>,
}

impl ViewModel {
    /// Build the view model for `data` under `state` and `threshold`.
    ///
    /// Pure: the same inputs always produce the same output.
    #[must_use]
    pub fn build(data: &GraphData, state: &SelectionState, threshold: f32) -> Self {
        let groups = state.groups();
        let colors = groups.colors();

        let mut nodes = Vec::with_capacity(data.num_layers * data.num_tokens);
        for layer in 0..data.num_layers {
            for token in 0..data.num_tokens {
                nodes.push(Node {
                    id: node_id(layer, token),
                    layer,
                    token,
                    label: data.token_label(token),
                });
            }
        }

        let links = filter_edges(&data.attention_patterns, threshold, state)
            .into_iter()
            .map(|visible| {
                let edge = visible.edge;
                let color = visible
                    .group
                    .and_then(|id| groups.color_of(id))
                    .unwrap_or_else(|| colors.head_color(edge.head));
                Link {
                    source: node_id(edge.source_layer, edge.source_token),
                    target: node_id(edge.dest_layer, edge.dest_token),
                    output: edge.dest_layer >= data.num_layers,
                    weight: edge.weight,
                    head: edge.head,
                    group_id: visible.group_id(),
                    color,
                }
            })
            .collect();

        let mut legend: Vec<LegendEntry> = groups
            .groups()
            .iter()
            .map(|group| LegendEntry {
                kind: LegendKind::Group {
                    id: group.id,
                    name: group.name.clone(),
                },
                label: group.name.clone(),
                color: groups
                    .color_of(group.id)
                    .unwrap_or_else(|| colors.nth(group.id)),
                description: group.description.clone(),
            })
            .collect();
        legend.extend(ungrouped_individual(state).into_iter().map(|head| LegendEntry {
            kind: LegendKind::Head { head },
            label: format!("Layer {}, Head {}", head.layer, head.head),
            color: colors.head_color(head.head),
            description: None,
        }));

        Self {
            nodes,
            links,
            legend,
        }
    }

    /// Node with id `id`.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Node id for `(layer, token)`.
#[must_use]
pub fn node_id(layer: usize, token: usize) -> String {
    format!("{layer}-{token}")
}
