// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tensor-to-graph conversion and the [`GraphData`] exchange format.
//!
//! [`tensor_to_edges`] maps every weight of an [`AttentionTensor`] to one
//! [`AttentionEdge`]. Edges run from layer `l` to layer `l + 1`: the source
//! node is `(l, src)` and the destination node is `(l + 1, dest)`, so an
//! edge represents information moved by a head of layer `l` into the
//! residual stream read by the next layer.
//!
//! Enumeration order is fixed: layer, then head, then destination token,
//! then source token.

use serde::{Deserialize, Serialize};

use crate::catalogue;
use crate::error::{FlowError, Result};
use crate::head::{HeadBounds, HeadRef};
use crate::tensor::AttentionTensor;

// ---------------------------------------------------------------------------
// AttentionEdge
// ---------------------------------------------------------------------------

/// One weighted, directed edge attributed to a single head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttentionEdge {
    /// Layer of the source node.
    pub source_layer: usize,
    /// Token position of the source node.
    pub source_token: usize,
    /// Layer of the destination node (`source_layer + 1` for converted tensors).
    pub dest_layer: usize,
    /// Token position of the destination node.
    pub dest_token: usize,
    /// Attention weight, copied verbatim from the tensor.
    pub weight: f32,
    /// Head index within `source_layer`.
    pub head: usize,
    /// Optional backend-supplied head classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_type: Option<String>,
}

impl AttentionEdge {
    /// The head this edge is attributed to.
    #[must_use]
    pub const fn head_ref(&self) -> HeadRef {
        HeadRef::new(self.source_layer, self.head)
    }
}

/// Convert a tensor into its full edge list.
///
/// Produces exactly `num_layers × num_heads × seq_len × seq_len` edges in
/// `(layer, head, dest, src)` order.
#[must_use]
pub fn tensor_to_edges(tensor: &AttentionTensor) -> Vec<AttentionEdge> {
    let seq_len = tensor.seq_len();
    let mut edges = Vec::with_capacity(tensor.as_slice().len());
    let mut weights = tensor.as_slice().iter().copied();
    for layer in 0..tensor.num_layers() {
        for head in 0..tensor.num_heads() {
            for dest in 0..seq_len {
                for src in 0..seq_len {
                    let Some(weight) = weights.next() else {
                        return edges;
                    };
                    edges.push(AttentionEdge {
                        source_layer: layer,
                        source_token: src,
                        dest_layer: layer + 1,
                        dest_token: dest,
                        weight,
                        head,
                        head_type: None,
                    });
                }
            }
        }
    }
    edges
}

// ---------------------------------------------------------------------------
// GraphData
// ---------------------------------------------------------------------------

/// Model metadata optionally attached by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name.
    pub name: String,
    /// Number of layers.
    pub layers: usize,
    /// Number of heads per layer.
    pub heads: usize,
    /// Architecture family.
    pub architecture: String,
}

/// Graph payload exchanged with the backend and the bundled sample files.
///
/// On the wire `attentionPatterns` may be either an edge list or a raw
/// `[layer][head][dest][src]` tensor; a tensor is converted with
/// [`tensor_to_edges`] during deserialization. Serialization always emits
/// the edge list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "GraphDataWire")]
pub struct GraphData {
    /// Number of layers.
    pub num_layers: usize,
    /// Number of token positions.
    pub num_tokens: usize,
    /// Number of heads per layer.
    pub num_heads: usize,
    /// Token strings, one per position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<String>>,
    /// Edge list.
    pub attention_patterns: Vec<AttentionEdge>,
    /// Model that produced the data.
    #[serde(rename = "model_name", default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// Model metadata.
    #[serde(rename = "model_info", default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<ModelInfo>,
}

/// Either form `attentionPatterns` may take on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum PatternsWire {
    Edges(Vec<AttentionEdge>),
    Tensor(Vec<Vec<Vec<Vec<f32>>>>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDataWire {
    num_layers: usize,
    num_tokens: usize,
    num_heads: usize,
    #[serde(default)]
    tokens: Option<Vec<String>>,
    #[serde(default)]
    attention_patterns: Option<PatternsWire>,
    #[serde(rename = "model_name", default)]
    model_name: Option<String>,
    #[serde(rename = "model_info", default)]
    model_info: Option<ModelInfo>,
}

impl TryFrom<GraphDataWire> for GraphData {
    type Error = FlowError;

    fn try_from(wire: GraphDataWire) -> Result<Self> {
        let attention_patterns = match wire.attention_patterns {
            None => Vec::new(),
            Some(PatternsWire::Edges(edges)) => edges,
            Some(PatternsWire::Tensor(nested)) => {
                let tensor = AttentionTensor::from_nested(nested)?;
                if tensor.num_layers() != wire.num_layers
                    || tensor.num_heads() != wire.num_heads
                    || tensor.seq_len() != wire.num_tokens
                {
                    return Err(FlowError::Shape(format!(
                        "tensor is {}x{}x{}, declared {}x{}x{} (layers x heads x tokens)",
                        tensor.num_layers(),
                        tensor.num_heads(),
                        tensor.seq_len(),
                        wire.num_layers,
                        wire.num_heads,
                        wire.num_tokens
                    )));
                }
                tensor_to_edges(&tensor)
            }
        };
        let data = Self {
            num_layers: wire.num_layers,
            num_tokens: wire.num_tokens,
            num_heads: wire.num_heads,
            tokens: wire.tokens,
            attention_patterns,
            model_name: wire.model_name,
            model_info: wire.model_info,
        };
        data.validate()?;
        Ok(data)
    }
}

impl GraphData {
    /// Build graph data from a validated tensor.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Shape`] if `tokens` is given and its length
    /// differs from the tensor's sequence length.
    pub fn from_tensor(tensor: &AttentionTensor, tokens: Option<Vec<String>>) -> Result<Self> {
        if let Some(tokens) = &tokens {
            if tokens.len() != tensor.seq_len() {
                return Err(FlowError::Shape(format!(
                    "{} tokens for a sequence of length {}",
                    tokens.len(),
                    tensor.seq_len()
                )));
            }
        }
        Ok(Self {
            num_layers: tensor.num_layers(),
            num_tokens: tensor.seq_len(),
            num_heads: tensor.num_heads(),
            tokens,
            attention_patterns: tensor_to_edges(tensor),
            model_name: None,
            model_info: None,
        })
    }

    /// Empty default grid shown after switching to `model` and before its
    /// first response arrives.
    #[must_use]
    pub fn placeholder(model: &str) -> Self {
        let defaults = catalogue::model_defaults(model);
        Self {
            num_layers: defaults.num_layers,
            num_tokens: defaults.num_tokens,
            num_heads: defaults.num_heads,
            tokens: Some(vec!["token".to_owned(); defaults.num_tokens]),
            attention_patterns: Vec::new(),
            model_name: Some(model.to_owned()),
            model_info: None,
        }
    }

    /// Head bounds of this graph.
    #[must_use]
    pub const fn bounds(&self) -> HeadBounds {
        HeadBounds::new(self.num_layers, self.num_heads)
    }

    /// Display label for token position `token`.
    #[must_use]
    pub fn token_label(&self, token: usize) -> String {
        self.tokens
            .as_ref()
            .and_then(|tokens| tokens.get(token))
            .filter(|label| !label.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("T{token}"))
    }

    /// Check every edge against the declared dimensions.
    ///
    /// Destination layers may reach `num_layers` (the output row of the
    /// final layer's edges).
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Shape`] naming the first offending edge.
    pub fn validate(&self) -> Result<()> {
        if let Some(tokens) = &self.tokens {
            if tokens.len() != self.num_tokens {
                return Err(FlowError::Shape(format!(
                    "{} tokens but numTokens is {}",
                    tokens.len(),
                    self.num_tokens
                )));
            }
        }
        for (i, edge) in self.attention_patterns.iter().enumerate() {
            let in_bounds = edge.source_layer < self.num_layers
                && edge.dest_layer <= self.num_layers
                && edge.head < self.num_heads
                && edge.source_token < self.num_tokens
                && edge.dest_token < self.num_tokens;
            if !in_bounds {
                return Err(FlowError::Shape(format!(
                    "edge {i} ({}:{} -> {}:{}, head {}) exceeds {}x{}x{} (layers x heads x tokens)",
                    edge.source_layer,
                    edge.source_token,
                    edge.dest_layer,
                    edge.dest_token,
                    edge.head,
                    self.num_layers,
                    self.num_heads,
                    self.num_tokens
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
