// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validated attention weight tensors.
//!
//! [`AttentionTensor`] holds the post-softmax attention patterns of every
//! head in every layer, indexed `[layer][head][dest_pos][src_pos]`. Shape is
//! checked once at construction; every layer must agree with layer 0 and
//! every per-head pattern must be square.

use candle_core::{DType, Tensor};

use crate::error::{FlowError, Result};
use crate::head::{HeadBounds, HeadRef};

/// Attention weights for all layers and heads of one forward pass.
///
/// Stored flat in `[layer, head, dest, src]` order.
///
/// # Example
///
/// ```
/// use headflow::AttentionTensor;
///
/// // 1 layer, 1 head, 2 tokens
/// let tensor = AttentionTensor::from_nested(vec![vec![vec![
///     vec![1.0, 0.0],
///     vec![0.3, 0.7],
/// ]]])
/// .unwrap();
/// assert_eq!(tensor.seq_len(), 2);
/// assert_eq!(tensor.weight(0, 0, 1, 0), Some(0.3));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AttentionTensor {
    num_layers: usize,
    num_heads: usize,
    seq_len: usize,
    weights: Vec<f32>,
}

impl AttentionTensor {
    /// Build a tensor from nested `[layer][head][dest][src]` vectors.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Shape`] if the tensor is empty, if any layer's
    /// head count or any pattern's extents disagree with layer 0, or if a
    /// pattern is not square.
    pub fn from_nested(layers: Vec<Vec<Vec<Vec<f32>>>>) -> Result<Self> {
        let first = layers
            .first()
            .ok_or_else(|| FlowError::Shape("attention tensor has no layers".into()))?;
        let num_heads = first.len();
        if num_heads == 0 {
            return Err(FlowError::Shape("layer 0 has no heads".into()));
        }
        let seq_len = first.first().map_or(0, Vec::len);
        if seq_len == 0 {
            return Err(FlowError::Shape("layer 0 has an empty sequence".into()));
        }

        let num_layers = layers.len();
        let mut weights = Vec::with_capacity(num_layers * num_heads * seq_len * seq_len);
        for (l, layer) in layers.into_iter().enumerate() {
            if layer.len() != num_heads {
                return Err(FlowError::Shape(format!(
                    "layer {l} has {} heads, layer 0 has {num_heads}",
                    layer.len()
                )));
            }
            for (h, pattern) in layer.into_iter().enumerate() {
                if pattern.len() != seq_len {
                    return Err(FlowError::Shape(format!(
                        "layer {l} head {h} has {} destination positions, expected {seq_len}",
                        pattern.len()
                    )));
                }
                for (d, row) in pattern.into_iter().enumerate() {
                    if row.len() != seq_len {
                        return Err(FlowError::Shape(format!(
                            "layer {l} head {h} row {d} has {} source positions, expected {seq_len}",
                            row.len()
                        )));
                    }
                    weights.extend(row);
                }
            }
        }

        Ok(Self {
            num_layers,
            num_heads,
            seq_len,
            weights,
        })
    }

    /// Build a tensor from per-layer candle tensors, as captured by an
    /// attention cache during a forward pass.
    ///
    /// # Shapes
    ///
    /// - each element: `[batch, heads, seq_q, seq_k]` (batch 0 is used) or
    ///   `[heads, seq_q, seq_k]`
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Shape`] on an unsupported rank or mismatched
    /// extents, and [`FlowError::Tensor`] if extraction fails.
    pub fn from_layer_tensors(layers: &[Tensor]) -> Result<Self> {
        let mut nested = Vec::with_capacity(layers.len());
        for (l, pattern) in layers.iter().enumerate() {
            // PROMOTE: patterns may be BF16/F16 on GPU; extract as F32
            let pattern = pattern.to_dtype(DType::F32)?;
            let heads = match pattern.rank() {
                4 => pattern.get(0)?,
                3 => pattern,
                rank => {
                    return Err(FlowError::Shape(format!(
                        "layer {l} pattern has rank {rank}, expected 3 or 4"
                    )))
                }
            };
            nested.push(heads.to_vec3::<f32>()?);
        }
        Self::from_nested(nested)
    }

    /// Number of layers.
    #[must_use]
    pub const fn num_layers(&self) -> usize {
        self.num_layers
    }

    /// Number of heads per layer.
    #[must_use]
    pub const fn num_heads(&self) -> usize {
        self.num_heads
    }

    /// Sequence length (destination and source extent).
    #[must_use]
    pub const fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Head bounds of this tensor.
    #[must_use]
    pub const fn bounds(&self) -> HeadBounds {
        HeadBounds::new(self.num_layers, self.num_heads)
    }

    /// Weight with which `dest` attends to `src` in one head.
    #[must_use]
    pub fn weight(&self, layer: usize, head: usize, dest: usize, src: usize) -> Option<f32> {
        if layer >= self.num_layers || head >= self.num_heads {
            return None;
        }
        if dest >= self.seq_len || src >= self.seq_len {
            return None;
        }
        let idx = ((layer * self.num_heads + head) * self.seq_len + dest) * self.seq_len + src;
        self.weights.get(idx).copied()
    }

    /// The full `[dest, src]` pattern of one head, row-major.
    #[must_use]
    pub fn head_pattern(&self, head: HeadRef) -> Option<&[f32]> {
        if !self.bounds().contains(head) {
            return None;
        }
        let block = self.seq_len * self.seq_len;
        let start = (head.layer * self.num_heads + head.head) * block;
        self.weights.get(start..start + block)
    }

    /// All weights in `[layer, head, dest, src]` order.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.weights
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn nested_round_trips_indices() {
        let tensor = AttentionTensor::from_nested(vec![
            vec![vec![vec![0.1, 0.2], vec![0.3, 0.4]]],
            vec![vec![vec![0.5, 0.6], vec![0.7, 0.8]]],
        ])
        .unwrap();
        assert_eq!(tensor.num_layers(), 2);
        assert_eq!(tensor.num_heads(), 1);
        assert_eq!(tensor.weight(1, 0, 0, 1), Some(0.6));
        assert_eq!(tensor.weight(1, 0, 2, 0), None);
        assert_eq!(
            tensor.head_pattern(HeadRef::new(0, 0)).unwrap(),
            &[0.1, 0.2, 0.3, 0.4]
        );
    }

    #[test]
    fn empty_tensor_is_shape_error() {
        assert!(matches!(
            AttentionTensor::from_nested(Vec::new()),
            Err(FlowError::Shape(_))
        ));
        assert!(matches!(
            AttentionTensor::from_nested(vec![Vec::new()]),
            Err(FlowError::Shape(_))
        ));
    }

    #[test]
    fn head_count_mismatch_is_shape_error() {
        let err = AttentionTensor::from_nested(vec![
            vec![vec![vec![1.0]], vec![vec![1.0]]],
            vec![vec![vec![1.0]]],
        ])
        .unwrap_err();
        assert!(err.to_string().contains("layer 1 has 1 heads"));
    }

    #[test]
    fn seq_len_mismatch_is_shape_error() {
        let err = AttentionTensor::from_nested(vec![
            vec![vec![vec![1.0, 0.0], vec![0.5, 0.5]]],
            vec![vec![vec![1.0]]],
        ])
        .unwrap_err();
        assert!(matches!(err, FlowError::Shape(_)));
    }

    #[test]
    fn non_square_pattern_is_shape_error() {
        let err =
            AttentionTensor::from_nested(vec![vec![vec![vec![1.0, 0.0, 0.0], vec![0.5, 0.5, 0.0]]]])
                .unwrap_err();
        assert!(matches!(err, FlowError::Shape(_)));
    }

    #[test]
    fn from_batched_candle_tensors() {
        #[rustfmt::skip]
        let data: Vec<f32> = vec![
            // head 0
            1.0, 0.0,
            0.4, 0.6,
            // head 1
            1.0, 0.0,
            0.9, 0.1,
        ];
        let layer = Tensor::from_vec(data, (1, 2, 2, 2), &Device::Cpu).unwrap();
        let tensor = AttentionTensor::from_layer_tensors(&[layer.clone(), layer]).unwrap();
        assert_eq!(tensor.num_layers(), 2);
        assert_eq!(tensor.num_heads(), 2);
        assert_eq!(tensor.seq_len(), 2);
        assert!((tensor.weight(1, 1, 1, 0).unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn candle_rank_is_checked() {
        let bad = Tensor::zeros((2, 2), DType::F32, &Device::Cpu).unwrap();
        assert!(matches!(
            AttentionTensor::from_layer_tensors(&[bad]),
            Err(FlowError::Shape(_))
        ));
    }
}
