// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attention head references.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One attention head instance, identified by `(layer, head)`.
///
/// Displays in the compact `L{layer}H{head}` form used throughout the
/// interpretability literature:
///
/// ```
/// use headflow::HeadRef;
///
/// assert_eq!(HeadRef::new(9, 6).to_string(), "L9H6");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HeadRef {
    /// Layer index.
    pub layer: usize,
    /// Head index within the layer.
    pub head: usize,
}

impl HeadRef {
    /// Create a head reference.
    #[must_use]
    pub const fn new(layer: usize, head: usize) -> Self {
        Self { layer, head }
    }
}

impl From<(usize, usize)> for HeadRef {
    fn from((layer, head): (usize, usize)) -> Self {
        Self { layer, head }
    }
}

impl fmt::Display for HeadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}H{}", self.layer, self.head)
    }
}

/// Graph bounds used to validate head references: `num_layers × num_heads`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadBounds {
    /// Number of layers.
    pub num_layers: usize,
    /// Number of heads per layer.
    pub num_heads: usize,
}

impl HeadBounds {
    /// Create bounds for `num_layers` layers of `num_heads` heads each.
    #[must_use]
    pub const fn new(num_layers: usize, num_heads: usize) -> Self {
        Self {
            num_layers,
            num_heads,
        }
    }

    /// Whether `head` lies inside the bounds.
    #[must_use]
    pub const fn contains(&self, head: HeadRef) -> bool {
        head.layer < self.num_layers && head.head < self.num_heads
    }

    /// Every head in layer-major order.
    pub fn iter(&self) -> impl Iterator<Item = HeadRef> + '_ {
        (0..self.num_layers)
            .flat_map(move |layer| (0..self.num_heads).map(move |head| HeadRef::new(layer, head)))
    }
}
