// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wildcard head selection patterns.
//!
//! One line of input selects heads as `layer,head` where either side may be
//! the wildcard `:`:
//!
//! | Input   | Selects                         |
//! |---------|---------------------------------|
//! | `:,:`   | every head of every layer       |
//! | `3,:`   | every head of layer 3           |
//! | `:,7`   | head 7 of every layer           |
//! | `3,7`   | exactly `L3H7`                  |
//!
//! Whitespace around either field is ignored. Only the first line of the
//! input is considered.

use std::fmt;
use std::str::FromStr;

use crate::error::{FlowError, Result};
use crate::head::{HeadBounds, HeadRef};

/// Message attached to any input that is not `<field>,<field>`.
const USAGE: &str = "please use 'layer,head' (e.g. '0,1'), 'layer,:' for all heads in a layer, \
                     ':,head' for all layers of a head, or ':,:' for all heads";

/// A parsed selection pattern, not yet checked against graph bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadPattern {
    /// `:,:`: every head of every layer.
    All,
    /// `<layer>,:`: every head of one layer.
    Layer(i64),
    /// `:,<head>`: one head index across every layer.
    Head(i64),
    /// `<layer>,<head>`: exactly one head.
    Exact(i64, i64),
}

impl HeadPattern {
    /// Parse one line of selection input.
    ///
    /// Returns `Ok(None)` for blank input.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Format`] if the line is not two comma-separated
    /// fields, or if a field is neither `:` nor an integer.
    pub fn parse_line(input: &str) -> Result<Option<Self>> {
        let line = input.trim().lines().next().unwrap_or("").trim();
        if line.is_empty() {
            return Ok(None);
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let [layer, head] = fields.as_slice() else {
            return Err(FlowError::Format(format!("'{line}': {USAGE}")));
        };

        let pattern = match (parse_field(layer)?, parse_field(head)?) {
            (None, None) => Self::All,
            (Some(layer), None) => Self::Layer(layer),
            (None, Some(head)) => Self::Head(head),
            (Some(layer), Some(head)) => Self::Exact(layer, head),
        };
        Ok(Some(pattern))
    }

    /// Whether this is a bulk (wildcard) pattern.
    #[must_use]
    pub const fn is_bulk(&self) -> bool {
        !matches!(self, Self::Exact(..))
    }

    /// Expand to the heads it names, in layer-major order.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Range`] if a numeric field is negative or not
    /// below its bound.
    pub fn expand(&self, bounds: HeadBounds) -> Result<Vec<HeadRef>> {
        match *self {
            Self::All => Ok(bounds.iter().collect()),
            Self::Layer(layer) => {
                let layer = check_range("Layer", layer, bounds.num_layers)?;
                Ok((0..bounds.num_heads)
                    .map(|head| HeadRef::new(layer, head))
                    .collect())
            }
            Self::Head(head) => {
                let head = check_range("Head", head, bounds.num_heads)?;
                Ok((0..bounds.num_layers)
                    .map(|layer| HeadRef::new(layer, head))
                    .collect())
            }
            Self::Exact(layer, head) => {
                let layer = check_range("Layer", layer, bounds.num_layers)?;
                let head = check_range("Head", head, bounds.num_heads)?;
                Ok(vec![HeadRef::new(layer, head)])
            }
        }
    }

    /// Message used when a bulk pattern would add nothing.
    #[must_use]
    pub const fn no_op_message(&self) -> &'static str {
        match self {
            Self::All | Self::Exact(..) => "All heads are already selected or in groups",
            Self::Layer(_) => "All heads in this layer are already selected or in groups",
            Self::Head(_) => "All layers for this head are already selected or in groups",
        }
    }
}

impl FromStr for HeadPattern {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_line(s)?
            .ok_or_else(|| FlowError::Format(format!("empty selection: {USAGE}")))
    }
}

impl fmt::Display for HeadPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, ":,:"),
            Self::Layer(layer) => write!(f, "{layer},:"),
            Self::Head(head) => write!(f, ":,{head}"),
            Self::Exact(layer, head) => write!(f, "{layer},{head}"),
        }
    }
}

/// `None` for the wildcard, `Some(n)` for an integer field.
fn parse_field(field: &str) -> Result<Option<i64>> {
    if field == ":" {
        return Ok(None);
    }
    field
        .parse::<i64>()
        .map(Some)
        .map_err(|_| FlowError::Format("layer and head must be numbers".into()))
}

fn check_range(what: &'static str, value: i64, bound: usize) -> Result<usize> {
    let max = i64::try_from(bound).unwrap_or(i64::MAX) - 1;
    if value < 0 || value > max {
        return Err(FlowError::Range { what, value, max });
    }
    usize::try_from(value).map_err(|_| FlowError::Range { what, value, max })
}
