// SPDX-License-Identifier: MIT OR Apache-2.0

//! Palette-based color assignment for head groups and individual heads.
//!
//! Groups rotate through the palette in creation order; individual heads
//! use `palette[head mod N]`, so their colors never move when groups are
//! edited.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// A CSS color string (e.g. `#38B2AC`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// Wrap a CSS color string.
    pub fn new(css: impl Into<String>) -> Self {
        Self(css.into())
    }

    /// The CSS color string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Color {
    fn from(css: &str) -> Self {
        Self(css.to_owned())
    }
}

/// Default palette: twenty distinct, high-contrast colors.
pub const DEFAULT_PALETTE: [&str; 20] = [
    "#38B2AC", // teal
    "#9F7AEA", // purple
    "#F6AD55", // orange
    "#68D391", // green
    "#F687B3", // pink
    "#4FD1C5", // teal-400
    "#B794F4", // purple-400
    "#7F9CF5", // indigo-400
    "#C6F6D5", // green-200
    "#FBD38D", // orange-300
    "#76E4F7", // cyan-300
    "#E9D8FD", // purple-200
    "#90CDF4", // blue-300
    "#FEB2B2", // red-300
    "#81E6D9", // teal-300
    "#D6BCFA", // purple-300
    "#FBB6CE", // pink-300
    "#B2F5EA", // teal-200
    "#667EEA", // indigo-600
    "#ED64A6", // pink-500
];

/// Deterministic, overridable palette assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorAssigner {
    palette: Vec<Color>,
}

impl Default for ColorAssigner {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.iter().copied().map(Color::from).collect(),
        }
    }
}

impl ColorAssigner {
    /// Use a custom palette.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Config`] if `palette` is empty.
    pub fn with_palette(palette: Vec<Color>) -> Result<Self> {
        if palette.is_empty() {
            return Err(FlowError::Config("color palette is empty".into()));
        }
        Ok(Self { palette })
    }

    /// Number of palette entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.palette.len()
    }

    /// Always `false`: the palette is non-empty by construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.palette.is_empty()
    }

    /// The palette entries in order.
    #[must_use]
    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    /// Palette entry at `index`, wrapping around.
    #[must_use]
    pub fn nth(&self, index: usize) -> Color {
        self.palette[index % self.palette.len()].clone()
    }

    /// Color for the `creation_index`-th group created in this session.
    #[must_use]
    pub fn group_color(&self, creation_index: usize) -> Color {
        self.nth(creation_index)
    }

    /// Color for an ungrouped head, keyed on the head index alone.
    #[must_use]
    pub fn head_color(&self, head: usize) -> Color {
        self.nth(head)
    }

    /// Pick a random palette entry not in `in_use`; if every entry is taken,
    /// pick uniformly from the whole palette.
    pub fn pick_unused<'a, R: Rng>(
        &self,
        in_use: impl IntoIterator<Item = &'a Color>,
        rng: &mut R,
    ) -> Color {
        let in_use: Vec<&Color> = in_use.into_iter().collect();
        let available: Vec<&Color> = self
            .palette
            .iter()
            .filter(|color| !in_use.contains(color))
            .collect();
        match available.choose(rng) {
            Some(color) => (*color).clone(),
            None => self.nth(rng.gen_range(0..self.palette.len())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rotation_wraps() {
        let colors = ColorAssigner::default();
        assert_eq!(colors.len(), 20);
        assert_eq!(colors.group_color(0).as_str(), "#38B2AC");
        assert_eq!(colors.group_color(21), colors.group_color(1));
        assert_eq!(colors.head_color(3).as_str(), "#68D391");
    }

    #[test]
    fn pick_unused_avoids_taken_colors() {
        let colors = ColorAssigner::with_palette(vec!["#a".into(), "#b".into(), "#c".into()]).unwrap();
        let taken = [Color::from("#a"), Color::from("#c")];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(colors.pick_unused(&taken, &mut rng).as_str(), "#b");
        }
    }

    #[test]
    fn pick_unused_falls_back_to_whole_palette() {
        let colors = ColorAssigner::with_palette(vec!["#a".into(), "#b".into()]).unwrap();
        let taken = [Color::from("#a"), Color::from("#b")];
        let mut rng = StdRng::seed_from_u64(1);
        let picked = colors.pick_unused(&taken, &mut rng);
        assert!(colors.palette().contains(&picked));
    }

    #[test]
    fn empty_palette_rejected() {
        assert!(matches!(
            ColorAssigner::with_palette(Vec::new()),
            Err(FlowError::Config(_))
        ));
    }
}
