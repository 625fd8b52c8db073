// SPDX-License-Identifier: MIT OR Apache-2.0

//! Head selection state: individually selected heads plus head groups.
//!
//! - [`HeadPattern`]: the `layer,head` wildcard grammar.
//! - [`GroupStore`]: named groups, membership, and group colors.
//! - [`SelectionState`]: both of the above, with the rules that tie them
//!   together (no duplicates across individual and grouped heads).

mod groups;
mod parser;

pub use groups::{GroupId, GroupStore, HeadGroup};
pub use parser::HeadPattern;

use crate::catalogue::PredefinedGroup;
use crate::color::ColorAssigner;
use crate::error::{FlowError, Result};
use crate::head::{HeadBounds, HeadRef};

/// The head used to seed an otherwise empty selection.
pub const DEFAULT_HEAD: HeadRef = HeadRef::new(0, 0);

/// Which heads the user has chosen to display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    individual: Vec<HeadRef>,
    groups: GroupStore,
}

impl SelectionState {
    /// Empty selection with no groups.
    #[must_use]
    pub fn new(colors: ColorAssigner) -> Self {
        Self {
            individual: Vec::new(),
            groups: GroupStore::new(colors),
        }
    }

    /// Empty individual selection with groups seeded from the catalogue.
    #[must_use]
    pub fn from_catalogue(entries: &[PredefinedGroup], colors: ColorAssigner) -> Self {
        Self {
            individual: Vec::new(),
            groups: GroupStore::from_catalogue(entries, colors),
        }
    }

    /// Individually selected heads, in selection order.
    #[must_use]
    pub fn individual(&self) -> &[HeadRef] {
        &self.individual
    }

    /// The group store.
    #[must_use]
    pub const fn groups(&self) -> &GroupStore {
        &self.groups
    }

    /// Mutable access to the group store.
    pub fn groups_mut(&mut self) -> &mut GroupStore {
        &mut self.groups
    }

    /// Whether `head` is individually selected.
    #[must_use]
    pub fn is_selected(&self, head: HeadRef) -> bool {
        self.individual.contains(&head)
    }

    /// Whether `head` is individually selected or in any group.
    #[must_use]
    pub fn is_known(&self, head: HeadRef) -> bool {
        self.is_selected(head) || self.groups.is_grouped(head)
    }

    /// Parse one line of selection input and add the heads it names.
    ///
    /// Bulk patterns skip heads that are already selected or grouped.
    /// Returns the heads actually added; blank input adds nothing. On error
    /// the state is left unchanged.
    ///
    /// # Errors
    ///
    /// - [`FlowError::Format`] / [`FlowError::Range`] for invalid input.
    /// - [`FlowError::NoOp`] if a bulk pattern would add nothing.
    /// - [`FlowError::AlreadyGrouped`] / [`FlowError::AlreadySelected`] if
    ///   an exact pair is already present.
    pub fn select(&mut self, input: &str, bounds: HeadBounds) -> Result<Vec<HeadRef>> {
        let Some(pattern) = HeadPattern::parse_line(input)? else {
            return Ok(Vec::new());
        };
        let heads = pattern.expand(bounds)?;

        let added: Vec<HeadRef> = if pattern.is_bulk() {
            let fresh: Vec<HeadRef> = heads.into_iter().filter(|&h| !self.is_known(h)).collect();
            if fresh.is_empty() {
                return Err(FlowError::NoOp(pattern.no_op_message().to_owned()));
            }
            fresh
        } else {
            for &head in &heads {
                if let Some(group) = self.groups.lookup_group(head) {
                    return Err(FlowError::AlreadyGrouped { head, group });
                }
                if self.is_selected(head) {
                    return Err(FlowError::AlreadySelected(head));
                }
            }
            heads
        };

        self.individual.extend_from_slice(&added);
        Ok(added)
    }

    /// Remove `head` from the individual selection. Returns whether it was
    /// selected.
    pub fn remove_individual(&mut self, head: HeadRef) -> bool {
        let before = self.individual.len();
        self.individual.retain(|&h| h != head);
        self.individual.len() != before
    }

    /// Select [`DEFAULT_HEAD`] if nothing is individually selected.
    pub fn seed_default(&mut self) {
        if self.individual.is_empty() {
            self.individual.push(DEFAULT_HEAD);
        }
    }
}
