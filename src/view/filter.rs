// SPDX-License-Identifier: MIT OR Apache-2.0

//! Threshold and visibility filtering of attention edges.

use std::collections::{HashMap, HashSet};

use crate::graph::AttentionEdge;
use crate::head::HeadRef;
use crate::selection::{GroupId, GroupStore, SelectionState};

/// An edge that passed filtering, with the group its head resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleEdge<'a> {
    /// The underlying edge.
    pub edge: &'a AttentionEdge,
    /// First group containing the edge's head, or `None` if ungrouped.
    pub group: Option<GroupId>,
}

impl VisibleEdge<'_> {
    /// Group id in renderer convention: `-1` for ungrouped heads.
    #[must_use]
    pub fn group_id(&self) -> i64 {
        self.group
            .and_then(|id| i64::try_from(id).ok())
            .unwrap_or(-1)
    }
}

/// Heads currently contributing edges: every grouped head plus every
/// individually selected head not already grouped.
#[must_use]
pub fn visible_heads(state: &SelectionState) -> HashSet<HeadRef> {
    let mut visible = state.groups().grouped_heads();
    visible.extend(state.individual().iter().copied());
    visible
}

/// Individually selected heads that no group claims, in selection order.
#[must_use]
pub fn ungrouped_individual(state: &SelectionState) -> Vec<HeadRef> {
    let grouped = state.groups().grouped_heads();
    state
        .individual()
        .iter()
        .copied()
        .filter(|h| !grouped.contains(h))
        .collect()
}

/// Head → first owning group, precomputed for one filtering pass.
fn group_index(groups: &GroupStore) -> HashMap<HeadRef, GroupId> {
    let mut index = HashMap::new();
    for group in groups.groups() {
        for &head in &group.members {
            index.entry(head).or_insert(group.id);
        }
    }
    index
}

/// Keep edges with `weight >= threshold` whose head is visible, annotating
/// each with its group. Input order is preserved.
#[must_use]
pub fn filter_edges<'a>(
    edges: &'a [AttentionEdge],
    threshold: f32,
    state: &SelectionState,
) -> Vec<VisibleEdge<'a>> {
    let visible = visible_heads(state);
    let groups = group_index(state.groups());
    edges
        .iter()
        .filter(|edge| edge.weight >= threshold && visible.contains(&edge.head_ref()))
        .map(|edge| VisibleEdge {
            edge,
            group: groups.get(&edge.head_ref()).copied(),
        })
        .collect()
}
