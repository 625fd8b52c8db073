// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named head groups and their membership.
//!
//! [`GroupStore`] owns every [`HeadGroup`] of a session. Groups keep their
//! display order: catalogue groups in catalogue order, user-created groups
//! prepended. Lookups resolve a head to the *first* group (in that order)
//! containing it, so a head shared by two groups is attributed to the one
//! shown highest.

use std::collections::HashSet;

use rand::Rng;

use crate::catalogue::PredefinedGroup;
use crate::color::{Color, ColorAssigner};
use crate::error::{FlowError, Result};
use crate::head::HeadRef;

/// Group identifier. Immutable once assigned.
pub type GroupId = usize;

/// A named set of heads treated as one visual unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadGroup {
    /// Unique id.
    pub id: GroupId,
    /// Display name (unique case-insensitively at creation time).
    pub name: String,
    /// Current members, in insertion order.
    pub members: Vec<HeadRef>,
    /// Explicit color, if one has been assigned.
    pub color: Option<Color>,
    /// Free-text description.
    pub description: Option<String>,
    /// Heads this group was defined with in the catalogue. Empty for
    /// user-created groups.
    pub candidates: Vec<HeadRef>,
}

impl HeadGroup {
    /// Whether `head` is currently a member.
    #[must_use]
    pub fn contains(&self, head: HeadRef) -> bool {
        self.members.contains(&head)
    }

    /// Whether this group came from the predefined catalogue.
    #[must_use]
    pub fn is_predefined(&self) -> bool {
        !self.candidates.is_empty()
    }
}

/// Owns the groups of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupStore {
    groups: Vec<HeadGroup>,
    colors: ColorAssigner,
    /// Groups created so far; drives palette rotation.
    created: usize,
}

impl GroupStore {
    /// An empty store using `colors` for assignment.
    #[must_use]
    pub fn new(colors: ColorAssigner) -> Self {
        Self {
            groups: Vec::new(),
            colors,
            created: 0,
        }
    }

    /// A store seeded from catalogue entries. Ids follow catalogue order
    /// starting at 0.
    #[must_use]
    pub fn from_catalogue(entries: &[PredefinedGroup], colors: ColorAssigner) -> Self {
        let mut store = Self::new(colors);
        for (id, entry) in entries.iter().enumerate() {
            let mut members = Vec::new();
            for head in entry.heads() {
                if !members.contains(&head) {
                    members.push(head);
                }
            }
            store.groups.push(HeadGroup {
                id,
                name: entry.name.to_owned(),
                candidates: members.clone(),
                members,
                color: Some(store.colors.group_color(store.created)),
                description: Some(entry.description.to_owned()),
            });
            store.created += 1;
        }
        store
    }

    /// Create a group and return its id.
    ///
    /// The name is trimmed. The new group is placed first in display order
    /// and gets the next palette color in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::EmptyName`] for a blank name and
    /// [`FlowError::DuplicateName`] if another group has the same name
    /// ignoring case.
    pub fn create_group(&mut self, name: &str, initial: &[HeadRef]) -> Result<GroupId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FlowError::EmptyName);
        }
        let lowered = name.to_lowercase();
        if self.groups.iter().any(|g| g.name.to_lowercase() == lowered) {
            return Err(FlowError::DuplicateName(name.to_owned()));
        }

        let id = self.groups.iter().map(|g| g.id).max().map_or(0, |max| max + 1);
        let mut members = Vec::with_capacity(initial.len());
        for &head in initial {
            if !members.contains(&head) {
                members.push(head);
            }
        }
        let color = self.colors.group_color(self.created);
        self.created += 1;
        self.groups.insert(
            0,
            HeadGroup {
                id,
                name: name.to_owned(),
                members,
                color: Some(color),
                description: None,
                candidates: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Add `head` to group `id` if absent, remove it if present.
    ///
    /// Returns `Some(true)` if the head was added, `Some(false)` if removed,
    /// and `None` (no change) if the group does not exist.
    pub fn toggle_member(&mut self, id: GroupId, head: HeadRef) -> Option<bool> {
        let group = self.groups.iter_mut().find(|g| g.id == id)?;
        if let Some(pos) = group.members.iter().position(|&h| h == head) {
            group.members.remove(pos);
            Some(false)
        } else {
            group.members.push(head);
            Some(true)
        }
    }

    /// Remove `head` from group `id`. Returns whether anything was removed.
    pub fn remove_member(&mut self, head: HeadRef, id: GroupId) -> bool {
        let Some(group) = self.groups.iter_mut().find(|g| g.id == id) else {
            return false;
        };
        let before = group.members.len();
        group.members.retain(|&h| h != head);
        group.members.len() != before
    }

    /// Id of the first group containing `head`.
    #[must_use]
    pub fn lookup_group(&self, head: HeadRef) -> Option<GroupId> {
        self.groups.iter().find(|g| g.contains(head)).map(|g| g.id)
    }

    /// Whether any group contains `head`.
    #[must_use]
    pub fn is_grouped(&self, head: HeadRef) -> bool {
        self.lookup_group(head).is_some()
    }

    /// Union of every group's members.
    #[must_use]
    pub fn grouped_heads(&self) -> HashSet<HeadRef> {
        self.groups
            .iter()
            .flat_map(|g| g.members.iter().copied())
            .collect()
    }

    /// Group with id `id`.
    #[must_use]
    pub fn get(&self, id: GroupId) -> Option<&HeadGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Groups in display order.
    #[must_use]
    pub fn groups(&self) -> &[HeadGroup] {
        &self.groups
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// The color assigner backing this store.
    #[must_use]
    pub const fn colors(&self) -> &ColorAssigner {
        &self.colors
    }

    /// Resolved color of group `id`: its explicit color, else the palette
    /// entry at `id`.
    #[must_use]
    pub fn color_of(&self, id: GroupId) -> Option<Color> {
        let group = self.get(id)?;
        Some(
            group
                .color
                .clone()
                .unwrap_or_else(|| self.colors.nth(group.id)),
        )
    }

    /// Set the explicit color of group `id`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnknownGroup`] if the group does not exist.
    pub fn set_color(&mut self, id: GroupId, color: Color) -> Result<()> {
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(FlowError::UnknownGroup(id))?;
        group.color = Some(color);
        Ok(())
    }

    /// Draw a replacement color for group `id`, preferring palette entries
    /// no group currently uses.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnknownGroup`] if the group does not exist.
    pub fn pick_new_color<R: Rng>(&self, id: GroupId, rng: &mut R) -> Result<Color> {
        if self.get(id).is_none() {
            return Err(FlowError::UnknownGroup(id));
        }
        let in_use: Vec<Color> = self.groups.iter().filter_map(|g| self.color_of(g.id)).collect();
        Ok(self.colors.pick_unused(&in_use, rng))
    }
}
