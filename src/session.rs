// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session state and its reducer.
//!
//! A [`Session`] is the single state object behind one graph view: active
//! model, graph data, threshold, selection, and the view model derived from
//! them. [`Session::apply`] takes a [`Command`] and returns the next
//! session; the receiver is never modified, so a failed command leaves the
//! previous state (and its view model) in place.
//!
//! ```
//! use headflow::{Command, FlowConfig, Session};
//!
//! let session = Session::new(&FlowConfig::default());
//! let session = session.apply(Command::SelectHeads("1,:".into())).unwrap();
//! assert_eq!(session.selection().individual().len(), 12);
//! ```

use rand::Rng;

use crate::catalogue;
use crate::color::{Color, ColorAssigner};
use crate::config::FlowConfig;
use crate::error::{FlowError, Result};
use crate::fetch::DataMode;
use crate::graph::GraphData;
use crate::head::{HeadBounds, HeadRef};
use crate::selection::{GroupId, SelectionState};
use crate::view::ViewModel;

/// A user or system action that changes the session.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Parse a selection line and add the heads it names.
    SelectHeads(String),
    /// Create an empty group with this name.
    CreateGroup(String),
    /// Add or remove a head from a group. Ignored for unknown groups.
    ToggleMember {
        /// Target group.
        group: GroupId,
        /// Head to toggle.
        head: HeadRef,
    },
    /// Remove a head from a group. Ignored for unknown groups.
    RemoveMember {
        /// Target group.
        group: GroupId,
        /// Head to remove.
        head: HeadRef,
    },
    /// Remove a head from the individual selection.
    RemoveIndividual(HeadRef),
    /// Give a group an explicit color.
    SetGroupColor {
        /// Target group.
        group: GroupId,
        /// New color.
        color: Color,
    },
    /// Change the edge weight threshold (clamped to `[0, 1]`).
    SetThreshold(f32),
    /// Install freshly fetched graph data.
    LoadGraph {
        /// The data.
        data: GraphData,
        /// Which source produced it.
        mode: DataMode,
    },
    /// Switch to another model, discarding all selection state.
    SwitchModel(String),
}

/// The state behind one attention flow view.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    model: String,
    data: GraphData,
    threshold: f32,
    selection: SelectionState,
    mode: DataMode,
    colors: ColorAssigner,
    view: ViewModel,
}

impl Session {
    /// A session on the configured default model, showing that model's
    /// placeholder grid and catalogue groups.
    #[must_use]
    pub fn new(config: &FlowConfig) -> Self {
        Self::with_colors(config, ColorAssigner::default())
    }

    /// Like [`new`](Self::new) with a custom palette.
    #[must_use]
    pub fn with_colors(config: &FlowConfig, colors: ColorAssigner) -> Self {
        let model = config.default_model.clone();
        let mut session = Self {
            data: GraphData::placeholder(&model),
            selection: SelectionState::from_catalogue(
                catalogue::predefined_groups(&model),
                colors.clone(),
            ),
            model,
            threshold: config.default_threshold.clamp(0.0, 1.0),
            mode: DataMode::Backend,
            colors,
            view: ViewModel::default(),
        };
        session.refresh();
        session
    }

    /// Apply `command`, returning the next session.
    ///
    /// # Errors
    ///
    /// Returns the command's validation error (see [`FlowError`]); `self`
    /// is unchanged either way.
    pub fn apply(&self, command: Command) -> Result<Self> {
        let mut next = self.clone();
        next.reduce(command)?;
        next.refresh();
        Ok(next)
    }

    /// Build a [`Command::SetGroupColor`] that moves `group` to a random
    /// palette color not used by any other group.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnknownGroup`] if the group does not exist.
    pub fn recolor_command<R: Rng>(&self, group: GroupId, rng: &mut R) -> Result<Command> {
        let color = self.selection.groups().pick_new_color(group, rng)?;
        Ok(Command::SetGroupColor { group, color })
    }

    /// Active model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Current graph data.
    #[must_use]
    pub const fn data(&self) -> &GraphData {
        &self.data
    }

    /// Current threshold.
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Where the current data came from.
    #[must_use]
    pub const fn mode(&self) -> DataMode {
        self.mode
    }

    /// Head bounds of the current data.
    #[must_use]
    pub const fn bounds(&self) -> HeadBounds {
        self.data.bounds()
    }

    /// View model for the current state.
    #[must_use]
    pub const fn view_model(&self) -> &ViewModel {
        &self.view
    }

    fn refresh(&mut self) {
        self.view = ViewModel::build(&self.data, &self.selection, self.threshold);
    }

    fn reduce(&mut self, command: Command) -> Result<()> {
        match command {
            Command::SelectHeads(input) => {
                let bounds = self.bounds();
                self.selection.select(&input, bounds)?;
            }
            Command::CreateGroup(name) => {
                self.selection.groups_mut().create_group(&name, &[])?;
            }
            Command::ToggleMember { group, head } => {
                self.selection.groups_mut().toggle_member(group, head);
            }
            Command::RemoveMember { group, head } => {
                self.selection.groups_mut().remove_member(head, group);
            }
            Command::RemoveIndividual(head) => {
                self.selection.remove_individual(head);
            }
            Command::SetGroupColor { group, color } => {
                self.selection.groups_mut().set_color(group, color)?;
            }
            Command::SetThreshold(threshold) => {
                if threshold.is_nan() {
                    return Err(FlowError::Format("threshold must be a number".into()));
                }
                self.threshold = threshold.clamp(0.0, 1.0);
            }
            Command::LoadGraph { data, mode } => self.load_graph(data, mode)?,
            Command::SwitchModel(model) => self.switch_model(&model)?,
        }
        Ok(())
    }

    fn load_graph(&mut self, data: GraphData, mode: DataMode) -> Result<()> {
        if let Err(e) = data.validate() {
            tracing::warn!(error = %e, "rejected graph data, keeping previous view");
            return Err(e);
        }
        if mode == DataMode::Sample {
            if let Some(sample_model) = data.model_name.as_deref() {
                if sample_model != self.model {
                    self.switch_model(sample_model)?;
                }
            }
        }
        self.data = data;
        self.mode = mode;
        if mode == DataMode::Sample {
            self.selection.seed_default();
        }
        Ok(())
    }

    fn switch_model(&mut self, model: &str) -> Result<()> {
        let model = model.trim();
        if model.is_empty() {
            return Err(FlowError::Config("model name is empty".into()));
        }
        let entries = catalogue::predefined_groups(model);
        tracing::info!(model, groups = entries.len(), "switching model");
        self.model = model.to_owned();
        self.data = GraphData::placeholder(model);
        self.selection = SelectionState::from_catalogue(entries, self.colors.clone());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::tensor::AttentionTensor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config(model: &str) -> FlowConfig {
        FlowConfig {
            default_model: model.to_owned(),
            ..FlowConfig::default()
        }
    }

    fn ones(layers: usize, heads: usize, tokens: usize) -> GraphData {
        let nested = vec![vec![vec![vec![1.0; tokens]; tokens]; heads]; layers];
        GraphData::from_tensor(&AttentionTensor::from_nested(nested).unwrap(), None).unwrap()
    }

    #[test]
    fn new_session_seeds_catalogue() {
        let session = Session::new(&FlowConfig::default());
        assert_eq!(session.model(), "gpt2-small");
        assert_eq!(session.selection().groups().len(), 7);
        assert_eq!(session.view_model().nodes.len(), 12 * 5);
        assert_eq!(session.view_model().legend.len(), 7);
        assert_eq!(session.threshold(), 0.4);
    }

    #[test]
    fn failed_command_keeps_state() {
        let session = Session::new(&config("custom"));
        let err = session.apply(Command::SelectHeads("99,0".into())).unwrap_err();
        assert!(err.is_recoverable());
        let err = session.apply(Command::CreateGroup(" ".into())).unwrap_err();
        assert!(matches!(err, FlowError::EmptyName));
    }

    #[test]
    fn shape_error_retains_previous_view() {
        let session = Session::new(&config("custom"))
            .apply(Command::LoadGraph {
                data: ones(2, 1, 2),
                mode: DataMode::Backend,
            })
            .unwrap();
        let mut bad = ones(2, 1, 2);
        bad.attention_patterns[0].source_token = 7;
        let err = session
            .apply(Command::LoadGraph {
                data: bad,
                mode: DataMode::Backend,
            })
            .unwrap_err();
        assert!(matches!(err, FlowError::Shape(_)));
        assert_eq!(session.data().num_layers, 2);
    }

    #[test]
    fn threshold_is_clamped() {
        let session = Session::new(&config("custom"));
        assert_eq!(session.apply(Command::SetThreshold(1.7)).unwrap().threshold(), 1.0);
        assert_eq!(session.apply(Command::SetThreshold(-0.2)).unwrap().threshold(), 0.0);
        assert!(session.apply(Command::SetThreshold(f32::NAN)).is_err());
    }

    #[test]
    fn sample_mode_seeds_default_head() {
        let session = Session::new(&config("custom"))
            .apply(Command::LoadGraph {
                data: ones(2, 2, 2),
                mode: DataMode::Sample,
            })
            .unwrap();
        assert_eq!(session.mode(), DataMode::Sample);
        assert_eq!(session.selection().individual(), &[HeadRef::new(0, 0)]);
    }

    #[test]
    fn sample_for_other_model_switches_model() {
        let mut data = ones(2, 2, 2);
        data.model_name = Some("pythia-2.8b".into());
        let session = Session::new(&config("gpt2-small"))
            .apply(Command::SelectHeads("0,0".into()))
            .unwrap()
            .apply(Command::LoadGraph {
                data,
                mode: DataMode::Sample,
            })
            .unwrap();
        assert_eq!(session.model(), "pythia-2.8b");
        assert_eq!(session.selection().groups().len(), 3);
        assert_eq!(session.selection().individual(), &[HeadRef::new(0, 0)]);
        assert_eq!(session.data().num_layers, 2);
    }

    #[test]
    fn switch_model_discards_selection() {
        let session = Session::new(&config("gpt2-small"))
            .apply(Command::SelectHeads("1,1".into()))
            .unwrap()
            .apply(Command::CreateGroup("Mine".into()))
            .unwrap()
            .apply(Command::SwitchModel("pythia-2.8b".into()))
            .unwrap();
        assert!(session.selection().individual().is_empty());
        let names: Vec<&str> = session
            .selection()
            .groups()
            .groups()
            .iter()
            .map(|g| g.name.as_str())
            .collect();
        assert_eq!(names, vec!["Subject Heads", "Relation Heads", "Mixed Heads"]);
        assert_eq!(session.bounds(), HeadBounds::new(32, 32));
    }

    #[test]
    fn recolor_round_trip() {
        let session = Session::new(&config("gpt2-small"));
        let mut rng = StdRng::seed_from_u64(5);
        let command = session.recolor_command(0, &mut rng).unwrap();
        let Command::SetGroupColor { color, .. } = &command else {
            panic!("expected SetGroupColor");
        };
        let used: Vec<Color> = (0..7)
            .filter_map(|id| session.selection().groups().color_of(id))
            .collect();
        assert!(!used.contains(color));
        let expected = color.clone();
        let next = session.apply(command).unwrap();
        assert_eq!(next.selection().groups().color_of(0), Some(expected));
        assert!(session.recolor_command(99, &mut rng).is_err());
    }

    #[test]
    fn toggle_unknown_group_is_silent() {
        let session = Session::new(&config("custom"));
        let next = session
            .apply(Command::ToggleMember {
                group: 5,
                head: HeadRef::new(0, 0),
            })
            .unwrap();
        assert_eq!(next, session);
    }
}
