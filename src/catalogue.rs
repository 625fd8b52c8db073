// SPDX-License-Identifier: MIT OR Apache-2.0

//! Predefined head groups and per-model defaults.
//!
//! The catalogue lists the circuit heads reported for each supported model
//! (IOI circuit for GPT-2 small, factual recall heads for Pythia-2.8B).
//! Entries seed the group store whenever the active model changes.

use crate::head::HeadRef;

/// A catalogue entry: a named set of heads with a description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredefinedGroup {
    /// Group name.
    pub name: &'static str,
    /// `(layer, head)` pairs.
    pub members: &'static [(usize, usize)],
    /// What the heads do.
    pub description: &'static str,
}

impl PredefinedGroup {
    /// Members as head references, in catalogue order.
    pub fn heads(&self) -> impl Iterator<Item = HeadRef> + '_ {
        self.members.iter().copied().map(HeadRef::from)
    }
}

const GPT2_SMALL: &[PredefinedGroup] = &[
    PredefinedGroup {
        name: "Name Mover",
        members: &[(9, 9), (10, 0), (9, 6)],
        description: "Attend to names and copy them to output. Active at END token position.",
    },
    PredefinedGroup {
        name: "Negative",
        members: &[(10, 7), (11, 10)],
        description: "Write in opposite direction of Name Movers, decreasing prediction confidence.",
    },
    PredefinedGroup {
        name: "S Inhibition",
        members: &[(8, 10), (7, 9), (8, 6), (7, 3)],
        description: "Reduce Name Mover Heads' attention to subject tokens. Attend to S2 and modify query patterns.",
    },
    PredefinedGroup {
        name: "Induction",
        members: &[(5, 5), (5, 9), (6, 9), (5, 8)],
        description: "Recognize [A][B]...[A] patterns to detect duplicated tokens via different mechanism.",
    },
    PredefinedGroup {
        name: "Duplicate Token",
        members: &[(0, 1), (0, 10), (3, 0)],
        description: "Identify repeated tokens. Active at S2, attend to S1, signal token duplication.",
    },
    PredefinedGroup {
        name: "Previous Token",
        members: &[(4, 11), (2, 2)],
        description: "Copy subject information to the token after S1. Support Induction Heads.",
    },
    PredefinedGroup {
        name: "Backup Name Mover",
        members: &[
            (11, 2),
            (10, 6),
            (10, 10),
            (10, 2),
            (9, 7),
            (10, 1),
            (11, 9),
            (9, 0),
        ],
        description: "Normally inactive but replace Name Movers if they're disabled. Show circuit redundancy.",
    },
];

const PYTHIA_2_8B: &[PredefinedGroup] = &[
    PredefinedGroup {
        name: "Subject Heads",
        members: &[(17, 2), (16, 12), (21, 9), (16, 20), (22, 17), (18, 14)],
        description: "Attend to subject tokens and extract their attributes. May activate even when irrelevant to the query.",
    },
    PredefinedGroup {
        name: "Relation Heads",
        members: &[(13, 31), (18, 20), (14, 24), (21, 18)],
        description: "Focus on relation tokens and boost possible answers for that relation type. Operate independently of subjects.",
    },
    PredefinedGroup {
        name: "Mixed Heads",
        members: &[(17, 17), (21, 23), (23, 22), (26, 8), (22, 15), (17, 30), (18, 25)],
        description: "Attend to both subject and relation tokens. Extract correct attributes more effectively through \"subject to relation propagation.\"",
    },
];

/// Catalogue entries for `model`; empty for models without a catalogue.
#[must_use]
pub fn predefined_groups(model: &str) -> &'static [PredefinedGroup] {
    match model {
        "gpt2-small" => GPT2_SMALL,
        "pythia-2.8b" => PYTHIA_2_8B,
        _ => &[],
    }
}

/// Grid dimensions used before a model's first real response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDefaults {
    /// Number of layers.
    pub num_layers: usize,
    /// Number of heads per layer.
    pub num_heads: usize,
    /// Number of placeholder tokens.
    pub num_tokens: usize,
}

/// Default grid dimensions for `model`, matched on the model family.
#[must_use]
pub fn model_defaults(model: &str) -> ModelDefaults {
    let model = model.to_lowercase();
    if model.contains("gpt2") {
        ModelDefaults {
            num_layers: 12,
            num_heads: 12,
            num_tokens: 5,
        }
    } else if model.contains("pythia") {
        ModelDefaults {
            num_layers: 32,
            num_heads: 32,
            num_tokens: 5,
        }
    } else {
        ModelDefaults {
            num_layers: 4,
            num_heads: 4,
            num_tokens: 5,
        }
    }
}

/// Prompt submitted automatically after switching to `model`.
#[must_use]
pub fn default_prompt(model: &str) -> &'static str {
    if model.to_lowercase().contains("pythia") {
        "Fact: The Colosseum is in the country of"
    } else {
        "When Mary and John went to the store, John gave a drink to"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpt2_catalogue() {
        let groups = predefined_groups("gpt2-small");
        assert_eq!(groups.len(), 7);
        assert_eq!(groups[0].name, "Name Mover");
        assert_eq!(
            groups[0].heads().collect::<Vec<_>>(),
            vec![HeadRef::new(9, 9), HeadRef::new(10, 0), HeadRef::new(9, 6)]
        );
    }

    #[test]
    fn catalogue_heads_fit_model_defaults() {
        for model in ["gpt2-small", "pythia-2.8b"] {
            let defaults = model_defaults(model);
            for group in predefined_groups(model) {
                for head in group.heads() {
                    assert!(head.layer < defaults.num_layers, "{model} {}: {head}", group.name);
                    assert!(head.head < defaults.num_heads, "{model} {}: {head}", group.name);
                }
            }
        }
    }

    #[test]
    fn unknown_model_has_no_catalogue() {
        assert!(predefined_groups("llama-3").is_empty());
        assert_eq!(model_defaults("llama-3").num_layers, 4);
    }

    #[test]
    fn default_prompt_by_family() {
        assert!(default_prompt("Pythia-2.8B").starts_with("Fact:"));
        assert!(default_prompt("gpt2-small").starts_with("When Mary"));
    }
}
