// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of the session reducer: tensor ingestion, selection,
//! grouping, filtering, and view-model output.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::float_cmp,
    clippy::missing_docs_in_private_items,
    missing_docs
)]

use headflow::{
    tensor_to_edges, AttentionTensor, Command, DataMode, FlowConfig, FlowError, GraphData,
    HeadRef, LegendKind, SampleGraphSource, Session,
};

/// A session on a model with no catalogue, so it starts with no groups.
fn bare_session() -> Session {
    Session::new(&FlowConfig {
        default_model: "toy".to_owned(),
        ..FlowConfig::default()
    })
}

fn uniform(layers: usize, heads: usize, seq: usize, weight: f32) -> AttentionTensor {
    AttentionTensor::from_nested(vec![vec![vec![vec![weight; seq]; seq]; heads]; layers]).unwrap()
}

fn load(session: &Session, tensor: &AttentionTensor) -> Session {
    session
        .apply(Command::LoadGraph {
            data: GraphData::from_tensor(tensor, None).unwrap(),
            mode: DataMode::Backend,
        })
        .unwrap()
}

#[test]
fn converter_emits_every_weight_verbatim() {
    let mut nested = vec![vec![vec![vec![0.0_f32; 3]; 3]; 2]; 2];
    for (l, layer) in nested.iter_mut().enumerate() {
        for (h, head) in layer.iter_mut().enumerate() {
            for (d, row) in head.iter_mut().enumerate() {
                for (s, w) in row.iter_mut().enumerate() {
                    *w = (l * 1000 + h * 100 + d * 10 + s) as f32;
                }
            }
        }
    }
    let tensor = AttentionTensor::from_nested(nested).unwrap();
    let edges = tensor_to_edges(&tensor);
    assert_eq!(edges.len(), 2 * 2 * 3 * 3);
    for e in &edges {
        let expected = (e.source_layer * 1000 + e.head * 100 + e.dest_token * 10 + e.source_token) as f32;
        assert_eq!(e.weight, expected);
        assert_eq!(e.dest_layer, e.source_layer + 1);
    }
}

#[test]
fn end_to_end_single_head() {
    let session = load(&bare_session(), &uniform(2, 1, 2, 1.0))
        .apply(Command::SetThreshold(0.5))
        .unwrap()
        .apply(Command::SelectHeads("0,0".into()))
        .unwrap();

    let view = session.view_model();
    assert_eq!(view.nodes.len(), 4);
    assert_eq!(view.links.len(), 4);
    for link in &view.links {
        assert!(link.source.starts_with("0-"));
        assert!(link.target.starts_with("1-"));
        assert_eq!(link.group_id, -1);
        assert_eq!(link.head, 0);
    }
    assert_eq!(view.legend.len(), 1);
    assert_eq!(view.legend[0].label, "Layer 0, Head 0");
}

#[test]
fn edge_count_is_monotone_in_threshold() {
    let mut nested = vec![vec![vec![vec![0.0_f32; 4]; 4]; 2]; 3];
    let mut w = 0.0;
    for layer in &mut nested {
        for head in layer {
            for row in head {
                for cell in row {
                    *cell = w;
                    w = (w + 0.037) % 1.0;
                }
            }
        }
    }
    let session = load(&bare_session(), &AttentionTensor::from_nested(nested).unwrap())
        .apply(Command::SelectHeads(":,:".into()))
        .unwrap();

    let mut previous = usize::MAX;
    for step in 0..=20 {
        let threshold = step as f32 / 20.0;
        let count = session
            .apply(Command::SetThreshold(threshold))
            .unwrap()
            .view_model()
            .links
            .len();
        assert!(count <= previous, "count rose at threshold {threshold}");
        previous = count;
    }
}

#[test]
fn wildcard_selection_expands_layer_major() {
    let session = load(&bare_session(), &uniform(2, 2, 1, 0.5))
        .apply(Command::SelectHeads(":,:".into()))
        .unwrap();
    assert_eq!(
        session.selection().individual(),
        &[
            HeadRef::new(0, 0),
            HeadRef::new(0, 1),
            HeadRef::new(1, 0),
            HeadRef::new(1, 1)
        ]
    );

    let session = load(&bare_session(), &uniform(3, 4, 1, 0.5))
        .apply(Command::SelectHeads("0,:".into()))
        .unwrap();
    assert_eq!(
        session.selection().individual(),
        &[
            HeadRef::new(0, 0),
            HeadRef::new(0, 1),
            HeadRef::new(0, 2),
            HeadRef::new(0, 3)
        ]
    );
}

#[test]
fn selection_errors_leave_state_untouched() {
    let session = load(&bare_session(), &uniform(2, 2, 2, 1.0))
        .apply(Command::SelectHeads("1,1".into()))
        .unwrap();

    for (input, check) in [
        ("1,1", (|e: &FlowError| matches!(e, FlowError::AlreadySelected(_))) as fn(&FlowError) -> bool),
        ("2,0", |e| matches!(e, FlowError::Range { .. })),
        ("a,b", |e| matches!(e, FlowError::Format(_))),
        ("1", |e| matches!(e, FlowError::Format(_))),
    ] {
        let err = session.apply(Command::SelectHeads(input.into())).unwrap_err();
        assert!(check(&err), "{input}: unexpected {err}");
        assert!(err.is_recoverable());
    }

    let full = session.apply(Command::SelectHeads(":,:".into())).unwrap();
    let err = full.apply(Command::SelectHeads(":,:".into())).unwrap_err();
    assert!(matches!(err, FlowError::NoOp(_)));
    assert_eq!(full.selection().individual().len(), 4);
}

#[test]
fn grouping_moves_heads_and_colors_links() {
    let session = load(&bare_session(), &uniform(2, 2, 2, 1.0))
        .apply(Command::CreateGroup("Movers".into()))
        .unwrap();
    let id = session.selection().groups().groups()[0].id;
    assert_eq!(id, 0);

    let err = session.apply(Command::CreateGroup("movers".into())).unwrap_err();
    assert!(matches!(err, FlowError::DuplicateName(_)));

    let head = HeadRef::new(1, 0);
    assert_eq!(session.selection().groups().lookup_group(head), None);
    let grouped = session
        .apply(Command::ToggleMember { group: id, head })
        .unwrap();
    assert_eq!(grouped.selection().groups().lookup_group(head), Some(id));

    let group_color = grouped.selection().groups().color_of(id).unwrap();
    let view = grouped.view_model();
    assert_eq!(view.links.len(), 4);
    assert!(view.links.iter().all(|l| l.group_id == 0 && l.color == group_color));
    assert!(matches!(view.legend[0].kind, LegendKind::Group { id: 0, .. }));

    let err = grouped
        .apply(Command::SelectHeads("1,0".into()))
        .unwrap_err();
    assert!(matches!(err, FlowError::AlreadyGrouped { group: 0, .. }));

    let restored = grouped
        .apply(Command::ToggleMember { group: id, head })
        .unwrap();
    assert_eq!(restored, session);
}

#[test]
fn bad_graph_keeps_previous_view() {
    let session = load(&bare_session(), &uniform(2, 1, 2, 1.0))
        .apply(Command::SelectHeads("0,0".into()))
        .unwrap();
    let json = r#"{"numLayers":1,"numTokens":2,"numHeads":1,"attentionPatterns":[[[[1.0]]]]}"#;
    assert!(serde_json::from_str::<GraphData>(json).is_err());

    let mut bad = GraphData::from_tensor(&uniform(1, 1, 2, 1.0), None).unwrap();
    bad.attention_patterns[0].head = 4;
    let err = session
        .apply(Command::LoadGraph {
            data: bad,
            mode: DataMode::Backend,
        })
        .unwrap_err();
    assert!(matches!(err, FlowError::Shape(_)));
    assert_eq!(session.view_model().links.len(), 4);
}

#[test]
fn sample_fallback_seeds_default_selection() {
    let samples = SampleGraphSource::bundled().unwrap();
    let data = samples.sample("gpt2-small").unwrap().clone();
    let session = Session::new(&FlowConfig::default())
        .apply(Command::LoadGraph {
            data,
            mode: DataMode::Sample,
        })
        .unwrap();

    assert_eq!(session.mode(), DataMode::Sample);
    assert_eq!(session.selection().individual(), &[HeadRef::new(0, 0)]);
    assert_eq!(session.selection().groups().len(), 7);
    assert_eq!(session.view_model().nodes.len(), 12 * 5);
    assert_eq!(session.view_model().node("0-1").unwrap().label, " Mary");
    assert!(!session.view_model().links.is_empty());
}

#[test]
fn switching_model_resets_to_catalogue() {
    let session = Session::new(&FlowConfig::default())
        .apply(Command::CreateGroup("Scratch".into()))
        .unwrap()
        .apply(Command::SwitchModel("pythia-2.8b".into()))
        .unwrap();
    assert_eq!(session.model(), "pythia-2.8b");
    assert_eq!(session.selection().groups().len(), 3);
    assert_eq!(session.view_model().nodes.len(), 32 * 5);
    assert!(session.view_model().links.is_empty());

    let err = session.apply(Command::SwitchModel("  ".into())).unwrap_err();
    assert!(matches!(err, FlowError::Config(_)));
}

#[test]
fn view_model_serializes_camel_case() {
    let session = load(&bare_session(), &uniform(1, 1, 1, 1.0))
        .apply(Command::SelectHeads("0,0".into()))
        .unwrap();
    let json = serde_json::to_value(session.view_model()).unwrap();
    assert_eq!(json["links"][0]["groupId"], -1);
    assert_eq!(json["nodes"][0]["id"], "0-0");
    assert_eq!(json["legend"][0]["kind"]["type"], "head");
}
