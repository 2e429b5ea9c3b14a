// tests/graph_builder.rs

use std::collections::BTreeSet;

use pipedag::dag::{CollaboratorKind, Step, build_graph};
use pipedag::errors::PipelineError;
use pipedag_test_utils::builders::{StepBuilder, derive, persist, produce};

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn nodes_carry_dependencies_and_outputs_in_step_order() {
    let steps = vec![
        produce("original"),
        derive("original", "small"),
        persist("small"),
    ];

    let graph = build_graph(&steps).unwrap();
    let nodes = graph.nodes();

    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes.iter().map(|n| n.index).collect::<Vec<_>>(), vec![0, 1, 2]);

    assert!(nodes[0].dependencies.is_empty());
    assert_eq!(nodes[0].outputs, vec!["original".to_string()]);

    assert_eq!(nodes[1].dependencies, names(&["original"]));
    assert_eq!(nodes[1].outputs, vec!["small".to_string()]);

    // Persist without an output name binds nothing.
    assert_eq!(nodes[2].dependencies, names(&["small"]));
    assert!(nodes[2].outputs.is_empty());
}

#[test]
fn persist_with_output_name_declares_it() {
    let steps = vec![
        produce("img"),
        StepBuilder::persist("img", "mem://img").output("stored").build(),
    ];

    let graph = build_graph(&steps).unwrap();
    assert_eq!(graph.nodes()[1].outputs, vec!["stored".to_string()]);
    assert_eq!(graph.producer_of("stored"), Some(1));
}

#[test]
fn duplicate_output_name_is_a_configuration_error() {
    let steps = vec![produce("img"), produce("other"), produce("img")];

    let err = build_graph(&steps).unwrap_err();
    match err {
        PipelineError::ConfigError(msg) => {
            assert!(msg.contains("'img'"), "unexpected message: {msg}");
            assert!(msg.contains("step 0"), "unexpected message: {msg}");
            assert!(msg.contains("step 2"), "unexpected message: {msg}");
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn forward_and_dangling_references_are_not_build_errors() {
    // Ordering and existence are scheduling concerns.
    let steps = vec![derive("later", "a"), produce("later"), derive("nowhere", "b")];

    let graph = build_graph(&steps).unwrap();
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.producer_of("later"), Some(1));
    assert_eq!(graph.producer_of("nowhere"), None);
}

#[test]
fn building_twice_yields_equal_graphs() {
    let steps = vec![
        produce("original"),
        derive("original", "small"),
        derive("original", "large"),
        persist("large"),
    ];

    let first = build_graph(&steps).unwrap();
    let second = build_graph(&steps).unwrap();
    assert_eq!(first, second);
}

#[test]
fn dependents_and_petgraph_edges_follow_names() {
    let steps = vec![
        produce("original"),
        derive("original", "small"),
        derive("original", "large"),
        persist("small"),
    ];

    let graph = build_graph(&steps).unwrap();
    assert_eq!(graph.dependents_of(0), vec![1, 2]);
    assert_eq!(graph.dependents_of(1), vec![3]);
    assert!(graph.dependents_of(3).is_empty());
    assert!(graph.dependents_of(42).is_empty());

    let edges = graph.dependency_graph();
    assert_eq!(edges.node_count(), 4);
    assert_eq!(edges.edge_count(), 3);
    assert!(edges.contains_edge(0, 1));
    assert!(edges.contains_edge(0, 2));
    assert!(edges.contains_edge(1, 3));
}

#[test]
fn empty_step_list_builds_an_empty_graph() {
    let graph = build_graph(&[]).unwrap();
    assert!(graph.is_empty());
}

#[test]
fn persister_id_falls_back_to_scheme_then_file() {
    let explicit = StepBuilder::persist("img", "s3://bucket/key")
        .persister("mem")
        .build();
    let by_scheme = Step::persist("img", "s3://bucket/key");
    let plain = Step::persist("img", "out/img.raw");

    assert_eq!(explicit.collaborator_id(), "mem");
    assert_eq!(by_scheme.collaborator_id(), "s3");
    assert_eq!(plain.collaborator_id(), "file");
    assert_eq!(plain.kind(), CollaboratorKind::Persister);
}

#[test]
fn steps_display_their_shape() {
    assert_eq!(Step::produce("solid", "img").to_string(), "produce solid -> img");
    assert_eq!(
        Step::derive("img", "invert", "neg").to_string(),
        "derive img via invert -> neg"
    );
    assert_eq!(
        StepBuilder::persist("neg", "out/neg.raw")
            .output("ack")
            .build()
            .to_string(),
        "persist neg via file to out/neg.raw -> ack"
    );
}

#[test]
fn reading_a_persist_output_is_rejected_at_build_time() {
    let derive_from_ack = vec![
        produce("img"),
        StepBuilder::persist("img", "mem://img").output("ack").build(),
        derive("ack", "oops"),
    ];
    match build_graph(&derive_from_ack).unwrap_err() {
        PipelineError::NotAnArtifact { step_index, name } => {
            assert_eq!(step_index, 2);
            assert_eq!(name, "ack");
        }
        other => panic!("expected NotAnArtifact, got {other:?}"),
    }

    // Persisting an acknowledgement is equally meaningless, wherever it sits.
    let persist_ack_first = vec![
        persist("ack"),
        produce("img"),
        StepBuilder::persist("img", "mem://img").output("ack").build(),
    ];
    match build_graph(&persist_ack_first).unwrap_err() {
        PipelineError::NotAnArtifact { step_index, name } => {
            assert_eq!(step_index, 0);
            assert_eq!(name, "ack");
        }
        other => panic!("expected NotAnArtifact, got {other:?}"),
    }
}
