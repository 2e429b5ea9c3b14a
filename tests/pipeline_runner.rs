// tests/pipeline_runner.rs

use std::error::Error as _;

use pipedag::dag::{CollaboratorKind, Step};
use pipedag::engine::{PipelineRunner, RunContext, RunPhase};
use pipedag::errors::PipelineError;
use pipedag_test_utils::builders::{StepBuilder, derive, persist, produce};
use pipedag_test_utils::fakes::{MemoryPersister, Probe, fake_registry};
use pipedag_test_utils::{fake_runner, fake_runner_limited, init_tracing, with_timeout};

fn labelled(label: &str, output: &str) -> Step {
    StepBuilder::produce("fake", output).param("label", label).build()
}

#[tokio::test]
async fn chain_binds_outputs_and_returns_results_in_step_order() {
    init_tracing();
    let probe = Probe::new();
    let steps = vec![
        labelled("A", "original"),
        StepBuilder::derive("original", "append", "small")
            .param("suffix", "s")
            .build(),
        StepBuilder::derive("original", "append", "large")
            .param("suffix", "l")
            .build(),
        persist("large"),
    ];

    let result = with_timeout(fake_runner(&probe).execute(&steps)).await.unwrap();

    let indices: Vec<usize> = result.iter().map(|s| s.step_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(result.artifact("original").unwrap().bytes(), b"A");
    assert_eq!(result.artifact("small").unwrap().bytes(), b"A+s");
    assert_eq!(result.artifact("large").unwrap().bytes(), b"A+l");

    // Persist without an output name is reported but not bound.
    assert_eq!(result.steps()[3].output_name, None);
    let acks: Vec<_> = result.persisted().collect();
    assert_eq!(acks.len(), 1);
    assert_eq!(acks[0].0, 3);
    assert_eq!(acks[0].1.location, "mem://large");
    assert_eq!(acks[0].1.bytes_written, 3);

    assert_eq!(
        probe.persisted(),
        vec![("mem://large".to_string(), b"A+l".to_vec())]
    );
}

#[tokio::test]
async fn persist_with_output_name_binds_the_acknowledgement() {
    init_tracing();
    let probe = Probe::new();
    let steps = vec![
        labelled("img", "img"),
        StepBuilder::persist("img", "mem://store/img")
            .output("stored")
            .build(),
    ];

    let result = with_timeout(fake_runner(&probe).execute(&steps)).await.unwrap();

    let ack = result.get("stored").unwrap().value.as_persisted().unwrap();
    assert_eq!(ack.location, "mem://store/img");
    assert_eq!(ack.bytes_written, 3);
    assert_eq!(ack.digest, result.artifact("img").unwrap().digest());
    assert!(result.artifact("stored").is_none());
}

#[tokio::test]
async fn waves_run_strictly_in_order() {
    init_tracing();
    let probe = Probe::new();
    let steps = vec![
        StepBuilder::produce("fake", "a")
            .param("label", "a")
            .param("delay_ms", 60)
            .build(),
        StepBuilder::produce("fake", "b")
            .param("label", "b")
            .param("delay_ms", 5)
            .build(),
        StepBuilder::derive("b", "append", "c")
            .param("label", "c")
            .build(),
    ];

    with_timeout(fake_runner(&probe).execute(&steps)).await.unwrap();

    let events = probe.events();
    let at = |e: &str| events.iter().position(|x| x == e).unwrap();
    // `c` only needs `b`, but still waits for all of wave 0.
    assert!(at("start:c") > at("end:a"), "{events:?}");
    assert!(at("start:c") > at("end:b"), "{events:?}");
    assert_eq!(probe.started(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn configured_concurrency_caps_steps_in_flight() {
    init_tracing();
    let probe = Probe::new();
    let steps: Vec<Step> = (0..5)
        .map(|i| {
            StepBuilder::produce("fake", &format!("img{i}"))
                .param("label", format!("p{i}"))
                .param("delay_ms", 20)
                .build()
        })
        .collect();

    let result = with_timeout(fake_runner_limited(&probe, 2).execute(&steps))
        .await
        .unwrap();

    assert_eq!(result.len(), 5);
    assert_eq!(probe.max_in_flight(), 2);
    assert_eq!(probe.started(), vec!["p0", "p1", "p2", "p3", "p4"]);
}

#[tokio::test]
async fn failed_step_reports_index_output_and_partial_bindings() {
    init_tracing();
    let probe = Probe::new();
    let steps = vec![
        labelled("a", "a"),
        StepBuilder::derive("a", "append", "b")
            .param("label", "b")
            .param("fail", true)
            .build(),
        StepBuilder::derive("b", "append", "c")
            .param("label", "c")
            .build(),
    ];

    let mut ctx = RunContext::new();
    let err = with_timeout(fake_runner(&probe).execute_in(&mut ctx, &steps))
        .await
        .unwrap_err();

    assert!(err.source().is_some());
    match err {
        PipelineError::StepFailed {
            step_index,
            output_name,
            produced,
            source,
        } => {
            assert_eq!(step_index, 1);
            assert_eq!(output_name.as_deref(), Some("b"));
            assert_eq!(produced, vec!["a".to_string()]);
            assert!(source.to_string().contains("simulated failure in b"));
        }
        other => panic!("expected StepFailed, got {other:?}"),
    }

    assert_eq!(ctx.phase(), RunPhase::Failed);
    assert!(ctx.bindings().contains("a"));
    assert!(!ctx.bindings().contains("b"));
    assert_eq!(ctx.completed_steps().len(), 1);
    assert_eq!(probe.started(), vec!["a", "b"]);
}

#[tokio::test]
async fn mid_wave_failure_drains_in_flight_siblings() {
    init_tracing();
    let probe = Probe::new();
    let steps = vec![
        StepBuilder::produce("fake", "x")
            .param("label", "x")
            .param("fail", true)
            .build(),
        StepBuilder::produce("fake", "y")
            .param("label", "y")
            .param("delay_ms", 40)
            .build(),
        derive("y", "z"),
    ];

    let mut ctx = RunContext::new();
    let err = with_timeout(fake_runner(&probe).execute_in(&mut ctx, &steps))
        .await
        .unwrap_err();

    match err {
        PipelineError::StepFailed {
            step_index,
            produced,
            ..
        } => {
            assert_eq!(step_index, 0);
            // Wave results are only bound when the whole wave succeeds.
            assert!(produced.is_empty());
        }
        other => panic!("expected StepFailed, got {other:?}"),
    }
    assert_eq!(probe.finished(), vec!["x", "y"]);
    assert!(ctx.bindings().is_empty());
}

#[tokio::test]
async fn failing_persister_surfaces_as_step_failure() {
    init_tracing();
    let probe = Probe::new();
    let registry =
        fake_registry(&probe).with_persister("broken", MemoryPersister::failing(probe.clone()));
    let steps = vec![
        labelled("img", "img"),
        StepBuilder::persist("img", "broken://bucket/img").build(),
    ];

    let err = with_timeout(PipelineRunner::new(registry).execute(&steps))
        .await
        .unwrap_err();

    match err {
        PipelineError::StepFailed {
            step_index,
            output_name,
            produced,
            ..
        } => {
            assert_eq!(step_index, 1);
            assert_eq!(output_name, None);
            assert_eq!(produced, vec!["img".to_string()]);
        }
        other => panic!("expected StepFailed, got {other:?}"),
    }
    assert!(probe.persisted().is_empty());
}

#[tokio::test]
async fn unknown_collaborator_aborts_before_the_wave_runs() {
    init_tracing();
    let probe = Probe::new();
    let steps = vec![labelled("a", "a"), Step::produce("missing", "b")];

    let err = with_timeout(fake_runner(&probe).execute(&steps)).await.unwrap_err();

    match err {
        PipelineError::UnknownCollaborator {
            step_index,
            kind,
            id,
            produced,
        } => {
            assert_eq!(step_index, 1);
            assert_eq!(kind, CollaboratorKind::Producer);
            assert_eq!(id, "missing");
            assert!(produced.is_empty());
        }
        other => panic!("expected UnknownCollaborator, got {other:?}"),
    }
    // Step 0 shares the wave and must not have been called.
    assert!(probe.events().is_empty());
}

#[tokio::test]
async fn unknown_persister_is_resolved_from_destination_scheme() {
    init_tracing();
    let probe = Probe::new();
    let steps = vec![labelled("a", "a"), Step::persist("a", "s3://bucket/a")];

    let err = with_timeout(fake_runner(&probe).execute(&steps)).await.unwrap_err();

    // Wave 0 already ran; the error still says what it bound.
    assert_eq!(err.produced(), Some(&["a".to_string()][..]));
    match err {
        PipelineError::UnknownCollaborator { kind, id, .. } => {
            assert_eq!(kind, CollaboratorKind::Persister);
            assert_eq!(id, "s3");
        }
        other => panic!("expected UnknownCollaborator, got {other:?}"),
    }
    assert_eq!(probe.started(), vec!["a"]);
}

#[tokio::test]
async fn reading_a_persistence_result_is_rejected_before_any_step_runs() {
    init_tracing();
    let probe = Probe::new();
    let steps = vec![
        labelled("img", "img"),
        StepBuilder::persist("img", "mem://img").output("ack").build(),
        derive("ack", "oops"),
    ];

    let mut ctx = RunContext::new();
    let err = with_timeout(fake_runner(&probe).execute_in(&mut ctx, &steps))
        .await
        .unwrap_err();

    match err {
        PipelineError::NotAnArtifact { step_index, name } => {
            assert_eq!(step_index, 2);
            assert_eq!(name, "ack");
        }
        other => panic!("expected NotAnArtifact, got {other:?}"),
    }
    assert_eq!(ctx.phase(), RunPhase::Failed);
    assert!(ctx.bindings().is_empty());
    assert!(probe.events().is_empty());
    assert!(probe.persisted().is_empty());
}

#[tokio::test]
async fn structural_errors_never_call_collaborators() {
    init_tracing();
    let probe = Probe::new();
    let runner = fake_runner(&probe);

    let duplicate = vec![produce("img"), produce("img")];
    let err = runner.execute(&duplicate).await.unwrap_err();
    assert!(matches!(err, PipelineError::ConfigError(_)), "{err:?}");

    let missing = vec![produce("img"), derive("nonexistent", "out")];
    let mut ctx = RunContext::new();
    let err = runner.execute_in(&mut ctx, &missing).await.unwrap_err();
    assert!(
        matches!(err, PipelineError::CircularOrMissingDependency(_)),
        "{err:?}"
    );
    assert!(err.to_string().contains("nonexistent"));
    assert_eq!(ctx.phase(), RunPhase::Failed);

    let cyclic = vec![derive("b", "a"), derive("a", "b")];
    let err = runner.execute(&cyclic).await.unwrap_err();
    assert!(
        matches!(err, PipelineError::CircularOrMissingDependency(_)),
        "{err:?}"
    );

    assert!(probe.events().is_empty());
}

#[tokio::test]
async fn context_is_single_use() {
    init_tracing();
    let probe = Probe::new();
    let runner = fake_runner(&probe);
    let steps = vec![produce("img")];

    let mut ctx = RunContext::new();
    assert_eq!(ctx.phase(), RunPhase::Idle);

    runner.execute_in(&mut ctx, &steps).await.unwrap();
    assert_eq!(ctx.phase(), RunPhase::Completed);
    assert!(ctx.phase().is_terminal());

    let err = runner.execute_in(&mut ctx, &steps).await.unwrap_err();
    match err {
        PipelineError::ConfigError(msg) => assert!(msg.contains("already used"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
    assert_eq!(probe.started().len(), 1);
}

#[tokio::test]
async fn concurrent_runs_keep_separate_bindings() {
    init_tracing();
    let probe = Probe::new();
    let runner = fake_runner(&probe);

    let first = vec![
        StepBuilder::produce("fake", "img")
            .param("label", "one")
            .param("delay_ms", 20)
            .build(),
        derive("img", "out"),
    ];
    let second = vec![
        StepBuilder::produce("fake", "img")
            .param("label", "two")
            .param("delay_ms", 5)
            .build(),
        derive("img", "out"),
    ];

    let (a, b) = with_timeout(async {
        tokio::join!(runner.execute(&first), runner.execute(&second))
    })
    .await;

    assert_eq!(a.unwrap().artifact("out").unwrap().bytes(), b"one+t");
    assert_eq!(b.unwrap().artifact("out").unwrap().bytes(), b"two+t");
}
