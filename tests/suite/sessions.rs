//! Anchors saved in one session and discovered in the next.

use tether_engine::{
    Anchor, AnchorEngine, AnchorId, Completion, Continuation, EngineConfig, Pose, SpatialSupport,
    sim::SimRuntime,
};

use crate::common::{Recorder, auto_engine, frame, run_ticks, settle};

/// Run a session that creates an anchor at each pose and erases the first
/// `erase` of them. Returns the runtime (session ended) and the kept ids.
fn first_session(poses: &[Pose], erase: usize) -> (SimRuntime, Vec<AnchorId>) {
    let mut engine = auto_engine(EngineConfig::default());
    for pose in poses {
        engine
            .create_anchor(*pose, frame(0), Continuation::none())
            .unwrap();
    }
    settle(&mut engine, 40);
    assert_eq!(engine.anchor_count(), poses.len());

    let ids: Vec<AnchorId> = engine.anchors().iter().map(Anchor::id).collect();
    for id in &ids[..erase] {
        engine.erase_anchor(*id, Continuation::none()).unwrap();
    }
    settle(&mut engine, 40);

    let (mut runtime, report) = engine.into_runtime();
    assert!(report.abandoned.is_empty());
    runtime.end_session();
    (runtime, ids[erase..].to_vec())
}

#[test]
fn saved_anchors_reload_in_next_session() {
    let pose = Pose::at(1.0, 1.0, -1.0);
    let (runtime, kept) = first_session(&[Pose::at(0.0, 1.0, 0.0), pose], 1);
    assert_eq!(runtime.stored_anchors(), kept);

    let mut engine = AnchorEngine::new(runtime, SpatialSupport::all(), EngineConfig::default());
    assert!(engine.anchors().is_empty());

    let recorder = Recorder::default();
    engine.load_all(recorder.continuation()).unwrap();
    settle(&mut engine, 40);

    assert_eq!(
        recorder.successes(),
        vec![Completion::QueryFinished { discovered: 1 }]
    );
    let anchors = engine.anchors();
    assert_eq!(anchors.len(), 1);
    assert_eq!(anchors[0].id(), kept[0]);
    assert_eq!(anchors[0].pose(), Some(pose));
    assert!(anchors[0].is_located());
    assert_eq!(engine.staged_count(), 0);
}

#[test]
fn load_on_start_discovers_without_explicit_call() {
    let (runtime, kept) = first_session(&[Pose::IDENTITY, Pose::at(2.0, 0.0, 0.0)], 0);

    let mut engine = AnchorEngine::new(
        runtime,
        SpatialSupport::all(),
        EngineConfig {
            load_on_start: true,
            ..EngineConfig::default()
        },
    );
    assert_eq!(engine.pending_requests(), 0);
    // The startup query is issued by the first tick.
    run_ticks(&mut engine, 1);
    assert_eq!(engine.pending_requests(), 1);
    settle(&mut engine, 40);

    let ids: Vec<AnchorId> = engine.anchors().iter().map(Anchor::id).collect();
    assert_eq!(ids, kept);
    assert_eq!(engine.stats().discovered, 2);
}

#[test]
fn query_is_bounded_by_max_results() {
    let poses = [
        Pose::at(0.0, 0.0, 0.0),
        Pose::at(1.0, 0.0, 0.0),
        Pose::at(2.0, 0.0, 0.0),
    ];
    let (runtime, _) = first_session(&poses, 0);

    let mut engine = AnchorEngine::new(
        runtime,
        SpatialSupport::all(),
        EngineConfig {
            query_max_results: 2,
            ..EngineConfig::default()
        },
    );
    let recorder = Recorder::default();
    engine.load_all(recorder.continuation()).unwrap();
    settle(&mut engine, 40);

    assert_eq!(
        recorder.successes(),
        vec![Completion::QueryFinished { discovered: 2 }]
    );
    assert_eq!(engine.anchor_count(), 2);
}
