//! Single-session lifecycle against the auto-completing runtime.

use tether_engine::{
    AnchorEngine, Completion, ComponentStatus, ComponentType, Continuation, EngineConfig,
    EngineError, OperationKind, Pose, SpatialSupport, sim::SimRuntime,
};

use crate::common::{Recorder, auto_engine, frame, run_ticks, settle};

#[test]
fn created_anchor_is_persisted_and_tracked() {
    let mut engine = auto_engine(EngineConfig::default());
    let recorder = Recorder::default();
    let pose = Pose::at(0.0, 1.2, -1.0);

    engine
        .create_anchor(pose, frame(0), recorder.continuation())
        .unwrap();
    settle(&mut engine, 20);

    let anchors = engine.anchors();
    assert_eq!(anchors.len(), 1);
    let anchor = &anchors[0];
    assert_eq!(
        recorder.successes(),
        vec![Completion::Created {
            id: anchor.id(),
            space: anchor.space(),
        }]
    );
    assert!(anchor.capabilities().has(ComponentType::Storable));
    assert_eq!(engine.runtime().stored_anchors(), vec![anchor.id()]);
    assert_eq!(engine.stats().saves_succeeded, 1);

    // Refreshed on the tick the create completed.
    assert_eq!(anchor.pose(), Some(pose));
    assert!(anchor.is_located());
}

#[test]
fn erase_removes_anchor_and_stored_copy() {
    let mut engine = auto_engine(EngineConfig::default());
    engine
        .create_anchor(Pose::IDENTITY, frame(0), Continuation::none())
        .unwrap();
    settle(&mut engine, 20);
    let id = engine.anchors()[0].id();

    let recorder = Recorder::default();
    engine.erase_anchor(id, recorder.continuation()).unwrap();
    // Still registered until the completion arrives.
    assert!(engine.anchor(id).is_some());
    settle(&mut engine, 20);

    assert!(engine.anchor(id).is_none());
    assert!(engine.runtime().stored_anchors().is_empty());
    assert_eq!(recorder.successes(), vec![Completion::Erased { id }]);
}

#[test]
fn persist_on_create_can_be_turned_off() {
    let mut engine = auto_engine(EngineConfig {
        persist_on_create: false,
        ..EngineConfig::default()
    });
    engine
        .create_anchor(Pose::IDENTITY, frame(0), Continuation::none())
        .unwrap();
    settle(&mut engine, 20);

    assert_eq!(engine.anchor_count(), 1);
    assert_eq!(engine.runtime().submission_count(OperationKind::SetComponent), 0);
    assert_eq!(engine.runtime().submission_count(OperationKind::Save), 0);
    assert!(engine.runtime().stored_anchors().is_empty());
}

#[test]
fn explicit_enable_then_repeat_is_rejected() {
    let mut engine = auto_engine(EngineConfig {
        persist_on_create: false,
        ..EngineConfig::default()
    });
    engine
        .create_anchor(Pose::IDENTITY, frame(0), Continuation::none())
        .unwrap();
    settle(&mut engine, 20);
    let id = engine.anchors()[0].id();

    let recorder = Recorder::default();
    engine
        .set_component(id, ComponentType::Locatable, true, recorder.continuation())
        .unwrap();
    assert_eq!(
        engine.component_status(id, ComponentType::Locatable),
        Ok(ComponentStatus {
            enabled: false,
            change_pending: true,
        })
    );
    settle(&mut engine, 20);
    assert_eq!(
        recorder.successes(),
        vec![Completion::ComponentSet {
            id,
            component: ComponentType::Locatable,
            enabled: true,
        }]
    );

    let repeat = Recorder::default();
    assert_eq!(
        engine.set_component(id, ComponentType::Locatable, true, repeat.continuation()),
        Err(EngineError::ComponentStatusAlreadySet)
    );
    assert!(repeat.successes().is_empty());
    assert!(repeat.failures().is_empty());
    assert_eq!(engine.pending_requests(), 0);
}

#[test]
fn slow_requests_are_flagged_but_kept() {
    let mut engine = AnchorEngine::new(
        SimRuntime::auto(50),
        SpatialSupport::all(),
        EngineConfig {
            stale_request_ticks: 3,
            ..EngineConfig::default()
        },
    );
    let recorder = Recorder::default();
    engine
        .create_anchor(Pose::IDENTITY, frame(0), recorder.continuation())
        .unwrap();

    let stale: usize = run_ticks(&mut engine, 10)
        .iter()
        .map(|r| r.stale_requests)
        .sum();
    assert_eq!(stale, 1);
    assert_eq!(engine.pending_requests(), 1);
    assert!(recorder.failures().is_empty());

    let report = engine.shutdown();
    assert_eq!(report.abandoned.len(), 1);
    assert!(recorder.successes().is_empty());
}
