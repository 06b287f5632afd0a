//! Configuration files flowing into engine behavior.

use std::fs;

use tempfile::tempdir;
use tether_engine::{
    ConfigError, Continuation, EngineConfig, OperationKind, Pose, TetherConfig,
    sim::Submission,
};

use crate::common::{auto_engine, frame, settle};

#[test]
fn config_file_shapes_engine() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[query]
max_results = 4

[engine]
persist_on_create = false
"#,
    )
    .unwrap();

    let loaded = TetherConfig::load_from(&path).unwrap().unwrap();
    let mut engine = auto_engine(EngineConfig::from(&loaded));

    engine
        .create_anchor(Pose::IDENTITY, frame(0), Continuation::none())
        .unwrap();
    engine.load_all(Continuation::none()).unwrap();
    settle(&mut engine, 20);

    assert_eq!(engine.anchor_count(), 1);
    assert_eq!(engine.runtime().submission_count(OperationKind::Save), 0);
    let max_results = engine
        .runtime()
        .submissions()
        .iter()
        .find_map(|s| match s {
            Submission::Query { info, .. } => Some(info.max_result_count),
            _ => None,
        });
    assert_eq!(max_results, Some(4));
}

#[test]
fn malformed_config_reports_its_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[engine\npersist_on_create = true\n").unwrap();

    let err = TetherConfig::load_from(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert_eq!(err.path(), &path);
    assert!(err.to_string().contains("config.toml"));
}
