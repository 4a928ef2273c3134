//! Integration tests for [`trajgraph_train::config`] and the class weight
//! table in [`trajgraph_train::classes`].

use std::fs;
use tempfile::tempdir;
use trajgraph_train::classes::{ClassRegistry, ClassWeightTable};
use trajgraph_train::config::{Delimiter, EdgeWeighting, TrajectoryConfig};
use trajgraph_train::error::ConfigError;

#[test]
fn config_loads_from_hand_written_json() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("args.json");
    let mut value = serde_json::to_value(TrajectoryConfig::default()).unwrap();
    value["obs_len"] = 5.into();
    value["delimiter"] = "tab".into();
    value["edge_weighting"] = "exponential".into();
    fs::write(&path, value.to_string()).unwrap();

    let cfg = TrajectoryConfig::from_json(&path).unwrap();
    assert_eq!(cfg.obs_len, 5);
    assert_eq!(cfg.seq_len(), 17);
    assert_eq!(cfg.delimiter, Delimiter::Tab);
    assert_eq!(cfg.edge_weighting, EdgeWeighting::Exponential);
}

#[test]
fn invalid_values_fail_on_load() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("args.json");
    let mut value = serde_json::to_value(TrajectoryConfig::default()).unwrap();
    value["num_samples"] = 0.into();
    fs::write(&path, value.to_string()).unwrap();
    assert!(matches!(
        TrajectoryConfig::from_json(&path),
        Err(ConfigError::InvalidValue { field: "num_samples", .. })
    ));
}

#[test]
fn malformed_and_missing_files() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("broken.json");
    fs::write(&path, "{ obs_len: ").unwrap();
    assert!(matches!(TrajectoryConfig::from_json(&path), Err(ConfigError::ParseError { .. })));
    assert!(matches!(
        TrajectoryConfig::from_json(&tmp.path().join("absent.json")),
        Err(ConfigError::FileRead { .. })
    ));
}

#[test]
fn class_info_file_provides_ordered_weights() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("classInfo.json");
    fs::write(
        &path,
        r#"{
            "class_weights": {"Pedestrian": 1.0, "Biker": 2.5, "Car": 9.0},
            "class_counts": {"Pedestrian": 900, "Biker": 360, "Car": 100}
        }"#,
    )
    .unwrap();
    let table = ClassWeightTable::from_json(&path).unwrap();
    let registry = ClassRegistry::new(&["Car", "Pedestrian", "Biker"]);
    assert_eq!(table.weights_for(&registry).unwrap(), vec![9.0, 1.0, 2.5]);
    assert_eq!(table.class_counts["Biker"], 360);
}

#[test]
fn negative_class_weight_is_rejected() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("classInfo.json");
    fs::write(&path, r#"{"class_weights": {"Pedestrian": -1.0}}"#).unwrap();
    assert!(ClassWeightTable::from_json(&path).is_err());
}

#[test]
fn registry_round_trips_one_hot_rows() {
    let registry = ClassRegistry::from_config(&TrajectoryConfig::default());
    for (i, label) in registry.labels().iter().enumerate() {
        let row = registry.one_hot(label).unwrap();
        assert_eq!(row.sum(), 1.0);
        assert_eq!(registry.index_of_one_hot(row.view()), Some(i));
    }
    assert!(registry.one_hot("Unicycle").is_none());
}
