//! Loading the startup configuration from disk

use std::io::Write;

use pulseflow_core::{config::FlowConfig, FlowError};
use tempfile::NamedTempFile;

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_a_complete_file() {
    let file = write_config(
        r#"{
            "calibration": { "pulses_per_liter": 450.0, "trim_factor": 1.02 },
            "tuning": {
                "gate_seconds": 0.5,
                "noise_threshold_lpm": 0.2,
                "idle_timeout_ms": 60000,
                "overflow_high_water": 20000,
                "overflow_max_count": 4
            },
            "smoothing": {
                "bands": [
                    { "above_lpm": 10.0, "alpha": 0.6 },
                    { "above_lpm": 2.0, "alpha": 0.4 }
                ],
                "floor_alpha": 0.1
            }
        }"#,
    );

    let config = FlowConfig::from_path(file.path()).unwrap();

    assert_eq!(config.calibration.pulses_per_liter, 450.0);
    assert_eq!(config.tuning.gate_period_ms(), 500);
    assert_eq!(config.tuning.overflow_max_count, 4);
    assert_eq!(config.smoothing.alpha_for(12.0), 0.6);
    assert_eq!(config.smoothing.alpha_for(3.0), 0.4);
    assert_eq!(config.smoothing.alpha_for(0.5), 0.1);
}

#[test]
fn missing_sections_take_defaults() {
    let file = write_config(r#"{ "calibration": { "pulses_per_liter": 5880.0 } }"#);

    let config = FlowConfig::from_path(file.path()).unwrap();

    assert_eq!(config.calibration.pulses_per_liter, 5880.0);
    assert_eq!(config.calibration.trim_factor, 1.0);
    assert_eq!(config.tuning, FlowConfig::default().tuning);
    assert_eq!(config.smoothing, FlowConfig::default().smoothing);
}

#[test]
fn invalid_tuning_is_rejected() {
    let file = write_config(r#"{ "tuning": { "gate_seconds": 0.0 } }"#);

    assert!(matches!(
        FlowConfig::from_path(file.path()),
        Err(FlowError::InvalidConfig { field: "gate_seconds", .. })
    ));
}

#[test]
fn malformed_or_missing_files_fail_to_load() {
    let file = write_config("{ not json");
    assert!(matches!(
        FlowConfig::from_path(file.path()),
        Err(FlowError::ConfigLoad { .. })
    ));

    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        FlowConfig::from_path(dir.path().join("absent.json")),
        Err(FlowError::ConfigLoad { .. })
    ));
}
