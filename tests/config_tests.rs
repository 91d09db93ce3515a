// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use pixelize::Config;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert!(!config.effect_enabled, "effect should start disabled");
    assert_eq!(config.block_size, 10.0);
    assert_eq!(config.capture_width, 640);
    assert_eq!(config.capture_height, 480);
    assert_eq!(config.capture_fps, 30);
}

#[test]
fn test_config_sanitize_clamps_invalid_values() {
    let config = Config {
        effect_enabled: true,
        block_size: -4.0,
        capture_width: 0,
        capture_height: 480,
        capture_fps: 0,
    }
    .sanitized();

    assert_eq!(config.block_size, 1.0, "block size clamps to the minimum");
    assert_eq!(config.capture_width, 640);
    assert_eq!(config.capture_height, 480);
    assert_eq!(config.capture_fps, 30);
    assert!(config.effect_enabled, "valid fields are left alone");
}

#[test]
fn test_config_json_round_trip() {
    let config = Config {
        effect_enabled: true,
        block_size: 24.0,
        capture_width: 1280,
        capture_height: 720,
        capture_fps: 60,
    };

    let raw = serde_json::to_string(&config).expect("serialize");
    let parsed: Config = serde_json::from_str(&raw).expect("parse");
    assert_eq!(parsed, config);
}

#[test]
fn test_config_parses_known_json() {
    let raw = r#"{
        "effect_enabled": true,
        "block_size": 16.0,
        "capture_width": 320,
        "capture_height": 240,
        "capture_fps": 15
    }"#;

    let parsed: Config = serde_json::from_str(raw).expect("parse");
    assert!(parsed.effect_enabled);
    assert_eq!(parsed.block_size, 16.0);
    assert_eq!(parsed.capture_width, 320);
}
