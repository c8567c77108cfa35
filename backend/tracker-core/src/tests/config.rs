// Unit tests for the config schema: defaults, validation, merge and on-disk format.

use crate::config::{
    CONFIG_VERSION, DEFAULT_LEFT_EYE_X, DEFAULT_SYNC_BLINK_ADDRESS, EyeTrackConfig,
};
use crate::error::config::ConfigError;

use serde_json::json;

/// **VALUE**: Pins the defaults the consumer application relies on.
///
/// **BUG THIS CATCHES**: A typo in one of the `concatcp!` parameter paths or a
/// changed default port would silently point the tracker at the wrong parameter.
#[test]
fn given_default_config_when_inspected_then_matches_documented_defaults() {
    let config = EyeTrackConfig::default();

    assert_eq!(config.version, CONFIG_VERSION);
    assert!(config.debug);
    assert_eq!(config.osc.address, "127.0.0.1");
    assert_eq!(config.osc.sending_port, 9000);
    assert_eq!(config.osc.receiver_port, 9001);
    assert!(!config.osc.sync_blink);
    assert_eq!(config.osc.osc_endpoints.left_eye_x, "/avatar/parameters/LeftEyeX");
    assert_eq!(config.osc.osc_endpoints.eyes_y, "/avatar/parameters/EyesY");
    assert_eq!(
        config.osc.osc_endpoints.right_eyelid_squeeze,
        "/avatar/parameters/RightEyeLidExpandedSqueeze"
    );
    assert_eq!(config.osc.sync_blink_address, "/avatar/parameters/etvr_sync_blink");
    assert_eq!(config.left_eye.threshold, 50);
    assert_eq!(config.algorithm.blob.threshold, 65);
    assert!(config.validate().is_ok(), "Defaults must validate");
}

#[test]
fn given_partial_document_when_deserialized_then_missing_fields_take_defaults() {
    // GIVEN: A document with one nested field and one unknown field
    let document = json!({
        "osc": { "sending_port": 9100 },
        "not_a_field": true
    });

    // WHEN: Deserializing
    let config: EyeTrackConfig = serde_json::from_value(document).unwrap();

    // THEN: The given field is kept, everything else is default
    assert_eq!(config.osc.sending_port, 9100);
    assert_eq!(config.osc.receiver_port, 9001);
    assert_eq!(config.osc.osc_endpoints.left_eye_x, DEFAULT_LEFT_EYE_X);
    assert_eq!(config.right_eye, Default::default());
}

/// **VALUE**: A partial update must only touch what it names.
///
/// **WHY THIS MATTERS**: The UI posts one section at a time. Replacing whole
/// nested objects would reset unrelated settings such as endpoint paths.
#[test]
fn given_nested_patch_when_merged_then_sibling_fields_are_preserved() {
    // GIVEN: A config with a customized endpoint
    let mut current = EyeTrackConfig::default();
    current.osc.osc_endpoints.eyes_y = "/custom/EyesY".to_string();
    current.left_eye.capture_source = "0".to_string();

    // WHEN: Patching an unrelated field in the same section
    let merged = current
        .merged(&json!({ "osc": { "mirror_eyes": true } }))
        .unwrap();

    // THEN: The patched field changed and the siblings survived
    assert!(merged.osc.mirror_eyes);
    assert_eq!(merged.osc.osc_endpoints.eyes_y, "/custom/EyesY");
    assert_eq!(merged.left_eye.capture_source, "0");
}

#[test]
fn given_wrong_type_when_merged_then_validation_error_and_source_untouched() {
    let current = EyeTrackConfig::default();
    let before = current.clone();

    let result = current.merged(&json!({ "osc": { "sending_port": "not a port" } }));

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    assert_eq!(current, before);
}

#[test]
fn given_out_of_range_port_when_merged_then_rejected() {
    let result = EyeTrackConfig::default().merged(&json!({ "osc": { "receiver_port": 70000 } }));

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
}

#[test]
fn given_non_object_payload_when_merged_then_rejected() {
    let current = EyeTrackConfig::default();

    for payload in [json!(null), json!([1, 2, 3]), json!("osc")] {
        assert!(
            current.merged(&payload).is_err(),
            "Payload {payload} should be rejected"
        );
    }
}

#[test]
fn given_invalid_values_when_validated_then_each_is_rejected() {
    let cases: [(&str, fn(&mut EyeTrackConfig)); 8] = [
        ("version zero", |c: &mut EyeTrackConfig| c.version = 0),
        ("future version", |c: &mut EyeTrackConfig| {
            c.version = CONFIG_VERSION + 1
        }),
        ("hostname address", |c: &mut EyeTrackConfig| {
            c.osc.address = "localhost".into()
        }),
        ("zero port", |c: &mut EyeTrackConfig| c.osc.sending_port = 0),
        ("relative endpoint", |c: &mut EyeTrackConfig| {
            c.osc.osc_endpoints.left_eye_x = "LeftEyeX".into()
        }),
        ("empty command address", |c: &mut EyeTrackConfig| {
            c.osc.recenter_address.clear()
        }),
        ("rotation", |c: &mut EyeTrackConfig| c.right_eye.rotation_angle = 400),
        ("blob bounds", |c: &mut EyeTrackConfig| {
            c.algorithm.blob.minsize = 30;
            c.algorithm.blob.maxsize = 20;
        }),
    ];

    for (name, mutate) in cases {
        let mut config = EyeTrackConfig::default();
        mutate(&mut config);
        assert!(
            matches!(config.validate(), Err(ConfigError::ValidationError { .. })),
            "Case '{name}' should fail validation"
        );
    }
}

/// **VALUE**: The persisted document is indented with four spaces.
///
/// **BUG THIS CATCHES**: Switching to `to_string_pretty` (two spaces) would
/// produce noisy diffs against files written by earlier versions.
#[test]
fn given_config_when_saved_then_file_uses_four_space_indent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker-config.json");

    EyeTrackConfig::default().save(&path).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("\n    \"version\": 2"), "{contents}");
    assert!(contents.contains("\n        \"sync_blink_address\""));
    assert!(!path.with_extension("json.tmp").exists(), "Temp file must be renamed away");

    let reloaded = EyeTrackConfig::read_from(&path).unwrap();
    assert_eq!(reloaded.osc.sync_blink_address, DEFAULT_SYNC_BLINK_ADDRESS);
}

#[test]
fn given_invalid_config_when_saved_then_nothing_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker-config.json");
    let mut config = EyeTrackConfig::default();
    config.osc.address = "not-an-ip".to_string();

    let result = config.save(&path);

    assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    assert!(!path.exists());
}

#[test]
fn given_missing_parent_dir_when_saved_then_dir_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("tracker-config.json");

    EyeTrackConfig::default().save(&path).unwrap();

    assert!(path.exists());
}

#[test]
fn given_osc_config_when_addresses_resolved_then_use_configured_ports() {
    let config = EyeTrackConfig::default();

    assert_eq!(
        config.osc.sending_addr().unwrap(),
        "127.0.0.1:9000".parse().unwrap()
    );
    assert_eq!(
        config.osc.receiving_addr().unwrap(),
        "127.0.0.1:9001".parse().unwrap()
    );
}
