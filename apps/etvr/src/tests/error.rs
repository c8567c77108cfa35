use crate::error::EtvrError;

use common::ErrorLocation;

use tracker_core::error::{CoreError, TrackerError};

use std::panic::Location;

/// **VALUE**: Errors serialize with a variant tag so a client can branch on them.
#[test]
fn given_etvr_error_when_serialized_then_tagged_with_variant() {
    // GIVEN: An EtvrError
    let err = EtvrError::Http {
        message: String::from("Test"),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Serializing to JSON
    let json = serde_json::to_value(&err).unwrap();

    // THEN: Tag and message are present
    assert_eq!(json["type"], "Http");
    assert_eq!(json["data"]["message"], "Test");
    assert!(json["data"]["location"]["line"].is_number());
}

#[test]
fn given_core_error_when_converted_then_message_preserved() {
    let core = CoreError::from(TrackerError::Unavailable {
        message: String::from("camera offline"),
        location: ErrorLocation::caller(),
    });

    let err = EtvrError::from(core);

    assert!(matches!(err, EtvrError::Core { .. }));
    assert!(err.to_string().contains("camera offline"));
    assert!(err.to_string().starts_with("Core Error:"));
}
