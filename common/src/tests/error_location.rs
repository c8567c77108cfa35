use crate::ErrorLocation;

#[track_caller]
fn located() -> ErrorLocation {
    ErrorLocation::caller()
}

/// **VALUE**: `caller()` must record the call site, not the line inside `ErrorLocation`.
///
/// **BUG THIS CATCHES**: Dropping `#[track_caller]` from `caller()` or from a helper
/// would make every error in the workspace point at `error_location.rs`.
#[test]
fn given_track_caller_helper_when_caller_captured_then_points_at_call_site() {
    // GIVEN/WHEN: Capturing through a #[track_caller] helper
    let expected_line = line!() + 1;
    let location = located();

    // THEN: File and line are this test's
    assert!(location.file.ends_with("error_location.rs"));
    assert!(location.file.contains("tests"));
    assert_eq!(location.line, expected_line);
}

#[test]
fn given_location_when_displayed_then_uses_bracketed_triplet() {
    let location = ErrorLocation {
        file: "src/osc/sender.rs",
        line: 42,
        column: 7,
    };

    assert_eq!(location.to_string(), "[src/osc/sender.rs:42:7]");
}
