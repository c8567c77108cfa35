use crate::error::osc::OscError;
use crate::osc::codec::{decode, encode, encode_float};

use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType, encoder};

#[test]
fn given_float_message_when_encoded_then_decodes_to_same_address_and_value() {
    let packet = encode_float("/avatar/parameters/LeftEyeX", 0.25).unwrap();

    let messages = decode(&packet).unwrap();

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].addr, "/avatar/parameters/LeftEyeX");
    assert_eq!(messages[0].args, vec![OscType::Float(0.25)]);
}

/// **VALUE**: Bundled commands are dispatched like loose messages.
///
/// **BUG THIS CATCHES**: Ignoring `OscPacket::Bundle` would drop commands from
/// clients that always bundle, with no error anywhere.
#[test]
fn given_nested_bundle_when_decoded_then_messages_are_flattened_in_order() {
    // GIVEN: A bundle holding a message and another bundle
    let message = |addr: &str| {
        OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args: vec![OscType::Bool(true)],
        })
    };
    let inner = OscPacket::Bundle(OscBundle {
        timetag: OscTime::from((0, 1)),
        content: vec![message("/b"), message("/c")],
    });
    let outer = OscPacket::Bundle(OscBundle {
        timetag: OscTime::from((0, 1)),
        content: vec![message("/a"), inner],
    });
    let bytes = encoder::encode(&outer).unwrap();

    // WHEN: Decoding
    let messages = decode(&bytes).unwrap();

    // THEN: All three arrive in document order
    let addresses: Vec<_> = messages.iter().map(|m| m.addr.as_str()).collect();
    assert_eq!(addresses, ["/a", "/b", "/c"]);
}

#[test]
fn given_garbage_when_decoded_then_returns_decode_error() {
    let result = decode(b"definitely not osc");

    assert!(matches!(result, Err(OscError::Decode { .. })));
}

#[test]
fn given_int_args_when_encoded_then_args_survive() {
    let packet = encode("/etvr", vec![OscType::Int(3), OscType::Bool(false)]).unwrap();

    let messages = decode(&packet).unwrap();

    assert_eq!(messages[0].args, vec![OscType::Int(3), OscType::Bool(false)]);
}

/// **VALUE**: Encode errors point at the code that asked for the message.
///
/// **BUG THIS CATCHES**: A missing `#[track_caller]` on a wrapper records the
/// wrapper's own line, so every send failure looks like it came from the codec.
#[test]
fn given_address_without_slash_when_encoded_then_error_located_at_caller() {
    let result = encode_float("avatar/parameters/LeftEyeX", 0.5);

    match result {
        Err(OscError::Encode { location, .. }) => {
            assert_eq!(location.file, file!());
            assert_eq!(location.line, line!() - 5);
        }
        other => panic!("Expected encode error, got {other:?}"),
    }
}
