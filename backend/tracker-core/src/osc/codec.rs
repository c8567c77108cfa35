//! OSC 1.0 packet encoding and decoding.

use crate::error::osc::OscError;

use common::ErrorLocation;

use rosc::{OscMessage, OscPacket, OscType, decoder, encoder};

/// Encode one message carrying a single float argument.
#[track_caller]
pub fn encode_float(address: &str, value: f32) -> Result<Vec<u8>, OscError> {
    encode(address, vec![OscType::Float(value)])
}

/// Encode one message with arbitrary arguments.
///
/// # Errors
///
/// Returns [`OscError::Encode`] if `address` does not start with `/`.
#[track_caller]
pub fn encode(address: &str, args: Vec<OscType>) -> Result<Vec<u8>, OscError> {
    if !address.starts_with('/') {
        return Err(OscError::Encode {
            message: format!("OSC address must start with '/': {address}"),
            location: ErrorLocation::caller(),
        });
    }

    let packet = OscPacket::Message(OscMessage {
        addr: address.to_string(),
        args,
    });

    encoder::encode(&packet).map_err(|e| OscError::Encode {
        message: format!("Failed to encode message for {address}: {e:?}"),
        location: ErrorLocation::caller(),
    })
}

/// Decode a datagram into its messages, flattening any bundles in order.
pub fn decode(datagram: &[u8]) -> Result<Vec<OscMessage>, OscError> {
    let (_, packet) = decoder::decode_udp(datagram)?;

    let mut messages = Vec::new();
    flatten(packet, &mut messages);
    Ok(messages)
}

fn flatten(packet: OscPacket, messages: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(message) => messages.push(message),
        OscPacket::Bundle(bundle) => {
            for packet in bundle.content {
                flatten(packet, messages);
            }
        }
    }
}
