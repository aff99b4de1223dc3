//! The incremental HTTP/1.x codec state machines (components D, E, G).

pub mod chunked;
pub mod decode;
pub mod encode;
pub mod framing;

pub use decode::{DecodeResult, Http1Decoder, ResponseHint};
pub use encode::{EncodeResult, Http1Encoder, ProtocolSwitchResult};

use crate::error::Error;

/// The decoder half of a protocol, generic over what it decodes into —
/// used as a trait object so the engine can hold an arbitrary
/// post-upgrade codec (§9 "protocol-switch extension point").
pub trait MessageDecoder {
    /// Feeds bytes in, drains decoded body bytes out; see
    /// [`Http1Decoder::decode`] for the full contract (§4.D).
    fn decode(&mut self, input: &mut &[u8], output: &mut Vec<u8>, end_of_input: bool) -> Result<DecodeResult, Error>;
}

/// The encoder half of a protocol; see [`Http1Encoder::encode_body`] for
/// the full contract (§4.E).
pub trait MessageEncoder {
    fn encode_body(&mut self, input: &mut &[u8], output: &mut Vec<u8>, end_of_input: bool) -> Result<EncodeResult, Error>;
}
