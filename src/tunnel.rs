//! A pass-through codec for the bytes that flow after a protocol switch
//! completes (§9).
//!
//! hyper's `upgrade.rs` hands the caller the raw, rewound I/O object and
//! steps out of the way entirely once a connection upgrades; there is no
//! equivalent hand-off here, since this crate never owns an I/O object to
//! begin with. Instead a switched [`Engine`](crate::engine::Engine) keeps
//! calling `decode`/`encode_body` against whatever
//! [`MessageDecoder`](crate::proto::MessageDecoder)/[`MessageEncoder`](crate::proto::MessageEncoder)
//! was installed, so the shape of "no more HTTP framing, just bytes" has
//! to be a codec like any other. `TunnelCodec` is that codec: every byte
//! fed in comes back out verbatim, and the message is never "done" on its
//! own — the tunnel ends when the caller stops feeding it.

use crate::error::Error;
use crate::proto::{MessageDecoder, MessageEncoder};
use crate::proto::decode::DecodeResult;
use crate::proto::encode::EncodeResult;

/// A codec that stops interpreting bytes as HTTP and just relays them,
/// for installing via [`Engine::install_switched_codec`](crate::engine::Engine::install_switched_codec)
/// once a `101 Switching Protocols` exchange has completed.
#[derive(Debug, Default, Clone, Copy)]
pub struct TunnelCodec;

impl TunnelCodec {
    pub fn new() -> Self {
        TunnelCodec
    }
}

impl MessageDecoder for TunnelCodec {
    fn decode(&mut self, input: &mut &[u8], output: &mut Vec<u8>, end_of_input: bool) -> Result<DecodeResult, Error> {
        output.extend_from_slice(input);
        *input = &input[input.len()..];
        Ok(DecodeResult { message_done: end_of_input, ..Default::default() })
    }
}

impl MessageEncoder for TunnelCodec {
    fn encode_body(&mut self, input: &mut &[u8], output: &mut Vec<u8>, end_of_input: bool) -> Result<EncodeResult, Error> {
        output.extend_from_slice(input);
        *input = &input[input.len()..];
        Ok(EncodeResult { message_done: end_of_input })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_relays_every_byte() {
        let mut codec = TunnelCodec::new();
        let mut input: &[u8] = b"raw bytes after the switch";
        let mut output = Vec::new();
        let result = codec.decode(&mut input, &mut output, false).unwrap();
        assert_eq!(output, b"raw bytes after the switch");
        assert!(input.is_empty());
        assert!(!result.message_done);
    }

    #[test]
    fn encoder_relays_every_byte() {
        let mut codec = TunnelCodec::new();
        let mut input: &[u8] = b"outbound tunnel bytes";
        let mut output = Vec::new();
        let result = codec.encode_body(&mut input, &mut output, true).unwrap();
        assert_eq!(output, b"outbound tunnel bytes");
        assert!(result.message_done);
    }
}
