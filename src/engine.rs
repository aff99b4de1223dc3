//! The request/response engine that pairs a decoder and an encoder over
//! one connection, and that owns the atomic codec swap a protocol switch
//! requires (component F, §4.F, §9).
//!
//! Grounded on `proto/h1/conn.rs`'s `Conn<I, B, T>`, which hyper uses to
//! pair a `Decoder`/`Encoder` with the transport and the dispatcher; this
//! engine keeps the pairing and drops the transport half. I/O stays the
//! caller's job — this engine just says how many bytes of a given buffer
//! mean what.

use http::Method;

use crate::config::{DecoderConfig, EncoderConfig};
use crate::error::Error;
use crate::message::{HttpRequest, HttpResponse};
use crate::proto::decode::{DecodeResult, Http1Decoder, ResponseHint, Role as DecodeRole};
use crate::proto::encode::{EncodeResult, Http1Encoder, ProtocolSwitchResult};
use crate::proto::{MessageDecoder, MessageEncoder};

/// Which side of a request/response exchange this engine plays. A server
/// reads requests and writes responses; a client does the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Server,
    Client,
}

enum DecoderSlot {
    Http1(Http1Decoder),
    Switched(Box<dyn MessageDecoder>),
}

enum EncoderSlot {
    Http1(Http1Encoder),
    Switched(Box<dyn MessageEncoder>),
}

/// Pairs one decoder and one encoder for a single connection, and
/// arbitrates the handoff to a post-upgrade codec once a protocol switch
/// completes (§9).
pub struct Engine {
    side: Side,
    decoder: DecoderSlot,
    encoder: EncoderSlot,
    last_request_method: Option<Method>,
    last_response_hint: Option<ResponseHint>,
}

impl Engine {
    /// Builds an engine reading requests and writing responses.
    pub fn server(decoder_config: DecoderConfig, encoder_config: EncoderConfig) -> Self {
        Engine {
            side: Side::Server,
            decoder: DecoderSlot::Http1(Http1Decoder::new(DecodeRole::Request, decoder_config)),
            encoder: EncoderSlot::Http1(Http1Encoder::new(encoder_config)),
            last_request_method: None,
            last_response_hint: None,
        }
    }

    /// Builds an engine writing requests and reading responses. A freshly
    /// built client engine has no request on record yet; `GET` is the
    /// conservative default until [`latch_request`](Self::latch_request)
    /// records the real one.
    pub fn client(decoder_config: DecoderConfig, encoder_config: EncoderConfig) -> Self {
        let role = DecodeRole::Response { request_method: Method::GET };
        Engine {
            side: Side::Client,
            decoder: DecoderSlot::Http1(Http1Decoder::new(role, decoder_config)),
            encoder: EncoderSlot::Http1(Http1Encoder::new(encoder_config)),
            last_request_method: None,
            last_response_hint: None,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// True once a `101 Switching Protocols` response has been latched
    /// and the new codec installed; [`decode`](Self::decode) and
    /// [`encode_body`](Self::encode_body) now delegate to it instead of
    /// the HTTP/1.x pair this engine started with.
    pub fn has_switched_protocol(&self) -> bool {
        matches!(self.decoder, DecoderSlot::Switched(_))
    }

    pub fn current_request(&self) -> Option<&HttpRequest> {
        match &self.decoder {
            DecoderSlot::Http1(d) => d.current_request(),
            DecoderSlot::Switched(_) => None,
        }
    }

    pub fn current_response(&self) -> Option<&HttpResponse> {
        match &self.decoder {
            DecoderSlot::Http1(d) => d.current_response(),
            DecoderSlot::Switched(_) => None,
        }
    }

    /// Hint alongside the most recently completed request header (§4.D
    /// "100-continue"); only meaningful for a server engine.
    pub fn response_hint(&self) -> Option<ResponseHint> {
        self.last_response_hint
    }

    /// Feeds bytes into the active decoder.
    pub fn decode(&mut self, input: &mut &[u8], output: &mut Vec<u8>, end_of_input: bool) -> Result<DecodeResult, Error> {
        match &mut self.decoder {
            DecoderSlot::Http1(decoder) => {
                let result = decoder.decode(input, output, end_of_input)?;
                if result.header_completed {
                    self.last_response_hint = result.response_hint;
                    if let Some(request) = decoder.current_request() {
                        self.last_request_method = Some(request.method().clone());
                    }
                }
                Ok(result)
            }
            DecoderSlot::Switched(decoder) => {
                let result = decoder.decode(input, output, end_of_input)?;
                Ok(DecodeResult { message_done: result.message_done, ..Default::default() })
            }
        }
    }

    /// Renders a request's header and latches its body framing on the
    /// encoder half. Also updates the response decoder's notion of which
    /// request it's answering, so a client engine applies the right
    /// zero-body rule (§4.F) to whatever response comes back.
    pub fn latch_request(&mut self, request: &HttpRequest) -> Result<Vec<u8>, Error> {
        self.last_request_method = Some(request.method().clone());
        if let DecoderSlot::Http1(decoder) = &mut self.decoder {
            decoder.set_expected_request_method(request.method().clone());
        }
        match &mut self.encoder {
            EncoderSlot::Http1(encoder) => encoder.latch_request(request),
            EncoderSlot::Switched(_) => Err(Error::new_invalid_state("connection already switched protocol")),
        }
    }

    /// Renders a response's header, using the method of the most
    /// recently decoded or latched request to apply the zero-body rules
    /// (§4.F). Latches exactly once; if this response is a `101` carrying
    /// an `Upgrade`, the returned [`ProtocolSwitchResult`] names it, and
    /// the caller installs the matching codec pair via
    /// [`install_switched_codec`](Self::install_switched_codec) (§9).
    pub fn latch_response(
        &mut self,
        response: &HttpResponse,
    ) -> Result<(Vec<u8>, Option<ProtocolSwitchResult>), Error> {
        let method = self.last_request_method.clone().unwrap_or(Method::GET);
        match &mut self.encoder {
            EncoderSlot::Http1(encoder) => {
                let header = encoder.latch_response(response, &method)?;
                let switch = encoder.take_protocol_switch();
                Ok((header, switch))
            }
            EncoderSlot::Switched(_) => Err(Error::new_invalid_state("connection already switched protocol")),
        }
    }

    pub fn encode_body(&mut self, input: &mut &[u8], output: &mut Vec<u8>, end_of_input: bool) -> Result<EncodeResult, Error> {
        match &mut self.encoder {
            EncoderSlot::Http1(encoder) => encoder.encode_body(input, output, end_of_input),
            EncoderSlot::Switched(encoder) => encoder
                .encode_body(input, output, end_of_input)
                .map(|r| EncodeResult { message_done: r.message_done }),
        }
    }

    /// Replaces the active codec pair with a post-upgrade one (§9). The
    /// swap is atomic from a caller's perspective: between one call and
    /// the next, [`decode`](Self::decode)/[`encode_body`](Self::encode_body)
    /// either both still run HTTP/1.x or both already run the new codec,
    /// never a mix of the two.
    pub fn install_switched_codec(&mut self, decoder: Box<dyn MessageDecoder>, encoder: Box<dyn MessageEncoder>) {
        self.decoder = DecoderSlot::Switched(decoder);
        self.encoder = EncoderSlot::Switched(encoder);
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("side", &self.side)
            .field("switched", &self.has_switched_protocol())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldValue;
    use crate::message::MessageHeader;
    use crate::tunnel::TunnelCodec;
    use http::StatusCode;

    #[test]
    fn decodes_request_then_latches_matching_response() {
        let mut engine = Engine::server(DecoderConfig::default(), EncoderConfig::default());
        let mut input: &[u8] = b"HEAD / HTTP/1.1\r\nHost: a\r\n\r\n";
        let mut sink = Vec::new();
        let result = engine.decode(&mut input, &mut sink, false).unwrap();
        assert!(result.header_completed);
        assert!(result.message_done);

        let mut response = HttpResponse::new(StatusCode::OK, crate::version::HttpVersion::Http11, false);
        response.set_field_value(http::header::CONTENT_LENGTH, FieldValue::Int(1000));
        let (header, switch) = engine.latch_response(&response).unwrap();
        assert!(switch.is_none());
        let mut body: &[u8] = b"";
        let encode_result = engine.encode_body(&mut body, &mut Vec::new(), true).unwrap();
        assert!(encode_result.message_done);
        assert!(String::from_utf8(header).unwrap().contains("Content-Length: 1000"));
    }

    #[test]
    fn protocol_switch_signal_lets_the_caller_install_the_new_codec() {
        let mut engine = Engine::server(DecoderConfig::default(), EncoderConfig::default());
        let mut input: &[u8] = b"GET /ws HTTP/1.1\r\nHost: a\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n";
        engine.decode(&mut input, &mut Vec::new(), false).unwrap();

        let mut response = HttpResponse::new(StatusCode::SWITCHING_PROTOCOLS, crate::version::HttpVersion::Http11, false);
        response.set_field_value(http::header::UPGRADE, FieldValue::Str("websocket".into()));
        let (_, switch) = engine.latch_response(&response).unwrap();
        let switch = switch.expect("101 response should signal a protocol switch");
        assert_eq!(switch.protocol.as_deref(), Some("websocket"));

        assert!(!engine.has_switched_protocol());
        engine.install_switched_codec(Box::new(TunnelCodec::new()), Box::new(TunnelCodec::new()));
        assert!(engine.has_switched_protocol());
    }

    #[test]
    fn client_engine_applies_the_latched_request_method_to_response_framing() {
        let mut engine = Engine::client(DecoderConfig::default(), EncoderConfig::default());
        let request = HttpRequest::new(
            Method::HEAD,
            "http://a/x".parse().unwrap(),
            crate::version::HttpVersion::Http11,
            false,
        );
        engine.latch_request(&request).unwrap();

        let mut input: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 40\r\n\r\n";
        let mut output = Vec::new();
        let result = engine.decode(&mut input, &mut output, false).unwrap();
        assert!(result.message_done);
        assert!(output.is_empty());
    }
}
