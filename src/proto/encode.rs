//! Incremental request/response encoding (component E, §4.E).
//!
//! Grounded on `proto/h1/encode.rs`'s `Encoder`/`Kind`/`ChunkSize` and
//! `proto/h1/role.rs`'s `set_length`/`write_headers`, with the same
//! "latch a header, then drain a body" split the spec calls for: the
//! header section is rendered in full the moment a message is latched
//! (there's nothing incremental about a start line), and only the body
//! is fed through [`MessageEncoder::encode_body`] a chunk at a time.

use std::time::SystemTime;

use http::{HeaderName, Method, StatusCode};

use crate::config::EncoderConfig;
use crate::error::Error;
use crate::field::FieldValue;
use crate::message::{self, HttpRequest, HttpResponse, MessageHeader};
use crate::proto::chunked::{encode_chunk, encode_last_chunk};
use crate::proto::framing::{self, BodyLength};

use tracing::{debug, trace};

/// Header field names hyper denylists from ever appearing as a trailer,
/// because an intermediary that doesn't understand trailers would never
/// apply them — letting them arrive late would silently defeat the field
/// they name (`proto/h1/encode.rs::is_valid_trailer_field`).
fn is_valid_trailer_field(name: &HeaderName) -> bool {
    use http::header::*;
    !matches!(
        *name,
        AUTHORIZATION
            | CACHE_CONTROL
            | CONTENT_ENCODING
            | CONTENT_LENGTH
            | CONTENT_RANGE
            | CONTENT_TYPE
            | HOST
            | TRAILER
            | TRANSFER_ENCODING
            | TE
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyMode {
    None,
    Fixed(u64),
    Chunked,
    UntilClose,
}

/// Outcome of one [`Http1Encoder::encode_body`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeResult {
    /// The latched message's body has been fully written.
    pub message_done: bool,
}

/// Returned when encoding a `101 Switching Protocols` response completes,
/// signaling the engine to swap codecs (§9 "protocol-switch extension
/// point").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolSwitchResult {
    /// The value of the `Upgrade` field on the response that authorized
    /// the switch, if any.
    pub protocol: Option<String>,
}

/// Encodes one HTTP/1.x message (request or response) at a time.
pub struct Http1Encoder {
    config: EncoderConfig,
    body_mode: BodyMode,
    keep_alive: bool,
    protocol_switch: Option<ProtocolSwitchResult>,
}

impl Http1Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Http1Encoder { config, body_mode: BodyMode::None, keep_alive: true, protocol_switch: None }
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Takes the pending protocol-switch signal, if the last latched
    /// response was a `101`.
    pub fn take_protocol_switch(&mut self) -> Option<ProtocolSwitchResult> {
        self.protocol_switch.take()
    }

    /// Renders a request's start line and header section and latches its
    /// body framing for subsequent [`encode_body`](Self::encode_body)
    /// calls.
    pub fn latch_request(&mut self, request: &HttpRequest) -> Result<Vec<u8>, Error> {
        let length = framing::request_body_length(request)?;
        trace!("latch_request; method={}, body={:?}", request.method(), length);
        self.body_mode = body_mode_for(length);
        self.keep_alive = request.keep_alive();

        let mut out = Vec::new();
        let target = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        out.extend_from_slice(format!("{} {} {}\r\n", request.method(), target, request.protocol()).as_bytes());

        self.write_date(&mut out, request, false)?;

        if request.field(&http::header::HOST).is_none() {
            if let Some(host) = request.host() {
                let line = if request.port() >= 0 {
                    format!("Host: {}:{}\r\n", host, request.port())
                } else {
                    format!("Host: {}\r\n", host)
                };
                out.extend_from_slice(line.as_bytes());
            }
        }

        self.write_length_fields(&mut out, length);
        self.write_remaining_fields(&mut out, request)?;
        out.extend_from_slice(b"\r\n");
        Ok(out)
    }

    /// As [`latch_request`](Self::latch_request), for a response; the
    /// answered request's method is required because HEAD/1xx/204/304
    /// zero-body rules can't be read off the response alone (§4.F).
    pub fn latch_response(&mut self, response: &HttpResponse, request_method: &Method) -> Result<Vec<u8>, Error> {
        let length = framing::response_body_length(response, request_method)?;
        self.body_mode = body_mode_for(length);
        self.keep_alive = !(framing::wants_close(response) || length == BodyLength::UntilClose);

        if response.status() == StatusCode::SWITCHING_PROTOCOLS {
            let protocol = match response.field(&http::header::UPGRADE).map(|f| f.value()) {
                Some(FieldValue::Str(s)) => Some(s.clone()),
                _ => None,
            };
            debug!("101 response sent, switching protocol to {:?}", protocol);
            self.protocol_switch = Some(ProtocolSwitchResult { protocol });
        }

        let mut out = Vec::new();
        out.extend_from_slice(
            format!("{} {} {}\r\n", response.protocol(), response.status().as_u16(), response.reason()).as_bytes(),
        );
        self.write_date(&mut out, response, true)?;
        self.write_length_fields(&mut out, length);
        self.write_remaining_fields(&mut out, response)?;
        out.extend_from_slice(b"\r\n");
        Ok(out)
    }

    /// Renders a standalone interim (1xx) response — most commonly `100
    /// Continue` — without touching this encoder's latched body state
    /// (§4.D/§4.E "100-continue").
    pub fn encode_interim(&self, response: &HttpResponse) -> Vec<u8> {
        format!("{} {} {}\r\n\r\n", response.protocol(), response.status().as_u16(), response.reason())
            .into_bytes()
    }

    /// Writes `Date` first, ahead of `Host` and the length fields (§4.E
    /// field output order). An explicitly set `Date` is rendered as-is;
    /// otherwise a response (never a request) gets one synthesized from
    /// the current time.
    fn write_date(&self, out: &mut Vec<u8>, header: &dyn MessageHeader, is_response: bool) -> Result<(), Error> {
        match header.field(&http::header::DATE) {
            Some(field) => {
                let text = message::render_field(field.name(), field.value())?;
                out.extend_from_slice(b"Date: ");
                out.extend_from_slice(text.as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            None if is_response => {
                out.extend_from_slice(b"Date: ");
                out.extend_from_slice(crate::field::date::format_imf_fixdate(SystemTime::now()).as_bytes());
                out.extend_from_slice(b"\r\n");
            }
            None => {}
        }
        Ok(())
    }

    fn write_length_fields(&self, out: &mut Vec<u8>, length: BodyLength) {
        match length {
            BodyLength::Fixed(n) => {
                out.extend_from_slice(b"Content-Length: ");
                let _ = itoa::write(&mut *out, n);
                out.extend_from_slice(b"\r\n");
            }
            BodyLength::Chunked => out.extend_from_slice(b"Transfer-Encoding: chunked\r\n"),
            BodyLength::None | BodyLength::UntilClose => {}
        }
    }

    fn write_remaining_fields(&self, out: &mut Vec<u8>, header: &dyn MessageHeader) -> Result<(), Error> {
        for field in header.fields() {
            if matches!(
                *field.name(),
                http::header::DATE | http::header::HOST | http::header::CONTENT_LENGTH | http::header::TRANSFER_ENCODING
            ) {
                continue;
            }
            let text = message::render_field(field.name(), field.value())?;
            let name = if self.config.title_case_headers { title_case(field.name().as_str()) } else { field.name().as_str().to_string() };
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(text.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Ok(())
    }

    /// Feeds body bytes in, consuming as much of `input` as the latched
    /// framing permits and writing the wire representation to `output`
    /// (raw for `Content-Length`/close-delimited, chunk-framed for
    /// `Transfer-Encoding: chunked`).
    pub fn encode_body(&mut self, input: &mut &[u8], output: &mut Vec<u8>, end_of_input: bool) -> Result<EncodeResult, Error> {
        match &mut self.body_mode {
            BodyMode::None => {
                if !input.is_empty() {
                    return Err(Error::new_invalid_state("message declared no body but bytes were offered"));
                }
                Ok(EncodeResult { message_done: true })
            }
            BodyMode::Fixed(remaining) => {
                let take = std::cmp::min(*remaining, input.len() as u64) as usize;
                output.extend_from_slice(&input[..take]);
                *input = &input[take..];
                *remaining -= take as u64;
                if *remaining == 0 {
                    Ok(EncodeResult { message_done: true })
                } else if end_of_input {
                    Err(Error::new_invalid_state("fewer bytes offered than the latched Content-Length"))
                } else {
                    Ok(EncodeResult { message_done: false })
                }
            }
            BodyMode::Chunked => {
                if !input.is_empty() {
                    encode_chunk(input, output);
                    *input = &input[input.len()..];
                }
                if end_of_input {
                    encode_last_chunk(&[], output);
                    Ok(EncodeResult { message_done: true })
                } else {
                    Ok(EncodeResult { message_done: false })
                }
            }
            BodyMode::UntilClose => {
                output.extend_from_slice(input);
                *input = &input[input.len()..];
                Ok(EncodeResult { message_done: end_of_input })
            }
        }
    }

    /// Writes the terminating chunk with trailer fields, rejecting any
    /// trailer the hop-by-hop denylist forbids (§4.E). Only meaningful
    /// when the latched body is chunked; callers otherwise get
    /// [`Error::new_invalid_state`].
    pub fn encode_trailers(&mut self, trailers: &[crate::field::HttpField], output: &mut Vec<u8>) -> Result<(), Error> {
        if self.body_mode != BodyMode::Chunked {
            return Err(Error::new_invalid_state("trailers are only valid on a chunked body"));
        }
        let mut lines = Vec::with_capacity(trailers.len());
        for field in trailers {
            if !is_valid_trailer_field(field.name()) {
                debug!("rejecting hop-by-hop field as trailer: {}", field.name());
                return Err(Error::new_invalid_state("field is not permitted as a trailer"));
            }
            let text = message::render_field(field.name(), field.value())?;
            lines.push(format!("{}: {}", field.name().as_str(), text));
        }
        encode_last_chunk(&lines, output);
        self.body_mode = BodyMode::None;
        Ok(())
    }
}

impl crate::proto::MessageEncoder for Http1Encoder {
    fn encode_body(&mut self, input: &mut &[u8], output: &mut Vec<u8>, end_of_input: bool) -> Result<EncodeResult, Error> {
        Http1Encoder::encode_body(self, input, output, end_of_input)
    }
}

fn body_mode_for(length: BodyLength) -> BodyMode {
    match length {
        BodyLength::None => BodyMode::None,
        BodyLength::Fixed(0) => BodyMode::None,
        BodyLength::Fixed(n) => BodyMode::Fixed(n),
        BodyLength::Chunked => BodyMode::Chunked,
        BodyLength::UntilClose => BodyMode::UntilClose,
    }
}

fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut start_of_word = true;
    for c in name.chars() {
        if c == '-' {
            out.push(c);
            start_of_word = true;
        } else if start_of_word {
            out.extend(c.to_uppercase());
            start_of_word = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::HttpField;
    use crate::version::HttpVersion;
    use http::Uri;

    #[test]
    fn latches_request_with_fixed_body() {
        let mut encoder = Http1Encoder::new(EncoderConfig::default());
        let mut request = HttpRequest::new(Method::POST, "http://a/x".parse::<Uri>().unwrap(), HttpVersion::Http11, true);
        request.set_field_value(http::header::CONTENT_LENGTH, FieldValue::Int(5));
        let header = encoder.latch_request(&request).unwrap();
        let text = String::from_utf8(header).unwrap();
        assert!(text.starts_with("POST /x HTTP/1.1\r\n"));
        assert!(text.contains("Host: a\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\n"));

        let mut input: &[u8] = b"hello";
        let mut out = Vec::new();
        let result = encoder.encode_body(&mut input, &mut out, true).unwrap();
        assert!(result.message_done);
        assert_eq!(out, b"hello");
    }

    #[test]
    fn latches_response_with_chunked_body_and_trailer() {
        let mut encoder = Http1Encoder::new(EncoderConfig::default());
        let mut response = HttpResponse::new(StatusCode::OK, HttpVersion::Http11, true);
        response.set_field_value(
            http::header::TRANSFER_ENCODING,
            FieldValue::List(vec![FieldValue::Str("chunked".into())]),
        );
        let header = encoder.latch_response(&response, &Method::GET).unwrap();
        assert!(String::from_utf8(header).unwrap().contains("Transfer-Encoding: chunked\r\n"));

        let mut input: &[u8] = b"abc";
        let mut out = Vec::new();
        encoder.encode_body(&mut input, &mut out, false).unwrap();
        assert_eq!(out, b"3\r\nabc\r\n");

        let trailer_name = HeaderName::from_static("x-checksum");
        let trailers = vec![HttpField::new(trailer_name, FieldValue::Str("deadbeef".into()))];
        encoder.encode_trailers(&trailers, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().ends_with("0\r\nx-checksum: deadbeef\r\n\r\n"));
    }

    #[test]
    fn head_response_has_no_body_regardless_of_content_length() {
        let mut encoder = Http1Encoder::new(EncoderConfig::default());
        let mut response = HttpResponse::new(StatusCode::OK, HttpVersion::Http11, false);
        response.set_field_value(http::header::CONTENT_LENGTH, FieldValue::Int(100));
        encoder.latch_response(&response, &Method::HEAD).unwrap();
        let mut input: &[u8] = b"";
        let result = encoder.encode_body(&mut input, &mut Vec::new(), true).unwrap();
        assert!(result.message_done);
    }

    #[test]
    fn switching_protocols_is_flagged() {
        let mut encoder = Http1Encoder::new(EncoderConfig::default());
        let mut response = HttpResponse::new(StatusCode::SWITCHING_PROTOCOLS, HttpVersion::Http11, false);
        response.set_field_value(http::header::UPGRADE, FieldValue::Str("websocket".into()));
        encoder.latch_response(&response, &Method::GET).unwrap();
        let switch = encoder.take_protocol_switch().unwrap();
        assert_eq!(switch.protocol.as_deref(), Some("websocket"));
    }

    #[test]
    fn explicit_date_field_is_still_emitted_first() {
        let mut encoder = Http1Encoder::new(EncoderConfig::default());
        let mut response = HttpResponse::new(StatusCode::OK, HttpVersion::Http11, false);
        response.set_field_value(
            http::header::DATE,
            FieldValue::Date(std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(784111777)),
        );
        response.set_field_value(http::header::CONTENT_LENGTH, FieldValue::Int(0));
        let header = encoder.latch_response(&response, &Method::GET).unwrap();
        let text = String::from_utf8(header).unwrap();
        let date_pos = text.find("Date:").unwrap();
        let length_pos = text.find("Content-Length:").unwrap();
        assert!(date_pos < length_pos);
        assert_eq!(text.matches("Date:").count(), 1);
        assert!(text.contains("Date: Sun, 06 Nov 1994 08:49:37 GMT\r\n"));
    }

    #[test]
    fn rejects_hop_by_hop_field_as_trailer() {
        let mut encoder = Http1Encoder::new(EncoderConfig::default());
        let mut response = HttpResponse::new(StatusCode::OK, HttpVersion::Http11, true);
        response.set_field_value(
            http::header::TRANSFER_ENCODING,
            FieldValue::List(vec![FieldValue::Str("chunked".into())]),
        );
        encoder.latch_response(&response, &Method::GET).unwrap();
        let mut out = Vec::new();
        let bad = vec![HttpField::new(http::header::CONTENT_TYPE, FieldValue::Str("text/plain".into()))];
        assert!(encoder.encode_trailers(&bad, &mut out).is_err());
    }
}
