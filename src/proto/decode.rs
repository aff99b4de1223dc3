//! Incremental request/response decoding (component D, §4.D).
//!
//! Grounded on `proto/h1/decode.rs`'s per-connection `Decoder` and
//! `proto/h1/role.rs`'s header-parsing and length-decision logic, both
//! stripped of the `Poll`/`MemRead` async plumbing hyper drives a reactor
//! with. This decoder instead owns a small internal buffer, appends
//! whatever's available from the caller's slice to it on every call, and
//! parses as far forward as that buffer allows — the copy this costs is
//! the same one `BytesMut`-based readers pay, just without the `Buf`
//! trait machinery around it.

use http::{HeaderName, Method, StatusCode, Uri};

use crate::config::DecoderConfig;
use crate::error::Error;
use crate::field::{FieldValue, HttpField};
use crate::message::{self, HttpRequest, HttpResponse, MessageHeader};
use crate::proto::chunked::{ChunkedDecoder, ChunkedProgress};
use crate::proto::framing::{self, BodyLength};
use crate::version::HttpVersion;

use tracing::{debug, trace};

/// Which kind of message this decoder reads. A response decoder needs to
/// know the method of the request it answers in order to apply the
/// zero-body rules (§4.F): a `HEAD` response never has a body no matter
/// what its headers claim.
#[derive(Debug, Clone)]
pub enum Role {
    Request,
    Response { request_method: Method },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Header,
    Body,
    Done,
}

#[derive(Debug)]
enum BodyMode {
    None,
    Fixed(u64),
    Chunked(ChunkedDecoder),
    UntilClose,
}

/// A hint returned alongside a completed request header, telling the
/// caller what interim response the client is waiting on before it sends
/// a body (§4.D "100-continue").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseHint {
    Expect100Continue,
}

/// Outcome of one [`Http1Decoder::decode`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeResult {
    /// The start-line and header section finished parsing during this call.
    pub header_completed: bool,
    /// The whole message — header and body both — is now fully decoded.
    pub message_done: bool,
    /// This message's framing requires closing the connection once it's
    /// fully sent or received (`Connection: close`, HTTP/1.0 without
    /// keep-alive, or a close-delimited body).
    pub close_connection: bool,
    /// Only set alongside `header_completed` on a request decode.
    pub response_hint: Option<ResponseHint>,
}

/// Decodes one HTTP/1.x message (request or response) at a time from an
/// arbitrarily fragmented byte stream.
pub struct Http1Decoder {
    config: DecoderConfig,
    role: Role,
    state: State,
    buf: Vec<u8>,
    body_mode: BodyMode,
    request: Option<HttpRequest>,
    response: Option<HttpResponse>,
    close_connection: bool,
}

impl Http1Decoder {
    pub fn new(role: Role, config: DecoderConfig) -> Self {
        Http1Decoder {
            config,
            role,
            state: State::Header,
            buf: Vec::new(),
            body_mode: BodyMode::None,
            request: None,
            response: None,
            close_connection: false,
        }
    }

    /// The request whose header has completed parsing, if this is a
    /// request decoder and a header has been parsed since the last
    /// [`take_request`](Self::take_request).
    pub fn current_request(&self) -> Option<&HttpRequest> {
        self.request.as_ref()
    }

    pub fn current_response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    /// Updates which request a response decoder expects to answer (§4.F).
    /// A client engine calls this from `latch_request` so the zero-body
    /// rule applied to the next decoded response matches the request
    /// actually sent, rather than the constructor's placeholder method.
    /// A no-op on a request decoder.
    pub fn set_expected_request_method(&mut self, method: Method) {
        if let Role::Response { request_method } = &mut self.role {
            *request_method = method;
        }
    }

    /// Resets the decoder to read the next message on this connection,
    /// returning the request just completed.
    pub fn take_request(&mut self) -> Option<HttpRequest> {
        self.reset_for_next_message();
        self.request.take()
    }

    pub fn take_response(&mut self) -> Option<HttpResponse> {
        self.reset_for_next_message();
        self.response.take()
    }

    fn reset_for_next_message(&mut self) {
        self.state = State::Header;
        self.body_mode = BodyMode::None;
    }

    fn header_budget(&self) -> usize {
        self.config.max_line_len * (self.config.max_headers + 2)
    }

    /// Feeds bytes in, draining decoded body bytes to `output`; advances
    /// `input` past everything consumed (§4.D "progress guarantee": every
    /// call either consumes input, produces output, or both — never
    /// neither while bytes remain available).
    pub fn decode(&mut self, input: &mut &[u8], output: &mut Vec<u8>, end_of_input: bool) -> Result<DecodeResult, Error> {
        trace!("decode; state={:?}, buffered={}", self.state, self.buf.len());
        self.buf.extend_from_slice(input);
        *input = &input[input.len()..];

        let mut result = DecodeResult::default();
        loop {
            match self.state {
                State::Header => {
                    if self.buf.len() > self.header_budget() {
                        return Err(Error::new_header_too_long());
                    }
                    match self.try_parse_header()? {
                        None => {
                            return if end_of_input {
                                Err(Error::new_unexpected_eof())
                            } else {
                                Ok(result)
                            };
                        }
                        Some(consumed) => {
                            self.buf.drain(..consumed);
                            self.begin_body()?;
                            result.header_completed = true;
                            result.response_hint = self.response_hint();
                            result.close_connection = self.close_connection;
                            if self.state == State::Done {
                                result.message_done = true;
                                return Ok(result);
                            }
                        }
                    }
                }
                State::Body => match self.step_body(output, end_of_input)? {
                    BodyStep::Done => {
                        result.message_done = true;
                        result.close_connection = self.close_connection;
                        return Ok(result);
                    }
                    BodyStep::NeedMore => return Ok(result),
                },
                State::Done => {
                    result.message_done = true;
                    return Ok(result);
                }
            }
        }
    }

    fn response_hint(&self) -> Option<ResponseHint> {
        let request = self.request.as_ref()?;
        let expects_continue = match request.field(&http::header::EXPECT).map(|f| f.value()) {
            Some(v) => v.as_str().map(|s| s.eq_ignore_ascii_case("100-continue")).unwrap_or(false),
            None => false,
        };
        if expects_continue {
            Some(ResponseHint::Expect100Continue)
        } else {
            None
        }
    }

    fn try_parse_header(&mut self) -> Result<Option<usize>, Error> {
        match &self.role {
            Role::Request => self.try_parse_request_header(),
            Role::Response { .. } => self.try_parse_response_header(),
        }
    }

    fn try_parse_request_header(&mut self) -> Result<Option<usize>, Error> {
        let mut raw_headers = vec![httparse::EMPTY_HEADER; self.config.max_headers];
        let mut parsed = httparse::Request::new(&mut raw_headers);
        // Obsolete line-folding is left disabled for requests: an
        // intermediary honoring a folded request header is exactly the
        // request-smuggling vector RFC 7230 §3.2.4 warns about.
        let cfg = httparse::ParserConfig::default();
        let status = cfg.parse_request(&mut parsed, &self.buf).map_err(map_httparse_error)?;
        let consumed = match status {
            httparse::Status::Partial => return Ok(None),
            httparse::Status::Complete(n) => n,
        };

        let method = Method::from_bytes(parsed.method.unwrap_or("").as_bytes())
            .map_err(|_| Error::new_malformed(0, "invalid request method"))?;
        let uri: Uri = parsed
            .path
            .unwrap_or("/")
            .parse()
            .map_err(|_| Error::new_malformed(0, "invalid request target"))?;
        let version = HttpVersion::from_httparse_minor(parsed.version.unwrap_or(1))
            .ok_or_else(Error::new_unsupported_version)?;

        let mut request = HttpRequest::new(method, uri, version, false);
        for h in parsed.headers.iter() {
            if h.name.is_empty() && h.value.is_empty() {
                break;
            }
            set_field_from_wire(&mut request, h)?;
        }
        apply_host_header(&mut request);
        request.set_response(HttpResponse::preliminary(version));

        self.close_connection = !request.keep_alive();
        self.request = Some(request);
        Ok(Some(consumed))
    }

    fn try_parse_response_header(&mut self) -> Result<Option<usize>, Error> {
        let mut raw_headers = vec![httparse::EMPTY_HEADER; self.config.max_headers];
        let mut parsed = httparse::Response::new(&mut raw_headers);
        let mut cfg = httparse::ParserConfig::default();
        // Real servers line-fold response headers far more often than
        // they should; tolerating it here matches what browsers and
        // hyper's own client do.
        cfg.allow_obsolete_multiline_headers_in_responses(true);
        let status = cfg.parse_response(&mut parsed, &self.buf).map_err(map_httparse_error)?;
        let consumed = match status {
            httparse::Status::Partial => return Ok(None),
            httparse::Status::Complete(n) => n,
        };

        let version = HttpVersion::from_httparse_minor(parsed.version.unwrap_or(1))
            .ok_or_else(Error::new_unsupported_version)?;
        let status_code = StatusCode::from_u16(parsed.code.unwrap_or(0))
            .map_err(|_| Error::new_malformed(0, "invalid status code"))?;

        let mut response = HttpResponse::new(status_code, version, false);
        if let Some(reason) = parsed.reason {
            if !reason.is_empty() {
                response.set_reason(reason);
            }
        }
        for h in parsed.headers.iter() {
            if h.name.is_empty() && h.value.is_empty() {
                break;
            }
            set_field_from_wire(&mut response, h)?;
        }

        self.response = Some(response);
        Ok(Some(consumed))
    }

    fn begin_body(&mut self) -> Result<(), Error> {
        let length = match &self.role {
            Role::Request => {
                let request = self.request.as_ref().expect("header just parsed");
                framing::request_body_length(request)?
            }
            Role::Response { request_method } => {
                let response = self.response.as_ref().expect("header just parsed");
                let length = framing::response_body_length(response, request_method)?;
                self.close_connection =
                    self.close_connection || framing::wants_close(response) || length == BodyLength::UntilClose;
                length
            }
        };

        debug!("body length = {:?}, close_connection = {}", length, self.close_connection);
        self.body_mode = match length {
            BodyLength::None => BodyMode::None,
            BodyLength::Fixed(0) => BodyMode::None,
            BodyLength::Fixed(n) => BodyMode::Fixed(n),
            BodyLength::Chunked => BodyMode::Chunked(ChunkedDecoder::new()),
            BodyLength::UntilClose => BodyMode::UntilClose,
        };

        let has_payload = !matches!(self.body_mode, BodyMode::None);
        match &mut self.request {
            Some(r) => r.set_has_payload(has_payload),
            None => {}
        }
        match &mut self.response {
            Some(r) => r.set_has_payload(has_payload),
            None => {}
        }

        self.state = if has_payload { State::Body } else { State::Done };
        Ok(())
    }

    fn step_body(&mut self, output: &mut Vec<u8>, end_of_input: bool) -> Result<BodyStep, Error> {
        match &mut self.body_mode {
            BodyMode::None => {
                self.state = State::Done;
                Ok(BodyStep::Done)
            }
            BodyMode::Fixed(remaining) => {
                if *remaining == 0 {
                    self.state = State::Done;
                    return Ok(BodyStep::Done);
                }
                if self.buf.is_empty() {
                    return if end_of_input { Err(Error::new_unexpected_eof()) } else { Ok(BodyStep::NeedMore) };
                }
                let take = std::cmp::min(*remaining, self.buf.len() as u64) as usize;
                output.extend_from_slice(&self.buf[..take]);
                self.buf.drain(..take);
                *remaining -= take as u64;
                if *remaining == 0 {
                    self.state = State::Done;
                    Ok(BodyStep::Done)
                } else {
                    Ok(BodyStep::NeedMore)
                }
            }
            BodyMode::Chunked(chunked) => {
                let mut slice: &[u8] = &self.buf;
                let max_trailer_lines = self.config.max_headers;
                let progress = chunked.decode(&mut slice, output, max_trailer_lines)?;
                let consumed = self.buf.len() - slice.len();
                self.buf.drain(..consumed);
                match progress {
                    ChunkedProgress::Underflow => {
                        if end_of_input {
                            Err(Error::new_unexpected_eof())
                        } else {
                            Ok(BodyStep::NeedMore)
                        }
                    }
                    ChunkedProgress::Done { trailer } => {
                        trace!("end of chunked body, {} trailer bytes", trailer.len());
                        self.merge_trailer_fields(&trailer)?;
                        self.state = State::Done;
                        Ok(BodyStep::Done)
                    }
                }
            }
            BodyMode::UntilClose => {
                if !self.buf.is_empty() {
                    output.extend_from_slice(&self.buf);
                    self.buf.clear();
                }
                if end_of_input {
                    self.state = State::Done;
                    Ok(BodyStep::Done)
                } else {
                    Ok(BodyStep::NeedMore)
                }
            }
        }
    }

    fn merge_trailer_fields(&mut self, trailer: &[u8]) -> Result<(), Error> {
        if trailer == b"\r\n" {
            return Ok(());
        }
        let mut raw_headers = vec![httparse::EMPTY_HEADER; self.config.max_headers];
        let status = httparse::parse_headers(trailer, &mut raw_headers).map_err(map_httparse_error)?;
        let headers = match status {
            httparse::Status::Complete((_, headers)) => headers,
            httparse::Status::Partial => return Err(Error::new_malformed(0, "incomplete trailer section")),
        };
        for h in headers {
            if h.name.is_empty() && h.value.is_empty() {
                break;
            }
            match (&mut self.request, &mut self.response) {
                (Some(r), _) => set_field_from_wire(r, h)?,
                (_, Some(r)) => set_field_from_wire(r, h)?,
                (None, None) => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum BodyStep {
    Done,
    NeedMore,
}

/// Parses one wire header line and records it. A repeated list-typed
/// field (`Accept`, `Connection`, `Transfer-Encoding`, ...) merges into
/// the field already recorded under that name instead of replacing it
/// (§3: "a list field owns all comma-separated instances collapsed in
/// insertion order") — RFC 7230 §3.2.2 treats repeated header lines the
/// same as one line joined by commas, and this crate's list converters
/// already parse each line's own commas, so merging is just
/// concatenation. Any other field kind keeps the simple last-one-wins
/// behavior `FieldMap::set` provides.
fn set_field_from_wire(header: &mut dyn MessageHeader, h: &httparse::Header<'_>) -> Result<(), Error> {
    let name = HeaderName::from_bytes(h.name.as_bytes()).map_err(|_| Error::new_malformed(0, "invalid header name"))?;
    let text = std::str::from_utf8(h.value).map_err(|_| Error::new_malformed(0, "header value is not UTF-8"))?;
    let value = message::parse_field(&name, text.trim())?;
    let merged = match (header.field(&name).map(|f| f.value()), &value) {
        (Some(FieldValue::List(existing)), FieldValue::List(more)) => {
            let mut items = existing.clone();
            items.extend(more.iter().cloned());
            FieldValue::List(items)
        }
        _ => value,
    };
    header.set_field(HttpField::new(name, merged));
    Ok(())
}

/// `Host` can arrive as a header even though the request-target is
/// authority-form for CONNECT or origin-form for everything else; when
/// present it overrides whatever authority the request-URI carried (RFC
/// 7230 §5.4).
fn apply_host_header(request: &mut HttpRequest) {
    let host_value = match request.field(&http::header::HOST).map(|f| f.value()) {
        Some(FieldValue::Str(s)) => s.clone(),
        _ => return,
    };
    match host_value.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) && !port.is_empty() => {
            request.set_host(Some(host.to_string()));
            if let Ok(p) = port.parse::<i32>() {
                request.set_port(p);
            }
        }
        _ => request.set_host(Some(host_value)),
    }
}

fn map_httparse_error(e: httparse::Error) -> Error {
    match e {
        httparse::Error::TooManyHeaders => Error::new_header_too_long(),
        _ => Error::new_malformed(0, "malformed start line or header"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DecoderConfig {
        DecoderConfig::default()
    }

    #[test]
    fn decodes_request_with_fixed_body() {
        let mut decoder = Http1Decoder::new(Role::Request, config());
        let mut input: &[u8] = b"POST /x HTTP/1.1\r\nHost: a\r\nContent-Length: 5\r\n\r\nhello";
        let mut output = Vec::new();
        let result = decoder.decode(&mut input, &mut output, false).unwrap();
        assert!(result.header_completed);
        assert!(result.message_done);
        assert_eq!(output, b"hello");
        let request = decoder.take_request().unwrap();
        assert_eq!(request.method(), &Method::POST);
    }

    #[test]
    fn underflows_on_partial_start_line() {
        let mut decoder = Http1Decoder::new(Role::Request, config());
        let mut input: &[u8] = b"GET /x HTTP/1.1\r\n";
        let mut output = Vec::new();
        let result = decoder.decode(&mut input, &mut output, false).unwrap();
        assert!(!result.header_completed);
    }

    #[test]
    fn decodes_chunked_request_across_calls() {
        let mut decoder = Http1Decoder::new(Role::Request, config());
        let head = b"POST /x HTTP/1.1\r\nHost: a\r\nTransfer-Encoding: chunked\r\n\r\n";
        let body = b"4\r\nWiki\r\n0\r\n\r\n";
        let mut output = Vec::new();
        let mut input: &[u8] = head;
        let r1 = decoder.decode(&mut input, &mut output, false).unwrap();
        assert!(r1.header_completed);
        assert!(!r1.message_done);
        let mut input2: &[u8] = body;
        let r2 = decoder.decode(&mut input2, &mut output, false).unwrap();
        assert!(r2.message_done);
        assert_eq!(output, b"Wiki");
    }

    #[test]
    fn head_response_has_no_body_despite_content_length() {
        let mut decoder = Http1Decoder::new(Role::Response { request_method: Method::HEAD }, config());
        let mut input: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 40\r\n\r\n";
        let mut output = Vec::new();
        let result = decoder.decode(&mut input, &mut output, false).unwrap();
        assert!(result.message_done);
        assert!(output.is_empty());
    }

    #[test]
    fn response_with_no_length_waits_for_close() {
        let mut decoder = Http1Decoder::new(Role::Response { request_method: Method::GET }, config());
        let mut input: &[u8] = b"HTTP/1.1 200 OK\r\n\r\nhello";
        let mut output = Vec::new();
        let result = decoder.decode(&mut input, &mut output, false).unwrap();
        assert!(!result.message_done);
        assert_eq!(output, b"hello");
        let mut input2: &[u8] = b"";
        let result2 = decoder.decode(&mut input2, &mut output, true).unwrap();
        assert!(result2.message_done);
        assert!(result2.close_connection);
    }

    #[test]
    fn repeated_list_header_lines_merge_instead_of_overwriting() {
        let mut decoder = Http1Decoder::new(Role::Request, config());
        let mut input: &[u8] = b"GET / HTTP/1.1\r\nHost: a\r\nAccept: text/html\r\nAccept: application/json\r\n\r\n";
        let mut output = Vec::new();
        decoder.decode(&mut input, &mut output, false).unwrap();
        let request = decoder.take_request().unwrap();
        let accept = request.field(&http::header::ACCEPT).unwrap().value();
        let items = accept.as_list().expect("Accept is a list field");
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn rejects_conflicting_length_and_chunked() {
        let mut decoder = Http1Decoder::new(Role::Request, config());
        let mut input: &[u8] =
            b"POST /x HTTP/1.1\r\nHost: a\r\nContent-Length: 5\r\nTransfer-Encoding: chunked\r\n\r\nhello";
        let mut output = Vec::new();
        assert!(decoder.decode(&mut input, &mut output, false).unwrap_err().is_bad_framing());
    }

    #[test]
    fn host_header_overrides_request_uri_authority() {
        let mut decoder = Http1Decoder::new(Role::Request, config());
        let mut input: &[u8] = b"GET / HTTP/1.1\r\nHost: example.com:9090\r\n\r\n";
        let mut output = Vec::new();
        decoder.decode(&mut input, &mut output, false).unwrap();
        let request = decoder.take_request().unwrap();
        assert_eq!(request.host(), Some("example.com"));
        assert_eq!(request.port(), 9090);
    }

    #[test]
    fn expect_continue_is_surfaced_as_a_hint() {
        let mut decoder = Http1Decoder::new(Role::Request, config());
        let mut input: &[u8] = b"POST /x HTTP/1.1\r\nHost: a\r\nContent-Length: 1\r\nExpect: 100-continue\r\n\r\nx";
        let mut output = Vec::new();
        let result = decoder.decode(&mut input, &mut output, false).unwrap();
        assert_eq!(result.response_hint, Some(ResponseHint::Expect100Continue));
    }
}
