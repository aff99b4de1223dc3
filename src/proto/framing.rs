//! Body-length determination (component G, §4.D/§4.E, §4.F zero-body
//! rules), shared between the decoder and the encoder so both sides agree
//! on how a message's framing is derived from its header fields.
//!
//! Grounded on `proto/h1/role.rs`'s `set_length`/`decoder` pair, which
//! hyper keeps separate per request/response role; this crate folds both
//! into one function per direction since there is no `Server`/`Client`
//! role split here, only "the message I'm decoding" and "the message I'm
//! encoding".

use http::{Method, StatusCode};

use crate::error::Error;
use crate::message::{HttpRequest, HttpResponse, MessageHeader};

use tracing::debug;

/// How many bytes of body follow a message's header section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLength {
    /// No body at all — HEAD responses, 1xx/204/304, or an explicit
    /// `Content-Length: 0`.
    None,
    /// Exactly this many bytes, from `Content-Length`.
    Fixed(u64),
    /// `Transfer-Encoding: chunked`.
    Chunked,
    /// No length given; the body runs until the connection closes. Only
    /// legal for a response (§4.D note on request framing).
    UntilClose,
}

/// A status code with no body regardless of what its headers claim
/// (§4.F): 1xx, 204 No Content, 304 Not Modified.
fn is_bodyless_status(status: StatusCode) -> bool {
    status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED
}

fn has_chunked_encoding(header: &dyn MessageHeader) -> bool {
    match header.field(&http::header::TRANSFER_ENCODING).map(|f| f.value()) {
        Some(crate::field::FieldValue::List(items)) => items
            .last()
            .and_then(|v| v.as_str())
            .map(|s| s.eq_ignore_ascii_case("chunked"))
            .unwrap_or(false),
        Some(crate::field::FieldValue::Str(s)) => s.eq_ignore_ascii_case("chunked"),
        _ => false,
    }
}

fn content_length(header: &dyn MessageHeader) -> Result<Option<u64>, Error> {
    match header.field(&http::header::CONTENT_LENGTH).map(|f| f.value()) {
        Some(value) => {
            let n = value
                .as_int()
                .ok_or_else(|| Error::new_bad_framing("Content-Length is not an integer"))?;
            if n < 0 {
                return Err(Error::new_bad_framing("Content-Length is negative"));
            }
            Ok(Some(n as u64))
        }
        None => Ok(None),
    }
}

/// Rejects a message declaring both `Content-Length` and
/// `Transfer-Encoding` (§4.D: "mutual exclusivity"), per RFC 7230 §3.3.3
/// step 3 — a sender doing this is either confused or smuggling.
fn check_not_both(header: &dyn MessageHeader) -> Result<(), Error> {
    if has_chunked_encoding(header) && header.field(&http::header::CONTENT_LENGTH).is_some() {
        debug!("message has both Content-Length and Transfer-Encoding: chunked, rejecting");
        Err(Error::new_bad_framing(
            "message carries both Content-Length and Transfer-Encoding: chunked",
        ))
    } else {
        Ok(())
    }
}

/// Body length for an incoming request (§4.D decision order: method/status
/// exemptions don't apply to requests, so this never returns `UntilClose`
/// — a request with neither header has no body, by definition).
pub fn request_body_length(request: &HttpRequest) -> Result<BodyLength, Error> {
    check_not_both(request)?;
    if has_chunked_encoding(request) {
        return Ok(BodyLength::Chunked);
    }
    match content_length(request)? {
        Some(0) => Ok(BodyLength::None),
        Some(n) => Ok(BodyLength::Fixed(n)),
        None => Ok(BodyLength::None),
    }
}

/// Body length for an outgoing or incoming response, given the method of
/// the request it answers (HEAD responses never carry a body even if
/// their headers claim one, §4.F).
pub fn response_body_length(response: &HttpResponse, request_method: &Method) -> Result<BodyLength, Error> {
    response_body_length_for(response, *request_method == Method::HEAD)
}

/// As [`response_body_length`], but for callers that only have the
/// originating request's [`RequestMethodClass`](crate::message::RequestMethodClass)
/// on hand (the encoder, which learns of the request only through the
/// response's stored `origin` snapshot).
pub fn response_body_length_for_class(
    response: &HttpResponse,
    method: crate::message::RequestMethodClass,
) -> Result<BodyLength, Error> {
    response_body_length_for(response, method == crate::message::RequestMethodClass::Head)
}

fn response_body_length_for(response: &HttpResponse, is_head: bool) -> Result<BodyLength, Error> {
    if is_head || is_bodyless_status(response.status()) {
        return Ok(BodyLength::None);
    }
    check_not_both(response)?;
    if has_chunked_encoding(response) {
        return Ok(BodyLength::Chunked);
    }
    match content_length(response)? {
        Some(0) => Ok(BodyLength::None),
        Some(n) => Ok(BodyLength::Fixed(n)),
        None => Ok(BodyLength::UntilClose),
    }
}

/// Whether a message's own `Connection` field (or the protocol version's
/// default, absent one) calls for closing the connection once this
/// message finishes (RFC 7230 §6.1). Shared by the decoder (deciding
/// whether to keep reading after this response) and the encoder
/// (deciding what it just committed the connection to).
pub fn wants_close(header: &dyn MessageHeader) -> bool {
    match header.field(&http::header::CONNECTION).map(|f| f.value()) {
        Some(crate::field::FieldValue::Str(s)) => s.eq_ignore_ascii_case("close"),
        Some(crate::field::FieldValue::List(items)) => items
            .iter()
            .any(|v| matches!(v.as_str(), Some(s) if s.eq_ignore_ascii_case("close"))),
        _ => !header.protocol().supports_keep_alive_by_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::HttpResponse;
    use crate::version::HttpVersion;
    use http::Uri;

    fn req() -> HttpRequest {
        HttpRequest::new(Method::GET, Uri::from_static("/"), HttpVersion::Http11, false)
    }

    #[test]
    fn request_with_no_length_headers_has_no_body() {
        assert_eq!(request_body_length(&req()).unwrap(), BodyLength::None);
    }

    #[test]
    fn request_rejects_both_length_and_chunked() {
        let mut r = req();
        r.set_field_value(http::header::CONTENT_LENGTH, crate::field::FieldValue::Int(3));
        r.set_field_value(
            http::header::TRANSFER_ENCODING,
            crate::field::FieldValue::List(vec![crate::field::FieldValue::Str("chunked".into())]),
        );
        assert!(request_body_length(&r).unwrap_err().is_bad_framing());
    }

    #[test]
    fn head_response_has_no_body_even_with_content_length() {
        let mut resp = HttpResponse::new(StatusCode::OK, HttpVersion::Http11, true);
        resp.set_field_value(http::header::CONTENT_LENGTH, crate::field::FieldValue::Int(500));
        assert_eq!(response_body_length(&resp, &Method::HEAD).unwrap(), BodyLength::None);
    }

    #[test]
    fn no_content_response_has_no_body() {
        let resp = HttpResponse::new(StatusCode::NO_CONTENT, HttpVersion::Http11, false);
        assert_eq!(response_body_length(&resp, &Method::GET).unwrap(), BodyLength::None);
    }

    #[test]
    fn response_with_no_length_header_runs_until_close() {
        let resp = HttpResponse::new(StatusCode::OK, HttpVersion::Http11, true);
        assert_eq!(response_body_length(&resp, &Method::GET).unwrap(), BodyLength::UntilClose);
    }

    #[test]
    fn response_chunked_wins_over_absent_length() {
        let mut resp = HttpResponse::new(StatusCode::OK, HttpVersion::Http11, true);
        resp.set_field_value(
            http::header::TRANSFER_ENCODING,
            crate::field::FieldValue::List(vec![crate::field::FieldValue::Str("chunked".into())]),
        );
        assert_eq!(response_body_length(&resp, &Method::GET).unwrap(), BodyLength::Chunked);
    }
}
