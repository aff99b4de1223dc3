//! Message header model (component C, §3, §4.C).

use std::cell::OnceCell;

use http::{HeaderName, Method, StatusCode, Uri};

use crate::field::{converter_for, FieldValue, HttpField};
use crate::query::QueryData;
use crate::version::HttpVersion;

/// An insertion-ordered, case-insensitive field map.
///
/// Grounded on `header::internals::VecMap<K, V>`'s linear-scan design:
/// messages carry a handful of header fields, so a `Vec` beats a hash map
/// on both memory and (for the common case of iterating all fields back
/// out in order) speed.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    entries: Vec<HttpField>,
}

impl FieldMap {
    pub fn new() -> Self {
        FieldMap { entries: Vec::new() }
    }

    pub fn get(&self, name: &HeaderName) -> Option<&HttpField> {
        self.entries.iter().find(|f| f.name() == name)
    }

    /// Replaces any existing field with this name (§3: "field names map to
    /// at most one field per header"), or appends at the end.
    pub fn set(&mut self, field: HttpField) {
        if let Some(existing) = self.entries.iter_mut().find(|f| f.name() == field.name()) {
            *existing = field;
        } else {
            self.entries.push(field);
        }
    }

    pub fn remove(&mut self, name: &HeaderName) -> Option<HttpField> {
        let pos = self.entries.iter().position(|f| f.name() == name)?;
        Some(self.entries.remove(pos))
    }

    pub fn contains(&self, name: &HeaderName) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HttpField> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Common operations on a request or response header (§4.C).
///
/// The header does not validate field combinations; that's the codec's
/// job (§4.C, §4.D, §4.E — component G).
pub trait MessageHeader {
    fn protocol(&self) -> HttpVersion;
    fn has_payload(&self) -> bool;
    fn set_has_payload(&mut self, has_payload: bool);
    fn field(&self, name: &HeaderName) -> Option<&HttpField>;
    fn set_field(&mut self, field: HttpField);
    fn remove_field(&mut self, name: &HeaderName) -> Option<HttpField>;
    fn fields(&self) -> std::slice::Iter<'_, HttpField>;

    /// Sets a field by name using the well-known converter for that name
    /// (§7: unknown names become opaque strings via `converter_for`).
    fn set_field_value(&mut self, name: HeaderName, value: FieldValue) {
        self.set_field(HttpField::new(name, value));
    }
}

/// A decoded or to-be-encoded HTTP request (§3).
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    uri: Uri,
    version: HttpVersion,
    has_payload: bool,
    fields: FieldMap,
    host: Option<String>,
    port: Option<i32>,
    /// The preliminary 501 response the decoder attaches on completing
    /// this request's header (§4.D). Relation only, owned here because
    /// Rust has no cheap "reference, no ownership" primitive that also
    /// survives the request outliving the engine that produced it.
    response: Option<HttpResponse>,
    query_cache: OnceCellClone<QueryData>,
}

/// `OnceCell` does not implement `Clone`; this crate's requests are cloned
/// in tests and by callers composing retries, so the lazy query cache is
/// allowed to re-compute after a clone rather than making `HttpRequest`
/// un-clonable over a cache-implementation detail.
#[derive(Debug, Default)]
struct OnceCellClone<T>(OnceCell<T>);

impl<T> Clone for OnceCellClone<T> {
    fn clone(&self) -> Self {
        OnceCellClone(OnceCell::new())
    }
}

impl HttpRequest {
    pub fn new(method: Method, uri: Uri, version: HttpVersion, has_payload: bool) -> Self {
        let host = uri.host().map(|h| h.to_string());
        let port = uri.port_u16().map(|p| p as i32).or(Some(-1));
        HttpRequest {
            method,
            uri,
            version,
            has_payload,
            fields: FieldMap::new(),
            host,
            port,
            response: None,
            query_cache: OnceCellClone::default(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The effective host: defaults to the request-URI's authority and
    /// stays mutable until the first wire emission (§3).
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn set_host(&mut self, host: Option<String>) {
        self.host = host;
    }

    /// The effective port; `-1` means "default for scheme" (§3).
    pub fn port(&self) -> i32 {
        self.port.unwrap_or(-1)
    }

    pub fn set_port(&mut self, port: i32) {
        self.port = Some(port);
    }

    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_ref()
    }

    pub fn response_mut(&mut self) -> Option<&mut HttpResponse> {
        self.response.as_mut()
    }

    /// Attaches the decoder's preliminary response (§4.D "Preliminary response").
    pub fn set_response(&mut self, response: HttpResponse) {
        self.response = Some(response);
    }

    /// `request.queryData(charset)`: lazily parses the request-URI's raw
    /// query into an ordered map, memoized after first access (§6, §9).
    pub fn query_data(&self) -> Result<&QueryData, crate::Error> {
        if let Some(cached) = self.query_cache.0.get() {
            return Ok(cached);
        }
        let parsed = QueryData::parse(self.uri.query().unwrap_or(""))?;
        // `OnceCell::set` can only fail if another write raced it; under
        // the single-threaded model (§5) that never happens here.
        let _ = self.query_cache.0.set(parsed);
        Ok(self.query_cache.0.get().expect("just set"))
    }

    /// Whether this request's declared framing permits a persistent
    /// connection (`Connection: close` vs. default-by-version, RFC 7230 §6.3).
    pub fn keep_alive(&self) -> bool {
        match self.field(&http::header::CONNECTION) {
            Some(f) => !contains_token_ci(f.value(), "close"),
            None => self.version.supports_keep_alive_by_default(),
        }
    }
}

impl MessageHeader for HttpRequest {
    fn protocol(&self) -> HttpVersion {
        self.version
    }

    fn has_payload(&self) -> bool {
        self.has_payload
    }

    fn set_has_payload(&mut self, has_payload: bool) {
        self.has_payload = has_payload;
    }

    fn field(&self, name: &HeaderName) -> Option<&HttpField> {
        self.fields.get(name)
    }

    fn set_field(&mut self, field: HttpField) {
        self.fields.set(field);
    }

    fn remove_field(&mut self, name: &HeaderName) -> Option<HttpField> {
        self.fields.remove(name)
    }

    fn fields(&self) -> std::slice::Iter<'_, HttpField> {
        self.fields.iter()
    }
}

/// Canonical reason phrases for well-known status codes (§3 `[ADDED]`).
/// Grounded on the existence of `ext::h1_reason_phrase` in the teacher
/// crate: a small static table, not a generated one.
fn canonical_reason(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        411 => "Length Required",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        426 => "Upgrade Required",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// A lightweight copy of the request context a response needs in order to
/// pick its framing (§4.E); see DESIGN.md for why this is a snapshot
/// rather than a true back-reference.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub version: HttpVersion,
    pub keep_alive: bool,
    pub method: RequestMethodClass,
}

/// Just enough of the request method to drive §4.D's zero-body rule
/// (`HEAD`) without requiring `http::Method` to be `Copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethodClass {
    Head,
    Other,
}

impl From<&Method> for RequestMethodClass {
    fn from(m: &Method) -> Self {
        if *m == Method::HEAD {
            RequestMethodClass::Head
        } else {
            RequestMethodClass::Other
        }
    }
}

impl From<&HttpRequest> for RequestContext {
    fn from(req: &HttpRequest) -> Self {
        RequestContext {
            version: req.protocol(),
            keep_alive: req.keep_alive(),
            method: RequestMethodClass::from(req.method()),
        }
    }
}

/// A decoded or to-be-encoded HTTP response (§3).
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    reason: String,
    version: HttpVersion,
    has_payload: bool,
    fields: FieldMap,
    pub(crate) origin: Option<RequestContext>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, version: HttpVersion, has_payload: bool) -> Self {
        let reason = canonical_reason(status).to_string();
        HttpResponse {
            status,
            reason,
            version,
            has_payload,
            fields: FieldMap::new(),
            origin: None,
        }
    }

    /// The decoder's preliminary response for every completed request
    /// header starts at 501 (§3, §4.D).
    pub fn preliminary(version: HttpVersion) -> Self {
        HttpResponse::new(StatusCode::NOT_IMPLEMENTED, version, false)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn set_reason(&mut self, reason: impl Into<String>) {
        self.reason = reason.into();
    }

    pub fn origin(&self) -> Option<RequestContext> {
        self.origin
    }

    pub fn set_origin(&mut self, origin: RequestContext) {
        self.origin = Some(origin);
    }

    pub fn is_interim(&self) -> bool {
        self.status.is_informational()
    }
}

impl MessageHeader for HttpResponse {
    fn protocol(&self) -> HttpVersion {
        self.version
    }

    fn has_payload(&self) -> bool {
        self.has_payload
    }

    fn set_has_payload(&mut self, has_payload: bool) {
        self.has_payload = has_payload;
    }

    fn field(&self, name: &HeaderName) -> Option<&HttpField> {
        self.fields.get(name)
    }

    fn set_field(&mut self, field: HttpField) {
        self.fields.set(field);
    }

    fn remove_field(&mut self, name: &HeaderName) -> Option<HttpField> {
        self.fields.remove(name)
    }

    fn fields(&self) -> std::slice::Iter<'_, HttpField> {
        self.fields.iter()
    }
}

fn contains_token_ci(value: &FieldValue, needle: &str) -> bool {
    match value {
        FieldValue::Str(s) => s.eq_ignore_ascii_case(needle),
        FieldValue::List(items) => items.iter().any(|v| contains_token_ci(v, needle)),
        _ => false,
    }
}

/// Builds a [`FieldValue`] for `name` from wire text using the converter
/// that's canonical for that header (used by the decoder, §4.D).
pub fn parse_field(name: &HeaderName, text: &str) -> Result<FieldValue, crate::Error> {
    converter_for(name).from_field_value(text)
}

/// Renders a [`FieldValue`] back to wire text using the converter that's
/// canonical for `name` (used by the encoder, §4.E).
pub fn render_field(name: &HeaderName, value: &FieldValue) -> Result<String, crate::Error> {
    converter_for(name).as_field_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_host_port_from_uri() {
        let req = HttpRequest::new(
            Method::GET,
            "http://example.com:8080/x".parse().unwrap(),
            HttpVersion::Http11,
            false,
        );
        assert_eq!(req.host(), Some("example.com"));
        assert_eq!(req.port(), 8080);
    }

    #[test]
    fn preliminary_response_is_501() {
        let resp = HttpResponse::preliminary(HttpVersion::Http11);
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
        assert!(!resp.has_payload());
    }

    #[test]
    fn field_map_collapses_same_name_fields() {
        let mut req = HttpRequest::new(Method::GET, "/".parse().unwrap(), HttpVersion::Http11, false);
        req.set_field(HttpField::new(http::header::HOST, FieldValue::Str("a".into())));
        req.set_field(HttpField::new(http::header::HOST, FieldValue::Str("b".into())));
        assert_eq!(req.fields().count(), 1);
        assert_eq!(req.field(&http::header::HOST).unwrap().value().as_str(), Some("b"));
    }

    #[test]
    fn keep_alive_follows_connection_close() {
        let mut req = HttpRequest::new(Method::GET, "/".parse().unwrap(), HttpVersion::Http11, false);
        assert!(req.keep_alive());
        req.set_field(HttpField::new(
            http::header::CONNECTION,
            FieldValue::List(vec![FieldValue::Str("close".into())]),
        ));
        assert!(!req.keep_alive());
    }
}
