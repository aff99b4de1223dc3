//! Error and Result types for the codec core.

use std::error::Error as StdError;
use std::fmt;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

type Cause = Box<dyn StdError + Send + Sync>;

/// An error produced by a converter, decoder, or encoder.
///
/// Opaque by design: callers branch on `is_*()` predicates rather than
/// matching on internals, so new error variants never break callers.
pub struct Error {
    inner: Box<ErrorImpl>,
}

struct ErrorImpl {
    kind: Kind,
    cause: Option<Cause>,
}

#[derive(Debug)]
pub(crate) enum Kind {
    /// A field converter could not parse a header value.
    ParseError { reason: &'static str },
    /// A syntactic wire violation at a known byte offset.
    MalformedInput { offset: usize, reason: &'static str },
    /// A header or start line exceeded the configured length cap.
    HeaderTooLong,
    /// Content-Length/Transfer-Encoding conflict or inconsistent framing.
    BadFraming { reason: &'static str },
    /// End of input reached mid-message.
    UnexpectedEof,
    /// HTTP version outside the enumerated set (1.0, 1.1).
    UnsupportedVersion,
    /// Body bytes offered before a header was latched, or after `endOfInput`.
    InvalidState { reason: &'static str },
    /// `queryData`/`wwwFormUrlencode` asked for a charset other than UTF-8.
    UnsupportedCharset,
}

impl Error {
    /// Returns true if this was a field-value parse error.
    pub fn is_parse_error(&self) -> bool {
        matches!(self.inner.kind, Kind::ParseError { .. })
    }

    /// Returns true if this was a syntactic wire violation.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self.inner.kind, Kind::MalformedInput { .. })
    }

    /// Returns true if a header line or start line exceeded its cap.
    pub fn is_header_too_long(&self) -> bool {
        matches!(self.inner.kind, Kind::HeaderTooLong)
    }

    /// Returns true if Content-Length/Transfer-Encoding framing was inconsistent.
    pub fn is_bad_framing(&self) -> bool {
        matches!(self.inner.kind, Kind::BadFraming { .. })
    }

    /// Returns true if input ended mid-message.
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self.inner.kind, Kind::UnexpectedEof)
    }

    /// Returns true if the HTTP version was outside {1.0, 1.1}.
    pub fn is_unsupported_version(&self) -> bool {
        matches!(self.inner.kind, Kind::UnsupportedVersion)
    }

    /// Returns true if the encoder was driven out of order.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self.inner.kind, Kind::InvalidState { .. })
    }

    /// Returns true if a non-UTF-8 charset was requested for query codec operations.
    pub fn is_unsupported_charset(&self) -> bool {
        matches!(self.inner.kind, Kind::UnsupportedCharset)
    }

    /// The byte offset associated with a `MalformedInput` error, if any.
    pub fn offset(&self) -> Option<usize> {
        match self.inner.kind {
            Kind::MalformedInput { offset, .. } => Some(offset),
            _ => None,
        }
    }

    pub(crate) fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(ErrorImpl { kind, cause: None }),
        }
    }

    #[allow(dead_code)]
    pub(crate) fn with<C: Into<Cause>>(mut self, cause: C) -> Error {
        self.inner.cause = Some(cause.into());
        self
    }

    pub(crate) fn new_parse(reason: &'static str) -> Error {
        Error::new(Kind::ParseError { reason })
    }

    pub(crate) fn new_malformed(offset: usize, reason: &'static str) -> Error {
        Error::new(Kind::MalformedInput { offset, reason })
    }

    pub(crate) fn new_header_too_long() -> Error {
        Error::new(Kind::HeaderTooLong)
    }

    pub(crate) fn new_bad_framing(reason: &'static str) -> Error {
        Error::new(Kind::BadFraming { reason })
    }

    pub(crate) fn new_unexpected_eof() -> Error {
        Error::new(Kind::UnexpectedEof)
    }

    pub(crate) fn new_unsupported_version() -> Error {
        Error::new(Kind::UnsupportedVersion)
    }

    pub(crate) fn new_invalid_state(reason: &'static str) -> Error {
        Error::new(Kind::InvalidState { reason })
    }

    pub(crate) fn new_unsupported_charset() -> Error {
        Error::new(Kind::UnsupportedCharset)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("httpcore::Error");
        builder.field("kind", &self.inner.kind);
        if let Some(ref cause) = self.inner.cause {
            builder.field("cause", cause);
        }
        builder.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::ParseError { reason } => write!(f, "parse error: {}", reason),
            Kind::MalformedInput { offset, reason } => {
                write!(f, "malformed input at offset {}: {}", offset, reason)
            }
            Kind::HeaderTooLong => f.write_str("header line exceeded the configured cap"),
            Kind::BadFraming { reason } => write!(f, "bad framing: {}", reason),
            Kind::UnexpectedEof => f.write_str("unexpected end of input mid-message"),
            Kind::UnsupportedVersion => f.write_str("unsupported HTTP version"),
            Kind::InvalidState { reason } => write!(f, "invalid encoder state: {}", reason),
            Kind::UnsupportedCharset => f.write_str("unsupported charset, only UTF-8 is implemented"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.cause.as_ref().map(|cause| &**cause as &(dyn StdError + 'static))
    }
}
