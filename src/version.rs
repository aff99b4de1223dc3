//! HTTP versions enumerated by the wire format this crate implements (§6).

use std::fmt;

/// The protocol identifier carried by every [`MessageHeader`](crate::MessageHeader).
///
/// Restricted to the set this codec actually speaks on the wire; HTTP/2 and
/// HTTP/3 are non-goals (§1) and surface only through the protocol-switch
/// extension point in [`crate::engine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpVersion {
    /// `HTTP/1.0`
    Http10,
    /// `HTTP/1.1`
    Http11,
}

impl HttpVersion {
    /// True for `HTTP/1.1`, which defaults to persistent connections.
    pub fn supports_keep_alive_by_default(self) -> bool {
        matches!(self, HttpVersion::Http11)
    }

    pub(crate) fn from_bytes(bytes: &[u8]) -> Option<HttpVersion> {
        match bytes {
            b"HTTP/1.0" => Some(HttpVersion::Http10),
            b"HTTP/1.1" => Some(HttpVersion::Http11),
            _ => None,
        }
    }

    pub(crate) fn from_httparse_minor(minor: u8) -> Option<HttpVersion> {
        match minor {
            0 => Some(HttpVersion::Http10),
            1 => Some(HttpVersion::Http11),
            _ => None,
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
        })
    }
}

impl From<HttpVersion> for http::Version {
    fn from(v: HttpVersion) -> http::Version {
        match v {
            HttpVersion::Http10 => http::Version::HTTP_10,
            HttpVersion::Http11 => http::Version::HTTP_11,
        }
    }
}

impl std::convert::TryFrom<http::Version> for HttpVersion {
    type Error = crate::Error;

    fn try_from(v: http::Version) -> Result<Self, Self::Error> {
        match v {
            http::Version::HTTP_10 => Ok(HttpVersion::Http10),
            http::Version::HTTP_11 => Ok(HttpVersion::Http11),
            _ => Err(crate::Error::new_unsupported_version()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips_from_bytes() {
        for &v in &[HttpVersion::Http10, HttpVersion::Http11] {
            let rendered = v.to_string();
            assert_eq!(HttpVersion::from_bytes(rendered.as_bytes()), Some(v));
        }
    }

    #[test]
    fn keep_alive_default_only_for_1_1() {
        assert!(!HttpVersion::Http10.supports_keep_alive_by_default());
        assert!(HttpVersion::Http11.supports_keep_alive_by_default());
    }
}
