//! Tunables for the decoder and encoder.

/// Decoder-side limits. Exceeding any of these is a fatal
/// [`HeaderTooLong`](crate::Error::is_header_too_long) error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Maximum length, in bytes, of a single start line or header line
    /// (after obs-fold continuation is collapsed). Default 8192.
    pub max_line_len: usize,
    /// Maximum number of header fields (leading headers or trailers) per
    /// message. Default 100.
    pub max_headers: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            max_line_len: 8 * 1024,
            max_headers: 100,
        }
    }
}

/// Encoder-side behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Emit header names in `Title-Case` instead of as stored. Some very
    /// old HTTP servers and proxies are picky about this; off by default.
    pub title_case_headers: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            title_case_headers: false,
        }
    }
}
