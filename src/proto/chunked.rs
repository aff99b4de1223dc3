//! Chunked transfer-coding (RFC 7230 §4.1), shared by the decoder and the
//! encoder.
//!
//! Grounded on the `ChunkedState` step machine in `proto/h1/decode.rs` and
//! the `ChunkSize` writer in `proto/h1/encode.rs`, both stripped of the
//! `Poll`/`MemRead` plumbing those use to drive an async transport — this
//! state machine instead steps over whatever prefix of `&[u8]` is
//! currently available and reports back how far it got, so callers can
//! feed it one byte or one megabyte at a time with the same result.

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Size,
    SizeLws,
    Extension,
    SizeLf,
    Body,
    BodyCr,
    BodyLf,
    Trailer,
    End,
}

/// Result of one [`ChunkedDecoder::decode`] call.
#[derive(Debug, PartialEq, Eq)]
pub enum ChunkedProgress {
    /// Consumed everything available; more input is needed to make
    /// further progress.
    Underflow,
    /// The terminating zero-length chunk and trailer section have both
    /// been consumed. `trailer` holds the raw trailer lines (each still
    /// CRLF-terminated, including the final blank line) ready for the
    /// same header tokenizer the start of the message used.
    Done { trailer: Vec<u8> },
}

/// Decodes a chunked body into its constituent chunk-data bytes, tracking
/// state across calls so a short read resumes exactly where it left off
/// (§4.D "progress guarantee").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: State,
    chunk_remaining: u64,
    size_digit_seen: bool,
    trailer_buf: Vec<u8>,
    trailer_lines: usize,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        ChunkedDecoder {
            state: State::Size,
            chunk_remaining: 0,
            size_digit_seen: false,
            trailer_buf: Vec::new(),
            trailer_lines: 0,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == State::End
    }

    /// Consumes as much of `input` as forms complete chunk-size lines and
    /// chunk-data, appending decoded body bytes to `output`. `input` is
    /// advanced past everything consumed, including trailing CRLFs that
    /// carry no data of their own. `max_trailer_lines` bounds how many
    /// trailer fields are buffered before this reports
    /// [`Error::new_header_too_long`] — the same cap the header section
    /// uses (§4.D).
    pub fn decode(
        &mut self,
        input: &mut &[u8],
        output: &mut Vec<u8>,
        max_trailer_lines: usize,
    ) -> Result<ChunkedProgress, Error> {
        loop {
            match self.state {
                State::Size => match input.first() {
                    None => return Ok(ChunkedProgress::Underflow),
                    Some(&b) => {
                        *input = &input[1..];
                        match (b as char).to_digit(16) {
                            Some(d) => {
                                self.chunk_remaining = self
                                    .chunk_remaining
                                    .checked_mul(16)
                                    .and_then(|v| v.checked_add(d as u64))
                                    .ok_or_else(|| Error::new_bad_framing("chunk size overflows u64"))?;
                                self.size_digit_seen = true;
                            }
                            None if b == b';' => {
                                self.require_size_digit()?;
                                self.state = State::Extension;
                            }
                            None if b == b' ' || b == b'\t' => {
                                self.require_size_digit()?;
                                self.state = State::SizeLws;
                            }
                            None if b == b'\r' => {
                                self.require_size_digit()?;
                                self.state = State::SizeLf;
                            }
                            None => return Err(Error::new_bad_framing("invalid chunk size digit")),
                        }
                    }
                },
                State::SizeLws => match input.first() {
                    None => return Ok(ChunkedProgress::Underflow),
                    Some(&b) => {
                        *input = &input[1..];
                        match b {
                            b' ' | b'\t' => {}
                            b';' => self.state = State::Extension,
                            b'\r' => self.state = State::SizeLf,
                            _ => return Err(Error::new_bad_framing("invalid byte after chunk size")),
                        }
                    }
                },
                State::Extension => match input.first() {
                    None => return Ok(ChunkedProgress::Underflow),
                    Some(&b) => {
                        *input = &input[1..];
                        if b == b'\r' {
                            self.state = State::SizeLf;
                        }
                    }
                },
                State::SizeLf => match input.first() {
                    None => return Ok(ChunkedProgress::Underflow),
                    Some(&b'\n') => {
                        *input = &input[1..];
                        self.state = if self.chunk_remaining == 0 { State::Trailer } else { State::Body };
                    }
                    Some(_) => return Err(Error::new_bad_framing("expected LF after chunk size")),
                },
                State::Body => {
                    if self.chunk_remaining == 0 {
                        self.state = State::BodyCr;
                        continue;
                    }
                    if input.is_empty() {
                        return Ok(ChunkedProgress::Underflow);
                    }
                    let take = std::cmp::min(self.chunk_remaining, input.len() as u64) as usize;
                    output.extend_from_slice(&input[..take]);
                    *input = &input[take..];
                    self.chunk_remaining -= take as u64;
                    if self.chunk_remaining > 0 {
                        return Ok(ChunkedProgress::Underflow);
                    }
                    self.state = State::BodyCr;
                }
                State::BodyCr => match input.first() {
                    None => return Ok(ChunkedProgress::Underflow),
                    Some(&b'\r') => {
                        *input = &input[1..];
                        self.state = State::BodyLf;
                    }
                    Some(_) => return Err(Error::new_bad_framing("expected CR after chunk data")),
                },
                State::BodyLf => match input.first() {
                    None => return Ok(ChunkedProgress::Underflow),
                    Some(&b'\n') => {
                        *input = &input[1..];
                        self.chunk_remaining = 0;
                        self.size_digit_seen = false;
                        self.state = State::Size;
                    }
                    Some(_) => return Err(Error::new_bad_framing("expected LF after chunk data")),
                },
                State::Trailer => match input.first() {
                    None => return Ok(ChunkedProgress::Underflow),
                    Some(&b) => {
                        *input = &input[1..];
                        self.trailer_buf.push(b);
                        if b == b'\n' {
                            self.trailer_lines += 1;
                            if self.trailer_lines > max_trailer_lines + 1 {
                                return Err(Error::new_header_too_long());
                            }
                            if self.trailer_buf.ends_with(b"\r\n\r\n") || self.trailer_buf == b"\r\n" {
                                self.state = State::End;
                                return Ok(ChunkedProgress::Done { trailer: std::mem::take(&mut self.trailer_buf) });
                            }
                        }
                    }
                },
                State::End => return Ok(ChunkedProgress::Done { trailer: Vec::new() }),
            }
        }
    }

    fn require_size_digit(&self) -> Result<(), Error> {
        if self.size_digit_seen {
            Ok(())
        } else {
            Err(Error::new_bad_framing("chunk size line has no digits"))
        }
    }
}

/// Writes one chunk (`chunk-size CRLF chunk-data CRLF`) to `output`.
/// Grounded on `proto/h1/encode.rs`'s `ChunkSize` writer; that writer
/// reuses a fixed-size hex buffer across many chunks on the same
/// connection, which matters when you're encoding thousands of them a
/// second. `itoa` only renders decimal, so the size line here goes
/// through `std::fmt`'s hex formatter instead.
pub fn encode_chunk(data: &[u8], output: &mut Vec<u8>) {
    use std::io::Write;
    let _ = write!(output, "{:x}", data.len());
    output.extend_from_slice(b"\r\n");
    output.extend_from_slice(data);
    output.extend_from_slice(b"\r\n");
}

/// Writes the terminating zero-length chunk, any trailer fields allowed
/// through the trailer allow-list, and the final CRLF.
pub fn encode_last_chunk(trailer_lines: &[String], output: &mut Vec<u8>) {
    output.extend_from_slice(b"0\r\n");
    for line in trailer_lines {
        output.extend_from_slice(line.as_bytes());
        output.extend_from_slice(b"\r\n");
    }
    output.extend_from_slice(b"\r\n");
}
