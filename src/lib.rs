#![deny(missing_debug_implementations)]
#![cfg_attr(test, deny(rust_2018_idioms))]

//! # httpcore
//!
//! httpcore is a non-blocking HTTP/1.x codec library: incremental
//! decoder and encoder state machines that turn bytes into typed
//! request/response headers (and back), without owning a socket,
//! a runtime, or an event loop.
//!
//! ## What this crate is
//!
//! - A pull-driven decoder: feed it whatever bytes you have, it tells you
//!   what it understood and how much of your buffer it used.
//! - A push-driven encoder: hand it a message, it renders the header and
//!   then streams the body through the same framing it chose.
//! - A typed field-value model for the header values HTTP actually uses
//!   in practice (dates, lists, parameters, weighted preferences).
//! - In-stream protocol-switch support (`101 Switching Protocols`): an
//!   [`Engine`](engine::Engine) can swap its HTTP/1.x codec pair for a
//!   different one without losing its place in the stream.
//!
//! ## What this crate is not
//!
//! There is no I/O in here — no `TcpStream`, no async executor, no
//! connection pool. Callers own the transport and drive the state
//! machines with whatever bytes arrive; see [`engine`] for the
//! top-level type that ties a decoder and an encoder together.

#[doc(no_inline)]
pub use http::{header, HeaderMap, Method, StatusCode, Uri};

pub use crate::error::{Error, Result};
pub use crate::engine::{Engine, Side};
pub use crate::message::{HttpRequest, HttpResponse, MessageHeader};
pub use crate::version::HttpVersion;

pub mod config;
pub mod engine;
mod error;
pub mod field;
pub mod message;
pub mod proto;
pub mod query;
pub mod token;
pub mod tunnel;
mod version;
