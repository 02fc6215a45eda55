//! REST client abstraction for appliance API access.
//!
//! The `RestClient` trait is the seam between the archive workflow and the
//! appliance's iControl REST surface. All workflow operations take a
//! `&dyn RestClient`, which allows dependency injection and scripted fake
//! devices in tests.
//!
//! # Design Principles
//!
//! - **Path-based**: callers pass endpoint paths (`/mgmt/tm/sys/ucs`), the
//!   client owns the scheme/host/auth plumbing
//! - **JSON in, JSON out**: the iControl API is JSON throughout except for
//!   range downloads, which get their own method
//! - **Deletes expose the raw response**: the workflow needs the HTTP status
//!   and body of DELETE calls to classify already-deleted conflicts
//! - **Dyn-compatible**: uses `Pin<Box<dyn Future>>` for trait object support

mod http;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use thiserror::Error;

pub use http::ReqwestClient;

/// Boxed future returned by `RestClient` methods.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Errors raised by the transport layer.
///
/// Everything here is a "transport failure" in workflow terms: connection
/// problems, timeouts, unexpected HTTP statuses, and unparsable bodies.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or the connection failed.
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The request exceeded the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// The response body could not be decoded.
    #[error("invalid response body from {url}: {reason}")]
    Body { url: String, reason: String },

    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Byte range cursor for chunked downloads.
///
/// Rendered as `{start}-{end}/{size}` in the request-side `Content-Range`
/// header. The appliance expects `size` to be `0` until the client has
/// learned the real total from the first response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
    pub size: u64,
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}/{}", self.start, self.end, self.size)
    }
}

/// One response to a range GET.
#[derive(Debug, Clone)]
pub struct RangeChunk {
    /// The response-side `Content-Range` header, e.g. `0-524287/1048576`.
    pub content_range: Option<String>,
    /// Raw body bytes for the requested window.
    pub body: Vec<u8>,
}

/// Raw response to a DELETE call.
///
/// Unlike the JSON methods, deletes never map HTTP errors to
/// `TransportError::Status`: the workflow inspects status and body itself
/// because the appliance reports already-deleted resources as HTTP 400.
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: u16,
    pub body: String,
}

impl RestResponse {
    /// True for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client-side view of the appliance REST API.
///
/// Implementations own host, credentials, and TLS settings. Paths are
/// absolute (`/mgmt/...`); query strings are passed separately so callers
/// never do their own URL assembly.
pub trait RestClient: Send + Sync {
    /// GET a JSON resource.
    fn get_json<'a>(&'a self, path: &'a str, query: Option<&'a str>) -> ClientFuture<'a, Value>;

    /// POST a JSON payload, returning the JSON response body.
    fn post_json<'a>(&'a self, path: &'a str, body: &'a Value) -> ClientFuture<'a, Value>;

    /// PUT a JSON payload, returning the JSON response body.
    fn put_json<'a>(&'a self, path: &'a str, body: &'a Value) -> ClientFuture<'a, Value>;

    /// DELETE a resource, returning status and body verbatim.
    fn delete<'a>(&'a self, path: &'a str) -> ClientFuture<'a, RestResponse>;

    /// GET one window of a file using the request-side `Content-Range`
    /// convention.
    fn get_range<'a>(&'a self, path: &'a str, range: ByteRange) -> ClientFuture<'a, RangeChunk>;
}

#[cfg(test)]
pub mod mock;
