//! Scripted fake `RestClient` for unit tests.
//!
//! Responses are queued per endpoint path ahead of the call; every call is
//! recorded so tests can assert on request counts and ordering. An
//! unscripted call panics with the offending method and path, which makes a
//! diverging workflow fail loudly instead of hanging.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::Value;

use super::{ByteRange, ClientFuture, RangeChunk, RestClient, RestResponse, TransportError};

type Script<T> = Mutex<HashMap<String, VecDeque<Result<T, TransportError>>>>;

/// Fake device client with pre-scripted responses.
#[derive(Default)]
pub struct MockRestClient {
    get: Script<Value>,
    post: Script<Value>,
    put: Script<Value>,
    delete: Script<RestResponse>,
    range: Mutex<VecDeque<Result<RangeChunk, TransportError>>>,
    calls: Mutex<Vec<String>>,
}

impl MockRestClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_get(&self, path: &str, response: Result<Value, TransportError>) {
        enqueue(&self.get, path, response);
    }

    pub fn expect_post(&self, path: &str, response: Result<Value, TransportError>) {
        enqueue(&self.post, path, response);
    }

    pub fn expect_put(&self, path: &str, response: Result<Value, TransportError>) {
        enqueue(&self.put, path, response);
    }

    pub fn expect_delete(&self, path: &str, response: Result<RestResponse, TransportError>) {
        enqueue(&self.delete, path, response);
    }

    pub fn push_range(&self, response: Result<RangeChunk, TransportError>) {
        self.range.lock().unwrap().push_back(response);
    }

    /// All recorded calls, as `"METHOD /path"` strings in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls starting with `prefix`.
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, method: &str, path: &str) {
        self.calls.lock().unwrap().push(format!("{} {}", method, path));
    }

    fn take<T>(&self, script: &Script<T>, method: &str, path: &str) -> Result<T, TransportError> {
        self.record(method, path);
        script
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| panic!("unscripted {} {}", method, path))
    }
}

fn enqueue<T>(script: &Script<T>, path: &str, response: Result<T, TransportError>) {
    script
        .lock()
        .unwrap()
        .entry(path.to_string())
        .or_default()
        .push_back(response);
}

/// Convenience constructor for a scripted connection failure.
pub fn transport_failure(url: &str) -> TransportError {
    TransportError::Request {
        url: url.to_string(),
        reason: "connection refused".to_string(),
    }
}

/// Convenience constructor for a scripted request timeout.
pub fn transport_timeout(url: &str) -> TransportError {
    TransportError::Timeout {
        url: url.to_string(),
        timeout_secs: 60,
    }
}

impl RestClient for MockRestClient {
    fn get_json<'a>(&'a self, path: &'a str, _query: Option<&'a str>) -> ClientFuture<'a, Value> {
        Box::pin(async move { self.take(&self.get, "GET", path) })
    }

    fn post_json<'a>(&'a self, path: &'a str, _body: &'a Value) -> ClientFuture<'a, Value> {
        Box::pin(async move { self.take(&self.post, "POST", path) })
    }

    fn put_json<'a>(&'a self, path: &'a str, _body: &'a Value) -> ClientFuture<'a, Value> {
        Box::pin(async move { self.take(&self.put, "PUT", path) })
    }

    fn delete<'a>(&'a self, path: &'a str) -> ClientFuture<'a, RestResponse> {
        Box::pin(async move { self.take(&self.delete, "DELETE", path) })
    }

    fn get_range<'a>(&'a self, path: &'a str, _range: ByteRange) -> ClientFuture<'a, RangeChunk> {
        Box::pin(async move {
            self.record("RANGE", path);
            self.range
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unscripted RANGE {}", path))
        })
    }
}
