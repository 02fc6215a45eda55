//! reqwest-backed `RestClient` implementation.

use reqwest::header::{HeaderValue, CONTENT_RANGE, CONTENT_TYPE};
use serde_json::Value;

use super::{ByteRange, ClientFuture, RangeChunk, RestClient, RestResponse, TransportError};
use crate::config::DeviceConfig;

/// Real appliance client over HTTPS with basic auth.
///
/// One instance targets one device; it holds no mutable state and can be
/// shared freely across tasks.
#[derive(Debug)]
pub struct ReqwestClient {
    client: reqwest::Client,
    base: String,
    username: String,
    password: String,
    timeout_secs: u64,
}

impl ReqwestClient {
    /// Build a client for the device described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ClientBuild` if the TLS backend cannot be
    /// initialized.
    pub fn new(config: &DeviceConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            base: format!("https://{}", config.host),
            username: config.username.clone(),
            password: config.password.clone(),
            timeout_secs: config.request_timeout.as_secs(),
        })
    }

    fn url(&self, path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) => format!("{}{}?{}", self.base, path, q),
            None => format!("{}{}", self.base, path),
        }
    }

    fn send_error(&self, url: &str, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            TransportError::Request {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
    }

    /// Read a response as JSON, mapping non-success statuses to
    /// `TransportError::Status` with the body preserved for diagnostics.
    async fn json_body(url: String, response: reqwest::Response) -> Result<Value, TransportError> {
        let status = response.status();
        let text = response.text().await.map_err(|e| TransportError::Body {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url,
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| TransportError::Body {
            url,
            reason: e.to_string(),
        })
    }
}

impl RestClient for ReqwestClient {
    fn get_json<'a>(&'a self, path: &'a str, query: Option<&'a str>) -> ClientFuture<'a, Value> {
        Box::pin(async move {
            let url = self.url(path, query);
            let response = self
                .client
                .get(&url)
                .basic_auth(&self.username, Some(&self.password))
                .send()
                .await
                .map_err(|e| self.send_error(&url, e))?;
            Self::json_body(url, response).await
        })
    }

    fn post_json<'a>(&'a self, path: &'a str, body: &'a Value) -> ClientFuture<'a, Value> {
        Box::pin(async move {
            let url = self.url(path, None);
            let response = self
                .client
                .post(&url)
                .basic_auth(&self.username, Some(&self.password))
                .json(body)
                .send()
                .await
                .map_err(|e| self.send_error(&url, e))?;
            Self::json_body(url, response).await
        })
    }

    fn put_json<'a>(&'a self, path: &'a str, body: &'a Value) -> ClientFuture<'a, Value> {
        Box::pin(async move {
            let url = self.url(path, None);
            let response = self
                .client
                .put(&url)
                .basic_auth(&self.username, Some(&self.password))
                .json(body)
                .send()
                .await
                .map_err(|e| self.send_error(&url, e))?;
            Self::json_body(url, response).await
        })
    }

    fn delete<'a>(&'a self, path: &'a str) -> ClientFuture<'a, RestResponse> {
        Box::pin(async move {
            let url = self.url(path, None);
            let response = self
                .client
                .delete(&url)
                .basic_auth(&self.username, Some(&self.password))
                .send()
                .await
                .map_err(|e| self.send_error(&url, e))?;

            // Deletes surface status and body verbatim; the appliance encodes
            // "already deleted" as HTTP 400 and callers must see that.
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| TransportError::Body {
                url,
                reason: e.to_string(),
            })?;
            Ok(RestResponse { status, body })
        })
    }

    fn get_range<'a>(&'a self, path: &'a str, range: ByteRange) -> ClientFuture<'a, RangeChunk> {
        Box::pin(async move {
            let url = self.url(path, None);
            let response = self
                .client
                .get(&url)
                .basic_auth(&self.username, Some(&self.password))
                .header(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"))
                .header(CONTENT_RANGE, range.to_string())
                .send()
                .await
                .map_err(|e| self.send_error(&url, e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    url,
                    body,
                });
            }

            let content_range = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::Body {
                    url,
                    reason: e.to_string(),
                })?
                .to_vec();

            Ok(RangeChunk {
                content_range,
                body,
            })
        })
    }
}
