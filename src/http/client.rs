//! HTTP client for Sequoia service communication.
//!
//! This module provides the [`HttpClient`] type shared by the request builder
//! and the discovery paths. It applies the fixed Sequoia content headers and
//! retries transient transport failures up to a configured attempt bound.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::Error;
use crate::http::request::ApiRequest;
use crate::http::request::HttpMethod;
use crate::http::response::ApiResponse;

/// Content type carried by every Sequoia request.
pub const CONTENT_TYPE: &str = "application/vnd.piksel+json";

/// HTTP client for making requests to Sequoia services.
///
/// The client handles:
/// - Fixed `Content-Type` and `Accept-Encoding` headers
/// - Body encoding through the codec and decoding of replies
/// - Immediate retry of timeout/connection failures, bounded by `max_retries`
///   total attempts (HTTP error statuses are never retried)
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync`, making it safe to share across async tasks.
#[derive(Debug)]
pub struct HttpClient {
    /// The internal reqwest HTTP client.
    client: reqwest::Client,
    /// Total attempts allowed per request.
    max_retries: u32,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// # Arguments
    ///
    /// * `max_retries` - Total attempts per request (values below 1 behave as 1)
    /// * `timeout` - Default per-request timeout; discovery calls override it
    ///
    /// # Panics
    ///
    /// Panics if the underlying reqwest client cannot be created. This should
    /// only happen in extremely unusual circumstances (e.g., TLS
    /// initialization failure).
    #[must_use]
    pub fn new(max_retries: u32, timeout: Option<Duration>) -> Self {
        let mut builder = reqwest::Client::builder().use_rustls_tls();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().expect("Failed to create HTTP client");

        Self {
            client,
            max_retries,
        }
    }

    /// Returns the inner reqwest client, used by the discovery and token
    /// paths that bypass the Sequoia content headers.
    #[must_use]
    pub const fn reqwest(&self) -> &reqwest::Client {
        &self.client
    }

    /// Returns the configured attempt bound.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Sends a request to a Sequoia service.
    ///
    /// Transient transport failures (timeouts, connection errors) are retried
    /// immediately with the exact same request until the attempt bound is
    /// reached, then the underlying error is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::Network`] when the transport fails after all attempts
    /// - [`Error::Response`] for non-2xx statuses (never retried)
    /// - [`Error::Json`] when a 2xx body is not valid JSON
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, Error> {
        // Encode the body once; every retry sends identical bytes.
        let body_text = request
            .body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;

            let mut req = match request.method {
                HttpMethod::Get => self.client.get(request.url.clone()),
                HttpMethod::Post => self.client.post(request.url.clone()),
                HttpMethod::Put => self.client.put(request.url.clone()),
                HttpMethod::Delete => self.client.delete(request.url.clone()),
            };
            req = req
                .header("Content-Type", CONTENT_TYPE)
                .header("Accept-Encoding", "identity");
            for (key, value) in &request.headers {
                req = req.header(key, value);
            }
            if !request.query.is_empty() {
                req = req.query(&request.query);
            }
            if let Some(text) = &body_text {
                req = req.body(text.clone());
            }

            tracing::debug!(
                method = %request.method,
                url = %request.url,
                attempt = attempts,
                "sending request",
            );

            let result = req.send().await;
            let response = match result {
                Ok(response) => response,
                Err(source)
                    if (source.is_timeout() || source.is_connect())
                        && attempts < self.max_retries =>
                {
                    tracing::warn!(
                        method = %request.method,
                        url = %request.url,
                        error = %source,
                        "transient transport failure, retrying",
                    );
                    continue;
                }
                Err(source) => return Err(Error::Network(source)),
            };

            let status = response.status();
            let headers = Self::parse_response_headers(response.headers());
            let text = response.text().await.unwrap_or_default();

            if !status.is_success() {
                tracing::error!(
                    status = status.as_u16(),
                    method = %request.method,
                    url = %request.url,
                    body = %text,
                    "error response from service",
                );
                return Err(Error::Response {
                    status: status.as_u16(),
                    method: request.method.to_string(),
                    url: request.url.to_string(),
                    body: text,
                });
            }

            let decoded =
                ApiResponse::new(status.as_u16(), headers, &text).map_err(|source| {
                    tracing::error!(
                        method = %request.method,
                        url = %request.url,
                        error = %source,
                        "wrong response body from service",
                    );
                    Error::Json(source)
                })?;

            tracing::debug!(status = decoded.status, "response received");
            return Ok(decoded);
        }
    }

    /// Flattens response headers, keeping the first value of each.
    fn parse_response_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
        let mut result = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            result
                .entry(key)
                .or_insert_with(|| value.to_str().unwrap_or_default().to_string());
        }
        result
    }
}
