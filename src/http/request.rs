//! Request types for the Sequoia transport.

use std::collections::HashMap;
use std::fmt;

use crate::codec::Value;

/// HTTP methods used against Sequoia services.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// HTTP GET method for retrieving resources.
    Get,
    /// HTTP POST method for creating resources.
    Post,
    /// HTTP PUT method for updating resources.
    Put,
    /// HTTP DELETE method for removing resources.
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A fully addressed request ready for the transport.
///
/// Built by the [`RequestBuilder`](crate::RequestBuilder) once service and
/// resource names have been resolved; the URL carries no query of its own,
/// parameters travel in `query`.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The absolute request URL, without query string.
    pub url: reqwest::Url,
    /// Query parameters to append to the URL.
    pub query: HashMap<String, String>,
    /// Extra headers beyond the fixed content headers.
    pub headers: HashMap<String, String>,
    /// The structured body, encoded through the codec when sent.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Creates a request with no query, headers, or body.
    #[must_use]
    pub fn new(method: HttpMethod, url: reqwest::Url) -> Self {
        Self {
            method,
            url,
            query: HashMap::new(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Sets all query parameters at once.
    #[must_use]
    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    /// Adds a single header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the structured request body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}
