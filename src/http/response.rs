//! Response wrapper for the Sequoia transport.

use std::collections::HashMap;

use crate::codec::Value;

/// A decoded response from a Sequoia service.
///
/// The body is decoded exactly once, at construction, so [`ApiResponse::json`]
/// is idempotent and always returns the identical value. An empty body decodes
/// to the empty-string sentinel `Value::String("")` rather than erroring,
/// which is what DELETE replies look like.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    /// The HTTP status code.
    pub status: u16,
    /// Response headers, lowercased keys, first value wins.
    pub headers: HashMap<String, String>,
    body: Value,
}

impl ApiResponse {
    /// Builds a response, decoding `text` through the codec.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error when a non-empty body is not
    /// valid JSON.
    pub fn new(
        status: u16,
        headers: HashMap<String, String>,
        text: &str,
    ) -> Result<Self, serde_json::Error> {
        let body = if text.is_empty() {
            Value::String(String::new())
        } else {
            Value::decode(serde_json::from_str(text)?)
        };
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// Returns the decoded body.
    #[must_use]
    pub const fn json(&self) -> &Value {
        &self.body
    }

    /// Consumes the response, returning the decoded body.
    #[must_use]
    pub fn into_json(self) -> Value {
        self.body
    }

    /// Returns `true` if the status code is in the 2xx range.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status >= 200 && self.status <= 299
    }
}
