//! HTTP transport layer for the Sequoia client.
//!
//! This module wraps `reqwest` with the Sequoia wire conventions: the fixed
//! Piksel content headers, body encoding/decoding through the
//! [codec](crate::codec), structured non-2xx errors, and count-bounded retry
//! of transient transport failures.

mod client;
mod request;
mod response;

pub use client::HttpClient;
pub use request::{ApiRequest, HttpMethod};
pub use response::ApiResponse;
