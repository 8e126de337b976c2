//! Error types for the Sequoia client.
//!
//! Two families live here: [`ConfigError`] for construction-time validation of
//! client configuration, and [`Error`] for everything that can go wrong while
//! talking to Sequoia services.
//!
//! # Error Handling
//!
//! Discovery and token acquisition normalize all of their failure shapes
//! (malformed payloads, non-2xx statuses, transport errors) into the dedicated
//! [`Error::DiscoveryServices`], [`Error::DiscoveryResources`], and
//! [`Error::UpdateToken`] kinds. Ordinary resource calls instead propagate
//! [`Error::Response`], [`Error::Json`], and [`Error::Network`] unmodified, so
//! callers can distinguish an API rejection from a dead network.

use thiserror::Error;

/// Errors that can occur while building a [`ClientConfig`](crate::ClientConfig).
///
/// All configuration newtypes validate on construction and report failures
/// through this enum with clear, actionable messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty. Please provide a valid Sequoia client ID.")]
    EmptyClientId,

    /// Client secret cannot be empty.
    #[error("Client secret cannot be empty. Please provide a valid Sequoia client secret.")]
    EmptyClientSecret,

    /// Registry URL is invalid.
    #[error("Invalid registry URL '{url}'. Please provide an absolute URL with scheme (e.g., 'https://registry.example.com').")]
    InvalidRegistryUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },
}

/// Errors returned by client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The named service is not present in the services registry.
    ///
    /// Either the name is wrong or the registry is stale for the current owner.
    #[error("Service '{name}' not found in the services registry.")]
    ServiceNotFound {
        /// The service name that failed to resolve.
        name: String,
    },

    /// The named resource is not declared by its service's descriptor.
    #[error("Resource '{name}' not found in the service's resources registry.")]
    ResourceNotFound {
        /// The resource name that failed to resolve.
        name: String,
    },

    /// An operation was invoked before the required path segment was bound.
    #[error("Request is not fully built: no {segment} has been bound yet.")]
    RequestNotBuilt {
        /// Which segment is missing ("service" or "resource").
        segment: &'static str,
    },

    /// The builder path already has both segments; it cannot be extended.
    #[error("Request is already fully built: a request path has at most a service and a resource.")]
    RequestAlreadyBuilt,

    /// Service discovery against the registry failed or returned a malformed
    /// document.
    #[error("Failed to discover services from the registry.")]
    DiscoveryServices,

    /// Resource discovery against a service descriptor failed or returned a
    /// malformed document.
    #[error("Failed to discover resources of service '{service}'.")]
    DiscoveryResources {
        /// The service whose descriptor could not be read.
        service: String,
    },

    /// Token acquisition from the identity service failed.
    #[error("Failed to update the authentication token from the identity service.")]
    UpdateToken,

    /// A request builder was requested before any services were discovered.
    #[error("Client is not initialized: no services have been discovered yet.")]
    ClientNotInitialized,

    /// The API answered with a non-2xx status code.
    #[error("Error {status} requesting ({method}) '{url}': {body}")]
    Response {
        /// The HTTP status code of the response.
        status: u16,
        /// The HTTP method of the failing request.
        method: String,
        /// The full URL of the failing request.
        url: String,
        /// The raw response body.
        body: String,
    },

    /// Network or connection error from the transport.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body was not valid JSON.
    #[error("Invalid JSON in response body: {0}")]
    Json(#[from] serde_json::Error),

    /// The response body did not match the resource envelope convention.
    #[error("Unexpected response payload: {reason}")]
    UnexpectedResponse {
        /// What was expected and not found.
        reason: String,
    },

    /// A URL could not be parsed or joined.
    #[error("Invalid URL: '{url}'")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
    },
}
