//! Configuration types for the Sequoia client.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`ClientConfig`]: the configuration struct consumed by [`Client`](crate::Client)
//! - [`ClientConfigBuilder`]: a builder for constructing [`ClientConfig`] instances
//! - [`ClientId`]: a validated client ID newtype
//! - [`ClientSecret`]: a validated client secret newtype with masked debug output
//! - [`RegistryUrl`]: a validated registry base URL
//!
//! # Example
//!
//! ```rust
//! use sequoia::{ClientConfig, ClientId, ClientSecret, RegistryUrl};
//!
//! let config = ClientConfig::builder()
//!     .client_id(ClientId::new("my-client").unwrap())
//!     .client_secret(ClientSecret::new("my-secret").unwrap())
//!     .registry_url(RegistryUrl::new("https://registry.example.com").unwrap())
//!     .owner("my-owner")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.owner(), Some("my-owner"));
//! ```

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

/// Default maximum number of attempts for a single request.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-request timeout for the general request path.
///
/// Discovery calls use their own, longer fixed ceiling
/// ([`DISCOVERY_TIMEOUT`](crate::registry::DISCOVERY_TIMEOUT)).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A validated Sequoia client ID.
///
/// # Example
///
/// ```rust
/// use sequoia::ClientId;
///
/// let id = ClientId::new("tool-qa-automation").unwrap();
/// assert_eq!(id.as_ref(), "tool-qa-automation");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientId(String);

impl ClientId {
    /// Creates a new validated client ID.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyClientId`] if the ID is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ConfigError::EmptyClientId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated Sequoia client secret.
///
/// # Security
///
/// The `Debug` implementation masks the secret value, displaying
/// `ClientSecret(*****)` instead of the actual secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecret(String);

impl ClientSecret {
    /// Creates a new validated client secret.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyClientSecret`] if the secret is empty.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::EmptyClientSecret);
        }
        Ok(Self(secret))
    }
}

impl AsRef<str> for ClientSecret {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientSecret(*****)")
    }
}

/// A validated base URL for the registry service.
///
/// Trailing slashes are stripped so paths can be appended uniformly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryUrl(String);

impl RegistryUrl {
    /// Creates a new validated registry URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRegistryUrl`] if the value is not an
    /// absolute URL.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        if reqwest::Url::parse(&url).is_err() {
            return Err(ConfigError::InvalidRegistryUrl { url });
        }
        Ok(Self(url.trim_end_matches('/').to_string()))
    }
}

impl AsRef<str> for RegistryUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Configuration for a Sequoia [`Client`](crate::Client).
///
/// Holds the credentials used for the client-credentials token grant, the
/// registry URL used for service discovery, the optional owner scope, and the
/// transport tuning knobs.
///
/// # Thread Safety
///
/// `ClientConfig` is `Clone`, `Send`, and `Sync`.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    client_id: ClientId,
    client_secret: ClientSecret,
    registry_url: RegistryUrl,
    owner: Option<String>,
    max_retries: u32,
    timeout: Option<Duration>,
}

// Verify ClientConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientConfig>();
};

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the client ID.
    #[must_use]
    pub const fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Returns the client secret.
    #[must_use]
    pub const fn client_secret(&self) -> &ClientSecret {
        &self.client_secret
    }

    /// Returns the registry URL.
    #[must_use]
    pub const fn registry_url(&self) -> &RegistryUrl {
        &self.registry_url
    }

    /// Returns the configured owner scope, if any.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Returns the maximum number of attempts per request.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the per-request timeout for the general request path.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Builder for constructing [`ClientConfig`] instances.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    client_id: Option<ClientId>,
    client_secret: Option<ClientSecret>,
    registry_url: Option<RegistryUrl>,
    owner: Option<String>,
    max_retries: Option<u32>,
    timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Sets the client ID (required).
    #[must_use]
    pub fn client_id(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Sets the client secret (required).
    #[must_use]
    pub fn client_secret(mut self, client_secret: ClientSecret) -> Self {
        self.client_secret = Some(client_secret);
        self
    }

    /// Sets the registry URL (required).
    #[must_use]
    pub fn registry_url(mut self, registry_url: RegistryUrl) -> Self {
        self.registry_url = Some(registry_url);
        self
    }

    /// Sets the owner scope sent with requests and used to select visible
    /// services.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Sets the maximum number of attempts per request.
    ///
    /// Defaults to [`DEFAULT_MAX_RETRIES`]. Only transient transport failures
    /// are retried, never HTTP error statuses.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets the per-request timeout for the general request path.
    ///
    /// Defaults to [`DEFAULT_TIMEOUT`].
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `client_id`,
    /// `client_secret`, or `registry_url` was not set.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let client_id = self
            .client_id
            .ok_or(ConfigError::MissingRequiredField { field: "client_id" })?;
        let client_secret = self.client_secret.ok_or(ConfigError::MissingRequiredField {
            field: "client_secret",
        })?;
        let registry_url = self.registry_url.ok_or(ConfigError::MissingRequiredField {
            field: "registry_url",
        })?;

        Ok(ClientConfig {
            client_id,
            client_secret,
            registry_url,
            owner: self.owner,
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            timeout: Some(self.timeout.unwrap_or(DEFAULT_TIMEOUT)),
        })
    }
}
