//! Client for interacting with Sequoia services.
//!
//! The [`Client`] owns the credentials, the current bearer token, the owner
//! scope, and the services registry, and is the entry point producing
//! [`RequestBuilder`](crate::RequestBuilder)s.
//!
//! # Example
//!
//! ```rust,ignore
//! use sequoia::{Client, ClientConfig, ClientId, ClientSecret, RegistryUrl};
//!
//! let config = ClientConfig::builder()
//!     .client_id(ClientId::new("tool-qa-automation")?)
//!     .client_secret(ClientSecret::new("secret")?)
//!     .registry_url(RegistryUrl::new("https://registry.example.com")?)
//!     .owner("my-owner")
//!     .build()?;
//!
//! let client = Client::connect(config).await?;
//! let item = client.resource("metadata", "contents")?.retrieve("1").await?;
//! ```

use std::future::Future;
use std::pin::Pin;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;

use crate::builder::RequestBuilder;
use crate::config::ClientConfig;
use crate::error::Error;
use crate::http::HttpClient;
use crate::registry::{ResourcesRegistry, ServicesRegistry};

/// Wire shape of the identity service's token reply.
#[derive(Debug, Deserialize)]
struct TokenDoc {
    access_token: String,
}

/// Client for interacting with Sequoia services.
///
/// Long-lived; owns the credentials, the current bearer token (if any), the
/// owner scope, the discovered [`ServicesRegistry`], and the shared transport.
/// Builders produced by [`Client::request`] snapshot the current owner and
/// token, so independent builder chains can run concurrently while the client
/// itself is only mutated through `&mut self` lifecycle methods.
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    http: HttpClient,
    owner: Option<String>,
    token: Option<String>,
    services: ServicesRegistry,
}

impl Client {
    /// Creates a client without performing any I/O.
    ///
    /// Call [`Client::open`] (or use [`Client::connect`]) to discover services
    /// and acquire a token before issuing requests.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let http = HttpClient::new(config.max_retries(), config.timeout());
        let owner = config.owner().map(str::to_string);
        Self {
            config,
            http,
            owner,
            token: None,
            services: ServicesRegistry::new(),
        }
    }

    /// Creates a client and opens it: discovers services and acquires a
    /// token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DiscoveryServices`] or [`Error::UpdateToken`] when
    /// either bootstrap step fails.
    pub async fn connect(config: ClientConfig) -> Result<Self, Error> {
        let mut client = Self::new(config);
        client.open().await?;
        Ok(client)
    }

    /// Discovers services and acquires a bearer token. Both must succeed
    /// before requests can be made.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DiscoveryServices`] or [`Error::UpdateToken`] when
    /// either step fails.
    pub async fn open(&mut self) -> Result<(), Error> {
        self.update_services().await?;
        self.update_token().await
    }

    /// Refreshes the services registry for the current owner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DiscoveryServices`] on any discovery failure; the
    /// previous registry contents are left untouched in that case.
    pub async fn update_services(&mut self) -> Result<(), Error> {
        self.services
            .discover(
                self.http.reqwest(),
                self.config.registry_url().as_ref(),
                self.owner.as_deref(),
            )
            .await
    }

    /// Requests a new bearer token from the identity service.
    ///
    /// Sends a client-credentials grant with Basic authentication to
    /// `{identityUrl}/oauth/token/`. The `identity` service must already be in
    /// the registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceNotFound`] when no `identity` service has been
    /// discovered, and [`Error::UpdateToken`] when the token endpoint is
    /// unreachable or its reply has no `access_token`.
    pub async fn update_token(&mut self) -> Result<(), Error> {
        let identity = self.services.get("identity")?;
        let url = format!("{}/oauth/token/", identity.url());
        let credentials = STANDARD.encode(format!(
            "{}:{}",
            self.config.client_id().as_ref(),
            self.config.client_secret().as_ref()
        ));

        let result = async {
            self.http
                .reqwest()
                .post(&url)
                .header("Authorization", format!("Basic {credentials}"))
                .form(&[("grant_type", "client_credentials")])
                .send()
                .await?
                .error_for_status()?
                .json::<TokenDoc>()
                .await
        }
        .await;

        match result {
            Ok(doc) => {
                self.token = Some(doc.access_token);
                Ok(())
            }
            Err(source) => {
                tracing::error!(
                    error = %source,
                    "wrong response retrieving token from 'identity'",
                );
                Err(Error::UpdateToken)
            }
        }
    }

    /// Sets the owner scope and refreshes the services registry, since the
    /// owner selects which services are visible.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DiscoveryServices`] when re-discovery fails.
    pub async fn set_owner(&mut self, owner: impl Into<String>) -> Result<(), Error> {
        self.owner = Some(owner.into());
        self.update_services().await
    }

    /// Returns the current owner scope, if any.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Returns the current bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns the discovered services registry.
    #[must_use]
    pub const fn services(&self) -> &ServicesRegistry {
        &self.services
    }

    /// Returns the resources of the named service, discovering them on first
    /// access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceNotFound`] for unknown services and
    /// [`Error::DiscoveryResources`] when the descriptor cannot be read.
    pub async fn resources(&self, service: &str) -> Result<&ResourcesRegistry, Error> {
        self.services
            .get(service)?
            .resources(self.http.reqwest())
            .await
    }

    /// Creates a fresh, unbound request builder seeded with the current
    /// owner and token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientNotInitialized`] before any services have been
    /// discovered.
    pub fn request(&self) -> Result<RequestBuilder<'_>, Error> {
        if self.services.is_empty() {
            return Err(Error::ClientNotInitialized);
        }
        Ok(RequestBuilder::new(
            &self.http,
            &self.services,
            self.owner.clone(),
            self.token.clone(),
        ))
    }

    /// Convenience for `request()?.extend(service)?.extend(resource)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClientNotInitialized`] before any services have been
    /// discovered.
    pub fn resource(&self, service: &str, resource: &str) -> Result<RequestBuilder<'_>, Error> {
        self.request()?.extend(service)?.extend(resource)
    }

    /// Clears the token, owner, and registry contents. The transport pool is
    /// released when the client is dropped.
    pub fn close(&mut self) {
        self.token = None;
        self.owner = None;
        self.services.clear();
    }

    /// Runs a scoped session: opens the client, runs `f`, then closes the
    /// client regardless of the outcome of `f`.
    ///
    /// The closure receives `&mut Client` and must return a boxed future
    /// borrowing it:
    ///
    /// ```rust,ignore
    /// let items = client
    ///     .session(|client| {
    ///         Box::pin(async move {
    ///             client
    ///                 .resource("metadata", "contents")?
    ///                 .list()
    ///                 .collect_items()
    ///                 .await
    ///         })
    ///     })
    ///     .await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the opening error when discovery or token acquisition fails
    /// (the body does not run and the client is not cleared), otherwise the
    /// body's own result.
    pub async fn session<T, F>(&mut self, f: F) -> Result<T, Error>
    where
        F: for<'a> FnOnce(
            &'a mut Self,
        ) -> Pin<Box<dyn Future<Output = Result<T, Error>> + 'a>>,
    {
        self.open().await?;
        let result = f(self).await;
        self.close();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientId, ClientSecret, RegistryUrl};
    use crate::registry::Service;

    fn build_config() -> ClientConfig {
        ClientConfig::builder()
            .client_id(ClientId::new("test-client").unwrap())
            .client_secret(ClientSecret::new("test-secret").unwrap())
            .registry_url(RegistryUrl::new("https://registry.example.com").unwrap())
            .owner("acme")
            .build()
            .unwrap()
    }

    #[test]
    fn test_new_client_takes_owner_from_config() {
        let client = Client::new(build_config());
        assert_eq!(client.owner(), Some("acme"));
        assert!(client.token().is_none());
        assert!(client.services().is_empty());
    }

    #[test]
    fn test_builder_before_discovery_is_not_initialized() {
        let client = Client::new(build_config());
        assert!(matches!(client.request(), Err(Error::ClientNotInitialized)));
    }

    #[test]
    fn test_close_clears_token_owner_and_registry() {
        let mut client = Client::new(build_config());
        client.token = Some("token".to_string());
        client
            .services
            .insert(Service::new("metadata", "http://metadata.example.com"));

        client.close();

        assert!(client.token().is_none());
        assert!(client.owner().is_none());
        assert!(client.services().is_empty());
    }
}
