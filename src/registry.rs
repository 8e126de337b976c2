//! In-memory model of discovered Sequoia services and their resources.
//!
//! Discovery is two-level: the registry service lists which [`Service`]s exist
//! for an owner, and each service's descriptor endpoint lists its
//! [`Resource`]s. The [`ServicesRegistry`] is replaced wholesale on each
//! refresh; per-service resources are fetched once on first access and cached
//! for the service's lifetime.

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;

/// Fixed timeout ceiling for discovery calls, distinct from (and longer than)
/// the general request path.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(60);

/// A resource exposed by a Sequoia service.
///
/// `name` is the plural, API-facing collection key used in request/response
/// envelopes; `path` is the URL path of the collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    /// The wire name (plural) keying payload envelopes.
    pub name: String,
    /// The URL path segment of the collection.
    pub path: String,
}

/// Mapping of a service's resources by underscored hyphenated name.
#[derive(Debug, Default)]
pub struct ResourcesRegistry {
    resources: BTreeMap<String, Resource>,
}

impl ResourcesRegistry {
    /// Looks a resource up by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceNotFound`] when the name is not declared by
    /// the service's descriptor.
    pub fn get(&self, name: &str) -> Result<&Resource, Error> {
        self.resources.get(name).ok_or_else(|| Error::ResourceNotFound {
            name: name.to_string(),
        })
    }

    /// Iterates over the resources in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.resources
            .iter()
            .map(|(name, resource)| (name.as_str(), resource))
    }

    /// Returns the number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns `true` if no resources have been discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// A service's discovered metadata and resources.
#[derive(Debug)]
struct Descriptor {
    title: String,
    description: String,
    resources: ResourcesRegistry,
}

/// Wire shape of `GET {serviceUrl}/descriptor/raw/`.
#[derive(Debug, Deserialize)]
struct DescriptorDoc {
    title: String,
    description: String,
    resourcefuls: BTreeMap<String, ResourcefulDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourcefulDoc {
    plural_name: String,
    hyphenated_plural_name: String,
    path: String,
}

/// A Sequoia service discovered through the registry.
///
/// Identity is the service name. The resource set is populated at most once
/// per instance, on first access; `title` and `description` become available
/// after that discovery.
#[derive(Debug)]
pub struct Service {
    name: String,
    url: String,
    descriptor: OnceLock<Descriptor>,
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.url == other.url
    }
}

impl Eq for Service {}

impl Service {
    /// Creates a not-yet-discovered service entry.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            descriptor: OnceLock::new(),
        }
    }

    /// Returns the service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the service base URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the service title, once discovered.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.descriptor.get().map(|d| d.title.as_str())
    }

    /// Returns the service description, once discovered.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.descriptor.get().map(|d| d.description.as_str())
    }

    /// Returns this service's resources, discovering them on first access.
    ///
    /// Concurrent first accesses may fetch the descriptor more than once;
    /// the first completed fetch wins and later ones are discarded. Subsequent
    /// calls are free.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DiscoveryResources`] when the descriptor endpoint is
    /// unreachable or its document is malformed.
    pub async fn resources(&self, http: &reqwest::Client) -> Result<&ResourcesRegistry, Error> {
        if let Some(descriptor) = self.descriptor.get() {
            return Ok(&descriptor.resources);
        }
        let descriptor = self.discover(http).await?;
        Ok(&self.descriptor.get_or_init(|| descriptor).resources)
    }

    /// Fetches and interprets the service descriptor.
    async fn discover(&self, http: &reqwest::Client) -> Result<Descriptor, Error> {
        let url = format!("{}/descriptor/raw/", self.url);
        let result = async {
            http.get(&url)
                .timeout(DISCOVERY_TIMEOUT)
                .send()
                .await?
                .error_for_status()?
                .json::<DescriptorDoc>()
                .await
        }
        .await;

        let doc = result.map_err(|source| {
            tracing::error!(
                service = %self.name,
                error = %source,
                "wrong response retrieving description of service",
            );
            Error::DiscoveryResources {
                service: self.name.clone(),
            }
        })?;

        let resources = doc
            .resourcefuls
            .into_values()
            .map(|resourceful| {
                let key = resourceful.hyphenated_plural_name.replace('-', "_");
                let resource = Resource {
                    name: resourceful.plural_name,
                    path: format!(
                        "{}/{}",
                        resourceful.path, resourceful.hyphenated_plural_name
                    ),
                };
                (key, resource)
            })
            .collect();

        Ok(Descriptor {
            title: doc.title,
            description: doc.description,
            resources: ResourcesRegistry { resources },
        })
    }
}

/// Wire shape of `GET {registryUrl}/services/{owner}/`.
#[derive(Debug, Deserialize)]
struct ServicesDoc {
    services: Vec<ServiceEntry>,
}

#[derive(Debug, Deserialize)]
struct ServiceEntry {
    name: String,
    location: String,
}

/// Mapping of available services by name, sorted by name.
///
/// The registry is the single source of truth for service base URLs. Each
/// [`ServicesRegistry::discover`] call replaces the contents entirely; there
/// is no partial merge.
#[derive(Debug, Default)]
pub struct ServicesRegistry {
    services: BTreeMap<String, Service>,
}

impl ServicesRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks a service up by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ServiceNotFound`] when the name is not in the
    /// registry.
    pub fn get(&self, name: &str) -> Result<&Service, Error> {
        self.services.get(name).ok_or_else(|| Error::ServiceNotFound {
            name: name.to_string(),
        })
    }

    /// Adds a service entry directly, mainly useful for tests and stubbing.
    pub fn insert(&mut self, service: Service) {
        self.services.insert(service.name().to_string(), service);
    }

    /// Iterates over the services in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Service)> {
        self.services
            .iter()
            .map(|(name, service)| (name.as_str(), service))
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if no services have been discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.services.clear();
    }

    /// Refreshes the registry from `GET {registryUrl}/services/{owner|"root"}/`.
    ///
    /// On success the previous contents are fully replaced. On failure the
    /// previous contents are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DiscoveryServices`] when the registry endpoint is
    /// unreachable or its document is malformed.
    pub async fn discover(
        &mut self,
        http: &reqwest::Client,
        registry_url: &str,
        owner: Option<&str>,
    ) -> Result<(), Error> {
        let url = format!("{registry_url}/services/{}/", owner.unwrap_or("root"));
        let result = async {
            http.get(&url)
                .timeout(DISCOVERY_TIMEOUT)
                .send()
                .await?
                .error_for_status()?
                .json::<ServicesDoc>()
                .await
        }
        .await;

        let doc = result.map_err(|source| {
            tracing::error!(
                error = %source,
                "wrong response retrieving list of services from 'registry'",
            );
            Error::DiscoveryServices
        })?;

        self.services = doc
            .services
            .into_iter()
            .map(|entry| (entry.name.clone(), Service::new(entry.name, entry.location)))
            .collect();
        Ok(())
    }
}
