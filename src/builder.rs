//! Deferred request builder for Sequoia resources.
//!
//! A [`RequestBuilder`] accumulates a two-segment path (service, then
//! resource) and only resolves the names against the registry when an
//! operation runs. Every step consumes the builder and returns a new value, so
//! builders are freely reusable and composable; nothing is validated until an
//! HTTP verb fires.
//!
//! # Example
//!
//! ```rust,ignore
//! let item = client
//!     .resource("metadata", "contents")?
//!     .retrieve("1")
//!     .await?;
//!
//! let mut pages = client
//!     .resource("metadata", "contents")?
//!     .param("perPage", "2")
//!     .list();
//! while let Some(items) = pages.try_next().await? {
//!     for item in items {
//!         println!("{item:?}");
//!     }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

use reqwest::Url;

use crate::codec::Value;
use crate::error::Error;
use crate::http::{ApiRequest, ApiResponse, HttpClient, HttpMethod};
use crate::registry::{Resource, Service, ServicesRegistry};

/// The builder's path, growing one segment at a time.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Path {
    Unbound,
    Service(String),
    Resource { service: String, resource: String },
}

/// Helper for building requests to Sequoia services.
///
/// Obtained from [`Client::request`](crate::Client::request) or
/// [`Client::resource`](crate::Client::resource); borrows the client's
/// transport and services registry and snapshots its owner and token.
#[derive(Clone, Debug)]
pub struct RequestBuilder<'a> {
    http: &'a HttpClient,
    services: &'a ServicesRegistry,
    path: Path,
    owner: Option<String>,
    token: Option<String>,
    params: HashMap<String, String>,
    send_owner: bool,
    send_token: bool,
}

impl<'a> RequestBuilder<'a> {
    pub(crate) fn new(
        http: &'a HttpClient,
        services: &'a ServicesRegistry,
        owner: Option<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            http,
            services,
            path: Path::Unbound,
            owner,
            token,
            params: HashMap::new(),
            send_owner: true,
            send_token: true,
        }
    }

    /// Binds the next path segment: first the service name, then the resource
    /// name. Neither is resolved against the registry until an operation runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequestAlreadyBuilt`] when both segments are already
    /// bound.
    pub fn extend(mut self, name: impl Into<String>) -> Result<Self, Error> {
        self.path = match self.path {
            Path::Unbound => Path::Service(name.into()),
            Path::Service(service) => Path::Resource {
                service,
                resource: name.into(),
            },
            Path::Resource { .. } => return Err(Error::RequestAlreadyBuilt),
        };
        Ok(self)
    }

    /// Adds a query parameter sent with every operation of this builder.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Suppresses the `owner` query parameter for this builder's requests.
    #[must_use]
    pub const fn without_owner(mut self) -> Self {
        self.send_owner = false;
        self
    }

    /// Suppresses the `Authorization` header for this builder's requests.
    #[must_use]
    pub const fn without_token(mut self) -> Self {
        self.send_token = false;
        self
    }

    fn service_name(&self) -> Result<&str, Error> {
        match &self.path {
            Path::Unbound => Err(Error::RequestNotBuilt { segment: "service" }),
            Path::Service(service) | Path::Resource { service, .. } => Ok(service),
        }
    }

    fn resource_name(&self) -> Result<&str, Error> {
        match &self.path {
            Path::Unbound => Err(Error::RequestNotBuilt { segment: "service" }),
            Path::Service(_) => Err(Error::RequestNotBuilt {
                segment: "resource",
            }),
            Path::Resource { resource, .. } => Ok(resource),
        }
    }

    /// Resolves the bound service against the registry.
    fn service(&self) -> Result<&'a Service, Error> {
        self.services.get(self.service_name()?)
    }

    /// Resolves the bound resource, discovering the service's resources on
    /// first access.
    async fn resource(&self) -> Result<&'a Resource, Error> {
        let service = self.service()?;
        let resources = service.resources(self.http.reqwest()).await?;
        resources.get(self.resource_name()?)
    }

    fn service_base(&self) -> Result<Url, Error> {
        let service = self.service()?;
        Url::parse(service.url()).map_err(|_| Error::InvalidUrl {
            url: service.url().to_string(),
        })
    }

    /// Joins the resource path (and optional primary key) against the service
    /// base URL.
    async fn resource_url(&self, pk: Option<&str>) -> Result<(Url, &'a Resource), Error> {
        let resource = self.resource().await?;
        let mut path = resource.path.clone();
        if let Some(pk) = pk {
            path.push('/');
            path.push_str(pk);
        }
        let url = self.service_base()?.join(&path).map_err(|_| Error::InvalidUrl {
            url: path.clone(),
        })?;
        Ok((url, resource))
    }

    /// The one request primitive every operation funnels through.
    ///
    /// Query precedence, lowest first: injected owner, builder params, then
    /// `query` (the pagination cursor overrides everything).
    async fn request(
        &self,
        method: HttpMethod,
        url: Url,
        query: HashMap<String, String>,
        body: Option<Value>,
    ) -> Result<ApiResponse, Error> {
        let mut merged = HashMap::new();
        if self.send_owner {
            if let Some(owner) = &self.owner {
                merged.insert("owner".to_string(), owner.clone());
            }
        }
        merged.extend(self.params.clone());
        merged.extend(query);

        let mut request = ApiRequest::new(method, url).with_query(merged);
        if self.send_token {
            if let Some(token) = &self.token {
                request = request.with_header("Authorization", format!("Bearer {token}"));
            }
        }
        if let Some(body) = body {
            request = request.with_body(body);
        }

        self.http.send(request).await
    }

    /// Creates a new resource item.
    ///
    /// Sends `POST {resourcePath}` with the payload wrapped in the envelope
    /// `{"<wireName>": [body]}` and returns the single created item unwrapped
    /// from the one-element reply array.
    ///
    /// # Errors
    ///
    /// Fails with the builder protocol, lookup, transport, or envelope errors
    /// described in [`Error`].
    pub async fn create(&self, body: Value) -> Result<Value, Error> {
        let (url, resource) = self.resource_url(None).await?;
        let name = resource.name.clone();
        let envelope = wrap_envelope(&name, body);
        let response = self
            .request(HttpMethod::Post, url, HashMap::new(), Some(envelope))
            .await?;
        unwrap_single(response.into_json(), &name)
    }

    /// Retrieves a resource item by primary key via `GET {resourcePath}/{pk}`.
    ///
    /// # Errors
    ///
    /// Fails with the builder protocol, lookup, transport, or envelope errors
    /// described in [`Error`].
    pub async fn retrieve(&self, pk: &str) -> Result<Value, Error> {
        let (url, resource) = self.resource_url(Some(pk)).await?;
        let name = resource.name.clone();
        let response = self
            .request(HttpMethod::Get, url, HashMap::new(), None)
            .await?;
        unwrap_single(response.into_json(), &name)
    }

    /// Updates a resource item via `PUT {resourcePath}/{pk}`, using the same
    /// envelope convention as [`RequestBuilder::create`].
    ///
    /// # Errors
    ///
    /// Fails with the builder protocol, lookup, transport, or envelope errors
    /// described in [`Error`].
    pub async fn update(&self, pk: &str, body: Value) -> Result<Value, Error> {
        let (url, resource) = self.resource_url(Some(pk)).await?;
        let name = resource.name.clone();
        let envelope = wrap_envelope(&name, body);
        let response = self
            .request(HttpMethod::Put, url, HashMap::new(), Some(envelope))
            .await?;
        unwrap_single(response.into_json(), &name)
    }

    /// Deletes a resource item via `DELETE {resourcePath}/{pk}`.
    ///
    /// # Errors
    ///
    /// Fails with the builder protocol, lookup, or transport errors described
    /// in [`Error`].
    pub async fn delete(&self, pk: &str) -> Result<(), Error> {
        let (url, _) = self.resource_url(Some(pk)).await?;
        self.request(HttpMethod::Delete, url, HashMap::new(), None)
            .await?;
        Ok(())
    }

    /// Starts a paginated collection read.
    ///
    /// The first request always carries `continue=true`; each page's
    /// `meta.continue` cursor feeds the next request until it is absent. See
    /// [`Pages`].
    #[must_use]
    pub fn list(&self) -> Pages<'a> {
        Pages::new(self.clone())
    }

    /// Sends a request against a custom path joined to the bound service's
    /// base URL, bypassing resource binding.
    ///
    /// # Errors
    ///
    /// Requires the service segment to be bound
    /// ([`Error::RequestNotBuilt`] otherwise); transport errors propagate as
    /// described in [`Error`].
    pub async fn custom(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, Error> {
        let url = self.service_base()?.join(path).map_err(|_| Error::InvalidUrl {
            url: path.to_string(),
        })?;
        let response = self.request(method, url, HashMap::new(), body).await?;
        Ok(response.into_json())
    }
}

/// Wraps a payload in the resource envelope `{"<name>": [body]}`.
fn wrap_envelope(name: &str, body: Value) -> Value {
    let mut entries = BTreeMap::new();
    entries.insert(name.to_string(), Value::Array(vec![body]));
    Value::Object(entries)
}

/// Unwraps the single item from a one-element envelope array.
fn unwrap_single(response: Value, name: &str) -> Result<Value, Error> {
    let Value::Object(mut entries) = response else {
        return Err(Error::UnexpectedResponse {
            reason: "expected an object payload".to_string(),
        });
    };
    let Some(Value::Array(mut items)) = entries.remove(name) else {
        return Err(Error::UnexpectedResponse {
            reason: format!("expected an array under '{name}'"),
        });
    };
    if items.is_empty() {
        return Err(Error::UnexpectedResponse {
            reason: format!("expected one item under '{name}', got none"),
        });
    }
    Ok(items.remove(0))
}

enum PageState {
    Initial,
    Next(Url),
    Done,
}

/// A lazy, cursor-following paginator over a collection.
///
/// Each call to [`Pages::try_next`] issues one request and yields that page's
/// items in order. When a page carries a `meta.continue` cursor (a relative
/// URL), its query parameters are merged over the accumulated ones (cursor
/// parameters win on conflict) and the next request targets the cursor path
/// with no query in the URL itself. An absent or falsy cursor ends the
/// sequence.
pub struct Pages<'a> {
    builder: RequestBuilder<'a>,
    params: HashMap<String, String>,
    state: PageState,
}

impl<'a> Pages<'a> {
    fn new(builder: RequestBuilder<'a>) -> Self {
        let mut params = HashMap::new();
        params.insert("continue".to_string(), "true".to_string());
        Self {
            builder,
            params,
            state: PageState::Initial,
        }
    }

    /// Fetches the next page, returning `Ok(None)` once the cursor is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Fails with the builder protocol, lookup, transport, or envelope errors
    /// described in [`Error`].
    pub async fn try_next(&mut self) -> Result<Option<Vec<Value>>, Error> {
        let url = match &self.state {
            PageState::Done => return Ok(None),
            PageState::Initial => self.builder.resource_url(None).await?.0,
            PageState::Next(url) => url.clone(),
        };

        let resource = self.builder.resource().await?;
        let response = self
            .builder
            .request(HttpMethod::Get, url, self.params.clone(), None)
            .await?;

        let Value::Object(mut entries) = response.into_json() else {
            return Err(Error::UnexpectedResponse {
                reason: "expected an object payload".to_string(),
            });
        };
        let Some(Value::Array(items)) = entries.remove(&resource.name) else {
            return Err(Error::UnexpectedResponse {
                reason: format!("expected an array under '{}'", resource.name),
            });
        };

        let cursor = entries
            .get("meta")
            .and_then(|meta| meta.get("continue"))
            .and_then(Value::as_str)
            .filter(|cursor| !cursor.is_empty())
            .map(str::to_string);

        self.state = match cursor {
            Some(cursor) => {
                let joined =
                    self.builder
                        .service_base()?
                        .join(&cursor)
                        .map_err(|_| Error::InvalidUrl {
                            url: cursor.clone(),
                        })?;
                for (key, value) in joined.query_pairs() {
                    self.params.insert(key.into_owned(), value.into_owned());
                }
                let mut next = joined;
                next.set_query(None);
                PageState::Next(next)
            }
            None => PageState::Done,
        };

        Ok(Some(items))
    }

    /// Drains the remaining pages into a flat item list.
    ///
    /// # Errors
    ///
    /// Fails with the first error of any underlying page fetch.
    pub async fn collect_items(mut self) -> Result<Vec<Value>, Error> {
        let mut all = Vec::new();
        while let Some(items) = self.try_next().await? {
            all.extend(items);
        }
        Ok(all)
    }
}
