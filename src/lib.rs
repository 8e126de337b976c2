//! # Sequoia Client
//!
//! An async Rust client for the Piksel Sequoia service family, providing
//! runtime service and resource discovery, authenticated request building,
//! and cursor-following pagination.
//!
//! ## Overview
//!
//! Sequoia exposes a registry of services, each advertising its resources via
//! a self-describing descriptor endpoint. Nothing is configured statically:
//! the client discovers which services exist for an owner, lazily discovers
//! each service's resources on first use, and validates the names a caller
//! addresses only when a request fires.
//!
//! This crate provides:
//! - Type-safe configuration via [`ClientConfig`] and its builder
//! - Two-level lazy discovery: [`ServicesRegistry`] and per-service
//!   [`ResourcesRegistry`] caches
//! - An immutable, copy-on-extend [`RequestBuilder`] with
//!   create/retrieve/update/delete/list/custom operations
//! - Transparent cursor pagination via [`Pages`]
//! - A JSON codec ([`Value`]) with typed ISO-8601 date-time and duration
//!   leaves
//! - Bearer token lifecycle management through the client-credentials grant
//!
//! ## Quick Start
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
//!
//! // Retrieve a single item.
//! let item = client.resource("metadata", "contents")?.retrieve("1").await?;
//!
//! // Follow pagination cursors transparently.
//! let mut pages = client.resource("metadata", "contents")?.list();
//! while let Some(items) = pages.try_next().await? {
//!     for item in items {
//!         println!("{item:?}");
//!     }
//! }
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: configuration is instance-based and passed
//!   explicitly; logging goes through the `tracing` dispatcher
//! - **Deferred validation**: builder paths bind names cheaply and resolve
//!   them against the registry only when an operation runs
//! - **Immutable builders**: every builder step returns a new value, so
//!   chains are reusable and safe to run concurrently
//! - **Async-first**: designed for use with the Tokio runtime

pub mod builder;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod registry;

// Re-export public types at crate root for convenience
pub use builder::{Pages, RequestBuilder};
pub use client::Client;
pub use codec::{Duration, Value};
pub use config::{ClientConfig, ClientConfigBuilder, ClientId, ClientSecret, RegistryUrl};
pub use error::{ConfigError, Error};
pub use http::{ApiRequest, ApiResponse, HttpClient, HttpMethod};
pub use registry::{Resource, ResourcesRegistry, Service, ServicesRegistry};
