//! Saleor checkout authentication client.
//!
//! Every GraphQL operation the checkout issues goes through
//! [`SaleorAuthClient`]. The client keeps the access token in memory, persists
//! the refresh token through a [`Storage`] backend, refreshes expired access
//! tokens with at most one refresh call in flight, and keeps the `signedIn` /
//! `signedOut` state in sync across every context that shares the storage.
//!
//! # Components
//!
//! - [`storage`] - Key/value backends and the auth-specific [`AuthStorage`] handler
//! - [`events`] - Cross-context storage events and the [`AuthStateBridge`]
//! - [`refresh`] - Single-flight token refresh coordination
//! - [`client`] - The authenticated fetch facade
//! - [`observer`] - Refresh start/settle callbacks for loading indicators
//! - [`graphql`] - Request/response envelopes and the auth mutations
//!
//! # Example
//!
//! ```rust,ignore
//! use saleor_checkout_auth::{AuthClientConfig, MemoryStorage, SaleorAuthClient};
//!
//! let storage = MemoryStorage::new();
//! let client = SaleorAuthClient::builder(config, Arc::new(storage.clone()))
//!     .event_source(Arc::new(storage))
//!     .on_auth_refresh(|refreshing| tracing::info!(refreshing, "auth refresh"))
//!     .build()?;
//!
//! client.sign_in(&TokenCreateVariables::new("user@example.com", password)).await?;
//! let products: GraphQLResponse<Products> = client.execute(&request).await?;
//!
//! client.cleanup();
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod graphql;
pub mod observer;
pub mod refresh;
pub mod storage;

pub use client::{SaleorAuthClient, SaleorAuthClientBuilder};
pub use config::{AuthClientConfig, ConfigError};
pub use error::{AuthClientError, StorageError};
pub use events::{
    AuthStateBridge, ContextId, StorageEvent, StorageEventSource, StorageListener, SubscriptionId,
};
pub use graphql::{GraphQLError, GraphQLRequest, GraphQLResponse};
pub use observer::AuthRefreshObserver;
pub use refresh::RefreshState;
pub use storage::{AuthStorage, FileStorage, MemoryStorage, Storage, StorageKeys};

pub use saleor_checkout_core::{AccessToken, AuthState, CheckoutId, RefreshToken};
