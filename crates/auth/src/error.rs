//! Error types for the auth client.
//!
//! Authentication failures (bad credentials, rejected refresh tokens) are not
//! errors at this layer: they degrade the session to `signedOut` and the
//! caller inspects the GraphQL response. Only transport, decoding, storage and
//! configuration problems surface as [`AuthClientError`].

use std::sync::Arc;

use thiserror::Error;

use crate::config::ConfigError;
use crate::graphql::{GraphQLError, format_graphql_errors};

/// Errors that can occur when talking to the Saleor API.
#[derive(Debug, Error)]
pub enum AuthClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The shared token refresh call failed before the backend answered.
    ///
    /// Every request waiting on the same refresh receives the same error.
    #[error("Token refresh request failed: {0}")]
    Refresh(Arc<reqwest::Error>),

    /// The refresh task ended without settling (panic or runtime shutdown).
    #[error("Token refresh was interrupted")]
    RefreshInterrupted,

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON encoding or parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Token storage could not be opened.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors that can occur when opening a persistent [`Storage`](crate::Storage).
///
/// Reads and writes on an open store never fail; see
/// [`FileStorage`](crate::FileStorage).
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a JSON object of strings.
    #[error("Corrupt storage file: {0}")]
    Corrupt(#[from] serde_json::Error),
}
