//! CLI commands.
//!
//! Every command shares one [`SaleorAuthClient`] backed by a [`FileStorage`]
//! session file.

pub mod query;
pub mod session;

use std::path::Path;
use std::sync::Arc;

use saleor_checkout_auth::graphql::types::MutationError;
use saleor_checkout_auth::{
    AuthClientConfig, AuthClientError, ConfigError, FileStorage, GraphQLError, SaleorAuthClient,
    StorageError,
};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Client configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The session file could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Request to the Saleor API failed.
    #[error(transparent)]
    Client(#[from] AuthClientError),

    /// Reading the GraphQL document failed.
    #[error("Failed to read {0}: {1}")]
    Read(String, std::io::Error),

    /// Variables or response could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend refused the operation.
    #[error("{operation} rejected: {reasons}")]
    Rejected {
        operation: &'static str,
        reasons: String,
    },
}

/// Build the auth client from the environment and the session file.
///
/// # Errors
///
/// Returns `CommandError` if configuration is missing, the session file is
/// unreadable, or the HTTP client cannot be built.
pub fn open_client(storage_path: &Path) -> Result<SaleorAuthClient, CommandError> {
    let config = AuthClientConfig::from_env()?;
    let storage = Arc::new(FileStorage::open(storage_path)?);

    tracing::debug!(
        api_url = %config.api_url,
        storage = %storage_path.display(),
        "opening session"
    );

    let client = SaleorAuthClient::builder(config, storage)
        .on_auth_refresh(|refreshing: bool| {
            if refreshing {
                tracing::info!("Refreshing access token...");
            } else {
                tracing::info!("Token refresh finished");
            }
        })
        .build()?;

    Ok(client)
}

/// A one-line summary of why the backend refused an operation.
fn rejection_reasons(mutation_errors: &[MutationError], graphql_errors: &[GraphQLError]) -> String {
    let reasons: Vec<String> = mutation_errors
        .iter()
        .map(|e| match &e.message {
            Some(message) => format!("{} ({message})", e.code),
            None => e.code.clone(),
        })
        .chain(graphql_errors.iter().map(|e| e.message.clone()))
        .collect();

    if reasons.is_empty() {
        "no token returned".to_string()
    } else {
        reasons.join("; ")
    }
}
