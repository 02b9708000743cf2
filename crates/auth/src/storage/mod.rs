//! Token storage.
//!
//! [`Storage`] is a synchronous string key/value store with browser
//! `localStorage` semantics: no operation fails, and a missing key reads as
//! `None`. [`AuthStorage`] layers the auth-specific keys on top and emits a
//! local notification whenever the auth state is written.
//!
//! # Backends
//!
//! - [`MemoryStorage`] - shared in-process area with per-context handles and
//!   change events, for tests and multi-context embedding
//! - [`FileStorage`] - JSON file, for the CLI

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::sync::Arc;

use saleor_checkout_core::{AuthState, RefreshToken};
use tokio::sync::broadcast;

/// Storage key of the persisted auth state.
pub const STORAGE_AUTH_STATE_KEY: &str = "saleor_auth_module_auth_state";

/// Storage key of the persisted refresh token.
pub const STORAGE_REFRESH_TOKEN_KEY: &str = "saleor_auth_module_refresh_token";

/// Capacity of the local auth-state notification channel.
const AUTH_STATE_CHANNEL_CAPACITY: usize = 16;

/// A synchronous string key/value store.
pub trait Storage: Send + Sync {
    /// Read a value.
    fn get_item(&self, key: &str) -> Option<String>;
    /// Write a value.
    fn set_item(&self, key: &str, value: &str);
    /// Delete a value. Deleting a missing key is a no-op.
    fn remove_item(&self, key: &str);
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get_item(&self, key: &str) -> Option<String> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) {
        (**self).set_item(key, value);
    }

    fn remove_item(&self, key: &str) {
        (**self).remove_item(key);
    }
}

/// The storage keys used for auth data.
///
/// With a prefix, keys become `"{prefix}+{key}"`, so clients for different
/// API URLs can share one store without sharing sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    auth_state: String,
    refresh_token: String,
}

impl StorageKeys {
    /// Keys with an optional prefix.
    #[must_use]
    pub fn new(prefix: Option<&str>) -> Self {
        let key = |name: &str| prefix.map_or_else(|| name.to_string(), |p| format!("{p}+{name}"));
        Self {
            auth_state: key(STORAGE_AUTH_STATE_KEY),
            refresh_token: key(STORAGE_REFRESH_TOKEN_KEY),
        }
    }

    /// Key of the auth state.
    #[must_use]
    pub fn auth_state(&self) -> &str {
        &self.auth_state
    }

    /// Key of the refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Auth-specific view of a [`Storage`].
///
/// Owns the local auth-state channel: every [`set_auth_state`] and every
/// state forwarded by the [`AuthStateBridge`](crate::AuthStateBridge) is
/// delivered to [`subscribe`] receivers.
///
/// [`set_auth_state`]: AuthStorage::set_auth_state
/// [`subscribe`]: AuthStorage::subscribe
pub struct AuthStorage {
    storage: Arc<dyn Storage>,
    keys: StorageKeys,
    events: broadcast::Sender<AuthState>,
}

impl AuthStorage {
    /// Wrap a storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, keys: StorageKeys) -> Self {
        let (events, _) = broadcast::channel(AUTH_STATE_CHANNEL_CAPACITY);
        Self {
            storage,
            keys,
            events,
        }
    }

    /// The keys this handler reads and writes.
    #[must_use]
    pub const fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// The persisted refresh token. Empty values read as `None`.
    #[must_use]
    pub fn get_refresh_token(&self) -> Option<RefreshToken> {
        self.storage
            .get_item(self.keys.refresh_token())
            .filter(|token| !token.is_empty())
            .map(RefreshToken::new)
    }

    /// Persist a refresh token.
    pub fn set_refresh_token(&self, token: &RefreshToken) {
        self.storage
            .set_item(self.keys.refresh_token(), token.expose());
    }

    /// The persisted auth state; missing or unknown values are `SignedOut`.
    #[must_use]
    pub fn get_auth_state(&self) -> AuthState {
        AuthState::from_stored(self.storage.get_item(self.keys.auth_state()).as_deref())
    }

    /// Persist the auth state and notify local subscribers.
    pub fn set_auth_state(&self, state: AuthState) {
        self.storage.set_item(self.keys.auth_state(), state.as_str());
        self.send_auth_state_event(state);
    }

    /// Notify local subscribers without writing to storage.
    pub fn send_auth_state_event(&self, state: AuthState) {
        tracing::debug!(auth_state = %state, "auth state changed");
        // No receivers is fine.
        let _ = self.events.send(state);
    }

    /// Receive auth-state notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthState> {
        self.events.subscribe()
    }

    /// Remove the refresh token and mark the session signed out.
    pub fn clear_auth_storage(&self) {
        self.storage.remove_item(self.keys.refresh_token());
        self.set_auth_state(AuthState::SignedOut);
    }
}

impl std::fmt::Debug for AuthStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStorage")
            .field("keys", &self.keys)
            .field("subscribers", &self.events.receiver_count())
            .finish_non_exhaustive()
    }
}
