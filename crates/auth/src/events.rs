//! Cross-context auth state synchronization.
//!
//! A storage shared by several contexts (browser tabs, or handles of one
//! [`MemoryStorage`](crate::MemoryStorage) area) reports every write as a
//! [`StorageEvent`]. The [`AuthStateBridge`] listens for writes to the
//! auth-state key made by *other* contexts and re-emits the new state as a
//! local notification, so every context converges on the same
//! `signedIn`/`signedOut` value without reloading.

use std::sync::{Arc, Mutex, PoisonError};

use saleor_checkout_core::AuthState;
use uuid::Uuid;

use crate::storage::AuthStorage;

/// Identifies one storage context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    /// A fresh random context ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A change made to a shared storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Changed key; `None` when the whole storage was cleared.
    pub key: Option<String>,
    /// Value before the change.
    pub old_value: Option<String>,
    /// Value after the change; `None` when the key was removed.
    pub new_value: Option<String>,
    /// Context that made the change.
    pub source: ContextId,
}

/// Callback invoked for each [`StorageEvent`].
pub type StorageListener = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

/// Handle for removing a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// A source of storage change notifications.
///
/// Implementations deliver events synchronously, in write order.
pub trait StorageEventSource: Send + Sync {
    /// The context writes through this handle are attributed to.
    fn context_id(&self) -> ContextId;

    /// Register a listener.
    fn subscribe(&self, listener: StorageListener) -> SubscriptionId;

    /// Remove a listener. Unknown IDs are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Forwards auth-state changes made in other contexts to local subscribers.
pub struct AuthStateBridge {
    source: Arc<dyn StorageEventSource>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl AuthStateBridge {
    /// Subscribe to `source` and forward qualifying events to `storage`.
    #[must_use]
    pub fn attach(source: Arc<dyn StorageEventSource>, storage: Arc<AuthStorage>) -> Self {
        let own_context = source.context_id();
        let auth_state_key = storage.keys().auth_state().to_owned();

        let listener: StorageListener = Arc::new(move |event: &StorageEvent| {
            if let Some(state) = foreign_auth_state(event, &auth_state_key, own_context) {
                storage.send_auth_state_event(state);
            }
        });

        let subscription = source.subscribe(listener);
        tracing::debug!(context = %own_context, "auth state bridge attached");

        Self {
            source,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    /// Stop listening. Safe to call more than once.
    pub fn detach(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(id) = subscription {
            self.source.unsubscribe(id);
            tracing::debug!(context = %self.source.context_id(), "auth state bridge detached");
        }
    }

    /// Whether the bridge is still subscribed.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Drop for AuthStateBridge {
    fn drop(&mut self) {
        self.detach();
    }
}

/// The new auth state carried by `event`, if it is a real change of the
/// auth-state key made by another context.
fn foreign_auth_state(event: &StorageEvent, key: &str, own_context: ContextId) -> Option<AuthState> {
    if event.old_value == event.new_value
        || event.source == own_context
        || event.key.as_deref() != Some(key)
    {
        return None;
    }

    Some(AuthState::from_stored(event.new_value.as_deref()))
}
