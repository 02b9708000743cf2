//! In-process shared storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::events::{ContextId, StorageEvent, StorageEventSource, StorageListener, SubscriptionId};

use super::Storage;

#[derive(Default)]
struct StorageArea {
    items: Mutex<HashMap<String, String>>,
    listeners: Mutex<Vec<(SubscriptionId, StorageListener)>>,
    next_subscription: AtomicU64,
}

/// A storage area shared by any number of contexts.
///
/// `MemoryStorage::new()` creates a fresh area and its first context;
/// [`context`](MemoryStorage::context) opens another context on the same
/// area, the way a second browser tab sees the same `localStorage`. Every
/// write is reported to all listeners on the area, tagged with the writing
/// context. Filtering (own writes, no-op writes) is left to the listener.
///
/// Cloning a handle keeps its context.
#[derive(Clone)]
pub struct MemoryStorage {
    area: Arc<StorageArea>,
    context: ContextId,
}

impl MemoryStorage {
    /// A new, empty area.
    #[must_use]
    pub fn new() -> Self {
        Self {
            area: Arc::new(StorageArea::default()),
            context: ContextId::new(),
        }
    }

    /// A new context on the same area.
    #[must_use]
    pub fn context(&self) -> Self {
        Self {
            area: Arc::clone(&self.area),
            context: ContextId::new(),
        }
    }

    /// Remove every key.
    pub fn clear(&self) {
        self.area
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        self.notify(StorageEvent {
            key: None,
            old_value: None,
            new_value: None,
            source: self.context,
        });
    }

    /// Number of registered listeners on the area.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.area
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn notify(&self, event: StorageEvent) {
        // Listeners run without the lock held so they may touch the area.
        let listeners: Vec<StorageListener> = self
            .area
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(&event);
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.area
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        let old_value = self
            .area
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());

        self.notify(StorageEvent {
            key: Some(key.to_string()),
            old_value,
            new_value: Some(value.to_string()),
            source: self.context,
        });
    }

    fn remove_item(&self, key: &str) {
        let old_value = self
            .area
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);

        if old_value.is_some() {
            self.notify(StorageEvent {
                key: Some(key.to_string()),
                old_value,
                new_value: None,
                source: self.context,
            });
        }
    }
}

impl StorageEventSource for MemoryStorage {
    fn context_id(&self) -> ContextId {
        self.context
    }

    fn subscribe(&self, listener: StorageListener) -> SubscriptionId {
        let id = SubscriptionId(self.area.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.area
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.area
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }
}
