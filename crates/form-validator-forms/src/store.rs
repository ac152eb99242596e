//! The per-field error store.
//!
//! [`ErrorStore`] is the single source of truth for displayed messages: one
//! message per field, empty meaning "no error". Writes are observable per
//! key through [`ErrorStore::subscribe`]; a subscriber is only called when
//! its own field's message actually changes.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// Callback invoked with a field's new message (`None` once cleared).
pub type ErrorListener = Arc<dyn Fn(Option<&str>) + Send + Sync>;

struct Listener {
    id: u64,
    prop: String,
    callback: ErrorListener,
}

#[derive(Default)]
struct Inner {
    entries: RwLock<HashMap<String, String>>,
    listeners: RwLock<Vec<Listener>>,
    next_id: AtomicU64,
}

impl Inner {
    fn remove_listener(&self, id: u64) -> bool {
        let mut listeners = self.listeners.write().expect("error store lock poisoned");
        let len_before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() < len_before
    }
}

/// A shared mapping from field name to its current error message.
///
/// Clones share the same underlying map.
///
/// # Examples
///
/// ```
/// use form_validator_forms::ErrorStore;
///
/// let store = ErrorStore::new();
/// store.set("age", "age required");
/// assert_eq!(store.get("age").as_deref(), Some("age required"));
///
/// store.clear("age");
/// assert!(store.get("age").is_none());
/// assert_eq!(store.message("age"), "");
/// ```
#[derive(Clone, Default)]
pub struct ErrorStore {
    inner: Arc<Inner>,
}

impl ErrorStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the message for `prop`, or `None` when it has no error.
    pub fn get(&self, prop: &str) -> Option<String> {
        self.entries().get(prop).cloned()
    }

    /// Returns the message for `prop`, or an empty string.
    pub fn message(&self, prop: &str) -> String {
        self.get(prop).unwrap_or_default()
    }

    /// Returns `true` if `prop` currently has an error.
    pub fn has_error(&self, prop: &str) -> bool {
        self.entries().contains_key(prop)
    }

    /// Stores `message` for `prop`. An empty message clears the entry.
    pub fn set(&self, prop: &str, message: impl Into<String>) {
        let message = message.into();
        if message.is_empty() {
            self.clear(prop);
            return;
        }

        let changed = {
            let mut entries = self.entries_mut();
            match entries.get(prop) {
                Some(current) if *current == message => false,
                _ => {
                    entries.insert(prop.to_string(), message.clone());
                    true
                }
            }
        };
        if changed {
            tracing::trace!(field = prop, message = %message, "Stored field error");
            self.notify(&[(prop.to_string(), Some(message))]);
        }
    }

    /// Removes the entry for `prop`. Clearing a field without an error is a
    /// no-op.
    pub fn clear(&self, prop: &str) {
        let removed = self.entries_mut().remove(prop).is_some();
        if removed {
            tracing::trace!(field = prop, "Cleared field error");
            self.notify(&[(prop.to_string(), None)]);
        }
    }

    /// Removes the entries for every name in `props`.
    pub fn clear_many<S: AsRef<str>>(&self, props: &[S]) {
        let removed: Vec<(String, Option<String>)> = {
            let mut entries = self.entries_mut();
            props
                .iter()
                .filter_map(|p| entries.remove_entry(p.as_ref()))
                .map(|(prop, _)| (prop, None))
                .collect()
        };
        self.notify(&removed);
    }

    /// Removes every entry.
    pub fn clear_all(&self) {
        let removed: Vec<(String, Option<String>)> = self
            .entries_mut()
            .drain()
            .map(|(prop, _)| (prop, None))
            .collect();
        if !removed.is_empty() {
            tracing::trace!(count = removed.len(), "Cleared all field errors");
        }
        self.notify(&removed);
    }

    /// Returns a sorted copy of every entry.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Returns the number of fields with an error.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns `true` if no field has an error.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Subscribes to changes of `prop`'s message.
    ///
    /// The callback runs after the store has been updated, outside of any
    /// store lock, so it may read from the store. Dropping the returned
    /// [`Subscription`] unsubscribes.
    pub fn subscribe<F>(&self, prop: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .write()
            .expect("error store lock poisoned")
            .push(Listener {
                id,
                prop: prop.into(),
                callback: Arc::new(callback),
            });
        Subscription {
            store: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Returns the number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .expect("error store lock poisoned")
            .len()
    }

    fn notify(&self, changes: &[(String, Option<String>)]) {
        if changes.is_empty() {
            return;
        }
        for (prop, message) in changes {
            let callbacks: Vec<ErrorListener> = self
                .inner
                .listeners
                .read()
                .expect("error store lock poisoned")
                .iter()
                .filter(|l| l.prop == *prop)
                .map(|l| Arc::clone(&l.callback))
                .collect();
            for callback in callbacks {
                callback(message.as_deref());
            }
        }
    }

    fn entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, String>> {
        self.inner.entries.read().expect("error store lock poisoned")
    }

    fn entries_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, String>> {
        self.inner.entries.write().expect("error store lock poisoned")
    }
}

impl fmt::Debug for ErrorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorStore")
            .field("entries", &self.snapshot())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// A live subscription to one field of an [`ErrorStore`].
///
/// Dropping it unsubscribes. It does not keep the store alive.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    store: Weak<Inner>,
    id: u64,
}

impl Subscription {
    /// Unsubscribes explicitly.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            inner.remove_listener(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<Option<String>>>>, impl Fn(Option<&str>) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |m: Option<&str>| {
            sink.lock().unwrap().push(m.map(str::to_string));
        })
    }

    #[test]
    fn test_set_get_clear() {
        let store = ErrorStore::new();
        assert!(store.is_empty());
        store.set("a", "bad");
        assert!(store.has_error("a"));
        assert_eq!(store.len(), 1);
        store.clear("a");
        assert!(!store.has_error("a"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_message_clears() {
        let store = ErrorStore::new();
        store.set("a", "bad");
        store.set("a", "");
        assert!(store.get("a").is_none());
    }

    #[test]
    fn test_clear_all_is_idempotent() {
        let store = ErrorStore::new();
        store.set("a", "x");
        store.set("b", "y");
        store.clear_all();
        assert!(store.is_empty());
        store.clear_all();
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_many_only_named() {
        let store = ErrorStore::new();
        store.set("a", "x");
        store.set("b", "y");
        store.set("c", "z");
        store.clear_many(&["a", "c", "missing"]);
        assert_eq!(store.snapshot().into_keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_clones_share_state() {
        let store = ErrorStore::new();
        let other = store.clone();
        other.set("a", "x");
        assert_eq!(store.message("a"), "x");
    }

    // ── Subscriptions ───────────────────────────────────────────────

    #[test]
    fn test_subscriber_sees_only_own_key() {
        let store = ErrorStore::new();
        let (seen, callback) = recorder();
        let _sub = store.subscribe("a", callback);

        store.set("b", "other field");
        store.set("a", "first");
        store.set("a", "first"); // unchanged, no notification
        store.set("a", "second");
        store.clear("a");
        store.clear("a"); // already clear

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("first".to_string()), Some("second".to_string()), None]
        );
    }

    #[test]
    fn test_clear_all_notifies_each_key() {
        let store = ErrorStore::new();
        let (seen_a, cb_a) = recorder();
        let (seen_b, cb_b) = recorder();
        let _a = store.subscribe("a", cb_a);
        let _b = store.subscribe("b", cb_b);
        store.set("a", "x");
        store.clear_all();
        assert_eq!(*seen_a.lock().unwrap(), vec![Some("x".to_string()), None]);
        assert!(seen_b.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let store = ErrorStore::new();
        let (seen, callback) = recorder();
        let sub = store.subscribe("a", callback);
        assert_eq!(store.subscriber_count(), 1);
        sub.unsubscribe();
        assert_eq!(store.subscriber_count(), 0);
        store.set("a", "x");
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_callback_may_read_store() {
        let store = ErrorStore::new();
        let reader = store.clone();
        let seen = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe("a", move |_| {
            *sink.lock().unwrap() = reader.message("a");
        });
        store.set("a", "visible");
        assert_eq!(*seen.lock().unwrap(), "visible");
    }

    #[test]
    fn test_subscription_outlives_store() {
        let store = ErrorStore::new();
        let sub = store.subscribe("a", |_| {});
        drop(store);
        drop(sub);
    }
}
