//! The per-form field registry.
//!
//! Tracks the fields currently mounted on a form so bulk operations can
//! address them. Entries may be removed at any time, including while a bulk
//! operation is iterating a snapshot.

use std::fmt;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::field::FormItem;

/// The set of currently mounted fields of one form.
#[derive(Default)]
pub struct FieldRegistry {
    items: RwLock<Vec<Arc<dyn FormItem>>>,
}

impl FieldRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mounted field. Registering the same id twice replaces the
    /// earlier entry.
    pub fn register(&self, item: Arc<dyn FormItem>) {
        let mut items = self.items.write().expect("field registry lock poisoned");
        if let Some(existing) = items.iter_mut().find(|i| i.id() == item.id()) {
            *existing = item;
        } else {
            tracing::trace!(id = %item.id(), prop = ?item.prop(), "Registered field");
            items.push(item);
        }
    }

    /// Removes the field with the given id.
    ///
    /// Returns `true` if an entry was removed.
    pub fn deregister(&self, id: Uuid) -> bool {
        let mut items = self.items.write().expect("field registry lock poisoned");
        let len_before = items.len();
        items.retain(|i| i.id() != id);
        let removed = items.len() < len_before;
        if removed {
            tracing::trace!(id = %id, "Deregistered field");
        }
        removed
    }

    /// Returns the mounted fields in mount order.
    ///
    /// The snapshot is detached: fields unmounted afterwards stay in it.
    pub fn snapshot(&self) -> Vec<Arc<dyn FormItem>> {
        self.items
            .read()
            .expect("field registry lock poisoned")
            .clone()
    }

    /// Returns the first mounted field bound to `prop`.
    pub fn find(&self, prop: &str) -> Option<Arc<dyn FormItem>> {
        self.items
            .read()
            .expect("field registry lock poisoned")
            .iter()
            .find(|i| i.prop() == Some(prop))
            .cloned()
    }

    /// Returns the props of the mounted fields, skipping fields without one.
    pub fn props(&self) -> Vec<String> {
        self.items
            .read()
            .expect("field registry lock poisoned")
            .iter()
            .filter_map(|i| i.prop().map(str::to_string))
            .collect()
    }

    /// Returns the number of mounted fields.
    pub fn len(&self) -> usize {
        self.items.read().expect("field registry lock poisoned").len()
    }

    /// Returns `true` if no field is mounted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRegistry")
            .field("props", &self.props())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use form_validator_core::FormResult;
    use form_validator_rules::{Rule, TriggerSet};

    struct StubItem {
        id: Uuid,
        prop: Option<String>,
    }

    impl StubItem {
        fn new(prop: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                id: Uuid::new_v4(),
                prop: prop.map(str::to_string),
            })
        }
    }

    #[async_trait]
    impl FormItem for StubItem {
        fn id(&self) -> Uuid {
            self.id
        }

        fn prop(&self) -> Option<&str> {
            self.prop.as_deref()
        }

        fn rules(&self) -> Vec<Rule> {
            Vec::new()
        }

        fn error(&self) -> Option<String> {
            None
        }

        async fn validate_field(&self, _trigger: Option<TriggerSet>) -> FormResult<()> {
            Ok(())
        }

        fn clear_validate(&self) {}

        fn reset_field(&self) {}
    }

    #[test]
    fn test_register_and_deregister() {
        let registry = FieldRegistry::new();
        let a = StubItem::new(Some("a"));
        let b = StubItem::new(Some("b"));
        registry.register(a.clone());
        registry.register(b.clone());
        assert_eq!(registry.props(), vec!["a", "b"]);

        assert!(registry.deregister(a.id));
        assert!(!registry.deregister(a.id));
        assert_eq!(registry.props(), vec!["b"]);
    }

    #[test]
    fn test_register_same_id_replaces() {
        let registry = FieldRegistry::new();
        let a = StubItem::new(Some("a"));
        registry.register(a.clone());
        registry.register(a);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_props_skip_unbound_fields() {
        let registry = FieldRegistry::new();
        registry.register(StubItem::new(None));
        registry.register(StubItem::new(Some("x")));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.props(), vec!["x"]);
        assert!(registry.find("x").is_some());
        assert!(registry.find("y").is_none());
    }

    #[test]
    fn test_snapshot_survives_removal() {
        let registry = FieldRegistry::new();
        let a = StubItem::new(Some("a"));
        registry.register(a.clone());
        let snapshot = registry.snapshot();
        registry.deregister(a.id);
        assert!(registry.is_empty());
        assert_eq!(snapshot.len(), 1);
    }
}
