//! Form data models.
//!
//! A [`Model`] is a plain mapping from field name to value. The caller owns
//! it through a [`SharedModel`] handle; the engine only ever works on
//! snapshots, so no lock is held while a validation is suspended.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use form_validator_core::{FormError, FormResult};

/// A mapping from field name to current value.
///
/// Values may be any JSON value, including nested objects and arrays. A
/// missing key reads as `null`.
///
/// # Examples
///
/// ```
/// use form_validator_forms::Model;
/// use serde_json::json;
///
/// let mut model = Model::from_value(json!({ "name": "Ann" })).unwrap();
/// model.set("age", json!(30));
/// assert_eq!(model.value("age"), json!(30));
/// assert_eq!(model.value("missing"), json!(null));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Model {
    values: Map<String, Value>,
}

impl Model {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a model from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::SerializationError`] if `value` is not an object.
    pub fn from_value(value: Value) -> FormResult<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(FormError::SerializationError(format!(
                "A model must be a JSON object, got {other}"
            ))),
        }
    }

    /// Returns the value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Returns a copy of the value of `field`, or `null` when absent.
    pub fn value(&self, field: &str) -> Value {
        self.values.get(field).cloned().unwrap_or(Value::Null)
    }

    /// Sets `field` to `value`, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(field.into(), value)
    }

    /// Removes `field`, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.values.remove(field)
    }

    /// Returns `true` if `field` is present.
    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    /// Iterates over field names.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the model has no fields.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the underlying map.
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Consumes the model and returns the underlying map.
    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }
}

impl From<Map<String, Value>> for Model {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Model {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A cloneable handle to a caller-owned [`Model`].
///
/// Clones share the same model. Reads and writes take a short-lived lock;
/// nothing in this crate keeps the lock across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedModel {
    inner: Arc<RwLock<Model>>,
}

impl SharedModel {
    /// Wraps `model` in a new shared handle.
    pub fn new(model: Model) -> Self {
        Self {
            inner: Arc::new(RwLock::new(model)),
        }
    }

    /// Returns a copy of the current model.
    pub fn snapshot(&self) -> Model {
        self.read().clone()
    }

    /// Returns a copy of the value of `field`, or `null` when absent.
    pub fn value(&self, field: &str) -> Value {
        self.read().value(field)
    }

    /// Sets `field` to `value`, returning the previous value.
    pub fn set(&self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.write().set(field, value)
    }

    /// Runs `f` with exclusive access to the model.
    pub fn update<R>(&self, f: impl FnOnce(&mut Model) -> R) -> R {
        f(&mut self.write())
    }

    /// Returns `true` if both handles point at the same model.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Acquires a read guard.
    pub fn read(&self) -> RwLockReadGuard<'_, Model> {
        self.inner.read().expect("model lock poisoned")
    }

    /// Acquires a write guard.
    pub fn write(&self) -> RwLockWriteGuard<'_, Model> {
        self.inner.write().expect("model lock poisoned")
    }
}

impl From<Model> for SharedModel {
    fn from(model: Model) -> Self {
        Self::new(model)
    }
}
