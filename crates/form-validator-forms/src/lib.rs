//! # form-validator-forms
//!
//! The stateful side of form-validator. A [`Form`] binds a caller-owned
//! model to a [`RuleSet`](form_validator_rules::RuleSet), keeps one error
//! message per field in an observable [`ErrorStore`], and lets mounted
//! fields validate, clear, and reset themselves through a [`FieldContext`].
//!
//! ## Modules
//!
//! - [`model`] - Form models and the shared model handle
//! - [`store`] - The per-field error store with key-level subscriptions
//! - [`sequence`] - Per-field last-call-wins guard
//! - [`scope`] - Field scopes for bulk operations
//! - [`engine`] - The validation engine reconciling outcomes into the store
//! - [`registry`] - Registry of mounted fields
//! - [`field`] - Field contexts, mount options, and mounted field handles
//! - [`form`] - The form instance tying everything together

pub mod engine;
pub mod field;
pub mod form;
pub mod model;
pub mod registry;
pub mod scope;
pub mod sequence;
pub mod store;

pub use engine::ValidationEngine;
pub use field::{FieldContext, FieldOptions, FormItem, MountedField};
pub use form::Form;
pub use model::{Model, SharedModel};
pub use registry::FieldRegistry;
pub use scope::FieldScope;
pub use sequence::{SequenceGuard, Ticket};
pub use store::{ErrorListener, ErrorStore, Subscription};
