//! # form-validator-rules
//!
//! The declarative side of form-validator: the [`Rule`] model, the
//! [`RuleSet`] that maps field names to rules, trigger-aware rule selection,
//! and the asynchronous [`Schema`] evaluator that checks a data source
//! against a rule set.
//!
//! ## Modules
//!
//! - [`trigger`] - Blur/change triggers and trigger sets
//! - [`rule`] - Rule descriptors, rule types, messages, and custom validators
//! - [`rule_set`] - Field name to rule mapping, (de)serializable from JSON/TOML
//! - [`selector`] - Picks the rules that apply to a field for a trigger
//! - [`messages`] - Default message templates and overrides
//! - [`validators`] - Built-in constraint checks
//! - [`schema`] - Async evaluation of a rule set against a source map

pub mod messages;
pub mod rule;
pub mod rule_set;
pub mod schema;
pub mod selector;
pub mod trigger;
pub mod validators;

pub use messages::Messages;
pub use rule::{Message, Pattern, Rule, RuleEntry, RuleFailure, RuleType};
pub use rule_set::RuleSet;
pub use schema::{Schema, ValidateOptions};
pub use selector::select_rules;
pub use trigger::{Trigger, TriggerSet};
