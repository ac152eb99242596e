//! The validation engine.
//!
//! [`ValidationEngine`] ties rule selection, schema evaluation and the
//! [`ErrorStore`] together. It validates one field for a trigger, or the
//! whole model (optionally reduced to a list of fields), and always updates
//! the store before reporting the outcome to the caller.
//!
//! Evaluation never holds a lock on the model: callers hand in a [`Model`]
//! snapshot. Each write to the store is gated by the per-field
//! [`SequenceGuard`], so a validation that was superseded while it was
//! suspended cannot overwrite a newer outcome.

use std::collections::HashMap;

use serde_json::Value;

use form_validator_core::{FormError, FormResult, Settings, ValidationError};
use form_validator_rules::{select_rules, Messages, RuleSet, Schema, TriggerSet, ValidateOptions};

use crate::model::Model;
use crate::scope::FieldScope;
use crate::sequence::{SequenceGuard, Ticket};
use crate::store::ErrorStore;

/// Runs validations and reconciles their outcome into an [`ErrorStore`].
///
/// # Examples
///
/// ```
/// use form_validator_forms::{ErrorStore, Model, ValidationEngine};
/// use form_validator_rules::{Rule, RuleSet, RuleType};
/// use serde_json::json;
///
/// # futures::executor::block_on(async {
/// let rules = RuleSet::new().with(
///     "age",
///     Rule::new().of_type(RuleType::Number).required().message("age required"),
/// );
/// let engine = ValidationEngine::new(ErrorStore::new());
///
/// let model = Model::from_value(json!({ "age": null })).unwrap();
/// assert!(engine.validate_field(&model, Some(&rules), "age", None).await.is_err());
/// assert_eq!(engine.store().message("age"), "age required");
///
/// let model = Model::from_value(json!({ "age": 30 })).unwrap();
/// assert!(engine.validate_field(&model, Some(&rules), "age", None).await.is_ok());
/// assert!(engine.store().get("age").is_none());
/// # });
/// ```
#[derive(Debug)]
pub struct ValidationEngine {
    store: ErrorStore,
    messages: Messages,
    first_fields: bool,
    guard: SequenceGuard,
}

impl ValidationEngine {
    /// Creates an engine with default options writing into `store`.
    pub fn new(store: ErrorStore) -> Self {
        Self {
            store,
            messages: Messages::default(),
            first_fields: true,
            guard: SequenceGuard::default(),
        }
    }

    /// Creates an engine configured from `settings`.
    pub fn from_settings(settings: &Settings, store: ErrorStore) -> Self {
        Self {
            store,
            messages: Messages::with_overrides(settings.messages.clone()),
            first_fields: settings.first_fields,
            guard: SequenceGuard::new(settings.sequence_guard),
        }
    }

    /// Replaces the message templates.
    #[must_use]
    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    /// Sets whether a field stops at its first failing rule.
    #[must_use]
    pub fn with_first_fields(mut self, first_fields: bool) -> Self {
        self.first_fields = first_fields;
        self
    }

    /// Enables or disables the per-field sequence guard.
    #[must_use]
    pub fn with_sequence_guard(mut self, enabled: bool) -> Self {
        self.guard = SequenceGuard::new(enabled);
        self
    }

    /// Returns the store this engine writes into.
    pub const fn store(&self) -> &ErrorStore {
        &self.store
    }

    /// Returns the sequence guard.
    pub const fn guard(&self) -> &SequenceGuard {
        &self.guard
    }

    const fn options(&self) -> ValidateOptions {
        ValidateOptions {
            first_fields: self.first_fields,
            first: false,
        }
    }

    fn schema(&self, rules: RuleSet) -> Schema {
        Schema::new(rules).with_messages(self.messages.clone())
    }

    /// Validates a single field for an optional trigger.
    ///
    /// Only `prop` is evaluated; custom validators still receive the whole
    /// model as their source. When no rule applies, the field's error is
    /// cleared and the call succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Validation`] after storing the field's first
    /// message, or [`FormError::RuleEvaluation`] (store untouched) when a
    /// custom rule aborts.
    pub async fn validate_field(
        &self,
        model: &Model,
        rules: Option<&RuleSet>,
        prop: &str,
        trigger: Option<TriggerSet>,
    ) -> FormResult<()> {
        let ticket = self.guard.issue(prop);
        let selected = select_rules(rules, prop, trigger);

        if selected.is_empty() {
            tracing::debug!(field = prop, "No applicable rules; field is valid");
            if self.is_current(&ticket) {
                self.store.clear(prop);
            }
            return Ok(());
        }

        tracing::debug!(field = prop, rules = selected.len(), "Validating field");
        let schema = self.schema(RuleSet::new().with(prop, selected));
        let result = schema.validate(model.as_map(), self.options()).await;

        match result {
            Ok(()) => {
                if self.is_current(&ticket) {
                    self.store.clear(prop);
                }
                tracing::debug!(field = prop, "Field is valid");
                Ok(())
            }
            Err(FormError::Validation(detail)) => {
                if self.is_current(&ticket) {
                    match detail.first_for_root(prop) {
                        Some(error) => self.store.set(prop, error.message.clone()),
                        None => self.store.clear(prop),
                    }
                }
                tracing::debug!(field = prop, failures = detail.len(), "Field is invalid");
                Err(FormError::Validation(detail))
            }
            Err(other) => Err(other),
        }
    }

    /// Validates the whole model, or only the fields in `scope`.
    ///
    /// With an explicit scope, the rule set is first reduced to the listed
    /// fields; listed fields without rules are dropped silently. On success
    /// the errors of every in-scope field are cleared (the whole store for
    /// [`FieldScope::All`]) and the same model reference is returned.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Validation`] with the full failure detail after
    /// writing the first message of each failing field and clearing every
    /// in-scope field that passed.
    pub async fn validate<'m>(
        &self,
        model: &'m Model,
        rules: Option<&RuleSet>,
        scope: impl Into<FieldScope>,
    ) -> FormResult<&'m Model> {
        let scope = scope.into();
        let reduced = match (&scope, rules) {
            (_, None) => RuleSet::new(),
            (FieldScope::All, Some(rules)) => rules.clone(),
            (FieldScope::Fields(names), Some(rules)) => rules.subset(names),
        };

        let mut in_scope: Vec<String> = reduced.fields().map(str::to_string).collect();
        if let Some(names) = scope.names() {
            for name in names {
                if !in_scope.contains(name) {
                    in_scope.push(name.clone());
                }
            }
        }
        let tickets: HashMap<String, Ticket> = in_scope
            .iter()
            .map(|prop| (prop.clone(), self.guard.issue(prop)))
            .collect();

        tracing::debug!(fields = reduced.len(), all = scope.is_all(), "Validating model");
        let result = if reduced.is_empty() {
            Ok(())
        } else {
            self.schema(reduced).validate(model.as_map(), self.options()).await
        };

        match result {
            Ok(()) => {
                if scope.is_all() {
                    for prop in self.store.snapshot().into_keys() {
                        if tickets.get(&prop).map_or(true, |t| self.is_current(t)) {
                            self.store.clear(&prop);
                        }
                    }
                } else {
                    self.clear_current(&in_scope, &tickets);
                }
                tracing::debug!("Model is valid");
                Ok(model)
            }
            Err(FormError::Validation(detail)) => {
                self.write_failures(&in_scope, &tickets, &detail);
                tracing::debug!(failures = detail.len(), "Model is invalid");
                Err(FormError::Validation(detail))
            }
            Err(other) => Err(other),
        }
    }

    /// Clears errors for `scope`; [`FieldScope::All`] wipes the store.
    ///
    /// In-flight validations of the cleared fields will not write their
    /// results.
    pub fn clear_validate(&self, scope: impl Into<FieldScope>) {
        match scope.into() {
            FieldScope::All => {
                self.guard.invalidate_all();
                self.store.clear_all();
            }
            FieldScope::Fields(names) => {
                for name in &names {
                    self.guard.invalidate(name);
                }
                self.store.clear_many(&names);
            }
        }
    }

    /// Restores fields of `model` from `initial` and clears their errors.
    ///
    /// [`FieldScope::All`] covers every field currently in `model` and wipes
    /// the whole store. A field absent from `initial` is reset to `null`. No
    /// validation is run.
    pub fn reset_fields(&self, model: &mut Model, initial: &Model, scope: impl Into<FieldScope>) {
        let scope = scope.into();
        Self::restore_values(model, initial, &scope);
        self.clear_validate(scope);
    }

    /// Writes the values of `scope` from `initial` into `model`.
    ///
    /// Leaves the error store alone, so callers holding a model lock can
    /// release it before [`clear_validate`](Self::clear_validate) notifies
    /// subscribers.
    pub fn restore_values(model: &mut Model, initial: &Model, scope: &FieldScope) {
        let names: Vec<String> = match scope {
            FieldScope::All => model.fields().map(str::to_string).collect(),
            FieldScope::Fields(names) => names.clone(),
        };
        for name in &names {
            let value = initial.get(name).cloned().unwrap_or(Value::Null);
            model.set(name.as_str(), value);
        }
        tracing::debug!(fields = names.len(), "Reset fields to initial values");
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        let current = self.guard.is_current(ticket);
        if !current {
            tracing::debug!(field = ticket.prop(), "Discarding stale validation result");
        }
        current
    }

    fn clear_current(&self, props: &[String], tickets: &HashMap<String, Ticket>) {
        for prop in props {
            if tickets.get(prop).map_or(true, |t| self.is_current(t)) {
                self.store.clear(prop);
            }
        }
    }

    fn write_failures(
        &self,
        in_scope: &[String],
        tickets: &HashMap<String, Ticket>,
        detail: &ValidationError,
    ) {
        for prop in in_scope {
            if !tickets.get(prop).map_or(true, |t| self.is_current(t)) {
                continue;
            }
            match detail.first_for_root(prop) {
                Some(error) => self.store.set(prop, error.message.clone()),
                None => self.store.clear(prop),
            }
        }
    }
}
