//! Forms.
//!
//! A [`Form`] owns everything one form instance needs: the caller's model
//! handle, the initial snapshot used by resets, the rule set, the error
//! store (through its [`ValidationEngine`]), and the registry of mounted
//! fields. Fields reach the form through a weak reference, so dropping the
//! `Form` ends its lifetime even while fields are still mounted.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use futures::future::join_all;
use tracing::Instrument;
use uuid::Uuid;

use form_validator_core::logging::{field_span, form_span};
use form_validator_core::{FormError, FormResult, Settings, ValidationError, SETTINGS};
use form_validator_rules::{Rule, RuleSet, TriggerSet};

use crate::engine::ValidationEngine;
use crate::field::{FieldOptions, MountedField};
use crate::model::{Model, SharedModel};
use crate::registry::FieldRegistry;
use crate::scope::FieldScope;
use crate::store::{ErrorStore, Subscription};

/// State shared between a form and its mounted fields.
pub(crate) struct FormContext {
    pub(crate) id: Uuid,
    pub(crate) model: SharedModel,
    initial: RwLock<Model>,
    rules: RwLock<RuleSet>,
    pub(crate) settings: Settings,
    disabled: AtomicBool,
    pub(crate) engine: ValidationEngine,
    pub(crate) registry: FieldRegistry,
}

impl FormContext {
    /// Returns the form-level rules declared for `prop`.
    pub(crate) fn declared_rules(&self, prop: &str) -> Vec<Rule> {
        self.rules
            .read()
            .expect("form rules lock poisoned")
            .get(prop)
            .map(|entry| entry.as_slice().to_vec())
            .unwrap_or_default()
    }

    /// Form rules with every mounted field's item rules appended.
    fn effective_rules(&self) -> RuleSet {
        let mut rules = self.rules.read().expect("form rules lock poisoned").clone();
        for item in self.registry.snapshot() {
            if let Some(prop) = item.prop() {
                rules.merge_field(prop, item.rules());
            }
        }
        rules
    }

    pub(crate) fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    pub(crate) async fn validate_field(&self, prop: &str, trigger: Option<TriggerSet>) -> FormResult<()> {
        let rules = self.effective_rules();
        let snapshot = self.model.snapshot();
        self.engine
            .validate_field(&snapshot, Some(&rules), prop, trigger)
            .instrument(field_span(&self.id.to_string(), prop))
            .await
    }

    async fn validate(&self, scope: FieldScope) -> FormResult<()> {
        let rules = self.effective_rules();
        let snapshot = self.model.snapshot();
        self.engine
            .validate(&snapshot, Some(&rules), scope)
            .instrument(form_span(&self.id.to_string()))
            .await
            .map(|_| ())
    }

    pub(crate) fn clear_validate(&self, scope: FieldScope) {
        self.engine.clear_validate(scope);
    }

    pub(crate) fn reset_fields(&self, scope: FieldScope) {
        let initial = self.initial.read().expect("form initial lock poisoned").clone();
        self.model
            .update(|model| ValidationEngine::restore_values(model, &initial, &scope));
        self.engine.clear_validate(scope);
    }
}

/// One form instance.
///
/// # Examples
///
/// ```
/// use form_validator_forms::{Form, Model, SharedModel};
/// use form_validator_rules::{Rule, RuleSet};
/// use serde_json::json;
///
/// # futures::executor::block_on(async {
/// let model = SharedModel::new(Model::from_value(json!({ "a": "", "b": "ok" })).unwrap());
/// let rules = RuleSet::new()
///     .with("a", Rule::new().required().message("a required"))
///     .with("b", Rule::new().required().message("b required"));
/// let form = Form::new(model.clone(), rules);
///
/// let err = form.validate().await.unwrap_err();
/// assert!(err.validation_error().unwrap().contains("a"));
/// assert_eq!(form.error("a").as_deref(), Some("a required"));
/// assert!(form.error("b").is_none());
///
/// model.set("a", json!("filled"));
/// let validated = form.validate().await.unwrap();
/// assert!(SharedModel::ptr_eq(&validated, &model));
/// assert!(form.errors().is_empty());
/// # });
/// ```
pub struct Form {
    ctx: Arc<FormContext>,
}

impl Form {
    /// Creates a form over `model` using the global settings.
    ///
    /// The model's current values become the initial values for resets.
    pub fn new(model: impl Into<SharedModel>, rules: RuleSet) -> Self {
        Self::with_settings(model, rules, SETTINGS.get_or_default())
    }

    /// Creates a form over `model` with explicit settings.
    pub fn with_settings(model: impl Into<SharedModel>, rules: RuleSet, settings: Settings) -> Self {
        let model = model.into();
        let engine = ValidationEngine::from_settings(&settings, ErrorStore::new());
        let ctx = FormContext {
            id: Uuid::new_v4(),
            initial: RwLock::new(model.snapshot()),
            model,
            rules: RwLock::new(rules),
            settings,
            disabled: AtomicBool::new(false),
            engine,
            registry: FieldRegistry::new(),
        };
        let fields = ctx.rules.read().expect("form rules lock poisoned").len();
        tracing::debug!(form = %ctx.id, fields, "Created form");
        Self { ctx: Arc::new(ctx) }
    }

    /// Returns this form's id.
    pub fn id(&self) -> Uuid {
        self.ctx.id
    }

    /// Returns the caller's model handle.
    pub fn model(&self) -> &SharedModel {
        &self.ctx.model
    }

    /// Returns the settings this form was created with.
    pub fn settings(&self) -> &Settings {
        &self.ctx.settings
    }

    /// Returns the error store.
    pub fn store(&self) -> &ErrorStore {
        self.ctx.engine.store()
    }

    // ── Validation ───────────────────────────────────────────────────

    /// Validates every field and resolves with the same model handle.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Validation`] with every failure after updating
    /// the error store.
    pub async fn validate(&self) -> FormResult<SharedModel> {
        self.validate_fields(FieldScope::All).await
    }

    /// Validates the fields in `scope` and resolves with the model handle.
    ///
    /// Fields in `scope` without declared rules are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Validation`] with the failures of the in-scope
    /// fields after updating the error store.
    pub async fn validate_fields(&self, scope: impl Into<FieldScope>) -> FormResult<SharedModel> {
        self.ctx.validate(scope.into()).await?;
        Ok(self.ctx.model.clone())
    }

    /// Validates one field for an optional trigger.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Validation`] after storing the field's message.
    pub async fn validate_field(&self, prop: &str, trigger: Option<TriggerSet>) -> FormResult<()> {
        self.ctx.validate_field(prop, trigger).await
    }

    /// Validates every mounted field through its own context, concurrently.
    ///
    /// Unlike [`Form::validate`], only fields that are currently mounted are
    /// checked, and each one applies `trigger` filtering.
    ///
    /// # Errors
    ///
    /// Returns a [`FormError::Validation`] merging every mounted field's
    /// failures, or the first evaluation error.
    pub async fn validate_mounted(&self, trigger: Option<TriggerSet>) -> FormResult<()> {
        let items = self.ctx.registry.snapshot();
        let outcomes = join_all(items.iter().map(|item| item.validate_field(trigger))).await;

        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(()) => {}
                Err(FormError::Validation(detail)) => failures.extend(detail.errors),
                Err(other) => return Err(other),
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(failures).into())
        }
    }

    // ── Clear / reset ────────────────────────────────────────────────

    /// Restores the fields in `scope` to their initial values and clears
    /// their errors.
    pub fn reset_fields(&self, scope: impl Into<FieldScope>) {
        self.ctx.reset_fields(scope.into());
    }

    /// Clears the errors of the fields in `scope`.
    pub fn clear_validate(&self, scope: impl Into<FieldScope>) {
        self.ctx.clear_validate(scope.into());
    }

    /// Re-captures the model's current values as the initial values.
    pub fn capture_initial(&self) {
        *self.ctx.initial.write().expect("form initial lock poisoned") = self.ctx.model.snapshot();
    }

    // ── Rules and state ──────────────────────────────────────────────

    /// Returns a copy of the form-level rules.
    pub fn rules(&self) -> RuleSet {
        self.ctx.rules.read().expect("form rules lock poisoned").clone()
    }

    /// Replaces the form-level rules. Errors already stored are kept.
    pub fn set_rules(&self, rules: RuleSet) {
        *self.ctx.rules.write().expect("form rules lock poisoned") = rules;
    }

    /// Returns `true` if the form is disabled.
    pub fn is_disabled(&self) -> bool {
        self.ctx.is_disabled()
    }

    /// Sets the disabled flag mounted fields report through `is_disabled`.
    pub fn set_disabled(&self, disabled: bool) {
        self.ctx.disabled.store(disabled, Ordering::SeqCst);
    }

    // ── Errors ───────────────────────────────────────────────────────

    /// Returns the current message of `prop`.
    pub fn error(&self, prop: &str) -> Option<String> {
        self.store().get(prop)
    }

    /// Returns every current message, sorted by field.
    pub fn errors(&self) -> BTreeMap<String, String> {
        self.store().snapshot()
    }

    /// Subscribes to changes of `prop`'s message.
    pub fn subscribe_error<F>(&self, prop: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        self.store().subscribe(prop, callback)
    }

    // ── Fields ───────────────────────────────────────────────────────

    /// Mounts a field bound to `prop`.
    ///
    /// An empty `prop` mounts a field with no validation target.
    pub fn mount_field(&self, prop: impl Into<String>, options: FieldOptions) -> MountedField {
        MountedField::mount(&self.ctx, prop.into(), options)
    }

    /// Returns the props of the mounted fields in mount order.
    pub fn fields(&self) -> Vec<String> {
        self.ctx.registry.props()
    }
}

impl Drop for Form {
    fn drop(&mut self) {
        tracing::debug!(form = %self.ctx.id, mounted = self.ctx.registry.len(), "Dropped form");
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("id", &self.ctx.id)
            .field("settings", &self.ctx.settings)
            .field("disabled", &self.is_disabled())
            .field("fields", &self.ctx.registry)
            .field("errors", self.store())
            .finish_non_exhaustive()
    }
}
