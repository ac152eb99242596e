//! The field context bridge.
//!
//! A field mounted on a [`Form`](crate::Form) gets a [`FieldContext`]: the
//! per-field facade that exposes the field's own error (read live from the
//! form's error store) and delegates validate/clear/reset to the form. The
//! context holds only a weak reference to the form, so a field that outlives
//! its form turns every operation into a silent no-op.
//!
//! [`MountedField`] is the RAII handle a field component keeps while it is
//! mounted. Dropping it (or calling [`MountedField::unmount`]) removes the
//! field from the form's registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use form_validator_core::FormResult;
use form_validator_rules::{Rule, RuleEntry, Trigger, TriggerSet};

use crate::form::FormContext;
use crate::scope::FieldScope;
use crate::store::Subscription;

/// A mounted field as seen by its form's registry.
#[async_trait]
pub trait FormItem: Send + Sync {
    /// A unique id for this mount.
    fn id(&self) -> Uuid;

    /// The model field this item is bound to, if any.
    fn prop(&self) -> Option<&str>;

    /// Item-level rules added to the form's rules for this field.
    fn rules(&self) -> Vec<Rule>;

    /// The message currently displayed for this field.
    fn error(&self) -> Option<String>;

    /// Validates this field for an optional trigger.
    async fn validate_field(&self, trigger: Option<TriggerSet>) -> FormResult<()>;

    /// Clears this field's error.
    fn clear_validate(&self);

    /// Restores this field's initial value and clears its error.
    fn reset_field(&self);
}

/// Per-field options supplied at mount time.
///
/// # Examples
///
/// ```
/// use form_validator_forms::FieldOptions;
/// use form_validator_rules::{Rule, Trigger};
///
/// let options = FieldOptions::new()
///     .required()
///     .rules(Rule::new().min(3.0).trigger(Trigger::Blur))
///     .validate_event(true);
/// assert!(options.required);
/// assert_eq!(options.rules.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FieldOptions {
    /// Rules appended after the form's rules for this field.
    pub rules: Vec<Rule>,
    /// Adds a required rule unless one is already declared.
    pub required: bool,
    /// A message supplied from outside that overrides the store view.
    pub error: Option<String>,
    /// Whether to display the message. `None` uses the form's settings.
    pub show_message: Option<bool>,
    /// Whether blur and change events validate the field.
    pub validate_event: bool,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            required: false,
            error: None,
            show_message: None,
            validate_event: true,
        }
    }
}

impl FieldOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends item-level rules.
    #[must_use]
    pub fn rules(mut self, entry: impl Into<RuleEntry>) -> Self {
        self.rules.extend(entry.into().into_vec());
        self
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets an externally supplied error message.
    #[must_use]
    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Sets whether the message is displayed.
    #[must_use]
    pub fn show_message(mut self, show: bool) -> Self {
        self.show_message = Some(show);
        self
    }

    /// Sets whether blur and change events validate the field.
    #[must_use]
    pub fn validate_event(mut self, enabled: bool) -> Self {
        self.validate_event = enabled;
        self
    }
}

/// The per-field facade registered with a form.
pub struct FieldContext {
    id: Uuid,
    prop: Option<String>,
    options: FieldOptions,
    external_error: RwLock<Option<String>>,
    form: Weak<FormContext>,
    change_seq: AtomicU64,
}

impl FieldContext {
    fn new(form: &Arc<FormContext>, prop: Option<String>, options: FieldOptions) -> Self {
        let external_error = RwLock::new(options.error.clone().filter(|e| !e.is_empty()));
        Self {
            id: Uuid::new_v4(),
            prop,
            options,
            external_error,
            form: Arc::downgrade(form),
            change_seq: AtomicU64::new(0),
        }
    }

    /// Returns the mount options.
    pub const fn options(&self) -> &FieldOptions {
        &self.options
    }

    fn form(&self) -> Option<Arc<FormContext>> {
        let form = self.form.upgrade();
        if form.is_none() {
            tracing::debug!(prop = ?self.prop, "Field operation after its form was dropped; ignoring");
        }
        form
    }

    fn external_error(&self) -> Option<String> {
        self.external_error
            .read()
            .expect("field context lock poisoned")
            .clone()
    }
}

#[async_trait]
impl FormItem for FieldContext {
    fn id(&self) -> Uuid {
        self.id
    }

    fn prop(&self) -> Option<&str> {
        self.prop.as_deref()
    }

    fn rules(&self) -> Vec<Rule> {
        let Some(prop) = self.prop.as_deref() else {
            return Vec::new();
        };
        let mut rules = self.options.rules.clone();
        if self.options.required {
            let declared = self
                .form()
                .map(|form| form.declared_rules(prop))
                .unwrap_or_default();
            if !declared.iter().chain(rules.iter()).any(|r| r.required) {
                rules.push(Rule::new().required());
            }
        }
        rules
    }

    fn error(&self) -> Option<String> {
        if let Some(message) = self.external_error() {
            return Some(message);
        }
        let prop = self.prop.as_deref()?;
        self.form.upgrade()?.engine.store().get(prop)
    }

    async fn validate_field(&self, trigger: Option<TriggerSet>) -> FormResult<()> {
        let Some(prop) = self.prop.as_deref() else {
            tracing::debug!("Field has no prop; nothing to validate");
            return Ok(());
        };
        let Some(form) = self.form() else {
            return Ok(());
        };
        form.validate_field(prop, trigger).await
    }

    fn clear_validate(&self) {
        if let (Some(prop), Some(form)) = (self.prop.as_deref(), self.form()) {
            form.clear_validate(FieldScope::from(prop));
        }
    }

    fn reset_field(&self) {
        if let (Some(prop), Some(form)) = (self.prop.as_deref(), self.form()) {
            form.reset_fields(FieldScope::from(prop));
        }
    }
}

impl fmt::Debug for FieldContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldContext")
            .field("id", &self.id)
            .field("prop", &self.prop)
            .field("options", &self.options)
            .field("attached", &(self.form.strong_count() > 0))
            .finish_non_exhaustive()
    }
}

/// A field mounted on a form.
///
/// Registered on creation and deregistered on drop.
///
/// # Examples
///
/// ```
/// use form_validator_forms::{FieldOptions, Form, Model};
/// use form_validator_rules::{Rule, RuleSet, Trigger};
/// use serde_json::json;
///
/// # futures::executor::block_on(async {
/// let rules = RuleSet::new().with(
///     "email",
///     Rule::new().required().trigger(Trigger::Blur).message("email required"),
/// );
/// let form = Form::new(Model::from_value(json!({ "email": "" })).unwrap(), rules);
/// let email = form.mount_field("email", FieldOptions::new());
///
/// assert!(!email.handle_blur().await);
/// assert_eq!(email.error().as_deref(), Some("email required"));
///
/// assert!(email.set_value(json!("a@example.com")).await);
/// assert!(email.handle_blur().await);
/// assert!(email.error().is_none());
/// # });
/// ```
pub struct MountedField {
    context: Arc<FieldContext>,
}

impl MountedField {
    pub(crate) fn mount(form: &Arc<FormContext>, prop: String, options: FieldOptions) -> Self {
        let prop = (!prop.is_empty()).then_some(prop);
        let context = Arc::new(FieldContext::new(form, prop, options));
        form.registry.register(context.clone());
        tracing::debug!(form = %form.id, prop = ?context.prop, "Mounted field");
        Self { context }
    }

    /// Returns the mount id.
    pub fn id(&self) -> Uuid {
        self.context.id
    }

    /// Returns the bound model field, if any.
    pub fn prop(&self) -> Option<&str> {
        self.context.prop.as_deref()
    }

    /// Returns the field's context as registered with the form.
    pub fn context(&self) -> Arc<FieldContext> {
        Arc::clone(&self.context)
    }

    /// Returns `true` while the owning form is alive.
    pub fn is_attached(&self) -> bool {
        self.context.form.strong_count() > 0
    }

    /// Returns the field's current message.
    ///
    /// An externally supplied error takes precedence over the store.
    pub fn error(&self) -> Option<String> {
        self.context.error()
    }

    /// Replaces the externally supplied error. `None` or an empty message
    /// falls back to the store view.
    pub fn set_error(&self, message: Option<String>) {
        *self
            .context
            .external_error
            .write()
            .expect("field context lock poisoned") = message.filter(|m| !m.is_empty());
    }

    /// Returns `true` if the field has a message and should display it.
    pub fn should_show_message(&self) -> bool {
        let show = self.context.options.show_message.unwrap_or_else(|| {
            self.context
                .form
                .upgrade()
                .map_or(true, |form| form.settings.show_message)
        });
        show && self.error().is_some()
    }

    /// Subscribes to changes of this field's entry in the error store.
    ///
    /// Returns `None` for a field without a prop or whose form is gone.
    pub fn subscribe_error<F>(&self, callback: F) -> Option<Subscription>
    where
        F: Fn(Option<&str>) + Send + Sync + 'static,
    {
        let prop = self.context.prop.clone()?;
        let form = self.context.form()?;
        Some(form.engine.store().subscribe(prop, callback))
    }

    /// Returns the field's current model value.
    pub fn value(&self) -> Value {
        match (self.prop(), self.context.form.upgrade()) {
            (Some(prop), Some(form)) => form.model.value(prop),
            _ => Value::Null,
        }
    }

    /// Returns `true` if the owning form is disabled.
    pub fn is_disabled(&self) -> bool {
        self.context
            .form
            .upgrade()
            .is_some_and(|form| form.is_disabled())
    }

    /// Validates the field for an optional trigger.
    ///
    /// # Errors
    ///
    /// Propagates the form's validation outcome.
    pub async fn validate(&self, trigger: Option<TriggerSet>) -> FormResult<()> {
        self.context.validate_field(trigger).await
    }

    /// Clears the field's error.
    pub fn clear_validate(&self) {
        self.context.clear_validate();
    }

    /// Restores the field's initial value and clears its error.
    pub fn reset_field(&self) {
        self.context.reset_field();
    }

    /// Handles a blur event.
    ///
    /// Runs blur-triggered validation unless disabled for this field or the
    /// form. Returns `false` if the field is now invalid or could not be
    /// validated.
    pub async fn handle_blur(&self) -> bool {
        if !self.triggers_enabled(Trigger::Blur) {
            return true;
        }
        self.run(Trigger::Blur).await
    }

    /// Handles a value change.
    ///
    /// Runs change-triggered validation unless disabled. With a debounce
    /// window configured, only the last of several rapid changes validates.
    pub async fn handle_change(&self) -> bool {
        if !self.triggers_enabled(Trigger::Change) {
            return true;
        }

        let debounce_ms = self
            .context
            .form
            .upgrade()
            .map_or(0, |form| form.settings.debounce_ms);
        if debounce_ms > 0 {
            let seq = self.context.change_seq.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(debounce_ms)).await;
            if self.context.change_seq.load(Ordering::SeqCst) != seq {
                tracing::trace!(prop = ?self.prop(), "Change superseded during debounce");
                return true;
            }
        }
        self.run(Trigger::Change).await
    }

    /// Writes `value` into the model, then handles it as a change.
    pub async fn set_value(&self, value: Value) -> bool {
        let Some(prop) = self.prop() else {
            return true;
        };
        let Some(form) = self.context.form() else {
            return true;
        };
        form.model.set(prop, value);
        drop(form);
        self.handle_change().await
    }

    /// Unmounts the field.
    pub fn unmount(self) {
        drop(self);
    }

    fn triggers_enabled(&self, trigger: Trigger) -> bool {
        if !self.context.options.validate_event {
            return false;
        }
        self.context.form.upgrade().is_some_and(|form| match trigger {
            Trigger::Blur => form.settings.validate_on_blur,
            Trigger::Change => form.settings.validate_on_change,
        })
    }

    async fn run(&self, trigger: Trigger) -> bool {
        match self.validate(Some(trigger.into())).await {
            Ok(()) => true,
            Err(err) if err.is_validation_failure() => false,
            Err(err) => {
                tracing::warn!(prop = ?self.prop(), trigger = %trigger, error = %err, "Field validation could not run");
                false
            }
        }
    }
}

impl Drop for MountedField {
    fn drop(&mut self) {
        if let Some(form) = self.context.form.upgrade() {
            form.registry.deregister(self.context.id);
            tracing::debug!(form = %form.id, prop = ?self.context.prop, "Unmounted field");
        }
    }
}

impl fmt::Debug for MountedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedField")
            .field("context", &self.context)
            .finish()
    }
}
