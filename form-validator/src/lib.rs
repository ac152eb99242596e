//! # form-validator
//!
//! Declarative, trigger-aware form validation.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient
//! access. Depend on `form-validator` to get everything, or on individual
//! crates for finer-grained control.
//!
//! ```
//! use form_validator::prelude::*;
//! use serde_json::json;
//!
//! # block_on(async {
//! let rules = RuleSet::new().with(
//!     "age",
//!     Rule::new().of_type(RuleType::Number).required().message("age required"),
//! );
//! let form = Form::new(Model::from_value(json!({ "age": null })).unwrap(), rules);
//!
//! let age = form.mount_field("age", FieldOptions::new());
//! assert!(age.validate(None).await.is_err());
//! assert_eq!(age.error().as_deref(), Some("age required"));
//! # });
//! # fn block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

/// Error types, settings, settings loading, and logging setup.
pub use form_validator_core as core;

/// Rules, rule sets, rule selection, and schema evaluation.
#[cfg(feature = "rules")]
pub use form_validator_rules as rules;

/// Forms, the validation engine, the error store, and field contexts.
#[cfg(feature = "forms")]
pub use form_validator_forms as forms;

// Third-party re-exports for user convenience
pub use async_trait::async_trait;
pub use serde_json;
pub use tracing;
pub use tracing_subscriber;

/// The most commonly used types.
pub mod prelude {
    pub use form_validator_core::logging::setup_logging;
    pub use form_validator_core::{
        FieldError, FormError, FormResult, Settings, ValidationError, SETTINGS,
    };

    #[cfg(feature = "rules")]
    pub use form_validator_rules::{
        select_rules, Messages, Rule, RuleEntry, RuleFailure, RuleSet, RuleType, Schema, Trigger,
        TriggerSet, ValidateOptions,
    };

    #[cfg(feature = "forms")]
    pub use form_validator_forms::{
        ErrorStore, FieldOptions, FieldScope, Form, FormItem, Model, MountedField, SharedModel,
        Subscription, ValidationEngine,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_prelude_covers_common_flow() {
        let rules = RuleSet::new().with("name", Rule::new().required().trigger(Trigger::Blur));
        let form = Form::new(Model::from_value(json!({ "name": "" })).unwrap(), rules);
        let name = form.mount_field("name", FieldOptions::new());
        assert!(!name.handle_blur().await);
        form.clear_validate(FieldScope::All);
        assert!(form.errors().is_empty());
    }

    #[test]
    fn test_core_always_available() {
        let settings = super::core::settings_loader::from_toml_str("debug = false").unwrap();
        assert!(!settings.debug);
    }
}
