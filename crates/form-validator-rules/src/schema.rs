//! Asynchronous schema evaluation.
//!
//! A [`Schema`] checks a data source (a JSON object) against a [`RuleSet`].
//! Fields are evaluated concurrently; the rules of one field run in
//! declaration order. On failure the returned [`FormError::Validation`]
//! carries every [`FieldError`] in field order.
//!
//! A custom rule that cannot reach a verdict surfaces as
//! [`FormError::RuleEvaluation`] instead, so callers can tell "invalid"
//! apart from "could not validate".

use futures::future::{join_all, BoxFuture};
use serde_json::{Map, Value};

use form_validator_core::{FieldError, FormError, FormResult, ValidationError};

use crate::messages::Messages;
use crate::rule::{Rule, RuleFailure};
use crate::rule_set::RuleSet;
use crate::validators::check_rule;

/// Options for one [`Schema::validate`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Stop evaluating a field's rules after its first failing rule.
    pub first_fields: bool,
    /// Report only the first failure of the whole run.
    pub first: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            first_fields: true,
            first: false,
        }
    }
}

/// A rule set paired with the message templates used to report failures.
///
/// # Examples
///
/// ```
/// use form_validator_rules::{Rule, RuleSet, Schema, ValidateOptions};
/// use serde_json::json;
///
/// # futures::executor::block_on(async {
/// let schema = Schema::new(RuleSet::new().with("age", Rule::new().required()));
/// let source = json!({ "age": null });
///
/// let err = schema
///     .validate(source.as_object().unwrap(), ValidateOptions::default())
///     .await
///     .unwrap_err();
/// let detail = err.validation_error().unwrap();
/// assert_eq!(detail.first_message("age"), Some("age is required"));
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Schema {
    rules: RuleSet,
    messages: Messages,
}

impl Schema {
    /// Creates a schema with the default message templates.
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            messages: Messages::default(),
        }
    }

    /// Replaces the message templates.
    #[must_use]
    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    /// Returns the rule set being evaluated.
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Returns the message templates.
    pub const fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Validates `source` against every field of the schema.
    ///
    /// A field absent from `source` is validated as `null`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Validation`] when at least one field fails, and
    /// [`FormError::RuleEvaluation`] when a custom rule aborts.
    pub async fn validate(&self, source: &Map<String, Value>, options: ValidateOptions) -> FormResult<()> {
        tracing::trace!(fields = self.rules.len(), "Evaluating schema");

        let checks = self.rules.iter().map(|(field, entry)| {
            let value = source.get(field).cloned().unwrap_or(Value::Null);
            self.validate_value(field.to_string(), value, entry.as_slice(), source, options)
        });

        let mut errors = Vec::new();
        for outcome in join_all(checks).await {
            errors.extend(outcome?);
        }

        if errors.is_empty() {
            return Ok(());
        }
        if options.first {
            errors.truncate(1);
        }
        Err(ValidationError::new(errors).into())
    }

    fn validate_value<'a>(
        &'a self,
        path: String,
        value: Value,
        rules: &'a [Rule],
        source: &'a Map<String, Value>,
        options: ValidateOptions,
    ) -> BoxFuture<'a, FormResult<Vec<FieldError>>> {
        Box::pin(async move {
            let mut errors = Vec::new();
            let mut current = value;

            for rule in rules {
                if let Some(transform) = &rule.transform {
                    current = transform(&current);
                }

                let mut messages = check_rule(rule, &current, &path, &self.messages);
                if messages.is_empty() {
                    if let Some(message) = self.run_custom(rule, &current, &path, source).await? {
                        messages.push(message);
                    }
                }

                if messages.is_empty() {
                    if rule.is_deep() {
                        errors.extend(self.validate_members(rule, &current, &path, source, options).await?);
                    }
                    continue;
                }

                errors.extend(
                    messages
                        .into_iter()
                        .map(|message| FieldError::new(path.clone(), message, current.clone())),
                );
                if options.first_fields {
                    break;
                }
            }

            Ok(errors)
        })
    }

    /// Runs the sync then async custom validator of `rule`.
    ///
    /// Returns the failure message, if any.
    async fn run_custom(
        &self,
        rule: &Rule,
        value: &Value,
        path: &str,
        source: &Map<String, Value>,
    ) -> FormResult<Option<String>> {
        let mut verdict = match &rule.validator {
            Some(validator) => validator(value, source),
            None => Ok(()),
        };
        if verdict.is_ok() {
            if let Some(validator) = &rule.async_validator {
                verdict = validator(value.clone()).await;
            }
        }

        match verdict {
            Ok(()) => Ok(None),
            Err(RuleFailure::Invalid(Some(message))) => Ok(Some(message)),
            Err(RuleFailure::Invalid(None)) => Ok(Some(
                rule.rendered_message()
                    .unwrap_or_else(|| self.messages.render("default", &[path])),
            )),
            Err(RuleFailure::Aborted(reason)) => {
                tracing::warn!(field = path, reason = %reason, "Custom rule aborted");
                Err(FormError::RuleEvaluation {
                    field: path.to_string(),
                    reason,
                })
            }
        }
    }

    /// Recurses into the members of an object or array value.
    ///
    /// Members named in `rule.fields` use those rules and are visited first;
    /// every other member uses `rule.default_field`. Named members missing
    /// from the value are validated as `null`.
    async fn validate_members(
        &self,
        rule: &Rule,
        value: &Value,
        path: &str,
        source: &Map<String, Value>,
        options: ValidateOptions,
    ) -> FormResult<Vec<FieldError>> {
        let present: Vec<String> = match value {
            Value::Object(map) => map.keys().cloned().collect(),
            Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            _ => return Ok(Vec::new()),
        };
        let mut keys: Vec<String> = rule
            .fields
            .iter()
            .flat_map(RuleSet::fields)
            .map(str::to_string)
            .collect();
        for key in present {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }

        let mut errors = Vec::new();
        for key in keys {
            let member_rules = match rule.fields.as_ref().and_then(|f| f.get(&key)) {
                Some(entry) => entry.as_slice(),
                None => match rule.default_field.as_deref() {
                    Some(entry) => entry.as_slice(),
                    None => continue,
                },
            };
            let member = member_value(value, &key);
            let nested = self
                .validate_value(format!("{path}.{key}"), member, member_rules, source, options)
                .await?;
            errors.extend(nested);
        }
        Ok(errors)
    }
}

fn member_value(value: &Value, key: &str) -> Value {
    match value {
        Value::Object(map) => map.get(key).cloned().unwrap_or(Value::Null),
        Value::Array(items) => key
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleType;
    use serde_json::json;
    use std::time::Duration;

    fn source(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    async fn run(schema: &Schema, value: Value) -> FormResult<()> {
        schema.validate(&source(value), ValidateOptions::default()).await
    }

    fn detail(result: FormResult<()>) -> ValidationError {
        match result {
            Err(FormError::Validation(err)) => err,
            other => panic!("expected a validation failure, got {other:?}"),
        }
    }

    // ── Basic evaluation ────────────────────────────────────────────

    #[tokio::test]
    async fn test_valid_source_passes() {
        let schema = Schema::new(
            RuleSet::new()
                .with("name", Rule::new().required())
                .with("age", Rule::new().of_type(RuleType::Number).min(18.0)),
        );
        assert!(run(&schema, json!({ "name": "Ann", "age": 30 })).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_field_is_null() {
        let schema = Schema::new(RuleSet::new().with("name", Rule::new().required()));
        let err = detail(run(&schema, json!({})).await);
        assert_eq!(err.first_message("name"), Some("name is required"));
        assert_eq!(err.errors[0].field_value, Value::Null);
    }

    #[tokio::test]
    async fn test_empty_rule_set_passes() {
        let schema = Schema::new(RuleSet::new());
        assert!(run(&schema, json!({ "anything": 1 })).await.is_ok());
    }

    #[tokio::test]
    async fn test_errors_in_field_order() {
        let schema = Schema::new(
            RuleSet::new()
                .with("b", Rule::new().required())
                .with("a", Rule::new().required()),
        );
        let err = detail(run(&schema, json!({})).await);
        let fields: Vec<&str> = err.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["a", "b"]);
    }

    // ── first_fields / first ────────────────────────────────────────

    #[tokio::test]
    async fn test_first_fields_stops_after_first_failing_rule() {
        let rules = RuleSet::new().with(
            "age",
            vec![
                Rule::new().of_type(RuleType::Number).message("age must be a number"),
                Rule::new().min(18.0).message("too young"),
            ],
        );
        let schema = Schema::new(rules);
        let src = source(json!({ "age": "abc" }));

        let err = detail(schema.validate(&src, ValidateOptions::default()).await);
        assert_eq!(err.len(), 1);
        assert_eq!(err.first_message("age"), Some("age must be a number"));

        let all = ValidateOptions {
            first_fields: false,
            first: false,
        };
        let err = detail(schema.validate(&src, all).await);
        // "abc" has 3 characters, which is also below 18.
        assert_eq!(err.len(), 2);
    }

    #[tokio::test]
    async fn test_first_reports_single_error() {
        let schema = Schema::new(
            RuleSet::new()
                .with("a", Rule::new().required())
                .with("b", Rule::new().required()),
        );
        let options = ValidateOptions {
            first_fields: true,
            first: true,
        };
        let err = detail(schema.validate(&source(json!({})), options).await);
        assert_eq!(err.len(), 1);
        assert!(err.contains("a"));
    }

    // ── Custom validators ───────────────────────────────────────────

    #[tokio::test]
    async fn test_sync_validator_sees_whole_source() {
        let schema = Schema::new(RuleSet::new().with(
            "confirm",
            Rule::new().validator(|value, source| {
                if source.get("password") == Some(value) {
                    Ok(())
                } else {
                    Err(RuleFailure::invalid("passwords differ"))
                }
            }),
        ));
        assert!(run(&schema, json!({ "password": "x", "confirm": "x" })).await.is_ok());
        let err = detail(run(&schema, json!({ "password": "x", "confirm": "y" })).await);
        assert_eq!(err.first_message("confirm"), Some("passwords differ"));
    }

    #[tokio::test]
    async fn test_async_validator_invalid() {
        let schema = Schema::new(RuleSet::new().with(
            "username",
            Rule::new().async_validator(|value| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                if value == "taken" {
                    Err(RuleFailure::invalid("username is taken"))
                } else {
                    Ok(())
                }
            }),
        ));
        assert!(run(&schema, json!({ "username": "free" })).await.is_ok());
        let err = detail(run(&schema, json!({ "username": "taken" })).await);
        assert_eq!(err.first_message("username"), Some("username is taken"));
    }

    #[tokio::test]
    async fn test_rejected_uses_rule_message_then_default() {
        let with_message = Schema::new(RuleSet::new().with(
            "code",
            Rule::new()
                .message("bad code")
                .validator(|_, _| Err(RuleFailure::rejected())),
        ));
        let err = detail(run(&with_message, json!({ "code": 1 })).await);
        assert_eq!(err.first_message("code"), Some("bad code"));

        let without = Schema::new(
            RuleSet::new().with("code", Rule::new().validator(|_, _| Err(RuleFailure::rejected()))),
        );
        let err = detail(run(&without, json!({ "code": 1 })).await);
        assert_eq!(err.first_message("code"), Some("Validation error on field code"));
    }

    #[tokio::test]
    async fn test_aborted_rule_is_evaluation_error() {
        let schema = Schema::new(RuleSet::new().with(
            "email",
            Rule::new().async_validator(|_| async { Err(RuleFailure::aborted("lookup timed out")) }),
        ));
        let err = run(&schema, json!({ "email": "a@b.co" })).await.unwrap_err();
        assert!(!err.is_validation_failure());
        match err {
            FormError::RuleEvaluation { field, reason } => {
                assert_eq!(field, "email");
                assert_eq!(reason, "lookup timed out");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_custom_skipped_when_builtin_fails() {
        let schema = Schema::new(RuleSet::new().with(
            "name",
            Rule::new()
                .required()
                .validator(|_, _| Err(RuleFailure::aborted("should not run"))),
        ));
        let err = detail(run(&schema, json!({ "name": "" })).await);
        assert_eq!(err.first_message("name"), Some("name is required"));
    }

    // ── Transform ───────────────────────────────────────────────────

    #[tokio::test]
    async fn test_transform_applies_before_checks() {
        let trim = |v: &Value| v.as_str().map_or_else(|| v.clone(), |s| Value::from(s.trim()));
        let schema = Schema::new(RuleSet::new().with(
            "name",
            vec![Rule::new().transform(trim).required(), Rule::new().min(2.0)],
        ));
        let err = detail(run(&schema, json!({ "name": "   " })).await);
        assert_eq!(err.first_message("name"), Some("name is required"));

        // The transformed value carries over to later rules.
        let err = detail(run(&schema, json!({ "name": " a  " })).await);
        assert_eq!(
            err.first_message("name"),
            Some("name must be at least 2 characters")
        );
    }

    // ── Deep rules ──────────────────────────────────────────────────

    #[tokio::test]
    async fn test_nested_fields_report_dotted_paths() {
        let address = Rule::new().of_type(RuleType::Object).fields(
            RuleSet::new()
                .with("city", Rule::new().required().message("city required"))
                .with("zip", Rule::new().length(5.0)),
        );
        let schema = Schema::new(RuleSet::new().with("address", address));

        assert!(run(&schema, json!({ "address": { "city": "Oslo", "zip": "01234" } }))
            .await
            .is_ok());

        let err = detail(run(&schema, json!({ "address": { "zip": "1" } })).await);
        assert_eq!(err.first_message("address.city"), Some("city required"));
        assert!(err.contains("address.zip"));
        assert_eq!(err.first_for_root("address").unwrap().field, "address.city");
    }

    #[tokio::test]
    async fn test_default_field_applies_to_every_item() {
        let tags = Rule::new()
            .of_type(RuleType::Array)
            .default_field(Rule::new().of_type(RuleType::String));
        let schema = Schema::new(RuleSet::new().with("tags", tags));

        assert!(run(&schema, json!({ "tags": ["a", "b"] })).await.is_ok());
        let err = detail(run(&schema, json!({ "tags": ["a", 2, "c"] })).await);
        assert_eq!(err.field_names().collect::<Vec<_>>(), vec!["tags.1"]);
    }

    #[tokio::test]
    async fn test_deep_skipped_when_parent_fails() {
        let rule = Rule::new()
            .of_type(RuleType::Object)
            .fields(RuleSet::new().with("inner", Rule::new().required()));
        let schema = Schema::new(RuleSet::new().with("obj", rule));
        let err = detail(run(&schema, json!({ "obj": "not an object" })).await);
        assert_eq!(err.field_names().collect::<Vec<_>>(), vec!["obj"]);
    }

    // ── Messages ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_custom_message_templates() {
        let mut messages = Messages::default();
        messages.set("required", "Please fill in %s");
        let schema =
            Schema::new(RuleSet::new().with("age", Rule::new().required())).with_messages(messages);
        let err = detail(run(&schema, json!({})).await);
        assert_eq!(err.first_message("age"), Some("Please fill in age"));
    }
}
