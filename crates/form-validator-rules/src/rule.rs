//! Rule descriptors.
//!
//! A [`Rule`] is a single declarative constraint attached to a field: a type
//! check, required-ness, a pattern, numeric or length bounds, an allowed
//! value list, or a custom (sync or async) predicate. Each rule carries an
//! optional [`TriggerSet`] that scopes when it applies, and an optional
//! [`Message`] that replaces every built-in message the rule produces.
//!
//! Rules are immutable once declared. Everything except closures
//! (transforms, custom validators, computed messages) round-trips through
//! serde, so rule sets can live in JSON or TOML files.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use form_validator_core::FormError;

use crate::rule_set::RuleSet;
use crate::trigger::TriggerSet;

/// Sync custom validator. Receives the (transformed) field value and the
/// whole source so cross-field rules can be expressed.
pub type ValidatorFn = Arc<dyn Fn(&Value, &Map<String, Value>) -> Result<(), RuleFailure> + Send + Sync>;

/// Async custom validator. Receives an owned copy of the field value.
pub type AsyncValidatorFn =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<(), RuleFailure>> + Send + Sync>;

/// Value transform applied before a rule's checks run.
pub type TransformFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Message-producing computation.
pub type MessageFn = Arc<dyn Fn() -> String + Send + Sync>;

/// The verdict of a custom validator that did not pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleFailure {
    /// The value is invalid. `None` defers to the rule's message, or the
    /// default message when the rule has none.
    Invalid(Option<String>),
    /// The validator could not reach a verdict (e.g. a lookup failed).
    Aborted(String),
}

impl RuleFailure {
    /// An invalid verdict with an explicit message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(Some(message.into()))
    }

    /// An invalid verdict that uses the rule's own message.
    pub const fn rejected() -> Self {
        Self::Invalid(None)
    }

    /// An aborted evaluation.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted(reason.into())
    }
}

/// The value type a rule expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    /// A string.
    #[default]
    String,
    /// Any number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// A string that compiles as a regular expression.
    Regexp,
    /// A number with no fractional part.
    Integer,
    /// A number with a fractional part.
    Float,
    /// An array.
    Array,
    /// A JSON object (not an array).
    Object,
    /// One of the values listed in `enum`.
    Enum,
    /// A date string (RFC 3339, `YYYY-MM-DD`, or `YYYY-MM-DDTHH:MM:SS`) or a
    /// millisecond timestamp.
    Date,
    /// An http(s) or ftp URL.
    Url,
    /// A hex color such as `#fff` or `a0b1c2`.
    Hex,
    /// An email address.
    Email,
    /// Anything.
    Any,
}

impl RuleType {
    /// Returns the lowercase name used in rule declarations and messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Regexp => "regexp",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Array => "array",
            Self::Object => "object",
            Self::Enum => "enum",
            Self::Date => "date",
            Self::Url => "url",
            Self::Hex => "hex",
            Self::Email => "email",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule's error message: fixed text or a computation evaluated each time
/// the rule fails.
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Message {
    /// Fixed text.
    Static(String),
    /// Text computed on demand (e.g. from the current locale).
    Dynamic(MessageFn),
}

impl Message {
    /// Creates a computed message.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    /// Produces the message text.
    pub fn render(&self) -> String {
        match self {
            Self::Static(s) => s.clone(),
            Self::Dynamic(f) => f(),
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(s) => f.debug_tuple("Static").field(s).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(<fn>)"),
        }
    }
}

impl From<String> for Message {
    fn from(s: String) -> Self {
        Self::Static(s)
    }
}

impl From<&str> for Message {
    fn from(s: &str) -> Self {
        Self::Static(s.to_string())
    }
}

impl From<Message> for String {
    fn from(message: Message) -> Self {
        message.render()
    }
}

/// A compiled regular expression that (de)serializes as its source text.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern(regex::Regex);

impl Pattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidPattern`] if `source` is not a valid regex.
    pub fn new(source: &str) -> Result<Self, FormError> {
        regex::Regex::new(source)
            .map(Self)
            .map_err(|e| FormError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })
    }

    /// Returns `true` if the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    /// Returns the pattern source.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.0.as_str())
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl From<regex::Regex> for Pattern {
    fn from(re: regex::Regex) -> Self {
        Self(re)
    }
}

impl TryFrom<String> for Pattern {
    type Error = FormError;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Self::new(&source)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.as_str().to_string()
    }
}

/// A single declarative constraint on a field.
///
/// # Examples
///
/// ```
/// use form_validator_rules::{Rule, RuleType, Trigger};
///
/// let rule = Rule::new()
///     .of_type(RuleType::Number)
///     .required()
///     .min(18.0)
///     .message("You must be an adult")
///     .trigger(Trigger::Blur);
/// assert!(rule.required);
/// assert_eq!(rule.min, Some(18.0));
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rule {
    /// Expected value type. `None` skips the type check.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<RuleType>,
    /// Whether an empty value (null, missing, `""`, `[]`) fails.
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    /// Pattern a string value must match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
    /// Lower bound: character count, array length, or numeric value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound: character count, array length, or numeric value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Exact character count, array length, or numeric value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<f64>,
    /// Allowed values.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    /// Whether a whitespace-only string fails.
    #[serde(skip_serializing_if = "is_false")]
    pub whitespace: bool,
    /// Message replacing every built-in message this rule produces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Triggers this rule is scoped to. `None` means always active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerSet>,
    /// Rules for named members of an object (or indices of an array).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<RuleSet>,
    /// Rules applied to every member of an object or array.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_field: Option<Box<RuleEntry>>,
    #[serde(skip)]
    pub transform: Option<TransformFn>,
    #[serde(skip)]
    pub validator: Option<ValidatorFn>,
    #[serde(skip)]
    pub async_validator: Option<AsyncValidatorFn>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(b: &bool) -> bool {
    !*b
}

impl Rule {
    /// Creates an empty rule that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the expected value type.
    #[must_use]
    pub fn of_type(mut self, rule_type: RuleType) -> Self {
        self.rule_type = Some(rule_type);
        self
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the message that replaces built-in messages.
    #[must_use]
    pub fn message(mut self, message: impl Into<Message>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets a computed message.
    #[must_use]
    pub fn message_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.message = Some(Message::computed(f));
        self
    }

    /// Scopes the rule to one or more triggers.
    #[must_use]
    pub fn trigger(mut self, trigger: impl Into<TriggerSet>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    /// Requires string values to match `pattern`.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<Pattern>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Sets the lower bound.
    #[must_use]
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the upper bound.
    #[must_use]
    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Sets the exact length (or value, for numbers).
    #[must_use]
    pub fn length(mut self, len: f64) -> Self {
        self.len = Some(len);
        self
    }

    /// Restricts the value to one of `values`.
    #[must_use]
    pub fn one_of<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Rejects whitespace-only strings.
    #[must_use]
    pub fn whitespace(mut self) -> Self {
        self.whitespace = true;
        self
    }

    /// Sets rules for named members of an object or array value.
    #[must_use]
    pub fn fields(mut self, fields: RuleSet) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Sets rules applied to every member of an object or array value.
    #[must_use]
    pub fn default_field(mut self, entry: impl Into<RuleEntry>) -> Self {
        self.default_field = Some(Box::new(entry.into()));
        self
    }

    /// Transforms the value before this rule's checks run.
    #[must_use]
    pub fn transform<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(f));
        self
    }

    /// Adds a synchronous custom validator.
    #[must_use]
    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Map<String, Value>) -> Result<(), RuleFailure> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    /// Adds an asynchronous custom validator.
    ///
    /// ```
    /// use form_validator_rules::{Rule, RuleFailure};
    ///
    /// let rule = Rule::new().async_validator(|value| async move {
    ///     if value == "taken" {
    ///         Err(RuleFailure::invalid("username is taken"))
    ///     } else {
    ///         Ok(())
    ///     }
    /// });
    /// assert!(rule.async_validator.is_some());
    /// ```
    #[must_use]
    pub fn async_validator<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RuleFailure>> + Send + 'static,
    {
        self.async_validator = Some(Arc::new(move |value| Box::pin(f(value))));
        self
    }

    /// Returns `true` if the rule is active for the requested triggers.
    ///
    /// A rule without triggers is always active.
    pub fn applies_to(&self, requested: TriggerSet) -> bool {
        self.trigger.map_or(true, |own| own.intersects(requested))
    }

    /// Returns `true` if the rule recurses into members of its value.
    pub const fn is_deep(&self) -> bool {
        self.fields.is_some() || self.default_field.is_some()
    }

    /// Renders the rule's own message, if it has one.
    pub fn rendered_message(&self) -> Option<String> {
        self.message.as_ref().map(Message::render)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("rule_type", &self.rule_type)
            .field("required", &self.required)
            .field("pattern", &self.pattern)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("len", &self.len)
            .field("enum_values", &self.enum_values)
            .field("whitespace", &self.whitespace)
            .field("message", &self.message)
            .field("trigger", &self.trigger)
            .field("fields", &self.fields)
            .field("default_field", &self.default_field)
            .field("transform", &self.transform.is_some())
            .field("validator", &self.validator.is_some())
            .field("async_validator", &self.async_validator.is_some())
            .finish()
    }
}

/// One rule or an ordered list of rules declared for a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleEntry {
    /// Several rules, evaluated in declaration order.
    ///
    /// Listed first: `Rule` also accepts a sequence, which would turn `[]`
    /// into one default rule.
    Many(Vec<Rule>),
    /// A single rule.
    One(Box<Rule>),
}

impl RuleEntry {
    /// Returns the rules as a slice; a single rule becomes a one-element slice.
    pub fn as_slice(&self) -> &[Rule] {
        match self {
            Self::One(rule) => std::slice::from_ref(rule.as_ref()),
            Self::Many(rules) => rules,
        }
    }

    /// Consumes the entry and returns its rules.
    pub fn into_vec(self) -> Vec<Rule> {
        match self {
            Self::One(rule) => vec![*rule],
            Self::Many(rules) => rules,
        }
    }
}

impl From<Rule> for RuleEntry {
    fn from(rule: Rule) -> Self {
        Self::One(Box::new(rule))
    }
}

impl From<Vec<Rule>> for RuleEntry {
    fn from(rules: Vec<Rule>) -> Self {
        Self::Many(rules)
    }
}

impl<const N: usize> From<[Rule; N]> for RuleEntry {
    fn from(rules: [Rule; N]) -> Self {
        Self::Many(rules.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::Trigger;
    use serde_json::json;

    #[test]
    fn test_builder_sets_fields() {
        let rule = Rule::new()
            .of_type(RuleType::String)
            .required()
            .min(3.0)
            .max(10.0)
            .whitespace()
            .message("bad name")
            .trigger([Trigger::Blur, Trigger::Change]);
        assert_eq!(rule.rule_type, Some(RuleType::String));
        assert!(rule.required);
        assert_eq!(rule.min, Some(3.0));
        assert_eq!(rule.max, Some(10.0));
        assert!(rule.whitespace);
        assert_eq!(rule.rendered_message().as_deref(), Some("bad name"));
        assert_eq!(rule.trigger, Some(TriggerSet::ALL));
    }

    #[test]
    fn test_applies_to() {
        let untriggered = Rule::new();
        assert!(untriggered.applies_to(Trigger::Change.into()));

        let blur_only = Rule::new().trigger(Trigger::Blur);
        assert!(blur_only.applies_to(Trigger::Blur.into()));
        assert!(!blur_only.applies_to(Trigger::Change.into()));
        assert!(blur_only.applies_to(TriggerSet::ALL));
    }

    #[test]
    fn test_computed_message() {
        let rule = Rule::new().message_fn(|| format!("{} required", "age"));
        assert_eq!(rule.rendered_message().as_deref(), Some("age required"));
    }

    #[test]
    fn test_pattern_invalid() {
        let err = Pattern::new("(unclosed").unwrap_err();
        assert!(matches!(err, FormError::InvalidPattern { .. }));
    }

    #[test]
    fn test_deserialize_rule() {
        let rule: Rule = serde_json::from_value(json!({
            "type": "number",
            "required": true,
            "message": "age required",
            "trigger": "blur",
            "min": 0,
            "enum": [1, 2, 3]
        }))
        .unwrap();
        assert_eq!(rule.rule_type, Some(RuleType::Number));
        assert!(rule.required);
        assert_eq!(rule.rendered_message().as_deref(), Some("age required"));
        assert_eq!(rule.trigger, Some(Trigger::Blur.into()));
        assert_eq!(rule.min, Some(0.0));
        assert_eq!(rule.enum_values, Some(vec![json!(1), json!(2), json!(3)]));
    }

    #[test]
    fn test_deserialize_pattern_and_nested() {
        let rule: Rule = serde_json::from_value(json!({
            "type": "object",
            "fields": { "zip": { "pattern": "^\\d{5}$" } },
            "defaultField": [{ "type": "string" }]
        }))
        .unwrap();
        assert!(rule.is_deep());
        let zip = rule.fields.as_ref().unwrap().get("zip").unwrap();
        assert!(zip.as_slice()[0].pattern.as_ref().unwrap().is_match("12345"));
        assert_eq!(rule.default_field.as_ref().unwrap().as_slice().len(), 1);
    }

    #[test]
    fn test_deserialize_bad_pattern_fails() {
        let result: Result<Rule, _> = serde_json::from_value(json!({ "pattern": "[" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_skips_defaults() {
        let rule = Rule::new().required().message("m");
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json, json!({ "required": true, "message": "m" }));
    }

    #[test]
    fn test_entry_as_slice() {
        let one = RuleEntry::from(Rule::new().required());
        assert_eq!(one.as_slice().len(), 1);
        let many = RuleEntry::from([Rule::new(), Rule::new().required()]);
        assert_eq!(many.as_slice().len(), 2);
        assert!(many.into_vec()[1].required);
    }

    #[test]
    fn test_entry_deserialize_one_or_many() {
        let one: RuleEntry = serde_json::from_value(json!({ "required": true })).unwrap();
        assert!(matches!(one, RuleEntry::One(_)));
        let many: RuleEntry =
            serde_json::from_value(json!([{ "required": true }, { "type": "email" }])).unwrap();
        assert_eq!(many.as_slice().len(), 2);
    }

    #[tokio::test]
    async fn test_async_validator_closure() {
        let rule = Rule::new().async_validator(|value| async move {
            if value == json!("taken") {
                Err(RuleFailure::invalid("taken"))
            } else {
                Ok(())
            }
        });
        let f = rule.async_validator.unwrap();
        assert_eq!(f(json!("free")).await, Ok(()));
        assert_eq!(f(json!("taken")).await, Err(RuleFailure::invalid("taken")));
    }

    #[test]
    fn test_rule_debug_hides_closures() {
        let rule = Rule::new().validator(|_, _| Ok(()));
        let debug = format!("{rule:?}");
        assert!(debug.contains("validator: true"));
    }
}
