//! Default message templates.
//!
//! Templates use `%s` placeholders filled positionally; the first argument
//! is always the field path. Any template can be replaced by key through
//! [`Messages::set`] or in bulk from the `messages` table in settings.

use std::collections::HashMap;

/// Message templates keyed by dotted message key.
///
/// # Examples
///
/// ```
/// use form_validator_rules::Messages;
///
/// let mut messages = Messages::default();
/// assert_eq!(messages.render("required", &["age"]), "age is required");
///
/// messages.set("required", "Please fill in %s");
/// assert_eq!(messages.render("required", &["age"]), "Please fill in age");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Messages {
    overrides: HashMap<String, String>,
}

impl Messages {
    /// Creates messages with the given overrides on top of the defaults.
    pub fn with_overrides(overrides: HashMap<String, String>) -> Self {
        Self { overrides }
    }

    /// Replaces the template for `key`.
    pub fn set(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.overrides.insert(key.into(), template.into());
    }

    /// Returns the template for `key`, falling back to the generic default.
    pub fn template(&self, key: &str) -> &str {
        self.overrides
            .get(key)
            .map(String::as_str)
            .or_else(|| default_template(key))
            .unwrap_or_else(|| self.template("default"))
    }

    /// Renders the template for `key` with positional arguments.
    pub fn render(&self, key: &str, args: &[&str]) -> String {
        format_template(self.template(key), args)
    }
}

/// Replaces each `%s` in `template` with the next argument.
///
/// Surplus placeholders are left as-is; surplus arguments are ignored.
pub fn format_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;
    while let Some(pos) = rest.find("%s") {
        out.push_str(&rest[..pos]);
        match args.next() {
            Some(arg) => out.push_str(arg),
            None => out.push_str("%s"),
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

fn default_template(key: &str) -> Option<&'static str> {
    let template = match key {
        "default" => "Validation error on field %s",
        "required" => "%s is required",
        "enum" => "%s must be one of %s",
        "whitespace" => "%s cannot be empty",
        "date.invalid" => "%s date %s is invalid",
        "types.string" | "types.array" | "types.object" | "types.number" | "types.date"
        | "types.boolean" | "types.integer" | "types.float" | "types.regexp" => "%s is not a %s",
        "types.email" | "types.url" | "types.hex" => "%s is not a valid %s",
        "string.len" => "%s must be exactly %s characters",
        "string.min" => "%s must be at least %s characters",
        "string.max" => "%s cannot be longer than %s characters",
        "string.range" => "%s must be between %s and %s characters",
        "number.len" => "%s must equal %s",
        "number.min" => "%s cannot be less than %s",
        "number.max" => "%s cannot be greater than %s",
        "number.range" => "%s must be between %s and %s",
        "array.len" => "%s must be exactly %s in length",
        "array.min" => "%s cannot be less than %s in length",
        "array.max" => "%s cannot be greater than %s in length",
        "array.range" => "%s must be between %s and %s in length",
        "pattern.mismatch" => "%s value %s does not match pattern %s",
        _ => return None,
    };
    Some(template)
}
