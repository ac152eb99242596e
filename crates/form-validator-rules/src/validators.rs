//! Built-in constraint checks.
//!
//! [`check_rule`] runs every declarative constraint of one [`Rule`] against a
//! value and returns the messages of the checks that failed. Custom
//! validators are not run here; the schema evaluator handles them after the
//! built-in checks pass.
//!
//! Order of checks: required, then (for non-empty values) type, range,
//! pattern, enum, whitespace. A non-required empty value skips everything.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::messages::Messages;
use crate::rule::{Rule, RuleType};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});

static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i)(https?|ftp)://[^\s/$.?#][^\s]*$").expect("valid regex")
});

static HEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)#?([a-f0-9]{6}|[a-f0-9]{3})$").expect("valid regex"));

/// Returns `true` for values that count as "not provided".
///
/// Null (which also stands for a missing key), the empty string, and the
/// empty array are empty.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

/// Runs the built-in checks of `rule` against `value`.
///
/// `field` is the path used in messages. When the rule declares its own
/// message, every failing check reports that message instead.
pub fn check_rule(rule: &Rule, value: &Value, field: &str, messages: &Messages) -> Vec<String> {
    let mut errors = Vec::new();

    if is_empty_value(value) {
        if rule.required {
            errors.push(messages.render("required", &[field]));
        }
    } else {
        if let Some(rule_type) = rule.rule_type {
            if let Some(err) = check_type(rule_type, value, field, messages) {
                errors.push(err);
            }
        }
        if let Some(err) = check_range(rule, value, field, messages) {
            errors.push(err);
        }
        if let Some(err) = check_pattern(rule, value, field, messages) {
            errors.push(err);
        }
        if let Some(err) = check_enum(rule, value, field, messages) {
            errors.push(err);
        }
        if let Some(err) = check_whitespace(rule, value, field, messages) {
            errors.push(err);
        }
    }

    if let Some(own) = rule.rendered_message() {
        for err in &mut errors {
            err.clone_from(&own);
        }
    }
    errors
}

/// Returns `true` if `value` has the shape `rule_type` expects.
pub fn matches_type(rule_type: RuleType, value: &Value) -> bool {
    match rule_type {
        RuleType::String => value.is_string(),
        RuleType::Number => value.is_number(),
        RuleType::Boolean => value.is_boolean(),
        RuleType::Integer => is_integer(value),
        RuleType::Float => value.is_number() && !is_integer(value),
        RuleType::Array => value.is_array(),
        RuleType::Object => value.is_object(),
        RuleType::Regexp => value.as_str().is_some_and(|s| Regex::new(s).is_ok()),
        RuleType::Date => is_date(value),
        RuleType::Email => value.as_str().is_some_and(|s| EMAIL_RE.is_match(s)),
        RuleType::Url => value.as_str().is_some_and(|s| URL_RE.is_match(s)),
        RuleType::Hex => value.as_str().is_some_and(|s| HEX_RE.is_match(s)),
        RuleType::Enum | RuleType::Any => true,
    }
}

fn check_type(rule_type: RuleType, value: &Value, field: &str, messages: &Messages) -> Option<String> {
    if matches_type(rule_type, value) {
        return None;
    }
    if rule_type == RuleType::Date && value.is_string() {
        return Some(messages.render("date.invalid", &[field, &display_value(value)]));
    }
    let key = format!("types.{}", rule_type.as_str());
    Some(messages.render(&key, &[field, rule_type.as_str()]))
}

fn check_range(rule: &Rule, value: &Value, field: &str, messages: &Messages) -> Option<String> {
    if rule.len.is_none() && rule.min.is_none() && rule.max.is_none() {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let (measure, family) = match value {
        Value::String(s) => (s.chars().count() as f64, "string"),
        Value::Array(a) => (a.len() as f64, "array"),
        Value::Number(n) => (n.as_f64()?, "number"),
        _ => return None,
    };

    let fmt = |n: f64| format_number(n);

    if let Some(len) = rule.len {
        #[allow(clippy::float_cmp)]
        if measure != len {
            return Some(messages.render(&format!("{family}.len"), &[field, &fmt(len)]));
        }
        return None;
    }

    match (rule.min, rule.max) {
        (Some(min), None) if measure < min => {
            Some(messages.render(&format!("{family}.min"), &[field, &fmt(min)]))
        }
        (None, Some(max)) if measure > max => {
            Some(messages.render(&format!("{family}.max"), &[field, &fmt(max)]))
        }
        (Some(min), Some(max)) if measure < min || measure > max => Some(messages.render(
            &format!("{family}.range"),
            &[field, &fmt(min), &fmt(max)],
        )),
        _ => None,
    }
}

fn check_pattern(rule: &Rule, value: &Value, field: &str, messages: &Messages) -> Option<String> {
    let pattern = rule.pattern.as_ref()?;
    let text = value.as_str()?;
    if pattern.is_match(text) {
        None
    } else {
        Some(messages.render("pattern.mismatch", &[field, text, pattern.as_str()]))
    }
}

fn check_enum(rule: &Rule, value: &Value, field: &str, messages: &Messages) -> Option<String> {
    let allowed = rule.enum_values.as_ref()?;
    if allowed.contains(value) {
        return None;
    }
    let listed: Vec<String> = allowed.iter().map(display_value).collect();
    Some(messages.render("enum", &[field, &listed.join(", ")]))
}

fn check_whitespace(rule: &Rule, value: &Value, field: &str, messages: &Messages) -> Option<String> {
    if !rule.whitespace {
        return None;
    }
    match value {
        Value::String(s) if s.trim().is_empty() => Some(messages.render("whitespace", &[field])),
        _ => None,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
        _ => false,
    }
}

fn is_date(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64(),
        Value::String(s) => {
            chrono::DateTime::parse_from_rfc3339(s).is_ok()
                || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
                || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
        }
        _ => false,
    }
}

/// Formats whole numbers without a trailing `.0`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)]
        let whole = n as i64;
        whole.to_string()
    } else {
        n.to_string()
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
