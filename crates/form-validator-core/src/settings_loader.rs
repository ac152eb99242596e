//! Settings loading from configuration files.
//!
//! This module provides functions to load [`Settings`] from TOML files, JSON
//! files, and to apply environment variable overrides.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (overriding defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `FORM_VALIDATOR_DEBUG` | `debug` |
//! | `FORM_VALIDATOR_LOG_LEVEL` | `log_level` |
//! | `FORM_VALIDATOR_VALIDATE_ON_BLUR` | `validate_on_blur` |
//! | `FORM_VALIDATOR_VALIDATE_ON_CHANGE` | `validate_on_change` |
//! | `FORM_VALIDATOR_DEBOUNCE_MS` | `debounce_ms` |
//! | `FORM_VALIDATOR_FIRST_FIELDS` | `first_fields` |
//! | `FORM_VALIDATOR_SEQUENCE_GUARD` | `sequence_guard` |
//! | `FORM_VALIDATOR_SHOW_MESSAGE` | `show_message` |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use form_validator_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file("config/forms.toml").unwrap();
//! let settings = settings_loader::from_json_file_with_env("config/forms.json").unwrap();
//! ```

use std::path::Path;

use crate::error::FormError;
use crate::settings::Settings;

const ENV_PREFIX: &str = "FORM_VALIDATOR_";

/// Loads settings from a TOML string.
///
/// Any settings not present in the TOML keep their default values.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, FormError> {
    // Deserialize into a serde_json::Value first and merge over the defaults
    // so that partial files are accepted.
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| FormError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    merge_into_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, FormError> {
    let content = read_config(path.as_ref(), "TOML")?;
    from_toml_str(&content)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, FormError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<Settings, FormError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| FormError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;

    merge_into_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, FormError> {
    let content = read_config(path.as_ref(), "JSON")?;
    from_json_str(&content)
}

/// Loads settings from a JSON file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file_with_env(path: impl AsRef<Path>) -> Result<Settings, FormError> {
    let mut settings = from_json_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies environment variable overrides to a settings struct.
///
/// Boolean variables accept "true"/"1"/"yes" as true and anything else as
/// false. Numeric variables that fail to parse are ignored.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Some(val) = env_var("DEBUG") {
        settings.debug = parse_bool(&val);
    }

    if let Some(val) = env_var("LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Some(val) = env_var("VALIDATE_ON_BLUR") {
        settings.validate_on_blur = parse_bool(&val);
    }

    if let Some(val) = env_var("VALIDATE_ON_CHANGE") {
        settings.validate_on_change = parse_bool(&val);
    }

    if let Some(val) = env_var("DEBOUNCE_MS") {
        if let Ok(ms) = val.trim().parse::<u64>() {
            settings.debounce_ms = ms;
        }
    }

    if let Some(val) = env_var("FIRST_FIELDS") {
        settings.first_fields = parse_bool(&val);
    }

    if let Some(val) = env_var("SEQUENCE_GUARD") {
        settings.sequence_guard = parse_bool(&val);
    }

    if let Some(val) = env_var("SHOW_MESSAGE") {
        settings.show_message = parse_bool(&val);
    }
}

// ============================================================
// Helpers
// ============================================================

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}")).ok()
}

fn parse_bool(val: &str) -> bool {
    matches!(val.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn read_config(path: &Path, kind: &str) -> Result<String, FormError> {
    std::fs::read_to_string(path).map_err(|e| {
        FormError::ConfigurationError(format!(
            "Failed to read {kind} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_into_defaults(value: serde_json::Value, kind: &str) -> Result<Settings, FormError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        FormError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        FormError::ConfigurationError(format!("Failed to deserialize settings from {kind}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = if let Some(base_v) = base_map.remove(&key) {
                    merge_json(base_v, override_v)
                } else {
                    override_v
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── TOML loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_str_basic() {
        let toml = r#"
            debug = false
            validate_on_change = false
            debounce_ms = 150
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert!(!settings.debug);
        assert!(!settings.validate_on_change);
        assert_eq!(settings.debounce_ms, 150);
        // Defaults preserved
        assert!(settings.validate_on_blur);
        assert!(settings.sequence_guard);
    }

    #[test]
    fn test_from_toml_str_messages() {
        let toml = r#"
            [messages]
            required = "%s must be provided"
            "types.email" = "%s is not an email address"
        "#;

        let settings = from_toml_str(toml).unwrap();
        assert_eq!(settings.messages.len(), 2);
        assert_eq!(settings.messages["required"], "%s must be provided");
    }

    #[test]
    fn test_from_toml_str_empty() {
        let settings = from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let result = from_toml_str("this is [not valid");
        assert!(matches!(result, Err(FormError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_toml_str_wrong_type() {
        let result = from_toml_str("debounce_ms = \"soon\"");
        assert!(result.is_err());
    }

    // ── JSON loading ────────────────────────────────────────────────

    #[test]
    fn test_from_json_str_basic() {
        let json = r#"{"first_fields": false, "log_level": "debug"}"#;
        let settings = from_json_str(json).unwrap();
        assert!(!settings.first_fields);
        assert_eq!(settings.log_level, "debug");
        assert!(settings.show_message);
    }

    #[test]
    fn test_from_json_str_empty_object() {
        let settings = from_json_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_from_json_str_invalid() {
        assert!(from_json_str("{not json").is_err());
    }

    // ── File loading ────────────────────────────────────────────────

    #[test]
    fn test_from_toml_file() {
        let dir = std::env::temp_dir().join("form_validator_test_toml");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("forms.toml");
        std::fs::write(&path, "sequence_guard = false\n").unwrap();

        let settings = from_toml_file(&path).unwrap();
        assert!(!settings.sequence_guard);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_from_json_file() {
        let dir = std::env::temp_dir().join("form_validator_test_json");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("forms.json");
        std::fs::write(&path, r#"{"show_message": false}"#).unwrap();

        let settings = from_json_file(&path).unwrap();
        assert!(!settings.show_message);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_from_toml_file_missing() {
        let result = from_toml_file("/nonexistent/forms.toml");
        assert!(matches!(result, Err(FormError::ConfigurationError(_))));
    }

    #[test]
    fn test_from_json_file_missing() {
        assert!(from_json_file("/nonexistent/forms.json").is_err());
    }

    // ── Environment overrides ───────────────────────────────────────
    // Each test touches a distinct variable so they can run in parallel.

    #[test]
    fn test_apply_env_overrides_debounce() {
        let mut settings = Settings::default();
        std::env::set_var("FORM_VALIDATOR_DEBOUNCE_MS", "300");
        apply_env_overrides(&mut settings);
        assert_eq!(settings.debounce_ms, 300);
        std::env::remove_var("FORM_VALIDATOR_DEBOUNCE_MS");
    }

    #[test]
    fn test_apply_env_overrides_sequence_guard_false() {
        let mut settings = Settings::default();
        std::env::set_var("FORM_VALIDATOR_SEQUENCE_GUARD", "false");
        apply_env_overrides(&mut settings);
        assert!(!settings.sequence_guard);
        std::env::remove_var("FORM_VALIDATOR_SEQUENCE_GUARD");
    }

    #[test]
    fn test_apply_env_overrides_show_message_one() {
        let mut settings = Settings::default();
        settings.show_message = false;
        std::env::set_var("FORM_VALIDATOR_SHOW_MESSAGE", "1");
        apply_env_overrides(&mut settings);
        assert!(settings.show_message);
        std::env::remove_var("FORM_VALIDATOR_SHOW_MESSAGE");
    }

    #[test]
    fn test_apply_env_overrides_log_level() {
        let mut settings = Settings::default();
        std::env::set_var("FORM_VALIDATOR_LOG_LEVEL", "trace");
        apply_env_overrides(&mut settings);
        assert_eq!(settings.log_level, "trace");
        std::env::remove_var("FORM_VALIDATOR_LOG_LEVEL");
    }

    // ── Helpers ─────────────────────────────────────────────────────

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("YES"));
        assert!(parse_bool(" 1 "));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("nope"));
    }

    #[test]
    fn test_merge_json_nested() {
        let base = serde_json::json!({"a": 1, "b": {"c": 2, "d": 3}});
        let over = serde_json::json!({"b": {"c": 20}, "e": 5});
        let merged = merge_json(base, over);
        assert_eq!(merged, serde_json::json!({"a": 1, "b": {"c": 20, "d": 3}, "e": 5}));
    }
}
