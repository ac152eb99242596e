//! Settings for the form-validator engine.
//!
//! This module provides the [`Settings`] struct, which holds every knob the
//! engine and the form layer consult, and [`LazySettings`], a globally
//! accessible, lazily-initialized settings instance.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// The complete set of engine settings.
///
/// Every field has a sensible default, so a partial TOML or JSON file only
/// needs to name what it changes.
///
/// # Examples
///
/// ```
/// use form_validator_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.validate_on_blur);
/// assert!(settings.sequence_guard);
/// assert_eq!(settings.debounce_ms, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,

    // ── Triggers ─────────────────────────────────────────────────────

    /// Whether field blur events run `blur`-triggered rules.
    pub validate_on_blur: bool,
    /// Whether field value changes run `change`-triggered rules.
    pub validate_on_change: bool,
    /// Debounce window for change-triggered validation, in milliseconds.
    /// Zero disables debouncing.
    pub debounce_ms: u64,

    // ── Evaluation ───────────────────────────────────────────────────

    /// Stop evaluating a field after its first failing rule.
    pub first_fields: bool,
    /// Discard results of a field validation that was superseded by a newer
    /// call (or by a clear/reset) for the same field.
    pub sequence_guard: bool,

    // ── Display ──────────────────────────────────────────────────────

    /// Default for whether mounted fields display their message.
    pub show_message: bool,
    /// Overrides for default message templates, keyed by dotted message key
    /// (e.g. `required`, `types.email`, `string.min`).
    pub messages: HashMap<String, String>,

    // ── Logging ──────────────────────────────────────────────────────

    /// Log filter directive (e.g. "info", "`form_validator_forms=debug`").
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Core
            debug: true,

            // Triggers
            validate_on_blur: true,
            validate_on_change: true,
            debounce_ms: 0,

            // Evaluation
            first_fields: true,
            sequence_guard: true,

            // Display
            show_message: true,
            messages: HashMap::new(),

            // Logging
            log_level: "info".to_string(),
        }
    }
}

/// A lazily-initialized, globally accessible settings container.
///
/// This wraps a [`OnceLock<Settings>`] so that settings can be configured
/// exactly once at application startup and then accessed from anywhere.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Creates a new, unconfigured `LazySettings`.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Configures the global settings. Must be called exactly once.
    ///
    /// # Panics
    ///
    /// Panics if settings have already been configured.
    pub fn configure(&self, settings: Settings) {
        self.inner
            .set(settings)
            .expect("Settings have already been configured");
    }

    /// Returns a reference to the configured settings.
    ///
    /// # Panics
    ///
    /// Panics if settings have not been configured.
    pub fn get(&self) -> &Settings {
        self.inner
            .get()
            .expect("Settings have not been configured. Call SETTINGS.configure() first.")
    }

    /// Returns the configured settings, or defaults if none were configured.
    pub fn get_or_default(&self) -> Settings {
        self.inner.get().cloned().unwrap_or_default()
    }

    /// Returns `true` if settings have been configured.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings instance.
///
/// Call `SETTINGS.configure(settings)` once at application startup. Forms
/// created without explicit settings fall back to
/// [`LazySettings::get_or_default`].
pub static SETTINGS: LazySettings = LazySettings::new();
