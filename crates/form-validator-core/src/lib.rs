//! # form-validator-core
//!
//! Core types, settings, and error types for the form-validator workspace.
//! This crate has zero workspace dependencies and provides the foundation for
//! the rule model and the form engine.
//!
//! ## Modules
//!
//! - [`error`] - Error types, structured validation failures, and result aliases
//! - [`settings`] - Engine settings and global configuration
//! - [`settings_loader`] - Loading settings from TOML, JSON, and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{FieldError, FormError, FormResult, ValidationError};
pub use settings::{Settings, SETTINGS};
