//! Mapping from field name to declared rules.
//!
//! A [`RuleSet`] is owned by a form and read by everything else. Iteration
//! order is the sorted field order, so evaluation results are deterministic
//! regardless of how the set was declared.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use form_validator_core::FormError;

use crate::rule::{Rule, RuleEntry};

/// A mapping from field name to one rule or an ordered list of rules.
///
/// # Examples
///
/// ```
/// use form_validator_rules::{Rule, RuleSet, RuleType};
///
/// let rules = RuleSet::new()
///     .with("name", Rule::new().required().message("name required"))
///     .with("age", vec![
///         Rule::new().required(),
///         Rule::new().of_type(RuleType::Integer).min(0.0),
///     ]);
/// assert_eq!(rules.len(), 2);
/// assert_eq!(rules.get("age").unwrap().as_slice().len(), 2);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    entries: BTreeMap<String, RuleEntry>,
}

impl RuleSet {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the rules for `field`, builder style.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, entry: impl Into<RuleEntry>) -> Self {
        self.insert(field, entry);
        self
    }

    /// Adds (or replaces) the rules for `field`.
    pub fn insert(&mut self, field: impl Into<String>, entry: impl Into<RuleEntry>) {
        self.entries.insert(field.into(), entry.into());
    }

    /// Appends `rules` after any rules already declared for `field`.
    pub fn merge_field(&mut self, field: &str, rules: Vec<Rule>) {
        if rules.is_empty() {
            return;
        }
        let merged = match self.entries.remove(field) {
            Some(existing) => {
                let mut all = existing.into_vec();
                all.extend(rules);
                all
            }
            None => rules,
        };
        self.entries.insert(field.to_string(), RuleEntry::Many(merged));
    }

    /// Returns the rules declared for `field`.
    pub fn get(&self, field: &str) -> Option<&RuleEntry> {
        self.entries.get(field)
    }

    /// Returns `true` if `field` has declared rules.
    pub fn contains(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    /// Iterates over declared field names in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over `(field, entry)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of fields with declared rules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no field has declared rules.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a reduced rule set holding only the requested fields.
    ///
    /// Requested fields with no declared rules are silently dropped.
    pub fn subset<S: AsRef<str>>(&self, fields: &[S]) -> Self {
        let entries = fields
            .iter()
            .filter_map(|f| {
                let name = f.as_ref();
                self.entries
                    .get(name)
                    .map(|entry| (name.to_string(), entry.clone()))
            })
            .collect();
        Self { entries }
    }

    /// Parses a rule set from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::SerializationError`] if the JSON is malformed or
    /// declares an invalid rule (e.g. an uncompilable pattern).
    pub fn from_json_str(json: &str) -> Result<Self, FormError> {
        serde_json::from_str(json)
            .map_err(|e| FormError::SerializationError(format!("Invalid rule set JSON: {e}")))
    }

    /// Parses a rule set from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::SerializationError`] if the TOML is malformed or
    /// declares an invalid rule.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, FormError> {
        toml::from_str(toml_str)
            .map_err(|e| FormError::SerializationError(format!("Invalid rule set TOML: {e}")))
    }
}

impl<K: Into<String>, E: Into<RuleEntry>> FromIterator<(K, E)> for RuleSet {
    fn from_iter<I: IntoIterator<Item = (K, E)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, e)| (k.into(), e.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleType;
    use crate::trigger::Trigger;

    fn sample() -> RuleSet {
        RuleSet::new()
            .with("a", Rule::new().required())
            .with("b", vec![Rule::new().required(), Rule::new().min(2.0)])
    }

    #[test]
    fn test_fields_sorted() {
        let rules = RuleSet::new()
            .with("zeta", Rule::new())
            .with("alpha", Rule::new());
        let fields: Vec<&str> = rules.fields().collect();
        assert_eq!(fields, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_subset_drops_unknown() {
        let rules = sample();
        let reduced = rules.subset(&["b", "missing"]);
        assert_eq!(reduced.len(), 1);
        assert!(reduced.contains("b"));
        assert!(!reduced.contains("missing"));
        // The original is untouched.
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_subset_of_nothing_declared_is_empty() {
        let rules = RuleSet::new().with("a", Rule::new().required());
        assert!(rules.subset(&["b"]).is_empty());
    }

    #[test]
    fn test_merge_field_appends() {
        let mut rules = sample();
        rules.merge_field("a", vec![Rule::new().of_type(RuleType::Email)]);
        let a = rules.get("a").unwrap().as_slice();
        assert_eq!(a.len(), 2);
        assert!(a[0].required);
        assert_eq!(a[1].rule_type, Some(RuleType::Email));

        rules.merge_field("c", vec![Rule::new()]);
        assert!(rules.contains("c"));

        rules.merge_field("d", Vec::new());
        assert!(!rules.contains("d"));
    }

    #[test]
    fn test_from_json_str() {
        let rules = RuleSet::from_json_str(
            r#"{
                "age": { "type": "number", "required": true, "message": "age required" },
                "email": [
                    { "required": true, "trigger": "blur" },
                    { "type": "email", "trigger": ["blur", "change"] }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 2);
        let email = rules.get("email").unwrap().as_slice();
        assert_eq!(email[0].trigger, Some(Trigger::Blur.into()));
    }

    #[test]
    fn test_from_json_str_empty_list_declares_no_rules() {
        let rules = RuleSet::from_json_str(
            r#"{ "tags": [], "age": { "required": true } }"#,
        )
        .unwrap();
        assert!(matches!(rules.get("tags"), Some(RuleEntry::Many(list)) if list.is_empty()));
        assert!(matches!(rules.get("age"), Some(RuleEntry::One(_))));
        assert!(crate::selector::select_rules(Some(&rules), "tags", None).is_empty());
        assert_eq!(crate::selector::select_rules(Some(&rules), "age", None).len(), 1);
    }

    #[test]
    fn test_from_toml_str_empty_list_declares_no_rules() {
        let rules = RuleSet::from_toml_str("tags = []\n").unwrap();
        assert!(rules.get("tags").unwrap().as_slice().is_empty());
    }

    #[test]
    fn test_from_json_str_invalid() {
        let err = RuleSet::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, FormError::SerializationError(_)));
    }

    #[test]
    fn test_from_toml_str() {
        let rules = RuleSet::from_toml_str(
            r#"
            [username]
            required = true
            min = 3
            message = "username must be at least 3 characters"

            [[tags]]
            type = "array"
            max = 5
            "#,
        )
        .unwrap();
        assert_eq!(rules.get("username").unwrap().as_slice()[0].min, Some(3.0));
        assert_eq!(
            rules.get("tags").unwrap().as_slice()[0].rule_type,
            Some(RuleType::Array)
        );
    }

    #[test]
    fn test_from_iter() {
        let rules: RuleSet = vec![("x", Rule::new()), ("y", Rule::new())]
            .into_iter()
            .collect();
        assert_eq!(rules.len(), 2);
    }
}
