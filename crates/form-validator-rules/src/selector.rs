//! Trigger-aware rule selection.
//!
//! [`select_rules`] is the pure function every validation path starts from:
//! given a rule set, a field name, and an optional trigger filter, it returns
//! the ordered rules that apply.

use crate::rule::Rule;
use crate::rule_set::RuleSet;
use crate::trigger::TriggerSet;

/// Returns the ordered rules that apply to `field` for `trigger`.
///
/// - A missing rule set or an undeclared field yields an empty list.
/// - A single declared rule becomes a one-element list.
/// - Without a trigger, every rule for the field is returned unmodified.
/// - With a trigger, a rule is kept if it declares no trigger or if its
///   triggers intersect the requested ones.
///
/// The input rule set is never modified.
///
/// # Examples
///
/// ```
/// use form_validator_rules::{select_rules, Rule, RuleSet, Trigger};
///
/// let rules = RuleSet::new().with("email", vec![
///     Rule::new().required(),
///     Rule::new().trigger(Trigger::Blur).message("checked on blur"),
/// ]);
///
/// assert_eq!(select_rules(Some(&rules), "email", None).len(), 2);
/// assert_eq!(select_rules(Some(&rules), "email", Some(Trigger::Change.into())).len(), 1);
/// assert!(select_rules(None, "email", None).is_empty());
/// ```
pub fn select_rules(rules: Option<&RuleSet>, field: &str, trigger: Option<TriggerSet>) -> Vec<Rule> {
    let Some(entry) = rules.and_then(|r| r.get(field)) else {
        return Vec::new();
    };

    let declared = entry.as_slice();
    match trigger {
        None => declared.to_vec(),
        Some(requested) => declared
            .iter()
            .filter(|rule| rule.applies_to(requested))
            .cloned()
            .collect(),
    }
}
