//! UI event classes that cause rules to run.
//!
//! A rule may declare one trigger, several, or none. A rule with no trigger
//! is always active; a rule with triggers only runs when the requested
//! trigger set intersects its own.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use form_validator_core::FormError;

/// The UI event class that should cause a rule to be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// The field lost focus.
    Blur,
    /// The field's value changed.
    Change,
}

impl Trigger {
    /// Returns the lowercase name used in rule declarations.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blur => "blur",
            Self::Change => "change",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trigger {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "blur" => Ok(Self::Blur),
            "change" => Ok(Self::Change),
            other => Err(FormError::ConfigurationError(format!(
                "Unknown trigger '{other}' (expected 'blur' or 'change')"
            ))),
        }
    }
}

/// A set of triggers.
///
/// Deserializes from either a single trigger name (`"blur"`) or a list
/// (`["blur", "change"]`), matching how rules are usually declared.
///
/// ```
/// use form_validator_rules::{Trigger, TriggerSet};
///
/// let set: TriggerSet = serde_json::from_str(r#"["blur", "change"]"#).unwrap();
/// assert!(set.contains(Trigger::Blur));
/// assert!(set.intersects(TriggerSet::from(Trigger::Change)));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "TriggerRepr", into = "TriggerRepr")]
pub struct TriggerSet {
    blur: bool,
    change: bool,
}

impl TriggerSet {
    /// An empty set.
    pub const EMPTY: Self = Self {
        blur: false,
        change: false,
    };

    /// Both triggers.
    pub const ALL: Self = Self {
        blur: true,
        change: true,
    };

    /// Adds a trigger to the set.
    #[must_use]
    pub const fn with(mut self, trigger: Trigger) -> Self {
        match trigger {
            Trigger::Blur => self.blur = true,
            Trigger::Change => self.change = true,
        }
        self
    }

    /// Returns `true` if the set holds `trigger`.
    pub const fn contains(self, trigger: Trigger) -> bool {
        match trigger {
            Trigger::Blur => self.blur,
            Trigger::Change => self.change,
        }
    }

    /// Returns `true` if the two sets share at least one trigger.
    pub const fn intersects(self, other: Self) -> bool {
        (self.blur && other.blur) || (self.change && other.change)
    }

    /// Returns `true` if the set holds no trigger.
    pub const fn is_empty(self) -> bool {
        !self.blur && !self.change
    }

    /// Iterates over the triggers in the set.
    pub fn iter(self) -> impl Iterator<Item = Trigger> {
        [Trigger::Blur, Trigger::Change]
            .into_iter()
            .filter(move |t| self.contains(*t))
    }
}

impl From<Trigger> for TriggerSet {
    fn from(trigger: Trigger) -> Self {
        Self::EMPTY.with(trigger)
    }
}

impl FromIterator<Trigger> for TriggerSet {
    fn from_iter<I: IntoIterator<Item = Trigger>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl<const N: usize> From<[Trigger; N]> for TriggerSet {
    fn from(triggers: [Trigger; N]) -> Self {
        triggers.into_iter().collect()
    }
}

impl fmt::Display for TriggerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Trigger::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Wire representation: one trigger or a list of triggers.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum TriggerRepr {
    One(Trigger),
    Many(Vec<Trigger>),
}

impl From<TriggerRepr> for TriggerSet {
    fn from(repr: TriggerRepr) -> Self {
        match repr {
            TriggerRepr::One(t) => t.into(),
            TriggerRepr::Many(ts) => ts.into_iter().collect(),
        }
    }
}

impl From<TriggerSet> for TriggerRepr {
    fn from(set: TriggerSet) -> Self {
        let triggers: Vec<Trigger> = set.iter().collect();
        match triggers.as_slice() {
            [single] => Self::One(*single),
            _ => Self::Many(triggers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_from_str() {
        assert_eq!("blur".parse::<Trigger>().unwrap(), Trigger::Blur);
        assert_eq!(" change ".parse::<Trigger>().unwrap(), Trigger::Change);
        assert!("submit".parse::<Trigger>().is_err());
    }

    #[test]
    fn test_trigger_display() {
        assert_eq!(Trigger::Blur.to_string(), "blur");
        assert_eq!(Trigger::Change.to_string(), "change");
    }

    #[test]
    fn test_set_intersects() {
        let blur = TriggerSet::from(Trigger::Blur);
        let change = TriggerSet::from(Trigger::Change);
        assert!(blur.intersects(blur));
        assert!(!blur.intersects(change));
        assert!(TriggerSet::ALL.intersects(change));
        assert!(!TriggerSet::EMPTY.intersects(TriggerSet::ALL));
    }

    #[test]
    fn test_set_from_array_and_iter() {
        let set = TriggerSet::from([Trigger::Change, Trigger::Blur]);
        assert_eq!(set, TriggerSet::ALL);
        let collected: Vec<Trigger> = set.iter().collect();
        assert_eq!(collected, vec![Trigger::Blur, Trigger::Change]);
    }

    #[test]
    fn test_set_deserialize_single_and_list() {
        let one: TriggerSet = serde_json::from_str(r#""blur""#).unwrap();
        assert_eq!(one, TriggerSet::from(Trigger::Blur));

        let many: TriggerSet = serde_json::from_str(r#"["change", "blur"]"#).unwrap();
        assert_eq!(many, TriggerSet::ALL);

        assert!(serde_json::from_str::<TriggerSet>(r#""focus""#).is_err());
    }

    #[test]
    fn test_set_serialize_shapes() {
        let one = serde_json::to_string(&TriggerSet::from(Trigger::Change)).unwrap();
        assert_eq!(one, r#""change""#);
        let both = serde_json::to_string(&TriggerSet::ALL).unwrap();
        assert_eq!(both, r#"["blur","change"]"#);
    }

    #[test]
    fn test_set_display() {
        assert_eq!(TriggerSet::ALL.to_string(), "[blur, change]");
        assert!(TriggerSet::EMPTY.is_empty());
    }
}
