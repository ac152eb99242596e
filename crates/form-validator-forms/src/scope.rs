//! Field scopes for bulk operations.

/// The set of fields a bulk operation addresses: everything, or a list of
/// names.
///
/// An explicit but empty list is normalized to [`FieldScope::All`].
///
/// ```
/// use form_validator_forms::FieldScope;
///
/// assert_eq!(FieldScope::from("age"), FieldScope::Fields(vec!["age".into()]));
/// assert_eq!(FieldScope::from(Vec::<String>::new()), FieldScope::All);
/// assert!(FieldScope::from(["a", "b"]).includes("b"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldScope {
    /// Every field.
    #[default]
    All,
    /// Only the named fields, in the given order, without duplicates.
    Fields(Vec<String>),
}

impl FieldScope {
    /// Builds a scope from field names.
    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !list.contains(&name) {
                list.push(name);
            }
        }
        if list.is_empty() {
            Self::All
        } else {
            Self::Fields(list)
        }
    }

    /// Returns `true` for [`FieldScope::All`].
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Returns the explicit field names, or `None` for [`FieldScope::All`].
    pub fn names(&self) -> Option<&[String]> {
        match self {
            Self::All => None,
            Self::Fields(names) => Some(names),
        }
    }

    /// Returns `true` if `prop` is within the scope.
    pub fn includes(&self, prop: &str) -> bool {
        match self {
            Self::All => true,
            Self::Fields(names) => names.iter().any(|n| n == prop),
        }
    }
}

impl From<&str> for FieldScope {
    fn from(name: &str) -> Self {
        Self::fields([name])
    }
}

impl From<String> for FieldScope {
    fn from(name: String) -> Self {
        Self::fields([name])
    }
}

impl From<&String> for FieldScope {
    fn from(name: &String) -> Self {
        Self::fields([name.as_str()])
    }
}

impl From<Vec<String>> for FieldScope {
    fn from(names: Vec<String>) -> Self {
        Self::fields(names)
    }
}

impl From<Vec<&str>> for FieldScope {
    fn from(names: Vec<&str>) -> Self {
        Self::fields(names)
    }
}

impl From<&[&str]> for FieldScope {
    fn from(names: &[&str]) -> Self {
        Self::fields(names.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for FieldScope {
    fn from(names: [&str; N]) -> Self {
        Self::fields(names)
    }
}

impl<T: Into<Self>> From<Option<T>> for FieldScope {
    fn from(scope: Option<T>) -> Self {
        scope.map_or(Self::All, Into::into)
    }
}
