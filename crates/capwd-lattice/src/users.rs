//! The user allow-list filter.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::passwd::Uid;

/// A finite set of name and uid selectors.
///
/// The two kinds are independent: a record matches if its name is in
/// `names` or its uid is in `uids`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UserSelectors {
    /// Login names admitted.
    #[cfg_attr(feature = "serde", serde(default))]
    pub names: BTreeSet<String>,
    /// Numeric user ids admitted.
    #[cfg_attr(feature = "serde", serde(default))]
    pub uids: BTreeSet<Uid>,
}

impl UserSelectors {
    /// Build a selector pair from any iterables of names and uids.
    pub fn new<N, S, U>(names: N, uids: U) -> Self
    where
        N: IntoIterator<Item = S>,
        S: Into<String>,
        U: IntoIterator<Item = Uid>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            uids: uids.into_iter().collect(),
        }
    }

    /// Whether a record with this name and uid matches.
    pub fn matches(&self, name: &str, uid: Uid) -> bool {
        self.names.contains(name) || self.uids.contains(&uid)
    }

    /// True if neither kind has any selector. Such a list admits nothing.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.uids.is_empty()
    }
}

/// Which identities a channel may observe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(from = "Option<UserSelectors>", into = "Option<UserSelectors>")
)]
pub enum UserLimit {
    /// No user filtering has been installed.
    #[default]
    Unrestricted,
    /// Only identities matching these selectors are visible.
    Only(UserSelectors),
}

impl UserLimit {
    /// Shorthand for `UserLimit::Only(UserSelectors::new(names, uids))`.
    pub fn only<N, S, U>(names: N, uids: U) -> Self
    where
        N: IntoIterator<Item = S>,
        S: Into<String>,
        U: IntoIterator<Item = Uid>,
    {
        UserLimit::Only(UserSelectors::new(names, uids))
    }

    /// Whether an identity passes the filter. Always called with the
    /// unmasked name and uid.
    pub fn permits(&self, name: &str, uid: Uid) -> bool {
        match self {
            UserLimit::Unrestricted => true,
            UserLimit::Only(selectors) => selectors.matches(name, uid),
        }
    }

    /// True for [`UserLimit::Unrestricted`].
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, UserLimit::Unrestricted)
    }

    /// The concrete selectors, if any are installed.
    pub fn selectors(&self) -> Option<&UserSelectors> {
        match self {
            UserLimit::Unrestricted => None,
            UserLimit::Only(selectors) => Some(selectors),
        }
    }
}

impl From<Option<UserSelectors>> for UserLimit {
    fn from(selectors: Option<UserSelectors>) -> Self {
        selectors.map_or(UserLimit::Unrestricted, UserLimit::Only)
    }
}

impl From<UserLimit> for Option<UserSelectors> {
    fn from(limit: UserLimit) -> Self {
        match limit {
            UserLimit::Unrestricted => None,
            UserLimit::Only(selectors) => Some(selectors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_permits_everyone() {
        assert!(UserLimit::Unrestricted.permits("root", 0));
        assert!(UserLimit::default().is_unrestricted());
    }

    #[test]
    fn test_selector_kinds_are_additive() {
        let limit = UserLimit::only(["operator"], [0]);
        assert!(limit.permits("operator", 2));
        assert!(limit.permits("root", 0));
        assert!(limit.permits("renamed", 0));
        assert!(!limit.permits("daemon", 1));
    }

    #[test]
    fn test_empty_selectors_admit_nothing() {
        let limit = UserLimit::only(Vec::<String>::new(), []);
        assert!(limit.selectors().unwrap().is_empty());
        assert!(!limit.permits("root", 0));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_shape() {
        assert_eq!(
            serde_json::to_string(&UserLimit::Unrestricted).unwrap(),
            "null"
        );
        let limit = UserLimit::only(["root"], [1]);
        let json = serde_json::to_string(&limit).unwrap();
        assert_eq!(json, r#"{"names":["root"],"uids":[1]}"#);
        assert_eq!(serde_json::from_str::<UserLimit>(&json).unwrap(), limit);

        let names_only: UserLimit = serde_json::from_str(r#"{"names":["bin"]}"#).unwrap();
        assert_eq!(names_only, UserLimit::only(["bin"], []));
    }
}
