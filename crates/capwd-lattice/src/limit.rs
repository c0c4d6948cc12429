//! Monotonic subset-install, written once for all three filter domains.
//!
//! A [`Limit`] holds the current value of one filter. The only way to change
//! it is [`Limit::install`], which commits the proposed value if and only if
//! it is a subset of the current one. A rejected install leaves the stored
//! value untouched, so narrowing never partially applies.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::field::Field;
use crate::flags::{Flag, FlagSet};
use crate::users::UserLimit;

/// Which filter of a restriction state an operation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Dimension {
    /// The command set.
    Commands,
    /// The field mask.
    Fields,
    /// The user allow-list.
    Users,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commands => write!(f, "commands"),
            Self::Fields => write!(f, "fields"),
            Self::Users => write!(f, "users"),
        }
    }
}

/// A filter domain with a subset order.
pub trait Narrowing: Clone + PartialEq + fmt::Debug {
    /// The filter this domain backs.
    const DIMENSION: Dimension;

    /// Members of `self` that `current` does not admit, rendered for error
    /// messages. Empty exactly when `self` is within `current`.
    fn excess(&self, current: &Self) -> Vec<String>;

    /// True if `self` admits nothing that `current` does not.
    fn is_within(&self, current: &Self) -> bool {
        self.excess(current).is_empty()
    }
}

macro_rules! flag_narrowing {
    ($flag:ty, $dimension:expr) => {
        impl Narrowing for FlagSet<$flag> {
            const DIMENSION: Dimension = $dimension;

            fn excess(&self, current: &Self) -> Vec<String> {
                self.iter()
                    .filter(|flag| !current.contains(*flag))
                    .map(|flag| flag.name().to_string())
                    .collect()
            }

            fn is_within(&self, current: &Self) -> bool {
                self.is_subset(current)
            }
        }
    };
}

flag_narrowing!(Command, Dimension::Commands);
flag_narrowing!(Field, Dimension::Fields);

impl Narrowing for UserLimit {
    const DIMENSION: Dimension = Dimension::Users;

    fn excess(&self, current: &Self) -> Vec<String> {
        match (self, current) {
            (_, UserLimit::Unrestricted) => Vec::new(),
            (UserLimit::Unrestricted, UserLimit::Only(_)) => vec!["unrestricted".to_string()],
            (UserLimit::Only(proposed), UserLimit::Only(current)) => {
                let names = proposed
                    .names
                    .difference(&current.names)
                    .map(|name| format!("name '{}'", name));
                let uids = proposed
                    .uids
                    .difference(&current.uids)
                    .map(|uid| format!("uid {}", uid));
                names.chain(uids).collect()
            }
        }
    }

    fn is_within(&self, current: &Self) -> bool {
        match (self, current) {
            (_, UserLimit::Unrestricted) => true,
            (UserLimit::Unrestricted, UserLimit::Only(_)) => false,
            (UserLimit::Only(proposed), UserLimit::Only(current)) => {
                proposed.names.is_subset(&current.names) && proposed.uids.is_subset(&current.uids)
            }
        }
    }
}

/// A proposed filter was not a subset of the installed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrowingError {
    /// The filter that refused the install.
    pub dimension: Dimension,
    /// What the proposal would have added.
    pub excess: Vec<String>,
}

impl fmt::Display for NarrowingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "proposed {} exceed the installed limit: {}",
            self.dimension,
            self.excess.join(", ")
        )
    }
}

impl std::error::Error for NarrowingError {}

/// The stored value of one filter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Limit<T> {
    current: T,
}

impl<T: Narrowing> Limit<T> {
    /// A limit starting at `initial`.
    pub fn new(initial: T) -> Self {
        Self { current: initial }
    }

    /// The installed value.
    pub fn get(&self) -> &T {
        &self.current
    }

    /// Replace the installed value with `proposed` if it is a subset.
    pub fn install(&mut self, proposed: T) -> Result<(), NarrowingError> {
        if !proposed.is_within(&self.current) {
            return Err(NarrowingError {
                dimension: T::DIMENSION,
                excess: proposed.excess(&self.current),
            });
        }
        self.current = proposed;
        Ok(())
    }
}

impl<T: Narrowing + Default> Default for Limit<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
