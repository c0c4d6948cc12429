//! Fixed-universe bitsets shared by the command and field filters.
//!
//! Both filters range over a small, closed enumeration, so a set is a `u16`
//! and the subset test is a single mask operation. The universe is described
//! by the [`Flag`] trait; [`FlagSet`] is generic over it.

use std::fmt;
use std::iter::FromIterator;
use std::marker::PhantomData;

#[cfg(feature = "serde")]
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A member of a fixed enumeration of at most 16 values.
pub trait Flag: Copy + Eq + fmt::Debug + 'static {
    /// Human-readable name of the enumeration, used in error messages.
    const KIND: &'static str;

    /// Every member in canonical order.
    const ALL: &'static [Self];

    /// Bit position of this member. Must be unique and below 16.
    fn index(self) -> u8;

    /// Canonical wire name of this member.
    fn name(self) -> &'static str;

    /// Look a member up by its canonical wire name.
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|flag| flag.name() == name)
    }
}

/// A name that does not belong to the enumeration it was parsed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownName {
    /// Which enumeration rejected the name (`"command"`, `"field"`).
    pub kind: &'static str,
    /// The offending name.
    pub name: String,
}

impl fmt::Display for UnknownName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} name '{}'", self.kind, self.name)
    }
}

impl std::error::Error for UnknownName {}

/// A set of [`Flag`] members.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FlagSet<T: Flag> {
    bits: u16,
    _marker: PhantomData<T>,
}

impl<T: Flag> FlagSet<T> {
    const fn from_bits(bits: u16) -> Self {
        Self {
            bits,
            _marker: PhantomData,
        }
    }

    /// The empty set.
    pub const fn empty() -> Self {
        Self::from_bits(0)
    }

    /// The set of every member.
    pub fn all() -> Self {
        T::ALL.iter().copied().collect()
    }

    /// Parse a list of canonical names.
    ///
    /// Duplicates are harmless. The first unknown name aborts the parse.
    pub fn parse_names<I, S>(names: I) -> Result<Self, UnknownName>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::empty();
        for name in names {
            let name = name.as_ref();
            let flag = T::from_name(name).ok_or_else(|| UnknownName {
                kind: T::KIND,
                name: name.to_string(),
            })?;
            set.insert(flag);
        }
        Ok(set)
    }

    fn bit(flag: T) -> u16 {
        1u16 << flag.index()
    }

    /// Check membership.
    pub fn contains(&self, flag: T) -> bool {
        self.bits & Self::bit(flag) != 0
    }

    /// Add a member.
    pub fn insert(&mut self, flag: T) {
        self.bits |= Self::bit(flag);
    }

    /// Remove a member.
    pub fn remove(&mut self, flag: T) {
        self.bits &= !Self::bit(flag);
    }

    /// Builder-style insert.
    pub fn with(mut self, flag: T) -> Self {
        self.insert(flag);
        self
    }

    /// Builder-style remove.
    pub fn without(mut self, flag: T) -> Self {
        self.remove(flag);
        self
    }

    /// True if every member of `self` is also in `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.bits & !other.bits == 0
    }

    /// Members present in both sets.
    pub fn intersection(&self, other: &Self) -> Self {
        Self::from_bits(self.bits & other.bits)
    }

    /// Members present in either set.
    pub fn union(&self, other: &Self) -> Self {
        Self::from_bits(self.bits | other.bits)
    }

    /// True if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Members in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        T::ALL.iter().copied().filter(move |flag| self.contains(*flag))
    }

    /// Canonical names of the members, in canonical order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(Flag::name).collect()
    }
}

impl<T: Flag> FromIterator<T> for FlagSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::empty();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl<T: Flag> fmt::Debug for FlagSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Flag::name)).finish()
    }
}

#[cfg(feature = "serde")]
impl<T: Flag> Serialize for FlagSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(Flag::name))
    }
}

#[cfg(feature = "serde")]
impl<'de, T: Flag> Deserialize<'de> for FlagSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Self::parse_names(&names).map_err(de::Error::custom)
    }
}
