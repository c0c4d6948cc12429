//! Record attributes a channel may observe.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::flags::{Flag, FlagSet, UnknownName};

/// One of the ten passwd record attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Field {
    /// Login name.
    #[cfg_attr(feature = "serde", serde(rename = "pw_name"))]
    Name,
    /// Encrypted password.
    #[cfg_attr(feature = "serde", serde(rename = "pw_passwd"))]
    Passwd,
    /// Numeric user id.
    #[cfg_attr(feature = "serde", serde(rename = "pw_uid"))]
    Uid,
    /// Numeric primary group id.
    #[cfg_attr(feature = "serde", serde(rename = "pw_gid"))]
    Gid,
    /// Password change time.
    #[cfg_attr(feature = "serde", serde(rename = "pw_change"))]
    Change,
    /// Login class.
    #[cfg_attr(feature = "serde", serde(rename = "pw_class"))]
    Class,
    /// Comment / full name.
    #[cfg_attr(feature = "serde", serde(rename = "pw_gecos"))]
    Gecos,
    /// Home directory.
    #[cfg_attr(feature = "serde", serde(rename = "pw_dir"))]
    Dir,
    /// Login shell.
    #[cfg_attr(feature = "serde", serde(rename = "pw_shell"))]
    Shell,
    /// Account expiration time.
    #[cfg_attr(feature = "serde", serde(rename = "pw_expire"))]
    Expire,
}

impl Field {
    /// Canonical wire name (`"pw_shell"` etc).
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "pw_name",
            Field::Passwd => "pw_passwd",
            Field::Uid => "pw_uid",
            Field::Gid => "pw_gid",
            Field::Change => "pw_change",
            Field::Class => "pw_class",
            Field::Gecos => "pw_gecos",
            Field::Dir => "pw_dir",
            Field::Shell => "pw_shell",
            Field::Expire => "pw_expire",
        }
    }

    /// True for the text-valued attributes.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            Field::Name | Field::Passwd | Field::Class | Field::Gecos | Field::Dir | Field::Shell
        )
    }
}

impl Flag for Field {
    const KIND: &'static str = "field";
    const ALL: &'static [Self] = &[
        Field::Name,
        Field::Passwd,
        Field::Uid,
        Field::Gid,
        Field::Change,
        Field::Class,
        Field::Gecos,
        Field::Dir,
        Field::Shell,
        Field::Expire,
    ];

    fn index(self) -> u8 {
        self as u8
    }

    fn name(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::from_name(s).ok_or_else(|| UnknownName {
            kind: Self::KIND,
            name: s.to_string(),
        })
    }
}

/// The set of attributes a channel may observe. Defaults to all ten.
///
/// The same type doubles as the per-record presence set on
/// [`Passwd`](crate::Passwd).
pub type FieldMask = FlagSet<Field>;
