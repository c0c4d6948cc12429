//! Command kinds a channel may invoke.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::flags::{Flag, FlagSet, UnknownName};

/// One of the seven passwd operations the broker forwards.
///
/// The `_r` variants are the buffered (caller-supplied storage) forms of the
/// plain variants. They filter and mask identically; only the ownership of
/// the result differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Command {
    /// Rewind the enumeration cursor.
    Setpwent,
    /// Next entry of the enumeration.
    Getpwent,
    /// Next entry of the enumeration, into caller storage.
    GetpwentR,
    /// Lookup by login name.
    Getpwnam,
    /// Lookup by login name, into caller storage.
    GetpwnamR,
    /// Lookup by numeric user id.
    Getpwuid,
    /// Lookup by numeric user id, into caller storage.
    GetpwuidR,
}

impl Command {
    /// Canonical wire name (`"getpwnam_r"` etc).
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Setpwent => "setpwent",
            Command::Getpwent => "getpwent",
            Command::GetpwentR => "getpwent_r",
            Command::Getpwnam => "getpwnam",
            Command::GetpwnamR => "getpwnam_r",
            Command::Getpwuid => "getpwuid",
            Command::GetpwuidR => "getpwuid_r",
        }
    }

    /// True for the caller-supplied-storage variants.
    pub fn is_buffered(self) -> bool {
        matches!(
            self,
            Command::GetpwentR | Command::GetpwnamR | Command::GetpwuidR
        )
    }

    /// True for commands that read or move the enumeration cursor.
    pub fn touches_cursor(self) -> bool {
        matches!(
            self,
            Command::Setpwent | Command::Getpwent | Command::GetpwentR
        )
    }
}

impl Flag for Command {
    const KIND: &'static str = "command";
    const ALL: &'static [Self] = &[
        Command::Setpwent,
        Command::Getpwent,
        Command::GetpwentR,
        Command::Getpwnam,
        Command::GetpwnamR,
        Command::Getpwuid,
        Command::GetpwuidR,
    ];

    fn index(self) -> u8 {
        self as u8
    }

    fn name(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::from_name(s).ok_or_else(|| UnknownName {
            kind: Self::KIND,
            name: s.to_string(),
        })
    }
}

/// The set of commands a channel may invoke. Defaults to all seven.
pub type CommandSet = FlagSet<Command>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for command in Command::ALL {
            assert_eq!(command.as_str().parse::<Command>().unwrap(), *command);
        }
        assert!("endpwent".parse::<Command>().is_err());
    }

    #[test]
    fn test_all_has_seven_commands() {
        assert_eq!(CommandSet::all().len(), 7);
    }

    #[test]
    fn test_buffered_variants() {
        let buffered: Vec<_> = Command::ALL
            .iter()
            .filter(|c| c.is_buffered())
            .map(|c| c.as_str())
            .collect();
        assert_eq!(buffered, vec!["getpwent_r", "getpwnam_r", "getpwuid_r"]);
    }

    #[test]
    fn test_excluding_setpwent_is_a_six_element_subset() {
        let six = CommandSet::all().without(Command::Setpwent);
        assert_eq!(six.len(), 6);
        assert!(six.is_subset(&CommandSet::all()));
        assert!(!CommandSet::empty().with(Command::Setpwent).is_subset(&six));
    }
}
