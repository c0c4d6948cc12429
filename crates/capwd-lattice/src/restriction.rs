//! The per-channel restriction state.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandSet};
use crate::field::FieldMask;
use crate::limit::{Limit, Narrowing, NarrowingError};
use crate::passwd::{Passwd, Uid};
use crate::users::UserLimit;

/// The (command set, field mask, user allow-list) triple governing one
/// channel.
///
/// Each dimension narrows independently through its own [`Limit`]. The
/// default is fully open: every command, every field, every user.
///
/// # Example
///
/// ```rust
/// use capwd_lattice::{Command, CommandSet, RestrictionState};
///
/// let mut state = RestrictionState::default();
/// let six = CommandSet::all().without(Command::Setpwent);
/// state.limit_commands(six).unwrap();
///
/// // widening back is refused and leaves the state alone
/// assert!(state.limit_commands(CommandSet::all()).is_err());
/// assert!(!state.permits_command(Command::Setpwent));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RestrictionState {
    commands: Limit<CommandSet>,
    fields: Limit<FieldMask>,
    users: Limit<UserLimit>,
}

impl Default for RestrictionState {
    fn default() -> Self {
        Self::new(CommandSet::all(), FieldMask::all(), UserLimit::Unrestricted)
    }
}

impl RestrictionState {
    /// A state with the given starting filters.
    pub fn new(commands: CommandSet, fields: FieldMask, users: UserLimit) -> Self {
        Self {
            commands: Limit::new(commands),
            fields: Limit::new(fields),
            users: Limit::new(users),
        }
    }

    /// Installed command set.
    pub fn commands(&self) -> CommandSet {
        *self.commands.get()
    }

    /// Installed field mask.
    pub fn fields(&self) -> FieldMask {
        *self.fields.get()
    }

    /// Installed user allow-list.
    pub fn users(&self) -> &UserLimit {
        self.users.get()
    }

    /// Narrow the command set.
    pub fn limit_commands(&mut self, proposed: CommandSet) -> Result<(), NarrowingError> {
        self.commands.install(proposed)
    }

    /// Narrow the field mask.
    pub fn limit_fields(&mut self, proposed: FieldMask) -> Result<(), NarrowingError> {
        self.fields.install(proposed)
    }

    /// Narrow the user allow-list.
    pub fn limit_users(&mut self, proposed: UserLimit) -> Result<(), NarrowingError> {
        self.users.install(proposed)
    }

    /// Whether the command set contains `command`.
    pub fn permits_command(&self, command: Command) -> bool {
        self.commands.get().contains(command)
    }

    /// Whether an identity passes the allow-list. Takes the unmasked values.
    pub fn permits_user(&self, name: &str, uid: Uid) -> bool {
        self.users.get().permits(name, uid)
    }

    /// Whether an unmasked record passes the allow-list.
    pub fn permits_record(&self, record: &Passwd) -> bool {
        self.permits_user(record.name(), record.uid())
    }

    /// Apply the field mask to a record.
    pub fn mask(&self, record: &Passwd) -> Passwd {
        record.masked(self.fields.get())
    }

    /// Partial order: true if every dimension of `self` is within `other`.
    pub fn leq(&self, other: &Self) -> bool {
        self.commands().is_within(&other.commands())
            && self.fields().is_within(&other.fields())
            && self.users().is_within(other.users())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    #[test]
    fn test_default_is_fully_open() {
        let state = RestrictionState::default();
        assert_eq!(state.commands(), CommandSet::all());
        assert_eq!(state.fields(), FieldMask::all());
        assert!(state.users().is_unrestricted());
        assert!(state.permits_user("anyone", 4242));
    }

    #[test]
    fn test_dimensions_narrow_independently() {
        let mut state = RestrictionState::default();
        let mask = FieldMask::empty().with(Field::Uid).with(Field::Shell);
        state.limit_fields(mask).unwrap();

        assert_eq!(state.commands(), CommandSet::all());
        assert_eq!(state.fields(), mask);

        state.limit_users(UserLimit::only(["root"], [])).unwrap();
        assert!(state.limit_fields(FieldMask::all()).is_err());
        assert_eq!(state.fields(), mask);
        assert_eq!(*state.users(), UserLimit::only(["root"], []));
    }

    #[test]
    fn test_permits_record_uses_unmasked_uid() {
        let mut state = RestrictionState::default();
        state.limit_users(UserLimit::only(Vec::<String>::new(), [0])).unwrap();
        state.limit_fields(FieldMask::empty().with(Field::Name)).unwrap();

        let root = Passwd::new("root", 0, 0);
        assert!(state.permits_record(&root));

        let view = state.mask(&root);
        assert_eq!(view.name(), "root");
        assert_eq!(view.uid(), crate::UID_UNSET);
    }

    #[test]
    fn test_leq_is_a_partial_order() {
        let open = RestrictionState::default();
        let mut narrow = open.clone();
        narrow.limit_commands(CommandSet::empty().with(Command::Getpwnam)).unwrap();

        let mut other = open.clone();
        other.limit_users(UserLimit::only(["bin"], [])).unwrap();

        assert!(narrow.leq(&open));
        assert!(!open.leq(&narrow));
        assert!(narrow.leq(&narrow));
        assert!(!narrow.leq(&other));
        assert!(!other.leq(&narrow));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_shape() {
        let mut state = RestrictionState::default();
        state.limit_commands(CommandSet::empty().with(Command::Getpwuid)).unwrap();
        state.limit_fields(FieldMask::empty().with(Field::Uid)).unwrap();

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "commands": ["getpwuid"],
                "fields": ["pw_uid"],
                "users": null,
            })
        );
        let back: RestrictionState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
