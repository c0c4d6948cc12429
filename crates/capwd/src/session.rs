//! Per-channel state.

use capwd_lattice::RestrictionState;

use crate::protocol::ChannelId;
use crate::source::Cursor;

/// Where a channel is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Filters equal the baseline the channel started with.
    Open,
    /// At least one filter has been narrowed below the baseline.
    Restricted,
    /// Terminal; every request fails with `ChannelClosed`.
    Closed,
}

/// One channel's restriction state and enumeration cursor.
#[derive(Debug, Clone)]
pub struct Session {
    id: ChannelId,
    pub(crate) state: RestrictionState,
    baseline: RestrictionState,
    pub(crate) cursor: Cursor,
    closed: bool,
}

impl Session {
    /// A fresh session starting from `baseline`.
    pub fn new(id: ChannelId, baseline: RestrictionState) -> Self {
        Self {
            id,
            state: baseline.clone(),
            baseline,
            cursor: Cursor::rewound(),
            closed: false,
        }
    }

    /// A new session whose baseline is this session's current state. The
    /// cursor position is inherited.
    pub fn fork(&self, id: ChannelId) -> Self {
        Self {
            id,
            state: self.state.clone(),
            baseline: self.state.clone(),
            cursor: self.cursor.clone(),
            closed: false,
        }
    }

    /// Mark closed and release the cursor position.
    pub fn close(&mut self) {
        self.closed = true;
        self.cursor = Cursor::rewound();
    }

    /// The channel this session backs.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Installed filters.
    pub fn state(&self) -> &RestrictionState {
        &self.state
    }

    /// Filters at creation or clone time.
    pub fn baseline(&self) -> &RestrictionState {
        &self.baseline
    }

    /// Enumeration position.
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Whether [`Session::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        if self.closed {
            Lifecycle::Closed
        } else if self.state == self.baseline {
            Lifecycle::Open
        } else {
            Lifecycle::Restricted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capwd_lattice::{Command, CommandSet};

    #[test]
    fn test_lifecycle_transitions() {
        let mut session = Session::new(ChannelId::new(1), RestrictionState::default());
        assert_eq!(session.lifecycle(), Lifecycle::Open);

        // narrowing to the same set is not a restriction
        session.state.limit_commands(CommandSet::all()).unwrap();
        assert_eq!(session.lifecycle(), Lifecycle::Open);

        session
            .state
            .limit_commands(CommandSet::all().without(Command::Setpwent))
            .unwrap();
        assert_eq!(session.lifecycle(), Lifecycle::Restricted);

        session.close();
        assert_eq!(session.lifecycle(), Lifecycle::Closed);
    }

    #[test]
    fn test_fork_rebases_and_keeps_cursor() {
        let mut parent = Session::new(ChannelId::new(1), RestrictionState::default());
        parent
            .state
            .limit_commands(CommandSet::empty().with(Command::Getpwent))
            .unwrap();
        parent.cursor.advance();

        let child = parent.fork(ChannelId::new(2));
        assert_eq!(child.lifecycle(), Lifecycle::Open);
        assert_eq!(child.baseline(), parent.state());
        assert_eq!(child.cursor().position(), 1);
        assert_eq!(child.id(), ChannelId::new(2));
    }

    #[test]
    fn test_close_releases_cursor() {
        let mut session = Session::new(ChannelId::new(1), RestrictionState::default());
        session.cursor.advance();
        session.close();
        assert_eq!(session.cursor(), &Cursor::rewound());
        assert!(session.is_closed());
    }
}
