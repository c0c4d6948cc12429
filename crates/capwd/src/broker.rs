//! The channel registry.
//!
//! Each channel's session sits behind its own mutex, held for the whole of a
//! request, so one channel's requests are applied strictly one at a time and
//! a limit install is never observed half done. Different channels only
//! contend on the registry lookup and on the shared record source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use capwd_lattice::RestrictionState;

use crate::dispatch::Dispatcher;
use crate::error::{CapwdError, Result};
use crate::protocol::{ChannelId, Reply, Request};
use crate::session::{Lifecycle, Session};
use crate::source::RecordSource;

/// Owns every live channel and routes requests to them.
pub struct Broker {
    dispatcher: Dispatcher,
    sessions: RwLock<HashMap<ChannelId, Arc<Mutex<Session>>>>,
    next_id: AtomicU64,
}

impl Broker {
    /// A broker dispatching through `dispatcher`.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            sessions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// A broker over `source`.
    pub fn with_source<S: RecordSource + 'static>(source: S) -> Self {
        Self::new(Dispatcher::new(source))
    }

    /// The dispatcher requests go through.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Open a fully unrestricted root channel.
    pub fn open(&self) -> ChannelId {
        self.open_with(RestrictionState::default())
    }

    /// Open a root channel starting from `initial`. The initial state is the
    /// channel's baseline; it can only be narrowed from there.
    pub fn open_with(&self, initial: RestrictionState) -> ChannelId {
        let id = self.allocate();
        self.sessions
            .write()
            .insert(id, Arc::new(Mutex::new(Session::new(id, initial))));
        info!(channel = %id, "channel opened");
        id
    }

    /// Open a new channel carrying a copy of `parent`'s restriction state and
    /// cursor.
    pub fn clone_channel(&self, parent: ChannelId) -> Result<ChannelId> {
        let session = self.session(parent)?;
        let session = session.lock();
        if session.is_closed() {
            return Err(CapwdError::ChannelClosed { channel: parent });
        }

        let id = self.allocate();
        let child = session.fork(id);
        self.sessions
            .write()
            .insert(id, Arc::new(Mutex::new(child)));
        info!(parent = %parent, channel = %id, "channel cloned");
        Ok(id)
    }

    /// Close a channel. Its clones are unaffected.
    pub fn close(&self, id: ChannelId) -> Result<()> {
        let session = self
            .sessions
            .write()
            .remove(&id)
            .ok_or(CapwdError::ChannelClosed { channel: id })?;
        session.lock().close();
        info!(channel = %id, "channel closed");
        Ok(())
    }

    /// Handle one request addressed to `id`.
    pub fn handle(&self, id: ChannelId, request: Request) -> Result<Reply> {
        match request {
            Request::Clone => self.clone_channel(id).map(Reply::Cloned),
            Request::Close => self.close(id).map(|()| Reply::Closed),
            request => {
                let session = self.session(id)?;
                let mut session = session.lock();
                let result = self.dispatcher.handle(&mut session, request);
                if let Err(err) = &result {
                    debug!(channel = %id, kind = %err.kind(), error = %err, "request failed");
                }
                result
            }
        }
    }

    /// Lifecycle of `id`. Unknown ids report `Closed`.
    pub fn lifecycle(&self, id: ChannelId) -> Lifecycle {
        match self.session(id) {
            Ok(session) => session.lock().lifecycle(),
            Err(_) => Lifecycle::Closed,
        }
    }

    /// Number of live channels.
    pub fn channel_count(&self) -> usize {
        self.sessions.read().len()
    }

    fn session(&self, id: ChannelId) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or(CapwdError::ChannelClosed { channel: id })
    }

    fn allocate(&self) -> ChannelId {
        ChannelId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Storage;
    use crate::source::MemorySource;
    use capwd_lattice::{Command, CommandSet, Passwd};

    fn broker() -> Broker {
        Broker::with_source(MemorySource::new(vec![
            Passwd::new("root", 0, 0),
            Passwd::new("daemon", 1, 1),
            Passwd::new("operator", 2, 5),
        ]))
    }

    fn next_name(broker: &Broker, id: ChannelId) -> Option<String> {
        match broker
            .handle(
                id,
                Request::GetEnt {
                    storage: Storage::Owned,
                },
            )
            .unwrap()
        {
            Reply::Record(record) => Some(record.name().to_string()),
            Reply::EndOfEnumeration => None,
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn test_ids_are_never_reused() {
        let broker = broker();
        let a = broker.open();
        broker.close(a).unwrap();
        let b = broker.open();
        assert_ne!(a, b);
        assert_eq!(broker.channel_count(), 1);
    }

    #[test]
    fn test_clone_is_independent() {
        let broker = broker();
        let parent = broker.open();
        let child = broker.clone_channel(parent).unwrap();

        broker
            .handle(
                child,
                Request::LimitCommands {
                    commands: vec!["getpwnam".into()],
                },
            )
            .unwrap();
        assert_eq!(broker.lifecycle(child), Lifecycle::Restricted);
        assert_eq!(broker.lifecycle(parent), Lifecycle::Open);

        match broker.handle(parent, Request::Limits).unwrap() {
            Reply::Limits(state) => assert_eq!(state.commands(), CommandSet::all()),
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[test]
    fn test_clone_inherits_cursor_then_diverges() {
        let broker = broker();
        let parent = broker.open();
        assert_eq!(next_name(&broker, parent).as_deref(), Some("root"));

        let child = broker.handle(parent, Request::Clone).unwrap();
        let child = match child {
            Reply::Cloned(id) => id,
            other => panic!("unexpected reply {:?}", other),
        };

        assert_eq!(next_name(&broker, child).as_deref(), Some("daemon"));
        assert_eq!(next_name(&broker, child).as_deref(), Some("operator"));
        assert_eq!(next_name(&broker, parent).as_deref(), Some("daemon"));
        assert_eq!(next_name(&broker, child), None);
    }

    #[test]
    fn test_clone_cannot_widen_past_parent() {
        let broker = broker();
        let parent = broker.open();
        broker
            .handle(
                parent,
                Request::LimitCommands {
                    commands: vec!["getpwent".into(), "getpwnam".into()],
                },
            )
            .unwrap();
        let child = broker.clone_channel(parent).unwrap();

        let err = broker
            .handle(
                child,
                Request::LimitCommands {
                    commands: vec!["getpwent".into(), "setpwent".into()],
                },
            )
            .unwrap_err();
        assert!(matches!(err, CapwdError::NarrowingDenied(_)));
        let err = broker.handle(child, Request::SetEnt).unwrap_err();
        assert!(matches!(
            err,
            CapwdError::CommandDenied {
                command: Command::Setpwent
            }
        ));
    }

    #[test]
    fn test_close_leaves_clones_alive() {
        let broker = broker();
        let parent = broker.open();
        let child = broker.clone_channel(parent).unwrap();

        assert_eq!(broker.handle(parent, Request::Close).unwrap(), Reply::Closed);
        assert_eq!(broker.lifecycle(parent), Lifecycle::Closed);
        assert!(matches!(
            broker.handle(parent, Request::SetEnt),
            Err(CapwdError::ChannelClosed { .. })
        ));
        assert!(matches!(
            broker.clone_channel(parent),
            Err(CapwdError::ChannelClosed { .. })
        ));
        assert!(matches!(
            broker.close(parent),
            Err(CapwdError::ChannelClosed { .. })
        ));

        assert_eq!(next_name(&broker, child).as_deref(), Some("root"));
    }

    #[test]
    fn test_open_with_sets_baseline() {
        let broker = broker();
        let mut initial = RestrictionState::default();
        initial
            .limit_commands(CommandSet::empty().with(Command::Getpwuid))
            .unwrap();
        let id = broker.open_with(initial);

        assert_eq!(broker.lifecycle(id), Lifecycle::Open);
        let err = broker
            .handle(
                id,
                Request::LimitCommands {
                    commands: vec!["getpwuid".into(), "getpwnam".into()],
                },
            )
            .unwrap_err();
        assert!(matches!(err, CapwdError::NarrowingDenied(_)));
    }

    #[test]
    fn test_channels_run_concurrently() {
        let broker = Arc::new(broker());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let broker = Arc::clone(&broker);
                std::thread::spawn(move || {
                    let id = broker.open();
                    let mut seen = Vec::new();
                    while let Some(name) = next_name(&broker, id) {
                        seen.push(name);
                    }
                    broker.close(id).unwrap();
                    seen
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), vec!["root", "daemon", "operator"]);
        }
        assert_eq!(broker.channel_count(), 0);
    }
}
