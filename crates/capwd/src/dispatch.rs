//! Request validation and forwarding.
//!
//! Every query goes through the same gates in the same order:
//!
//! 1. the command must be in the channel's command set,
//! 2. the source is consulted,
//! 3. records whose identity is outside the allow-list are dropped
//!    (skipped during enumeration, reported as not found on lookup),
//! 4. what remains is masked and checked against the caller's storage.
//!
//! A disallowed lookup is deliberately indistinguishable from a miss, so a
//! channel cannot probe the allow-list.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use capwd_lattice::{CommandSet, FieldMask, NarrowingError, Passwd, RestrictionState, UserLimit};

use crate::error::{CapwdError, Result};
use crate::protocol::{Reply, Request, Storage};
use crate::session::Session;
use crate::source::RecordSource;

/// A record source shared by every channel of a broker.
pub type SharedSource = Arc<Mutex<dyn RecordSource>>;

/// Applies a session's restrictions to requests against one record source.
#[derive(Clone)]
pub struct Dispatcher {
    source: SharedSource,
}

impl Dispatcher {
    /// Dispatch against `source`.
    pub fn new<S: RecordSource + 'static>(source: S) -> Self {
        Self::from_shared(Arc::new(Mutex::new(source)))
    }

    /// Dispatch against an already shared source.
    pub fn from_shared(source: SharedSource) -> Self {
        Self { source }
    }

    /// The underlying source.
    pub fn source(&self) -> &SharedSource {
        &self.source
    }

    /// Handle one request on `session`.
    ///
    /// `Clone` and `Close` need the broker's registry and are rejected here.
    pub fn handle(&self, session: &mut Session, request: Request) -> Result<Reply> {
        if session.is_closed() {
            return Err(CapwdError::ChannelClosed {
                channel: session.id(),
            });
        }

        if let Some(command) = request.command() {
            if !session.state().permits_command(command) {
                warn!(channel = %session.id(), %command, "command denied");
                return Err(CapwdError::CommandDenied { command });
            }
        }

        let op = request.op();
        debug!(channel = %session.id(), op, "dispatch");

        match request {
            Request::SetEnt => {
                self.source.lock().rewind(&mut session.cursor);
                Ok(Reply::Rewound)
            }
            Request::GetEnt { storage } => self.next_visible(session, storage),
            Request::GetNam { name, storage } => {
                let found = self.source.lock().by_name(&name)?;
                deliver(session, found, storage)
            }
            Request::GetUid { uid, storage } => {
                let found = self.source.lock().by_uid(uid)?;
                deliver(session, found, storage)
            }
            Request::LimitCommands { commands } => {
                let proposed = CommandSet::parse_names(&commands)?;
                install(session, |state| state.limit_commands(proposed))
            }
            Request::LimitFields { fields } => {
                let proposed = FieldMask::parse_names(&fields)?;
                install(session, |state| state.limit_fields(proposed))
            }
            Request::LimitUsers { names, uids } => {
                let proposed = UserLimit::only(names, uids);
                install(session, |state| state.limit_users(proposed))
            }
            Request::Limits => Ok(Reply::Limits(session.state().clone())),
            Request::Clone | Request::Close => Err(CapwdError::MalformedRequest {
                reason: format!("'{}' must be sent to the broker", op),
            }),
        }
    }

    fn next_visible(&self, session: &mut Session, storage: Storage) -> Result<Reply> {
        let mut source = self.source.lock();
        loop {
            match source.next(&mut session.cursor)? {
                None => return Ok(Reply::EndOfEnumeration),
                Some(record) if session.state().permits_record(&record) => {
                    return deliver(session, Some(record), storage);
                }
                Some(_) => continue,
            }
        }
    }
}

fn deliver(session: &Session, found: Option<Passwd>, storage: Storage) -> Result<Reply> {
    match found {
        Some(record) if session.state().permits_record(&record) => {
            let view = session.state().mask(&record);
            storage.check(&view)?;
            Ok(Reply::Record(view))
        }
        _ => Ok(Reply::NotFound),
    }
}

fn install<F>(session: &mut Session, apply: F) -> Result<Reply>
where
    F: FnOnce(&mut RestrictionState) -> std::result::Result<(), NarrowingError>,
{
    match apply(&mut session.state) {
        Ok(()) => {
            debug!(channel = %session.id(), lifecycle = ?session.lifecycle(), "limit installed");
            Ok(Reply::Limited)
        }
        Err(err) => {
            warn!(channel = %session.id(), dimension = %err.dimension, "narrowing denied");
            Err(err.into())
        }
    }
}
