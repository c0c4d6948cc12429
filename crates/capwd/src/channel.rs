//! In-process client handle.
//!
//! [`Channel`] wraps a broker channel id with the familiar passwd calls.
//! Lookups that find nothing visible return `Ok(None)`; the `_r` variants
//! fill a caller-owned [`PasswdBuf`] and fail with `BufferTooSmall` when it
//! cannot hold the record.

use std::sync::Arc;

use capwd_lattice::{CommandSet, FieldMask, Passwd, RestrictionState, Uid};

use crate::broker::Broker;
use crate::error::{CapwdError, Result};
use crate::protocol::{ChannelId, Reply, Request, Storage};
use crate::session::Lifecycle;

/// Default capacity of a [`PasswdBuf`], matching the usual
/// `_SC_GETPW_R_SIZE_MAX`.
pub const DEFAULT_BUF_CAPACITY: usize = 1024;

/// Caller-supplied storage for the buffered calls.
#[derive(Debug, Clone)]
pub struct PasswdBuf {
    capacity: usize,
    record: Option<Passwd>,
}

impl Default for PasswdBuf {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_BUF_CAPACITY)
    }
}

impl PasswdBuf {
    /// A buffer that can hold records needing up to `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            record: None,
        }
    }

    /// Buffer size in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The record last stored, if the last call found one.
    pub fn record(&self) -> Option<&Passwd> {
        self.record.as_ref()
    }

    fn storage(&self) -> Storage {
        Storage::Caller {
            capacity: self.capacity,
        }
    }
}

/// One channel of a [`Broker`]. Closed when dropped.
pub struct Channel {
    broker: Arc<Broker>,
    id: ChannelId,
    closed: bool,
}

impl Channel {
    /// Open an unrestricted root channel.
    pub fn open(broker: &Arc<Broker>) -> Self {
        Self::attach(broker, broker.open())
    }

    /// Open a root channel starting from `initial`.
    pub fn open_with(broker: &Arc<Broker>, initial: RestrictionState) -> Self {
        Self::attach(broker, broker.open_with(initial))
    }

    fn attach(broker: &Arc<Broker>, id: ChannelId) -> Self {
        Self {
            broker: Arc::clone(broker),
            id,
            closed: false,
        }
    }

    /// The broker-side id.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Lifecycle state as the broker sees it.
    pub fn lifecycle(&self) -> Lifecycle {
        self.broker.lifecycle(self.id)
    }

    fn call(&self, request: Request) -> Result<Reply> {
        self.broker.handle(self.id, request)
    }

    /// Rewind the enumeration.
    pub fn setpwent(&self) -> Result<()> {
        match self.call(Request::SetEnt)? {
            Reply::Rewound => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Next visible entry, `None` at the end.
    pub fn getpwent(&self) -> Result<Option<Passwd>> {
        record(self.call(Request::GetEnt {
            storage: Storage::Owned,
        })?)
    }

    /// Next visible entry into `buf`.
    pub fn getpwent_r<'b>(&self, buf: &'b mut PasswdBuf) -> Result<Option<&'b Passwd>> {
        let reply = self.call(Request::GetEnt {
            storage: buf.storage(),
        });
        fill(buf, reply)
    }

    /// Lookup by login name.
    pub fn getpwnam(&self, name: &str) -> Result<Option<Passwd>> {
        record(self.call(Request::GetNam {
            name: name.to_string(),
            storage: Storage::Owned,
        })?)
    }

    /// Lookup by login name into `buf`.
    pub fn getpwnam_r<'b>(
        &self,
        name: &str,
        buf: &'b mut PasswdBuf,
    ) -> Result<Option<&'b Passwd>> {
        let reply = self.call(Request::GetNam {
            name: name.to_string(),
            storage: buf.storage(),
        });
        fill(buf, reply)
    }

    /// Lookup by uid.
    pub fn getpwuid(&self, uid: Uid) -> Result<Option<Passwd>> {
        record(self.call(Request::GetUid {
            uid,
            storage: Storage::Owned,
        })?)
    }

    /// Lookup by uid into `buf`.
    pub fn getpwuid_r<'b>(
        &self,
        uid: Uid,
        buf: &'b mut PasswdBuf,
    ) -> Result<Option<&'b Passwd>> {
        let reply = self.call(Request::GetUid {
            uid,
            storage: buf.storage(),
        });
        fill(buf, reply)
    }

    /// Narrow the command set.
    pub fn limit_commands(&self, commands: CommandSet) -> Result<()> {
        limited(self.call(Request::LimitCommands {
            commands: names(commands.names()),
        })?)
    }

    /// Narrow the field mask.
    pub fn limit_fields(&self, fields: FieldMask) -> Result<()> {
        limited(self.call(Request::LimitFields {
            fields: names(fields.names()),
        })?)
    }

    /// Narrow the user allow-list to these names and uids.
    pub fn limit_users<N, S, U>(&self, names: N, uids: U) -> Result<()>
    where
        N: IntoIterator<Item = S>,
        S: Into<String>,
        U: IntoIterator<Item = Uid>,
    {
        limited(self.call(Request::LimitUsers {
            names: names.into_iter().map(Into::into).collect(),
            uids: uids.into_iter().collect(),
        })?)
    }

    /// The installed restriction state.
    pub fn limits(&self) -> Result<RestrictionState> {
        match self.call(Request::Limits)? {
            Reply::Limits(state) => Ok(state),
            other => Err(unexpected(other)),
        }
    }

    /// Open a clone carrying this channel's restrictions and cursor.
    pub fn try_clone(&self) -> Result<Channel> {
        match self.call(Request::Clone)? {
            Reply::Cloned(id) => Ok(Self::attach(&self.broker, id)),
            other => Err(unexpected(other)),
        }
    }

    /// Close the channel.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.broker.close(self.id)
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.broker.close(self.id);
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("closed", &self.closed)
            .finish()
    }
}

fn names(names: Vec<&'static str>) -> Vec<String> {
    names.into_iter().map(String::from).collect()
}

fn record(reply: Reply) -> Result<Option<Passwd>> {
    match reply {
        Reply::Record(record) => Ok(Some(record)),
        Reply::NotFound | Reply::EndOfEnumeration => Ok(None),
        other => Err(unexpected(other)),
    }
}

fn fill(buf: &mut PasswdBuf, reply: Result<Reply>) -> Result<Option<&Passwd>> {
    buf.record = None;
    buf.record = record(reply?)?;
    Ok(buf.record.as_ref())
}

fn limited(reply: Reply) -> Result<()> {
    match reply {
        Reply::Limited => Ok(()),
        other => Err(unexpected(other)),
    }
}

fn unexpected(reply: Reply) -> CapwdError {
    CapwdError::MalformedRequest {
        reason: format!("unexpected reply {:?}", reply),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use capwd_lattice::{Command, Field};

    fn broker() -> Arc<Broker> {
        Arc::new(Broker::with_source(MemorySource::new(vec![
            Passwd::new("root", 0, 0).with_shell("/bin/sh"),
            Passwd::new("daemon", 1, 1).with_shell("/usr/sbin/nologin"),
        ])))
    }

    #[test]
    fn test_buffered_and_owned_agree() {
        let broker = broker();
        let channel = Channel::open(&broker);
        channel
            .limit_fields(FieldMask::empty().with(Field::Name).with(Field::Shell))
            .unwrap();

        let owned = channel.getpwnam("root").unwrap().unwrap();
        let mut buf = PasswdBuf::default();
        let buffered = channel.getpwnam_r("root", &mut buf).unwrap().unwrap();
        assert_eq!(&owned, buffered);
    }

    #[test]
    fn test_small_buffer() {
        let broker = broker();
        let channel = Channel::open(&broker);
        let mut buf = PasswdBuf::with_capacity(3);
        let err = channel.getpwuid_r(0, &mut buf).unwrap_err();
        assert!(matches!(err, CapwdError::BufferTooSmall { .. }));
        assert!(buf.record().is_none());
    }

    #[test]
    fn test_drop_closes() {
        let broker = broker();
        let channel = Channel::open(&broker);
        let clone = channel.try_clone().unwrap();
        assert_eq!(broker.channel_count(), 2);

        drop(channel);
        assert_eq!(broker.channel_count(), 1);
        clone.close().unwrap();
        assert_eq!(broker.channel_count(), 0);
    }

    #[test]
    fn test_limits_round_trip() {
        let broker = broker();
        let channel = Channel::open(&broker);
        let commands = CommandSet::empty().with(Command::Getpwuid);
        channel.limit_commands(commands).unwrap();
        channel.limit_users(["root"], []).unwrap();

        let limits = channel.limits().unwrap();
        assert_eq!(limits.commands(), commands);
        assert!(limits.permits_user("root", 99));
        assert!(!limits.permits_user("daemon", 1));
        assert_eq!(channel.lifecycle(), Lifecycle::Restricted);
    }
}
