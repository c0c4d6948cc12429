//! Request and reply vocabulary.
//!
//! One wire frame is an [`Envelope`] addressed to a channel; the answer is a
//! [`Response`]. Both are JSON. Query requests map 1:1 onto the seven
//! [`Command`] kinds: the buffered kinds are the plain ones with
//! [`Storage::Caller`].

use std::fmt;

use serde::{Deserialize, Serialize};

use capwd_lattice::{Command, Passwd, RestrictionState, Uid};

use crate::error::{CapwdError, ErrorKind, Result};

/// Identifier of a channel within one broker. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Wrap a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who owns the storage a record is returned in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Storage {
    /// The broker allocates the result.
    #[default]
    Owned,
    /// The caller supplied a buffer of `capacity` bytes.
    Caller {
        /// Size of the caller's buffer.
        capacity: usize,
    },
}

impl Storage {
    /// Fail with `BufferTooSmall` if `record` does not fit.
    pub fn check(&self, record: &Passwd) -> Result<()> {
        match *self {
            Storage::Owned => Ok(()),
            Storage::Caller { capacity } => {
                let needed = record.storage_len();
                if needed > capacity {
                    Err(CapwdError::BufferTooSmall { needed, capacity })
                } else {
                    Ok(())
                }
            }
        }
    }

    fn pick(&self, owned: Command, buffered: Command) -> Command {
        match self {
            Storage::Owned => owned,
            Storage::Caller { .. } => buffered,
        }
    }
}

/// A request on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Rewind the enumeration.
    SetEnt,
    /// Next visible entry.
    GetEnt {
        /// Result ownership.
        #[serde(default)]
        storage: Storage,
    },
    /// Lookup by name.
    GetNam {
        /// Login name.
        name: String,
        /// Result ownership.
        #[serde(default)]
        storage: Storage,
    },
    /// Lookup by uid.
    GetUid {
        /// User id.
        uid: Uid,
        /// Result ownership.
        #[serde(default)]
        storage: Storage,
    },
    /// Narrow the command set to these command names.
    LimitCommands {
        /// Canonical command names.
        commands: Vec<String>,
    },
    /// Narrow the field mask to these field names.
    LimitFields {
        /// Canonical field names.
        fields: Vec<String>,
    },
    /// Narrow the user allow-list.
    LimitUsers {
        /// Admitted login names.
        #[serde(default)]
        names: Vec<String>,
        /// Admitted uids.
        #[serde(default)]
        uids: Vec<Uid>,
    },
    /// Read back the installed restriction state.
    Limits,
    /// Open a new channel with a copy of this one's state.
    Clone,
    /// Close this channel.
    Close,
}

impl Request {
    /// The command kind a query request exercises. `None` for limit and
    /// lifecycle requests.
    pub fn command(&self) -> Option<Command> {
        match self {
            Request::SetEnt => Some(Command::Setpwent),
            Request::GetEnt { storage } => {
                Some(storage.pick(Command::Getpwent, Command::GetpwentR))
            }
            Request::GetNam { storage, .. } => {
                Some(storage.pick(Command::Getpwnam, Command::GetpwnamR))
            }
            Request::GetUid { storage, .. } => {
                Some(storage.pick(Command::Getpwuid, Command::GetpwuidR))
            }
            _ => None,
        }
    }

    /// Wire name of the request, for logs.
    pub fn op(&self) -> &'static str {
        match self {
            Request::SetEnt => "set_ent",
            Request::GetEnt { .. } => "get_ent",
            Request::GetNam { .. } => "get_nam",
            Request::GetUid { .. } => "get_uid",
            Request::LimitCommands { .. } => "limit_commands",
            Request::LimitFields { .. } => "limit_fields",
            Request::LimitUsers { .. } => "limit_users",
            Request::Limits => "limits",
            Request::Clone => "clone",
            Request::Close => "close",
        }
    }
}

/// A successful answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", content = "value", rename_all = "snake_case")]
pub enum Reply {
    /// The cursor is back at the start.
    Rewound,
    /// A record, already masked.
    Record(Passwd),
    /// No such user, or the user is not visible on this channel.
    NotFound,
    /// The enumeration has no further visible entries.
    EndOfEnumeration,
    /// A limit was installed.
    Limited,
    /// The installed restriction state.
    Limits(RestrictionState),
    /// A clone was opened.
    Cloned(ChannelId),
    /// The channel was closed.
    Closed,
}

/// One request frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Addressed channel.
    pub channel: ChannelId,
    /// What to do on it.
    pub request: Request,
}

/// The error half of a response frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    /// Classification.
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
}

/// One response frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    /// The request succeeded.
    Ok(Reply),
    /// The request failed.
    Error(ErrorFrame),
}

impl From<Result<Reply>> for Response {
    fn from(result: Result<Reply>) -> Self {
        match result {
            Ok(reply) => Response::Ok(reply),
            Err(err) => Response::Error(ErrorFrame {
                kind: err.kind(),
                message: err.to_string(),
            }),
        }
    }
}

/// Decode one request frame. Any failure is `MalformedRequest`.
pub fn decode_envelope(frame: &[u8]) -> Result<Envelope> {
    Ok(serde_json::from_slice(frame)?)
}
