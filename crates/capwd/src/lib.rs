//! # capwd
//!
//! Runtime enforcement of `capwd-lattice` restrictions.
//!
//! While `capwd-lattice` decides what a channel MAY see, `capwd` is what a
//! sandboxed process actually talks to: a [`Broker`] owning every channel,
//! a [`Dispatcher`] putting each request through the channel's filters, and
//! a [`RecordSource`] standing in for the passwd database.
//!
//! | Aspect | capwd-lattice | capwd |
//! |--------|---------------|-------|
//! | Commands | `CommandSet::contains` predicate | `Dispatcher` refuses before touching the source |
//! | Users | `UserLimit::permits` predicate | enumeration skips, lookups report not found |
//! | Fields | `Passwd::masked` | applied to every record on every path |
//! | State | plain values, `&mut self` | per-channel sessions behind mutexes |
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use capwd::{Broker, Channel, MemorySource};
//! use capwd_lattice::{Field, FieldMask, Passwd};
//!
//! let broker = Arc::new(Broker::with_source(MemorySource::new(vec![
//!     Passwd::new("root", 0, 0).with_shell("/bin/sh"),
//!     Passwd::new("operator", 2, 5).with_shell("/usr/sbin/nologin"),
//! ])));
//!
//! let channel = Channel::open(&broker);
//! channel.limit_users(["operator"], []).unwrap();
//! channel.limit_fields(FieldMask::empty().with(Field::Name)).unwrap();
//!
//! // hand a narrower capability to a sub-component
//! let delegated = channel.try_clone().unwrap();
//! assert!(delegated.getpwnam("root").unwrap().is_none());
//!
//! let operator = delegated.getpwuid(2).unwrap().unwrap();
//! assert_eq!(operator.name(), "operator");
//! assert_eq!(operator.shell(), "");
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod broker;
pub mod channel;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod session;
pub mod source;

pub use broker::Broker;
pub use channel::{Channel, PasswdBuf, DEFAULT_BUF_CAPACITY};
pub use dispatch::{Dispatcher, SharedSource};
pub use error::{CapwdError, ErrorKind, Result};
pub use protocol::{
    decode_envelope, ChannelId, Envelope, ErrorFrame, Reply, Request, Response, Storage,
};
pub use session::{Lifecycle, Session};
pub use source::{parse_passwd, Cursor, FileSource, MemorySource, RecordSource};
