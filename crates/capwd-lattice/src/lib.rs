//! # capwd-lattice
//!
//! The policy layer of the capwd passwd broker: what a channel is allowed to
//! ask for, and what it is allowed to see.
//!
//! A channel carries three independent filters:
//!
//! ```text
//! RestrictionState = CommandSet × FieldMask × UserLimit
//!
//! CommandSet  ⊆ { setpwent, getpwent, getpwent_r, getpwnam, getpwnam_r,
//!                 getpwuid, getpwuid_r }
//! FieldMask   ⊆ { pw_name, pw_passwd, pw_uid, pw_gid, pw_change, pw_class,
//!                 pw_gecos, pw_dir, pw_shell, pw_expire }
//! UserLimit   = Unrestricted | Only { names, uids }
//! ```
//!
//! Every filter only ever narrows. [`Limit::install`] is the single
//! subset-install operation behind all three: a proposal that is not a
//! subset of the installed value is refused with a [`NarrowingError`] and
//! the installed value is left as it was.
//!
//! ## Quick Start
//!
//! ```rust
//! use capwd_lattice::{Field, FieldMask, Passwd, RestrictionState, UserLimit, GID_UNSET};
//!
//! let mut state = RestrictionState::default();
//! state.limit_users(UserLimit::only(["operator"], [])).unwrap();
//! state
//!     .limit_fields(FieldMask::empty().with(Field::Name).with(Field::Uid))
//!     .unwrap();
//!
//! let record = Passwd::new("operator", 2, 5).with_shell("/usr/sbin/nologin");
//! assert!(state.permits_record(&record));
//!
//! let view = state.mask(&record);
//! assert_eq!(view.gid(), GID_UNSET);
//! assert_eq!(view.shell(), "");
//!
//! // no way back
//! assert!(state.limit_users(UserLimit::Unrestricted).is_err());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

mod command;
mod field;
mod flags;
mod limit;
mod passwd;
mod restriction;
mod users;

pub use command::{Command, CommandSet};
pub use field::{Field, FieldMask};
pub use flags::{Flag, FlagSet, UnknownName};
pub use limit::{Dimension, Limit, Narrowing, NarrowingError};
pub use passwd::{Gid, Passwd, Uid, GID_UNSET, UID_UNSET};
pub use restriction::RestrictionState;
pub use users::{UserLimit, UserSelectors};
