//! # capwd-node
//!
//! Serves [`capwd`] channels to other processes over a unix socket, one
//! newline-delimited JSON frame per request and per response.
//!
//! ```text
//! <- {"hello":{"channel":1}}
//! -> {"channel":1,"request":{"op":"limit_fields","fields":["pw_name","pw_uid"]}}
//! <- {"ok":{"reply":"limited"}}
//! -> {"channel":1,"request":{"op":"get_uid","uid":0,"storage":{"mode":"owned"}}}
//! <- {"ok":{"reply":"record","value":{...}}}
//! ```

#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod server;

pub use client::Client;
pub use config::{LimitsConfig, NodeConfig, SourceConfig};
pub use error::NodeError;
pub use server::{Connection, Greeting, Server, MAX_FRAME_LEN};
