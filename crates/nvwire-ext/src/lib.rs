//! Msgpack extension-type codec for Neovim remote object handles.
//!
//! The editor's RPC protocol carries buffers, windows and tabpages as
//! msgpack extension values:
//! - A 1-byte extension type from a fixed table (Buffer 0, Window 1, Tabpage 2)
//! - A payload holding the object id as one packed integer, nothing else
//!
//! [`ExtModule`] plugs these handles into serde for one session, so that
//! arrays, maps and structs containing handles round-trip transparently and
//! every decoded handle stays bound to the channel that produced it.

pub mod channel;
pub mod codec;
pub mod config;
pub mod decode;
pub mod error;
pub mod handle;
pub mod module;
pub mod tag;
pub mod value;

pub use channel::{ChannelRef, RecordedCall, RecordingChannel, RpcChannel};
pub use codec::{decode_payload, encode_ext, encode_payload, MAX_PAYLOAD_LEN};
pub use config::{CodecConfig, DEFAULT_MAX_DOCUMENT};
pub use decode::{Decode, DecodeContext, Seed};
pub use error::{CallError, ExtError, Result};
pub use handle::{Buffer, Handle, RemoteHandle, Tabpage, Window};
pub use module::ExtModule;
pub use tag::ExtTag;
pub use value::Value;
