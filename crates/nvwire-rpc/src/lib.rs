//! Blocking msgpack-RPC channel for Neovim.
//!
//! Messages are plain msgpack arrays with no extra framing; a
//! [`MessageReader`] cuts them out of the byte stream by decoding. A
//! [`StreamChannel`] implements [`nvwire_ext::RpcChannel`], so handles in
//! its results can call back into the same editor.

pub mod client;
#[cfg(feature = "async")]
pub mod codec_async;
pub mod config;
pub mod connector;
pub mod error;
pub mod message;
pub mod reader;
pub mod writer;

pub use client::StreamChannel;
#[cfg(feature = "async")]
pub use codec_async::RpcCodec;
pub use config::{ClientConfig, DEFAULT_MAX_MESSAGE};
#[cfg(unix)]
pub use connector::{connect, connect_with_config, UnixChannel};
pub use connector::{connect_tcp, connect_tcp_with_config, from_child, ChildChannel, TcpChannel};
pub use error::{Result, RpcError};
pub use message::{
    decode_message, encode_message, remote_error, Message, NOTIFICATION, REQUEST, RESPONSE,
};
pub use reader::MessageReader;
pub use writer::MessageWriter;
