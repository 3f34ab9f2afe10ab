//! Neovim remote object handles over msgpack.
//!
//! # Crate Structure
//!
//! - [`ext`]: extension-type codec, handle types and the serialization module
//! - [`rpc`]: blocking msgpack-RPC channel whose results carry live handles

/// Re-export codec and handle types.
pub mod ext {
    pub use nvwire_ext::*;
}

/// Re-export RPC channel types.
pub mod rpc {
    pub use nvwire_rpc::*;
}

pub use nvwire_ext::{Buffer, ExtModule, Handle, RpcChannel, Tabpage, Value, Window};
pub use nvwire_rpc::StreamChannel;
