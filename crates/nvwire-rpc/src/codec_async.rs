use bytes::BytesMut;
use nvwire_ext::ExtModule;
use tokio_util::codec::{Decoder, Encoder};

use crate::config::DEFAULT_MAX_MESSAGE;
use crate::error::RpcError;
use crate::message::{decode_message, encode_message, Message};

/// `tokio_util` codec for msgpack-RPC messages.
///
/// Decoded handles are bound to the module's channel.
#[derive(Debug, Clone)]
pub struct RpcCodec {
    module: ExtModule,
    max_message_size: usize,
}

impl RpcCodec {
    pub fn new(module: ExtModule) -> Self {
        Self::with_max_message_size(module, DEFAULT_MAX_MESSAGE)
    }

    pub fn with_max_message_size(module: ExtModule, max_message_size: usize) -> Self {
        Self {
            module,
            max_message_size,
        }
    }

    pub fn module(&self) -> &ExtModule {
        &self.module
    }
}

impl Decoder for RpcCodec {
    type Item = Message;
    type Error = RpcError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_message(src, &self.module, self.max_message_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(message) => Ok(Some(message)),
            None if src.is_empty() => Ok(None),
            None => Err(RpcError::ConnectionClosed),
        }
    }
}

impl Encoder<Message> for RpcCodec {
    type Error = RpcError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_message(&item, &self.module, self.max_message_size, dst)
    }
}

impl Encoder<&Message> for RpcCodec {
    type Error = RpcError;

    fn encode(&mut self, item: &Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_message(item, &self.module, self.max_message_size, dst)
    }
}
