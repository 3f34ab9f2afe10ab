use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use nvwire_ext::ExtModule;

use crate::config::DEFAULT_MAX_MESSAGE;
use crate::error::{Result, RpcError};
use crate::message::{encode_message, Message};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete msgpack-RPC messages to any `Write` stream.
pub struct MessageWriter<T> {
    inner: T,
    buf: BytesMut,
    max_message_size: usize,
}

impl<T: Write> MessageWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_max_message_size(inner, DEFAULT_MAX_MESSAGE)
    }

    pub fn with_max_message_size(inner: T, max_message_size: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_message_size,
        }
    }

    /// Encode and send one message (blocking), then flush.
    ///
    /// Nothing reaches the stream if encoding fails.
    pub fn write_message(&mut self, message: &Message, module: &ExtModule) -> Result<()> {
        self.buf.clear();
        encode_message(message, module, self.max_message_size, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(RpcError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(RpcError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(RpcError::Io(err)),
            }
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}
