//! Session-bound codec entry points.

use std::io::{Cursor, ErrorKind, Read, Write};

use rmp_serde::{Deserializer, Serializer};
use serde::Serialize;

use crate::channel::ChannelRef;
use crate::config::CodecConfig;
use crate::decode::{Decode, DecodeContext};
use crate::error::{ExtError, Result};
use crate::handle::Handle;

/// Binds every handle type to its extension codec for one session.
///
/// Encoding accepts any `Serialize` value; handles anywhere in the tree come
/// out as extension values. Decoding goes through [`Decode`] so that every
/// handle it produces is bound to this module's channel. Create one module
/// per channel; modules are cheap to clone and hold no mutable state.
#[derive(Clone)]
pub struct ExtModule {
    channel: ChannelRef,
    config: CodecConfig,
}

impl ExtModule {
    /// Create a module for `channel` with default configuration.
    pub fn new(channel: ChannelRef) -> Self {
        Self::with_config(channel, CodecConfig::default())
    }

    /// Create a module for `channel` with explicit configuration.
    pub fn with_config(channel: ChannelRef, config: CodecConfig) -> Self {
        Self { channel, config }
    }

    /// Session decoded handles are bound to.
    pub fn channel(&self) -> &ChannelRef {
        &self.channel
    }

    /// Current module configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Serialize `value` to a new buffer.
    pub fn to_vec<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(64);
        if self.config.struct_map {
            value.serialize(&mut Serializer::new(&mut buf).with_struct_map())?;
        } else {
            value.serialize(&mut Serializer::new(&mut buf))?;
        }

        if buf.len() > self.config.max_document_size {
            return Err(ExtError::DocumentTooLarge {
                size: buf.len(),
                max: self.config.max_document_size,
            });
        }
        Ok(buf)
    }

    /// Serialize `value` into `writer`.
    ///
    /// Nothing is written if serialization fails.
    pub fn to_writer<W, T>(&self, writer: &mut W, value: &T) -> Result<()>
    where
        W: Write + ?Sized,
        T: Serialize + ?Sized,
    {
        let buf = self.to_vec(value)?;
        writer.write_all(&buf)?;
        Ok(())
    }

    /// Decode exactly one value from `bytes`.
    pub fn from_slice<T: Decode>(&self, bytes: &[u8]) -> Result<T> {
        self.check_size(bytes.len())?;
        let (value, consumed) = self.decode_at(bytes)?;
        if self.config.reject_trailing_bytes && consumed < bytes.len() {
            return Err(ExtError::TrailingData {
                remaining: bytes.len() - consumed,
            });
        }
        Ok(value)
    }

    /// Decode one value from the front of `bytes`.
    ///
    /// Returns `Ok(None)` if `bytes` ends before the value does, otherwise the
    /// value and the number of bytes it occupied.
    pub fn decode_prefix<T: Decode>(&self, bytes: &[u8]) -> Result<Option<(T, usize)>> {
        match self.decode_at(bytes) {
            Ok((value, consumed)) => {
                self.check_size(consumed)?;
                Ok(Some((value, consumed)))
            }
            Err(ExtError::Decode(err)) if is_incomplete(&err) => {
                self.check_size(bytes.len())?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Decode one value from a blocking reader.
    ///
    /// At most `max_document_size` bytes are read. A value that runs past
    /// the limit fails with [`ExtError::DocumentTooLarge`]; its `size` is
    /// then a lower bound.
    pub fn from_read<T: Decode, R: Read>(&self, reader: R) -> Result<T> {
        let max = self.config.max_document_size;
        let ctx = DecodeContext::new(self.channel.clone());
        let mut limited = reader.take(u64::try_from(max).unwrap_or(u64::MAX));
        let decoded = {
            let mut de = Deserializer::new(&mut limited);
            T::decode(&mut de, &ctx)
        };
        decoded.map_err(|err| {
            if let Some(fault) = ctx.take_fault() {
                return fault;
            }
            if limited.limit() == 0 && is_incomplete(&err) && has_more(limited.get_mut()) {
                return ExtError::DocumentTooLarge {
                    size: max.saturating_add(1),
                    max,
                };
            }
            ExtError::Decode(err)
        })
    }

    /// Resolve a raw extension value through the handle table.
    pub fn resolve(&self, tag: i8, payload: &[u8]) -> Result<Handle> {
        DecodeContext::new(self.channel.clone()).resolve(tag, payload)
    }

    fn decode_at<T: Decode>(&self, bytes: &[u8]) -> Result<(T, usize)> {
        let ctx = DecodeContext::new(self.channel.clone());
        let mut cursor = Cursor::new(bytes);
        let value = {
            let mut de = Deserializer::new(&mut cursor);
            T::decode(&mut de, &ctx)
                .map_err(|err| ctx.take_fault().unwrap_or(ExtError::Decode(err)))?
        };
        Ok((value, cursor.position() as usize))
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.config.max_document_size {
            return Err(ExtError::DocumentTooLarge {
                size,
                max: self.config.max_document_size,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ExtModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtModule")
            .field("channel", &self.channel)
            .field("config", &self.config)
            .finish()
    }
}

fn has_more<R: Read>(reader: &mut R) -> bool {
    let mut probe = [0u8; 1];
    loop {
        match reader.read(&mut probe) {
            Ok(n) => return n > 0,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(_) => return false,
        }
    }
}

fn is_incomplete(err: &rmp_serde::decode::Error) -> bool {
    match err {
        rmp_serde::decode::Error::InvalidMarkerRead(io)
        | rmp_serde::decode::Error::InvalidDataRead(io) => io.kind() == ErrorKind::UnexpectedEof,
        _ => false,
    }
}
