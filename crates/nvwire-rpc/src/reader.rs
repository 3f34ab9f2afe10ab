use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use nvwire_ext::ExtModule;

use crate::config::DEFAULT_MAX_MESSAGE;
use crate::error::{Result, RpcError};
use crate::message::{decode_message, Message};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete msgpack-RPC messages from any `Read` stream.
///
/// msgpack values are self-delimiting, so messages are cut from the byte
/// stream by decoding; partial reads are buffered until a value completes.
pub struct MessageReader<T> {
    inner: T,
    buf: BytesMut,
    max_message_size: usize,
}

impl<T: Read> MessageReader<T> {
    /// Create a reader with the default message size limit.
    pub fn new(inner: T) -> Self {
        Self::with_max_message_size(inner, DEFAULT_MAX_MESSAGE)
    }

    /// Create a reader with an explicit message size limit.
    pub fn with_max_message_size(inner: T, max_message_size: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_message_size,
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Handles in the message are bound to `module`'s channel. Returns
    /// `Err(RpcError::ConnectionClosed)` when EOF is reached.
    pub fn read_message(&mut self, module: &ExtModule) -> Result<Message> {
        loop {
            if let Some(message) = decode_message(&mut self.buf, module, self.max_message_size)? {
                return Ok(message);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(RpcError::Io(err)),
            };

            if read == 0 {
                return Err(RpcError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Bytes received but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
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

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use nvwire_ext::{Buffer, RecordingChannel, Value};

    use super::*;
    use crate::message::encode_message;

    fn module() -> ExtModule {
        ExtModule::new(RecordingChannel::shared())
    }

    fn wire(messages: &[Message], module: &ExtModule) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for message in messages {
            encode_message(message, module, DEFAULT_MAX_MESSAGE, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    fn notification(method: &str) -> Message {
        Message::Notification {
            method: method.to_string(),
            params: vec![Value::from(1)],
        }
    }

    #[test]
    fn read_multiple_messages() {
        let module = module();
        let bytes = wire(&[notification("one"), notification("two")], &module);

        let mut reader = MessageReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_message(&module).unwrap(), notification("one"));
        assert_eq!(reader.read_message(&module).unwrap(), notification("two"));
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn partial_read_handling() {
        let module = module();
        let response = Message::Response {
            id: 9,
            error: Value::Nil,
            result: Value::from(Buffer::new(module.channel().clone(), 300)),
        };
        let bytes = wire(std::slice::from_ref(&response), &module);

        let mut reader = MessageReader::new(ByteByByteReader { bytes, pos: 0 });
        assert_eq!(reader.read_message(&module).unwrap(), response);
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = MessageReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_message(&module()).unwrap_err();
        assert!(matches!(err, RpcError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_message() {
        let module = module();
        let mut bytes = wire(&[notification("nvim_buf_changedtick_event")], &module);
        bytes.truncate(bytes.len() - 3);

        let mut reader = MessageReader::new(Cursor::new(bytes));
        let err = reader.read_message(&module).unwrap_err();
        assert!(matches!(err, RpcError::ConnectionClosed));
    }

    #[test]
    fn interrupted_read_retries() {
        let module = module();
        let bytes = wire(&[notification("redraw")], &module);
        let mut reader = MessageReader::new(InterruptedOnce {
            interrupted: false,
            inner: Cursor::new(bytes),
        });
        assert_eq!(reader.read_message(&module).unwrap(), notification("redraw"));
    }

    #[test]
    fn would_block_propagates_io_error() {
        let mut reader = MessageReader::new(WouldBlock);
        let err = reader.read_message(&module()).unwrap_err();
        assert!(matches!(err, RpcError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedOnce {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedOnce {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    struct WouldBlock;

    impl Read for WouldBlock {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }
    }
}
