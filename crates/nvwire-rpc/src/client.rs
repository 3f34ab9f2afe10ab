use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use nvwire_ext::{CallError, ExtModule, RpcChannel, Value};

use crate::config::ClientConfig;
use crate::error::{Result, RpcError};
use crate::message::{remote_error, Message};
use crate::reader::MessageReader;
use crate::writer::MessageWriter;

/// Error kind reported back to the editor for requests this client
/// does not serve.
const EXCEPTION: i64 = 0;

struct Io<R, W> {
    reader: MessageReader<R>,
    writer: MessageWriter<W>,
}

/// Blocking msgpack-RPC client over a byte stream pair.
///
/// One request is in flight at a time; concurrent callers queue on an
/// internal lock. Handles in every result are bound to this channel, so
/// they can issue further calls through it.
pub struct StreamChannel<R, W> {
    io: Mutex<Io<R, W>>,
    next_id: AtomicU32,
    broken: AtomicBool,
    config: ClientConfig,
    this: Weak<Self>,
}

impl<R, W> StreamChannel<R, W>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    /// Create a channel with default configuration.
    pub fn new(reader: R, writer: W) -> Arc<Self> {
        Self::with_config(reader, writer, ClientConfig::default())
    }

    /// Create a channel with explicit configuration.
    ///
    /// Timeouts in `config` are not applied here; transports that support
    /// them are configured by the connectors.
    pub fn with_config(reader: R, writer: W, config: ClientConfig) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            io: Mutex::new(Io {
                reader: MessageReader::with_max_message_size(reader, config.max_message_size),
                writer: MessageWriter::with_max_message_size(writer, config.max_message_size),
            }),
            next_id: AtomicU32::new(0),
            broken: AtomicBool::new(false),
            config,
            this: this.clone(),
        })
    }

    /// Codec module whose decoded handles are bound to this channel.
    pub fn module(&self) -> Result<ExtModule> {
        let this = self.this.upgrade().ok_or(RpcError::ConnectionClosed)?;
        Ok(ExtModule::with_config(this, self.config.codec))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send a request and wait for its response.
    pub fn request(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        self.ensure_open()?;
        let module = self.module()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut io = self.io.lock().unwrap_or_else(PoisonError::into_inner);

        tracing::debug!(id, method, "sending request");
        let request = Message::Request {
            id,
            method: method.to_string(),
            params,
        };
        io.writer
            .write_message(&request, &module)
            .map_err(|err| self.fail_write(err))?;

        loop {
            let message = io
                .reader
                .read_message(&module)
                .map_err(|err| self.fail(err))?;

            match message {
                Message::Response {
                    id: got,
                    error,
                    result,
                } if got == id => {
                    tracing::debug!(id, method, failed = !error.is_nil(), "response received");
                    if error.is_nil() {
                        return Ok(result);
                    }
                    return Err(remote_error(error));
                }
                Message::Response { id: stale, .. } => {
                    tracing::warn!(id = stale, expected = id, "dropping unmatched response");
                }
                Message::Notification { method, .. } => {
                    tracing::debug!(%method, "dropping notification");
                }
                Message::Request {
                    id: peer_id,
                    method,
                    ..
                } => {
                    tracing::warn!(id = peer_id, %method, "rejecting request from peer");
                    let reply = Message::Response {
                        id: peer_id,
                        error: Value::Array(vec![
                            Value::from(EXCEPTION),
                            Value::from(format!("no handler for {method}")),
                        ]),
                        result: Value::Nil,
                    };
                    io.writer
                        .write_message(&reply, &module)
                        .map_err(|err| self.fail_write(err))?;
                }
            }
        }
    }

    /// Send a notification. No response is expected.
    pub fn notify(&self, method: &str, params: Vec<Value>) -> Result<()> {
        self.ensure_open()?;
        let module = self.module()?;
        let mut io = self.io.lock().unwrap_or_else(PoisonError::into_inner);

        tracing::debug!(method, "sending notification");
        let message = Message::Notification {
            method: method.to_string(),
            params,
        };
        io.writer
            .write_message(&message, &module)
            .map_err(|err| self.fail_write(err))
    }

    /// Whether an earlier failure left the stream unusable.
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_broken() {
            return Err(RpcError::ConnectionClosed);
        }
        Ok(())
    }

    // A timed-out read keeps its partial bytes buffered and may resume.
    // Anything else leaves the stream position unknown.
    fn fail(&self, err: RpcError) -> RpcError {
        match err {
            RpcError::Io(io) if is_timeout(&io) => {
                RpcError::Timeout(self.config.read_timeout.unwrap_or_default())
            }
            other => self.poison(other),
        }
    }

    // Encoding happens before any byte is written.
    fn fail_write(&self, err: RpcError) -> RpcError {
        match err {
            RpcError::Codec(_) | RpcError::MessageTooLarge { .. } => err,
            RpcError::Io(io) if is_timeout(&io) => self.poison(RpcError::Timeout(
                self.config.write_timeout.unwrap_or_default(),
            )),
            other => self.poison(other),
        }
    }

    fn poison(&self, err: RpcError) -> RpcError {
        tracing::debug!(error = %err, "channel unusable");
        self.broken.store(true, Ordering::Release);
        err
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

impl<R, W> RpcChannel for StreamChannel<R, W>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    fn call(&self, method: &str, args: Vec<Value>) -> std::result::Result<Value, CallError> {
        self.request(method, args).map_err(CallError::from)
    }
}

impl<R, W> fmt::Debug for StreamChannel<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamChannel")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("broken", &self.broken.load(Ordering::Relaxed))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
