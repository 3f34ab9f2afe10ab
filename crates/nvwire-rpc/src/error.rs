use nvwire_ext::{CallError, ExtError};

/// Errors that can occur on a msgpack-RPC channel.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Failed to open the connection.
    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        source: std::io::Error,
    },

    /// A message body could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] ExtError),

    /// A well-formed msgpack value that is not a msgpack-RPC message.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The message exceeds the configured maximum size.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The peer answered with an error object.
    #[error("remote error: {message}")]
    Remote { kind: Option<i64>, message: String },

    /// No response arrived within the read timeout.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// An I/O error occurred while reading or writing messages.
    #[error("rpc I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete message was received.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, RpcError>;

impl From<RpcError> for CallError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Codec(err) => CallError::Codec(err),
            RpcError::Remote { kind, message } => CallError::Remote { kind, message },
            RpcError::ConnectionClosed => CallError::Disconnected,
            other => CallError::Transport(other.to_string()),
        }
    }
}
