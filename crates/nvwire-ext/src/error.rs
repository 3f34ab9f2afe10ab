/// Errors that can occur while encoding or decoding handle-bearing values.
#[derive(Debug, thiserror::Error)]
pub enum ExtError {
    /// The extension payload is not exactly one packed integer.
    #[error("malformed payload for extension type {tag}: {reason}")]
    MalformedPayload { tag: i8, reason: String },

    /// The extension tag is not part of the handle table.
    #[error("unknown extension type {0}")]
    UnknownExtensionType(i8),

    /// A value of the wrong kind was found where a specific handle was required.
    #[error("type mismatch (expected {expected}, found {found})")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    /// Bytes remain after the top-level value.
    #[error("trailing data after value ({remaining} bytes)")]
    TrailingData { remaining: usize },

    /// The document exceeds the configured maximum size.
    #[error("document too large ({size} bytes, max {max})")]
    DocumentTooLarge { size: usize, max: usize },

    /// The serializer rejected the value.
    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// The deserializer rejected the input.
    #[error("decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// An I/O error occurred on the underlying reader or writer.
    #[error("codec I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExtError>;

/// Errors surfaced by [`RpcChannel::call`](crate::channel::RpcChannel::call).
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The peer answered the request with an error object.
    #[error("remote error: {message}")]
    Remote { kind: Option<i64>, message: String },

    /// Arguments or result could not be (de)serialized.
    #[error("codec error: {0}")]
    Codec(#[from] ExtError),

    /// The transport failed while the call was in flight.
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer is gone.
    #[error("channel disconnected")]
    Disconnected,
}
