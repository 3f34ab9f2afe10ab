use std::time::Duration;

use nvwire_ext::CodecConfig;

/// Default maximum message size: 16 MiB.
pub const DEFAULT_MAX_MESSAGE: usize = 16 * 1024 * 1024;

/// Configuration for a [`StreamChannel`](crate::client::StreamChannel).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum encoded message size in bytes. Default: 16 MiB.
    pub max_message_size: usize,
    /// Read timeout applied to socket transports.
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to socket transports.
    pub write_timeout: Option<Duration>,
    /// Codec settings for arguments and results.
    pub codec: CodecConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE,
            read_timeout: None,
            write_timeout: None,
            codec: CodecConfig::default(),
        }
    }
}
