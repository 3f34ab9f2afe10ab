use std::fmt;
use std::io;

use nvwire_ext::ExtError;
use nvwire_rpc::RpcError;

// Exit codes shared by every subcommand.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn ext_error(context: &str, err: ExtError) -> CliError {
    match err {
        ExtError::Io(source) => io_error(context, source),
        ExtError::Encode(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn rpc_error(context: &str, err: RpcError) -> CliError {
    match err {
        RpcError::Connect { source, .. } | RpcError::Io(source) => io_error(context, source),
        RpcError::Codec(err) => ext_error(context, err),
        RpcError::InvalidMessage(_) | RpcError::MessageTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        RpcError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        RpcError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        RpcError::Remote { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn rpc_errors_map_to_exit_codes() {
        assert_eq!(rpc_error("x", RpcError::Timeout(Duration::from_secs(1))).code, TIMEOUT);
        assert_eq!(rpc_error("x", RpcError::ConnectionClosed).code, TRANSPORT_ERROR);
        assert_eq!(
            rpc_error("x", RpcError::Codec(ExtError::UnknownExtensionType(5))).code,
            DATA_INVALID
        );
        let refused = RpcError::Connect {
            target: "/tmp/nvim.sock".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(rpc_error("connect failed", refused).code, TRANSPORT_ERROR);
    }
}
