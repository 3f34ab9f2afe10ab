use std::net::{TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
#[cfg(unix)]
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout};
use std::sync::Arc;

use crate::client::StreamChannel;
use crate::config::ClientConfig;
use crate::error::{Result, RpcError};

/// Channel over a Unix domain socket (`nvim --listen`).
#[cfg(unix)]
pub type UnixChannel = StreamChannel<UnixStream, UnixStream>;
/// Channel over TCP.
pub type TcpChannel = StreamChannel<TcpStream, TcpStream>;
/// Channel over the stdio pipes of a child process (`nvim --embed`).
pub type ChildChannel = StreamChannel<ChildStdout, ChildStdin>;

/// Connect to an editor listening on a Unix domain socket.
#[cfg(unix)]
pub fn connect(path: impl AsRef<Path>) -> Result<Arc<UnixChannel>> {
    connect_with_config(path, ClientConfig::default())
}

/// Connect to a Unix domain socket with explicit configuration.
#[cfg(unix)]
pub fn connect_with_config(path: impl AsRef<Path>, config: ClientConfig) -> Result<Arc<UnixChannel>> {
    let path = path.as_ref();
    let connect_err = |source| RpcError::Connect {
        target: path.display().to_string(),
        source,
    };

    let stream = UnixStream::connect(path).map_err(connect_err)?;
    stream.set_read_timeout(config.read_timeout)?;
    stream.set_write_timeout(config.write_timeout)?;
    let reader = stream.try_clone()?;

    tracing::debug!(path = %path.display(), "connected");
    Ok(StreamChannel::with_config(reader, stream, config))
}

/// Connect to an editor listening on a TCP address.
pub fn connect_tcp(addr: impl ToSocketAddrs + std::fmt::Debug) -> Result<Arc<TcpChannel>> {
    connect_tcp_with_config(addr, ClientConfig::default())
}

/// Connect to a TCP address with explicit configuration.
pub fn connect_tcp_with_config(
    addr: impl ToSocketAddrs + std::fmt::Debug,
    config: ClientConfig,
) -> Result<Arc<TcpChannel>> {
    let target = format!("{addr:?}");
    let stream = TcpStream::connect(addr).map_err(|source| RpcError::Connect {
        target: target.clone(),
        source,
    })?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(config.read_timeout)?;
    stream.set_write_timeout(config.write_timeout)?;
    let reader = stream.try_clone()?;

    tracing::debug!(%target, "connected");
    Ok(StreamChannel::with_config(reader, stream, config))
}

/// Talk to a child process over its stdio pipes.
///
/// Both `stdin` and `stdout` must have been configured as
/// [`Stdio::piped`](std::process::Stdio::piped). The pipes are taken from
/// `child`; the caller keeps ownership of the process itself. Timeouts in
/// `config` do not apply to pipes.
pub fn from_child(child: &mut Child, config: ClientConfig) -> Result<Arc<ChildChannel>> {
    let target = format!("child process {}", child.id());
    let (Some(stdout), Some(stdin)) = (child.stdout.take(), child.stdin.take()) else {
        return Err(RpcError::Connect {
            target,
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "stdin and stdout must be piped",
            ),
        });
    };

    tracing::debug!(%target, "attached");
    Ok(StreamChannel::with_config(stdout, stdin, config))
}
