use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use nvwire_ext::ExtTag;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod call;
pub mod encode;
pub mod inspect;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the wire bytes of a handle.
    Encode(EncodeArgs),
    /// Decode a msgpack document and print its value tree.
    Inspect(InspectArgs),
    /// Call a method on a running editor.
    Call(CallArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Call(args) => call::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum HandleKind {
    Buffer,
    Window,
    Tabpage,
}

impl From<HandleKind> for ExtTag {
    fn from(kind: HandleKind) -> Self {
        match kind {
            HandleKind::Buffer => ExtTag::Buffer,
            HandleKind::Window => ExtTag::Window,
            HandleKind::Tabpage => ExtTag::Tabpage,
        }
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Handle type.
    pub kind: HandleKind,
    /// Object id.
    #[arg(allow_negative_numbers = true)]
    pub id: i64,
    /// Wrap the handle in a one-element array, as in an argument list.
    #[arg(long)]
    pub wrap: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Hex-encoded msgpack document (whitespace allowed).
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read the document from a file instead.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
    /// Accept bytes after the first value.
    #[arg(long)]
    pub allow_trailing: bool,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Unix socket path, or host:port with --tcp.
    #[arg(env = "NVIM_LISTEN_ADDRESS")]
    pub address: String,
    /// Method name, e.g. nvim_get_current_buf.
    pub method: String,
    /// Arguments as a JSON array. `{"type":"buffer","id":1}` denotes a handle.
    #[arg(long, value_name = "JSON", default_value = "[]")]
    pub args: String,
    /// Connect over TCP instead of a Unix socket.
    #[arg(long)]
    pub tcp: bool,
    /// Maximum time to wait for the response (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show build details and the handle table.
    #[arg(long)]
    pub extended: bool,
}
