//! Extension type tags.
//!
//! The editor advertises one msgpack extension type per remote object kind.
//! The table is fixed by the peer: Buffer = 0, Window = 1, Tabpage = 2.

use std::fmt;

use crate::error::ExtError;

/// Extension type tag identifying a handle variant on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtTag {
    Buffer,
    Window,
    Tabpage,
}

impl ExtTag {
    /// Every tag in wire order.
    pub const ALL: [ExtTag; 3] = [ExtTag::Buffer, ExtTag::Window, ExtTag::Tabpage];

    /// The wire code of this tag.
    pub const fn code(self) -> i8 {
        match self {
            ExtTag::Buffer => 0,
            ExtTag::Window => 1,
            ExtTag::Tabpage => 2,
        }
    }

    /// Look up a tag by wire code.
    pub const fn from_code(code: i8) -> Option<Self> {
        match code {
            0 => Some(ExtTag::Buffer),
            1 => Some(ExtTag::Window),
            2 => Some(ExtTag::Tabpage),
            _ => None,
        }
    }

    /// Type name as the editor reports it in its API metadata.
    pub const fn name(self) -> &'static str {
        match self {
            ExtTag::Buffer => "Buffer",
            ExtTag::Window => "Window",
            ExtTag::Tabpage => "Tabpage",
        }
    }

    /// Method prefix the editor uses for functions taking this handle.
    pub const fn api_prefix(self) -> &'static str {
        match self {
            ExtTag::Buffer => "nvim_buf_",
            ExtTag::Window => "nvim_win_",
            ExtTag::Tabpage => "nvim_tabpage_",
        }
    }
}

impl TryFrom<i8> for ExtTag {
    type Error = ExtError;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(ExtError::UnknownExtensionType(code))
    }
}

impl fmt::Display for ExtTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
