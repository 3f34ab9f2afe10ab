//! Remote object handles.
//!
//! A handle is a local proxy for an object living in the editor: an opaque
//! id assigned by the peer plus the session it came from. Identity is the
//! pair `(variant, id)`; the session reference never takes part in
//! equality, hashing or serialization.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::ser::{self, Serialize, Serializer};

use crate::channel::ChannelRef;
use crate::codec::encode_payload;
use crate::decode::{decode_handle, Decode, DecodeContext};
use crate::error::ExtError;
use crate::tag::ExtTag;

/// Capabilities shared by every handle variant.
pub trait RemoteHandle: Sized {
    /// Extension tag this variant travels under.
    const TAG: ExtTag;

    /// Build a handle from its parts.
    fn from_parts(channel: ChannelRef, id: i64) -> Self;

    /// Peer-assigned identifier.
    fn id(&self) -> i64;

    /// Session that owns the remote object.
    fn channel(&self) -> &ChannelRef;
}

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident => $tag:expr) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            id: i64,
            channel: ChannelRef,
        }

        impl $name {
            /// Wrap a known id for the given session.
            pub fn new(channel: ChannelRef, id: i64) -> Self {
                Self { id, channel }
            }

            /// Peer-assigned identifier.
            pub fn id(&self) -> i64 {
                self.id
            }

            /// Session that owns the remote object.
            pub fn channel(&self) -> &ChannelRef {
                &self.channel
            }
        }

        impl RemoteHandle for $name {
            const TAG: ExtTag = $tag;

            fn from_parts(channel: ChannelRef, id: i64) -> Self {
                Self::new(channel, id)
            }

            fn id(&self) -> i64 {
                self.id
            }

            fn channel(&self) -> &ChannelRef {
                &self.channel
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                Self::TAG.hash(state);
                self.id.hash(state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("id", &self.id)
                    .finish_non_exhaustive()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.id)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serialize_ext(Self::TAG, self.id, serializer)
            }
        }

        impl Decode for $name {
            fn decode<'de, D>(deserializer: D, ctx: &DecodeContext) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                decode_handle(deserializer, ctx, Some(Self::TAG)).and_then(|handle| {
                    match handle {
                        Handle::$name(inner) => Ok(inner),
                        other => Err(ctx.fail::<D::Error>(ExtError::TypeMismatch {
                            expected: stringify!($name),
                            found: other.to_string(),
                        })),
                    }
                })
            }
        }

        impl From<$name> for Handle {
            fn from(handle: $name) -> Self {
                Handle::$name(handle)
            }
        }

        impl TryFrom<Handle> for $name {
            type Error = ExtError;

            fn try_from(handle: Handle) -> Result<Self, Self::Error> {
                match handle {
                    Handle::$name(inner) => Ok(inner),
                    other => Err(ExtError::TypeMismatch {
                        expected: stringify!($name),
                        found: other.to_string(),
                    }),
                }
            }
        }
    };
}

define_handle!(
    /// An editor buffer.
    Buffer => ExtTag::Buffer
);
define_handle!(
    /// An editor window.
    Window => ExtTag::Window
);
define_handle!(
    /// An editor tab page.
    Tabpage => ExtTag::Tabpage
);

/// Any handle variant.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Handle {
    Buffer(Buffer),
    Window(Window),
    Tabpage(Tabpage),
}

impl Handle {
    /// Build the variant selected by `tag`.
    pub fn from_parts(tag: ExtTag, channel: ChannelRef, id: i64) -> Self {
        match tag {
            ExtTag::Buffer => Handle::Buffer(Buffer::new(channel, id)),
            ExtTag::Window => Handle::Window(Window::new(channel, id)),
            ExtTag::Tabpage => Handle::Tabpage(Tabpage::new(channel, id)),
        }
    }

    pub fn tag(&self) -> ExtTag {
        match self {
            Handle::Buffer(_) => ExtTag::Buffer,
            Handle::Window(_) => ExtTag::Window,
            Handle::Tabpage(_) => ExtTag::Tabpage,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Handle::Buffer(inner) => inner.id(),
            Handle::Window(inner) => inner.id(),
            Handle::Tabpage(inner) => inner.id(),
        }
    }

    pub fn channel(&self) -> &ChannelRef {
        match self {
            Handle::Buffer(inner) => inner.channel(),
            Handle::Window(inner) => inner.channel(),
            Handle::Tabpage(inner) => inner.channel(),
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handle::Buffer(inner) => inner.fmt(f),
            Handle::Window(inner) => inner.fmt(f),
            Handle::Tabpage(inner) => inner.fmt(f),
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.tag(), self.id())
    }
}

impl Serialize for Handle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_ext(self.tag(), self.id(), serializer)
    }
}

impl Decode for Handle {
    fn decode<'de, D>(deserializer: D, ctx: &DecodeContext) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        decode_handle(deserializer, ctx, None)
    }
}

/// Emit one handle as a msgpack extension value.
///
/// rmp-serde turns the `_ExtStruct` newtype carrying `(tag, bytes)` into an
/// extension header followed by the raw payload. Other serde formats see a
/// plain `(tag, bytes)` tuple.
fn serialize_ext<S: Serializer>(tag: ExtTag, id: i64, serializer: S) -> Result<S::Ok, S::Error> {
    let payload = encode_payload(id).map_err(<S::Error as ser::Error>::custom)?;
    serializer.serialize_newtype_struct(
        rmp_serde::MSGPACK_EXT_STRUCT_NAME,
        &(tag.code(), RawPayload(&payload)),
    )
}

struct RawPayload<'a>(&'a [u8]);

impl Serialize for RawPayload<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.0)
    }
}
