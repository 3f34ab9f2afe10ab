//! Channel-aware deserialization.
//!
//! serde's `Deserialize` has no room for runtime state, but a decoded handle
//! must be bound to the session that decoded it. [`Decode`] is the seeded
//! counterpart: every implementation receives the [`DecodeContext`] of the
//! current call and threads it down to nested values.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

use crate::channel::ChannelRef;
use crate::codec::decode_payload;
use crate::error::ExtError;
use crate::handle::Handle;
use crate::tag::ExtTag;

/// State shared by every value decoded in one call.
pub struct DecodeContext {
    channel: ChannelRef,
    fault: Cell<Option<ExtError>>,
}

impl DecodeContext {
    /// Create a context that binds decoded handles to `channel`.
    pub fn new(channel: ChannelRef) -> Self {
        Self {
            channel,
            fault: Cell::new(None),
        }
    }

    /// Session decoded handles are bound to.
    pub fn channel(&self) -> &ChannelRef {
        &self.channel
    }

    /// Record `err` as the cause of the current failure and convert it for serde.
    ///
    /// The first recorded fault wins; the caller of the decode gets it back
    /// unchanged instead of serde's stringified copy.
    pub fn fail<E: de::Error>(&self, err: ExtError) -> E {
        let message = err.to_string();
        let previous = self.fault.take();
        self.fault.set(previous.or(Some(err)));
        E::custom(message)
    }

    pub(crate) fn take_fault(&self) -> Option<ExtError> {
        self.fault.take()
    }

    /// Map an extension value onto a handle through the fixed tag table.
    pub fn resolve(&self, tag: i8, payload: &[u8]) -> Result<Handle, ExtError> {
        let Some(ext_tag) = ExtTag::from_code(tag) else {
            tracing::warn!(tag, len = payload.len(), "unknown extension type");
            return Err(ExtError::UnknownExtensionType(tag));
        };
        let id = decode_payload(ext_tag, payload)?;
        tracing::trace!(tag, id, "decoded {ext_tag} handle");
        Ok(Handle::from_parts(ext_tag, self.channel.clone(), id))
    }

    fn resolve_expected(
        &self,
        tag: i8,
        payload: &[u8],
        expected: Option<ExtTag>,
    ) -> Result<Handle, ExtError> {
        match (expected, ExtTag::from_code(tag)) {
            (Some(want), Some(got)) if want != got => Err(ExtError::TypeMismatch {
                expected: want.name(),
                found: format!("{got} extension"),
            }),
            _ => self.resolve(tag, payload),
        }
    }
}

impl fmt::Debug for DecodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeContext")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

/// A type that can be decoded with access to the current [`DecodeContext`].
pub trait Decode: Sized {
    fn decode<'de, D>(deserializer: D, ctx: &DecodeContext) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>;
}

/// [`DeserializeSeed`] adapter that decodes a `T` with a borrowed context.
pub struct Seed<'a, T> {
    ctx: &'a DecodeContext,
    marker: PhantomData<fn() -> T>,
}

impl<'a, T> Seed<'a, T> {
    pub fn new(ctx: &'a DecodeContext) -> Self {
        Self {
            ctx,
            marker: PhantomData,
        }
    }
}

impl<'de, T: Decode> DeserializeSeed<'de> for Seed<'_, T> {
    type Value = T;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<T, D::Error> {
        T::decode(deserializer, self.ctx)
    }
}

/// Decode one extension value into a handle, optionally requiring a variant.
///
/// Any other msgpack value is a [`ExtError::TypeMismatch`].
pub(crate) fn decode_handle<'de, D>(
    deserializer: D,
    ctx: &DecodeContext,
    expected: Option<ExtTag>,
) -> Result<Handle, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(HandleVisitor { ctx, expected })
}

struct HandleVisitor<'a> {
    ctx: &'a DecodeContext,
    expected: Option<ExtTag>,
}

impl HandleVisitor<'_> {
    fn mismatch<E: de::Error>(&self, found: &str) -> E {
        self.ctx.fail(ExtError::TypeMismatch {
            expected: self.expected.map_or("handle", ExtTag::name),
            found: found.to_string(),
        })
    }
}

impl<'de> Visitor<'de> for HandleVisitor<'_> {
    type Value = Handle;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expected {
            Some(tag) => write!(f, "a {tag} extension value"),
            None => f.write_str("a handle extension value"),
        }
    }

    fn visit_newtype_struct<D>(self, deserializer: D) -> Result<Handle, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ext = ExtParts::deserialize(deserializer)?;
        self.ctx
            .resolve_expected(ext.tag, &ext.payload, self.expected)
            .map_err(|err| self.ctx.fail(err))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Handle, E> {
        Err(self.mismatch("boolean"))
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Handle, E> {
        Err(self.mismatch("integer"))
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Handle, E> {
        Err(self.mismatch("integer"))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Handle, E> {
        Err(self.mismatch("float"))
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Handle, E> {
        Err(self.mismatch("string"))
    }

    fn visit_bytes<E: de::Error>(self, _: &[u8]) -> Result<Handle, E> {
        Err(self.mismatch("binary"))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Handle, E> {
        Err(self.mismatch("nil"))
    }

    fn visit_none<E: de::Error>(self) -> Result<Handle, E> {
        Err(self.mismatch("nil"))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, _: A) -> Result<Handle, A::Error> {
        Err(self.mismatch("array"))
    }

    fn visit_map<A: MapAccess<'de>>(self, _: A) -> Result<Handle, A::Error> {
        Err(self.mismatch("map"))
    }
}

/// The `(tag, payload)` pair rmp-serde hands out for an extension value.
pub(crate) struct ExtParts {
    pub tag: i8,
    pub payload: Vec<u8>,
}

impl<'de> Deserialize<'de> for ExtParts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (tag, PayloadBuf(payload)) = <(i8, PayloadBuf)>::deserialize(deserializer)?;
        Ok(Self { tag, payload })
    }
}

struct PayloadBuf(Vec<u8>);

impl<'de> Deserialize<'de> for PayloadBuf {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_bytes(PayloadVisitor)
    }
}

struct PayloadVisitor;

impl<'de> Visitor<'de> for PayloadVisitor {
    type Value = PayloadBuf;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("extension payload bytes")
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<PayloadBuf, E> {
        Ok(PayloadBuf(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<PayloadBuf, E> {
        Ok(PayloadBuf(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<PayloadBuf, A::Error> {
        let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(byte) = seq.next_element::<u8>()? {
            out.push(byte);
        }
        Ok(PayloadBuf(out))
    }
}

macro_rules! decode_via_deserialize {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Decode for $ty {
                fn decode<'de, D>(deserializer: D, _ctx: &DecodeContext) -> Result<Self, D::Error>
                where
                    D: Deserializer<'de>,
                {
                    <$ty as Deserialize>::deserialize(deserializer)
                }
            }
        )*
    };
}

decode_via_deserialize!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, ());

impl<T: Decode> Decode for Vec<T> {
    fn decode<'de, D>(deserializer: D, ctx: &DecodeContext) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(SeqVisitor {
            ctx,
            marker: PhantomData,
        })
    }
}

struct SeqVisitor<'a, T> {
    ctx: &'a DecodeContext,
    marker: PhantomData<fn() -> T>,
}

impl<'de, T: Decode> Visitor<'de> for SeqVisitor<'_, T> {
    type Value = Vec<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a sequence")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<T>, A::Error> {
        // Cap the preallocation; the length prefix comes from the peer.
        let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1024));
        while let Some(item) = seq.next_element_seed(Seed::<T>::new(self.ctx))? {
            out.push(item);
        }
        Ok(out)
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode<'de, D>(deserializer: D, ctx: &DecodeContext) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_option(OptionVisitor {
            ctx,
            marker: PhantomData,
        })
    }
}

struct OptionVisitor<'a, T> {
    ctx: &'a DecodeContext,
    marker: PhantomData<fn() -> T>,
}

impl<'de, T: Decode> Visitor<'de> for OptionVisitor<'_, T> {
    type Value = Option<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an optional value")
    }

    fn visit_none<E: de::Error>(self) -> Result<Option<T>, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Option<T>, E> {
        Ok(None)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::decode(deserializer, self.ctx).map(Some)
    }
}

impl<K, V> Decode for HashMap<K, V>
where
    K: Decode + Eq + Hash,
    V: Decode,
{
    fn decode<'de, D>(deserializer: D, ctx: &DecodeContext) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(MapVisitor {
            ctx,
            marker: PhantomData,
        })
    }
}

impl<K, V> Decode for BTreeMap<K, V>
where
    K: Decode + Ord,
    V: Decode,
{
    fn decode<'de, D>(deserializer: D, ctx: &DecodeContext) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(MapVisitor {
            ctx,
            marker: PhantomData,
        })
    }
}

struct MapVisitor<'a, K, V, M> {
    ctx: &'a DecodeContext,
    marker: PhantomData<fn() -> (K, V, M)>,
}

impl<'de, K, V, M> Visitor<'de> for MapVisitor<'_, K, V, M>
where
    K: Decode,
    V: Decode,
    M: Default + Extend<(K, V)>,
{
    type Value = M;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<M, A::Error> {
        let mut out = M::default();
        while let Some(entry) =
            map.next_entry_seed(Seed::<K>::new(self.ctx), Seed::<V>::new(self.ctx))?
        {
            out.extend(std::iter::once(entry));
        }
        Ok(out)
    }
}

macro_rules! decode_tuple {
    ($visitor:ident, $len:expr, $($name:ident),+) => {
        impl<$($name: Decode),+> Decode for ($($name,)+) {
            fn decode<'de, D>(deserializer: D, ctx: &DecodeContext) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_tuple($len, $visitor {
                    ctx,
                    marker: PhantomData,
                })
            }
        }

        struct $visitor<'a, $($name),+> {
            ctx: &'a DecodeContext,
            marker: PhantomData<fn() -> ($($name,)+)>,
        }

        impl<'de, $($name: Decode),+> Visitor<'de> for $visitor<'_, $($name),+> {
            type Value = ($($name,)+);

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a tuple of {} elements", $len)
            }

            #[allow(non_snake_case)]
            fn visit_seq<SA: SeqAccess<'de>>(self, mut seq: SA) -> Result<Self::Value, SA::Error> {
                let mut index = 0usize;
                $(
                    let $name = seq
                        .next_element_seed(Seed::<$name>::new(self.ctx))?
                        .ok_or_else(|| <SA::Error as de::Error>::invalid_length(index, &self))?;
                    index += 1;
                )+
                let _ = index;
                Ok(($($name,)+))
            }
        }
    };
}

decode_tuple!(Tuple2Visitor, 2, A, B);
decode_tuple!(Tuple3Visitor, 3, A, B, C);
