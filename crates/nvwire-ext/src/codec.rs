//! Raw extension payload codec for handle ids.

use bytes::{BufMut, Bytes, BytesMut};
use rmp::decode::NumValueReadError;
use rmp::encode::ValueWriteError;

use crate::error::{ExtError, Result};
use crate::tag::ExtTag;

/// Largest payload a single packed integer can occupy (marker + 8 bytes).
pub const MAX_PAYLOAD_LEN: usize = 9;

/// Encode a handle id as an extension payload.
///
/// The payload is the id alone, packed with the narrowest msgpack integer
/// format that holds it (42 becomes the single byte `0x2a`). The extension
/// header is not included.
pub fn encode_payload(id: i64) -> Result<Bytes> {
    let mut buf = Vec::with_capacity(MAX_PAYLOAD_LEN);
    rmp::encode::write_sint(&mut buf, id).map_err(write_error)?;
    Ok(Bytes::from(buf))
}

/// Decode a handle id from an extension payload.
///
/// The payload must hold exactly one packed integer that fits in `i64`.
pub fn decode_payload(tag: ExtTag, payload: &[u8]) -> Result<i64> {
    let mut rd = payload;
    let id = rmp::decode::read_int::<i64, _>(&mut rd).map_err(|err| {
        let reason = match err {
            NumValueReadError::InvalidMarkerRead(_) => "empty payload".to_string(),
            NumValueReadError::InvalidDataRead(_) => "truncated integer".to_string(),
            NumValueReadError::TypeMismatch(marker) => {
                format!("expected integer, found {marker:?}")
            }
            NumValueReadError::OutOfRange => "integer out of i64 range".to_string(),
        };
        malformed(tag, reason)
    })?;

    if !rd.is_empty() {
        return Err(malformed(
            tag,
            format!("{} trailing bytes after id", rd.len()),
        ));
    }

    Ok(id)
}

/// Encode a complete extension value (header and payload) for one handle.
///
/// Wire format:
/// ```text
/// ┌──────────────────────┬───────────┬──────────────────────┐
/// │ ext marker + length  │ type (1B) │ payload (packed id)  │
/// │ 0xd4..0xd8 / 0xc7..  │ tag code  │ 1..9 bytes           │
/// └──────────────────────┴───────────┴──────────────────────┘
/// ```
pub fn encode_ext(tag: ExtTag, id: i64, dst: &mut BytesMut) -> Result<()> {
    let payload = encode_payload(id)?;
    let mut header = Vec::with_capacity(6);
    rmp::encode::write_ext_meta(&mut header, payload.len() as u32, tag.code())
        .map_err(write_error)?;

    dst.reserve(header.len() + payload.len());
    dst.put_slice(&header);
    dst.put_slice(&payload);
    Ok(())
}

fn malformed(tag: ExtTag, reason: String) -> ExtError {
    ExtError::MalformedPayload {
        tag: tag.code(),
        reason,
    }
}

fn write_error(err: ValueWriteError) -> ExtError {
    ExtError::Io(std::io::Error::other(err.to_string()))
}
