use bytes::{Buf, BufMut, BytesMut};
use nvwire_ext::{ExtModule, Value};
use serde::ser::{Serialize, Serializer};

use crate::error::{Result, RpcError};

/// Message type: request.
pub const REQUEST: u8 = 0;
/// Message type: response.
pub const RESPONSE: u8 = 1;
/// Message type: notification.
pub const NOTIFICATION: u8 = 2;

/// A msgpack-RPC message.
///
/// Wire format (each a msgpack array):
/// ```text
/// request       [0, msgid, method, params]
/// response      [1, msgid, error, result]
/// notification  [2, method, params]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request {
        id: u32,
        method: String,
        params: Vec<Value>,
    },
    Response {
        id: u32,
        error: Value,
        result: Value,
    },
    Notification {
        method: String,
        params: Vec<Value>,
    },
}

impl Message {
    /// Short name of the message type, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Request { .. } => "request",
            Message::Response { .. } => "response",
            Message::Notification { .. } => "notification",
        }
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Message::Request { id, method, params } => {
                (REQUEST, *id, method.as_str(), params).serialize(serializer)
            }
            Message::Response { id, error, result } => {
                (RESPONSE, *id, error, result).serialize(serializer)
            }
            Message::Notification { method, params } => {
                (NOTIFICATION, method.as_str(), params).serialize(serializer)
            }
        }
    }
}

impl TryFrom<Value> for Message {
    type Error = RpcError;

    fn try_from(value: Value) -> Result<Self> {
        let Value::Array(items) = value else {
            return Err(invalid(format!("expected array, found {}", value.kind())));
        };

        let len = items.len();
        let mut items = items.into_iter();
        let kind = items
            .next()
            .and_then(|kind| kind.as_i64())
            .ok_or_else(|| invalid("missing message type".to_string()))?;

        match (kind, len) {
            (k, 4) if k == i64::from(REQUEST) => Ok(Message::Request {
                id: take_id(items.next())?,
                method: take_string(items.next())?,
                params: take_params(items.next())?,
            }),
            (k, 4) if k == i64::from(RESPONSE) => Ok(Message::Response {
                id: take_id(items.next())?,
                error: items.next().unwrap_or_default(),
                result: items.next().unwrap_or_default(),
            }),
            (k, 3) if k == i64::from(NOTIFICATION) => Ok(Message::Notification {
                method: take_string(items.next())?,
                params: take_params(items.next())?,
            }),
            (kind, len) => Err(invalid(format!(
                "unsupported message type {kind} with {len} elements"
            ))),
        }
    }
}

/// Encode a message and append it to `dst`.
pub fn encode_message(
    message: &Message,
    module: &ExtModule,
    max_message_size: usize,
    dst: &mut BytesMut,
) -> Result<()> {
    let bytes = module.to_vec(message)?;
    if bytes.len() > max_message_size {
        return Err(RpcError::MessageTooLarge {
            size: bytes.len(),
            max: max_message_size,
        });
    }
    dst.reserve(bytes.len());
    dst.put_slice(&bytes);
    Ok(())
}

/// Decode one message from the front of a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete message yet.
/// On success, consumes exactly the message bytes from the buffer. Handles
/// in the message are bound to `module`'s channel.
pub fn decode_message(
    src: &mut BytesMut,
    module: &ExtModule,
    max_message_size: usize,
) -> Result<Option<Message>> {
    if src.is_empty() {
        return Ok(None);
    }

    match module.decode_prefix::<Value>(&src[..])? {
        None if src.len() > max_message_size => Err(RpcError::MessageTooLarge {
            size: src.len(),
            max: max_message_size,
        }),
        None => Ok(None), // Need more data
        Some((_, used)) if used > max_message_size => Err(RpcError::MessageTooLarge {
            size: used,
            max: max_message_size,
        }),
        Some((value, used)) => {
            src.advance(used);
            Message::try_from(value).map(Some)
        }
    }
}

/// Convert a response error object into [`RpcError::Remote`].
///
/// The editor reports errors as `[kind, message]`.
pub fn remote_error(error: Value) -> RpcError {
    match error {
        Value::Array(items) => {
            if let [Value::Integer(kind), Value::String(message)] = items.as_slice() {
                return RpcError::Remote {
                    kind: Some(*kind),
                    message: message.clone(),
                };
            }
            RpcError::Remote {
                kind: None,
                message: Value::Array(items).to_string(),
            }
        }
        Value::String(message) => RpcError::Remote {
            kind: None,
            message,
        },
        other => RpcError::Remote {
            kind: None,
            message: other.to_string(),
        },
    }
}

fn take_id(value: Option<Value>) -> Result<u32> {
    value
        .as_ref()
        .and_then(Value::as_i64)
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| invalid("msgid is not a u32".to_string()))
}

fn take_string(value: Option<Value>) -> Result<String> {
    match value {
        Some(Value::String(method)) => Ok(method),
        _ => Err(invalid("method is not a string".to_string())),
    }
}

fn take_params(value: Option<Value>) -> Result<Vec<Value>> {
    match value {
        Some(Value::Array(params)) => Ok(params),
        _ => Err(invalid("params is not an array".to_string())),
    }
}

fn invalid(reason: String) -> RpcError {
    RpcError::InvalidMessage(reason)
}

#[cfg(test)]
mod tests {
    use nvwire_ext::{Buffer, ExtError, RecordingChannel, Window};

    use super::*;
    use crate::config::DEFAULT_MAX_MESSAGE;

    fn module() -> ExtModule {
        ExtModule::new(RecordingChannel::shared())
    }

    #[test]
    fn request_wire_layout() {
        let module = module();
        let mut buf = BytesMut::new();
        let request = Message::Request {
            id: 1,
            method: "nvim_buf_get_name".to_string(),
            params: vec![Value::from(Buffer::new(module.channel().clone(), 42))],
        };
        encode_message(&request, &module, DEFAULT_MAX_MESSAGE, &mut buf).unwrap();

        let mut expected = Vec::new();
        rmp::encode::write_array_len(&mut expected, 4).unwrap();
        rmp::encode::write_uint(&mut expected, 0).unwrap();
        rmp::encode::write_uint(&mut expected, 1).unwrap();
        rmp::encode::write_str(&mut expected, "nvim_buf_get_name").unwrap();
        rmp::encode::write_array_len(&mut expected, 1).unwrap();
        expected.extend_from_slice(&[0xd4, 0x00, 0x2a]);
        assert_eq!(buf.as_ref(), expected.as_slice());
    }

    #[test]
    fn decode_multiple_messages() {
        let module = module();
        let channel = module.channel().clone();
        let mut buf = BytesMut::new();
        let first = Message::Response {
            id: 7,
            error: Value::Nil,
            result: Value::from(Window::new(channel, 1000)),
        };
        let second = Message::Notification {
            method: "nvim_buf_lines_event".to_string(),
            params: vec![Value::from(true)],
        };
        encode_message(&first, &module, DEFAULT_MAX_MESSAGE, &mut buf).unwrap();
        encode_message(&second, &module, DEFAULT_MAX_MESSAGE, &mut buf).unwrap();

        let m1 = decode_message(&mut buf, &module, DEFAULT_MAX_MESSAGE)
            .unwrap()
            .unwrap();
        let m2 = decode_message(&mut buf, &module, DEFAULT_MAX_MESSAGE)
            .unwrap()
            .unwrap();
        assert_eq!(m1, first);
        assert_eq!(m2, second);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_incomplete_message() {
        let module = module();
        let mut buf = BytesMut::new();
        let request = Message::Request {
            id: 3,
            method: "nvim_get_current_buf".to_string(),
            params: vec![],
        };
        encode_message(&request, &module, DEFAULT_MAX_MESSAGE, &mut buf).unwrap();
        let full = buf.len();
        buf.truncate(full - 4);

        assert!(decode_message(&mut buf, &module, DEFAULT_MAX_MESSAGE)
            .unwrap()
            .is_none());
        assert_eq!(buf.len(), full - 4);
    }

    #[test]
    fn decode_rejects_non_rpc_value() {
        let module = module();
        let mut buf = BytesMut::from(&[0x93, 0x05, 0x01, 0x02][..]);
        let err = decode_message(&mut buf, &module, DEFAULT_MAX_MESSAGE).unwrap_err();
        assert!(matches!(err, RpcError::InvalidMessage(_)));

        let mut buf = BytesMut::from(&[0xa3, b'a', b'b', b'c'][..]);
        let err = decode_message(&mut buf, &module, DEFAULT_MAX_MESSAGE).unwrap_err();
        assert!(matches!(err, RpcError::InvalidMessage(_)));
    }

    #[test]
    fn decode_surfaces_handle_errors() {
        let module = module();
        // [1, 0, nil, ext(9, 0x01)]
        let mut buf = BytesMut::from(&[0x94, 0x01, 0x00, 0xc0, 0xd4, 0x09, 0x01][..]);
        let err = decode_message(&mut buf, &module, DEFAULT_MAX_MESSAGE).unwrap_err();
        assert!(matches!(
            err,
            RpcError::Codec(ExtError::UnknownExtensionType(9))
        ));
    }

    #[test]
    fn oversized_partial_message() {
        let module = module();
        // array of 4 whose string element claims 200 bytes
        let mut buf = BytesMut::from(&[0x94, 0x00, 0x01, 0xd9, 200, b'x', b'y'][..]);
        let err = decode_message(&mut buf, &module, 4).unwrap_err();
        assert!(matches!(err, RpcError::MessageTooLarge { max: 4, .. }));
    }

    #[test]
    fn oversized_complete_message() {
        let module = module();
        let mut buf = BytesMut::new();
        let note = Message::Notification {
            method: "nvim_buf_lines_event".to_string(),
            params: vec![Value::from("x".repeat(48))],
        };
        encode_message(&note, &module, DEFAULT_MAX_MESSAGE, &mut buf).unwrap();
        let len = buf.len();

        let err = decode_message(&mut buf, &module, 16).unwrap_err();
        assert!(
            matches!(err, RpcError::MessageTooLarge { size, max: 16 } if size == len),
            "{err:?}"
        );
        assert_eq!(buf.len(), len);
    }

    #[test]
    fn encode_rejects_oversized_message() {
        let module = module();
        let mut buf = BytesMut::new();
        let note = Message::Notification {
            method: "nvim_command".to_string(),
            params: vec![Value::from("x".repeat(64))],
        };
        let err = encode_message(&note, &module, 16, &mut buf).unwrap_err();
        assert!(matches!(err, RpcError::MessageTooLarge { max: 16, .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn remote_error_shapes() {
        let err = remote_error(Value::Array(vec![
            Value::from(0),
            Value::from("Invalid buffer id: 99"),
        ]));
        assert!(matches!(
            err,
            RpcError::Remote { kind: Some(0), ref message } if message == "Invalid buffer id: 99"
        ));

        let err = remote_error(Value::from("boom"));
        assert!(matches!(err, RpcError::Remote { kind: None, ref message } if message == "boom"));
    }
}
