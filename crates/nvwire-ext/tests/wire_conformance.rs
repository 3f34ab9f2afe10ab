use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::thread;

use nvwire_ext::{
    Buffer, ChannelRef, Decode, ExtError, ExtModule, Handle, RecordingChannel, RemoteHandle,
    Tabpage, Value, Window,
};
use serde::Serialize;

/// Expected wire bytes for `[handle]`, built from msgpack primitives only.
fn wrapped_handle_bytes(tag: i8, id: i64) -> Vec<u8> {
    let mut payload = Vec::new();
    rmp::encode::write_sint(&mut payload, id).unwrap();

    let mut out = Vec::new();
    rmp::encode::write_array_len(&mut out, 1).unwrap();
    rmp::encode::write_ext_meta(&mut out, payload.len() as u32, tag).unwrap();
    out.extend_from_slice(&payload);
    out
}

fn check_variant<H>(id: i64)
where
    H: RemoteHandle + Serialize + Decode + PartialEq + Debug,
{
    let module = ExtModule::new(RecordingChannel::shared());
    let handle = H::from_parts(RecordingChannel::shared(), id);

    // (a) expected bytes from primitives
    let expected = wrapped_handle_bytes(H::TAG.code(), id);

    // (b) + (c) module output is byte-identical
    let encoded = module.to_vec(&[&handle]).unwrap();
    assert_eq!(encoded, expected, "{:?} id={id}", H::TAG);

    // (d) decoding the hand-built bytes yields an equal handle
    let decoded: Vec<H> = module.from_slice(&expected).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0], handle);
    assert!(Arc::ptr_eq(decoded[0].channel(), module.channel()));

    // (e) full round trip
    let again: Vec<H> = module.from_slice(&module.to_vec(&vec![&handle]).unwrap()).unwrap();
    assert_eq!(again[0], handle);
}

const IDS: [i64; 9] = [0, 1, 42, 127, 128, 1000, 70_000, -1, i64::MAX];

#[test]
fn buffer_conformance() {
    for id in IDS {
        check_variant::<Buffer>(id);
    }
}

#[test]
fn window_conformance() {
    for id in IDS {
        check_variant::<Window>(id);
    }
}

#[test]
fn tabpage_conformance() {
    for id in IDS {
        check_variant::<Tabpage>(id);
    }
}

#[test]
fn buffer_42_wire_bytes() {
    let module = ExtModule::new(RecordingChannel::shared());
    let buffer = Buffer::new(module.channel().clone(), 42);

    let bytes = module.to_vec(&vec![buffer.clone()]).unwrap();
    assert_eq!(bytes, vec![0x91, 0xd4, 0x00, 0x2a]);

    let list: Vec<Buffer> = module.from_slice(&bytes).unwrap();
    assert_eq!(list, vec![buffer]);
}

#[test]
fn equality_across_channels() {
    let first: ChannelRef = RecordingChannel::shared();
    let second: ChannelRef = RecordingChannel::shared();
    assert_eq!(Buffer::new(first, 42), Buffer::new(second, 42));
}

#[test]
fn payload_with_two_values_is_malformed() {
    let module = ExtModule::new(RecordingChannel::shared());
    // [fixext2 type 0: 0x2a 0x2b]
    let bytes = [0x91, 0xd5, 0x00, 0x2a, 0x2b];

    let err = module.from_slice::<Vec<Buffer>>(&bytes).unwrap_err();
    assert!(matches!(err, ExtError::MalformedPayload { tag: 0, .. }), "{err:?}");

    let err = module.from_slice::<Value>(&bytes).unwrap_err();
    assert!(matches!(err, ExtError::MalformedPayload { tag: 0, .. }), "{err:?}");
}

#[test]
fn non_integer_payload_is_malformed() {
    let module = ExtModule::new(RecordingChannel::shared());
    // [fixext2 type 1: "x"]
    let bytes = [0x91, 0xd5, 0x01, 0xa1, b'x'];
    let err = module.from_slice::<Vec<Window>>(&bytes).unwrap_err();
    assert!(matches!(err, ExtError::MalformedPayload { tag: 1, .. }), "{err:?}");
}

#[test]
fn unknown_tag_is_rejected() {
    let module = ExtModule::new(RecordingChannel::shared());
    let bytes = wrapped_handle_bytes(5, 42);

    for err in [
        module.from_slice::<Vec<Buffer>>(&bytes).unwrap_err(),
        module.from_slice::<Vec<Handle>>(&bytes).unwrap_err(),
        module.from_slice::<Value>(&bytes).unwrap_err(),
    ] {
        assert!(matches!(err, ExtError::UnknownExtensionType(5)), "{err:?}");
    }

    // The timestamp extension (-1) is not a handle either.
    let timestamp = [0xd6, 0xff, 0x00, 0x00, 0x00, 0x01];
    let err = module.from_slice::<Value>(&timestamp).unwrap_err();
    assert!(matches!(err, ExtError::UnknownExtensionType(-1)), "{err:?}");
}

#[test]
fn nested_tree_interleaves_codec_bytes() {
    let module = ExtModule::new(RecordingChannel::shared());
    let channel = module.channel().clone();
    let tree = Value::Map(vec![
        (
            Value::from("bufs"),
            Value::Array(vec![
                Value::from(Buffer::new(channel.clone(), 1)),
                Value::from(Buffer::new(channel.clone(), 300)),
            ]),
        ),
        (Value::from("win"), Value::from(Window::new(channel, 1000))),
        (Value::from("n"), Value::from(-5)),
    ]);

    let mut expected = Vec::new();
    rmp::encode::write_map_len(&mut expected, 3).unwrap();
    rmp::encode::write_str(&mut expected, "bufs").unwrap();
    rmp::encode::write_array_len(&mut expected, 2).unwrap();
    expected.extend_from_slice(&[0xd4, 0x00, 0x01]);
    expected.extend_from_slice(&[0xc7, 0x03, 0x00, 0xcd, 0x01, 0x2c]);
    rmp::encode::write_str(&mut expected, "win").unwrap();
    expected.extend_from_slice(&[0xc7, 0x03, 0x01, 0xcd, 0x03, 0xe8]);
    rmp::encode::write_str(&mut expected, "n").unwrap();
    rmp::encode::write_sint(&mut expected, -5).unwrap();

    assert_eq!(module.to_vec(&tree).unwrap(), expected);
    assert_eq!(module.from_slice::<Value>(&expected).unwrap(), tree);

    let typed: BTreeMap<String, Value> = module.from_slice(&expected).unwrap();
    let bufs: Vec<i64> = typed["bufs"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_handle)
        .map(Handle::id)
        .collect();
    assert_eq!(bufs, vec![1, 300]);
}

#[test]
fn optional_handles() {
    let module = ExtModule::new(RecordingChannel::shared());
    let tab = Tabpage::new(module.channel().clone(), 2);
    let bytes = module.to_vec(&vec![Some(tab.clone()), None]).unwrap();
    assert_eq!(bytes, vec![0x92, 0xd4, 0x02, 0x02, 0xc0]);

    let decoded: Vec<Option<Tabpage>> = module.from_slice(&bytes).unwrap();
    assert_eq!(decoded, vec![Some(tab), None]);
}

#[test]
fn concurrent_encode_decode() {
    let module = ExtModule::new(RecordingChannel::shared());
    let workers: Vec<_> = (0..4i64)
        .map(|worker| {
            let module = module.clone();
            thread::spawn(move || {
                for id in (worker * 100)..(worker * 100 + 50) {
                    let window = Window::new(module.channel().clone(), id);
                    let bytes = module.to_vec(&[window.clone()]).unwrap();
                    let decoded: Vec<Window> = module.from_slice(&bytes).unwrap();
                    assert_eq!(decoded[0], window);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker should finish");
    }
}
