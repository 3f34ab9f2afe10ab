#![cfg(all(unix, feature = "cli"))]

use std::os::unix::net::UnixListener;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::thread;

use nvwire::ext::{Buffer, ExtModule, RecordingChannel, Value};
use nvwire::rpc::{Message, MessageReader, MessageWriter};

fn nvwire(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_nvwire"))
        .args(["--log-level", "error"])
        .args(args)
        .output()
        .expect("nvwire should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "nvwire-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

#[test]
fn encode_prints_wire_bytes() {
    let output = nvwire(&["encode", "buffer", "42", "--format", "pretty"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "d4002a");

    let output = nvwire(&["encode", "window", "1000", "--wrap", "--format", "pretty"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "91c70301cd03e8");
}

#[test]
fn encode_json_describes_the_handle() {
    let output = nvwire(&["encode", "tabpage", "2", "--format", "json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["type"], "tabpage");
    assert_eq!(json["id"], 2);
    assert_eq!(json["tag"], 2);
    assert_eq!(json["hex"], "d40202");
}

#[test]
fn inspect_decodes_handles() {
    let output = nvwire(&["inspect", "92 d4 00 2a c0", "--format", "json"]);
    assert!(output.status.success(), "{output:?}");
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json, serde_json::json!([{ "type": "buffer", "id": 42 }, null]));
}

#[test]
fn inspect_rejects_unknown_extension_type() {
    let output = nvwire(&["inspect", "d40501"]);
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("decode failed"));
}

#[test]
fn inspect_rejects_bad_hex() {
    let output = nvwire(&["inspect", "d4z"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn call_reports_missing_socket() {
    let dir = unique_temp_dir("missing");
    let output = nvwire(&[
        "call",
        dir.join("absent.sock").to_str().unwrap(),
        "nvim_get_current_buf",
    ]);
    assert_eq!(output.status.code(), Some(3));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn call_prints_handle_result() {
    let dir = unique_temp_dir("call");
    let sock_path = dir.join("nvim.sock");
    let listener = UnixListener::bind(&sock_path).expect("listener should bind");

    let editor = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("editor should accept");
        let module = ExtModule::new(RecordingChannel::shared());
        let mut reader = MessageReader::new(stream.try_clone().expect("clone stream"));
        let mut writer = MessageWriter::new(stream);

        let Message::Request { id, method, params } = reader.read_message(&module).unwrap() else {
            panic!("expected a request");
        };
        assert_eq!(method, "nvim_win_get_buf");
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].as_handle().map(|h| h.id()), Some(1000));

        let reply = Message::Response {
            id,
            error: Value::Nil,
            result: Value::from(Buffer::new(module.channel().clone(), 5)),
        };
        writer.write_message(&reply, &module).unwrap();
    });

    let output = nvwire(&[
        "call",
        sock_path.to_str().unwrap(),
        "nvim_win_get_buf",
        "--args",
        r#"[{"type":"window","id":1000}]"#,
        "--format",
        "json",
    ]);
    editor.join().expect("editor thread should finish");

    assert!(output.status.success(), "{output:?}");
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json, serde_json::json!({ "type": "buffer", "id": 5 }));
    let _ = std::fs::remove_dir_all(&dir);
}
