use std::fmt::Write as _;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use nvwire_ext::{Handle, Value};
use serde_json::{json, Map};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print a decoded value. `raw` is the msgpack text it came from.
pub fn print_value(value: &Value, raw: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", value_to_json(value));
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KEY", "TYPE", "VALUE"]);
            for (key, item) in entries(value) {
                table.add_row(vec![key, item.kind().to_string(), item.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{value}"),
        OutputFormat::Raw => print_raw(raw),
    }
}

/// Print an encoded handle.
pub fn print_handle(handle: &Handle, bytes: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let mut out = handle_json(handle);
            out["tag"] = json!(handle.tag().code());
            out["hex"] = json!(to_hex(bytes));
            println!("{out}");
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "TAG", "ID", "BYTES"])
                .add_row(vec![
                    handle.tag().name().to_string(),
                    handle.tag().code().to_string(),
                    handle.id().to_string(),
                    to_hex(bytes),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", to_hex(bytes)),
        OutputFormat::Raw => print_raw(bytes),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// JSON view of a value. Handles become `{"type": "buffer", "id": 1}`;
/// maps with non-string keys become arrays of `[key, value]` pairs.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Nil => serde_json::Value::Null,
        Value::Boolean(v) => json!(v),
        Value::Integer(v) => json!(v),
        Value::Unsigned(v) => json!(v),
        Value::Float(v) => json!(v),
        Value::String(v) => json!(v),
        Value::Binary(v) => json!({ "type": "binary", "hex": to_hex(v) }),
        Value::Array(items) => items.iter().map(value_to_json).collect(),
        Value::Map(pairs) => {
            if pairs.iter().all(|(k, _)| k.as_str().is_some()) {
                let object: Map<String, serde_json::Value> = pairs
                    .iter()
                    .filter_map(|(k, v)| Some((k.as_str()?.to_string(), value_to_json(v))))
                    .collect();
                serde_json::Value::Object(object)
            } else {
                pairs
                    .iter()
                    .map(|(k, v)| json!([value_to_json(k), value_to_json(v)]))
                    .collect()
            }
        }
        Value::Handle(handle) => handle_json(handle),
    }
}

fn handle_json(handle: &Handle) -> serde_json::Value {
    json!({ "type": handle.tag().name().to_ascii_lowercase(), "id": handle.id() })
}

fn entries(value: &Value) -> Vec<(String, &Value)> {
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect(),
        Value::Map(pairs) => pairs.iter().map(|(k, v)| (k.to_string(), v)).collect(),
        other => vec![("-".to_string(), other)],
    }
}

pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
