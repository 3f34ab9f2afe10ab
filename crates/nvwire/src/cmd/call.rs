use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

use nvwire_ext::{ChannelRef, ExtTag, Handle, Value};
use nvwire_rpc::{ClientConfig, StreamChannel};

use crate::cmd::CallArgs;
use crate::exit::{ext_error, rpc_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_value, OutputFormat};

pub fn run(args: CallArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let params: serde_json::Value = serde_json::from_str(&args.args)
        .map_err(|err| CliError::usage(format!("--args is not valid JSON: {err}")))?;
    let config = ClientConfig {
        read_timeout: Some(timeout),
        write_timeout: Some(timeout),
        ..ClientConfig::default()
    };

    if args.tcp {
        let channel = nvwire_rpc::connect_tcp_with_config(args.address.as_str(), config)
            .map_err(|err| rpc_error("connect failed", err))?;
        return invoke(&channel, &args.method, &params, format);
    }

    #[cfg(not(unix))]
    {
        let _ = (params, config, format);
        return Err(CliError::usage("Unix sockets are unavailable here; use --tcp"));
    }

    #[cfg(unix)]
    {
        let channel = nvwire_rpc::connect_with_config(&args.address, config)
            .map_err(|err| rpc_error("connect failed", err))?;
        invoke(&channel, &args.method, &params, format)
    }
}

fn invoke<R, W>(
    channel: &Arc<StreamChannel<R, W>>,
    method: &str,
    params: &serde_json::Value,
    format: OutputFormat,
) -> CliResult<i32>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let module = channel
        .module()
        .map_err(|err| rpc_error("session closed", err))?;
    let params = json_to_params(params, module.channel())?;

    let result = channel
        .request(method, params)
        .map_err(|err| rpc_error(&format!("{method} failed"), err))?;
    let raw = module
        .to_vec(&result)
        .map_err(|err| ext_error("encode failed", err))?;

    print_value(&result, &raw, format);
    Ok(SUCCESS)
}

fn json_to_params(json: &serde_json::Value, channel: &ChannelRef) -> CliResult<Vec<Value>> {
    match json {
        serde_json::Value::Array(items) => Ok(items
            .iter()
            .map(|item| json_to_value(item, channel))
            .collect()),
        _ => Err(CliError::usage("--args must be a JSON array")),
    }
}

/// Convert JSON to a value. Objects of the form `{"type": "window", "id": 1000}`
/// become handles bound to `channel`.
fn json_to_value(json: &serde_json::Value, channel: &ChannelRef) -> Value {
    match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(v) => Value::Boolean(*v),
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Value::Integer(v)
            } else if let Some(v) = n.as_u64() {
                Value::Unsigned(v)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(v) => Value::String(v.clone()),
        serde_json::Value::Array(items) => {
            Value::Array(items.iter().map(|item| json_to_value(item, channel)).collect())
        }
        serde_json::Value::Object(object) => {
            if let Some(handle) = json_handle(object, channel) {
                return Value::Handle(handle);
            }
            Value::Map(
                object
                    .iter()
                    .map(|(k, v)| (Value::from(k.as_str()), json_to_value(v, channel)))
                    .collect(),
            )
        }
    }
}

fn json_handle(
    object: &serde_json::Map<String, serde_json::Value>,
    channel: &ChannelRef,
) -> Option<Handle> {
    if object.len() != 2 {
        return None;
    }
    let kind = object.get("type")?.as_str()?;
    let id = object.get("id")?.as_i64()?;
    let tag = ExtTag::ALL
        .into_iter()
        .find(|tag| tag.name().eq_ignore_ascii_case(kind))?;
    Some(Handle::from_parts(tag, channel.clone(), id))
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else {
        (input.strip_suffix('s').unwrap_or(input), false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input:?}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use nvwire_ext::{RecordingChannel, Window};
    use serde_json::json;

    use super::*;

    #[test]
    fn json_objects_with_type_and_id_become_handles() {
        let channel: ChannelRef = RecordingChannel::shared();
        let params = json_to_params(
            &json!([{ "type": "window", "id": 1000 }, { "type": "note", "id": 1 }, "x", 3]),
            &channel,
        )
        .unwrap();

        assert_eq!(params[0], Value::from(Window::new(channel.clone(), 1000)));
        assert!(matches!(params[1], Value::Map(ref pairs) if pairs.len() == 2));
        assert_eq!(params[2].as_str(), Some("x"));
        assert_eq!(params[3].as_i64(), Some(3));
        let handle = params[0].as_handle().unwrap();
        assert!(Arc::ptr_eq(handle.channel(), &channel));
    }

    #[test]
    fn params_must_be_an_array() {
        let channel: ChannelRef = RecordingChannel::shared();
        let err = json_to_params(&json!({ "a": 1 }), &channel).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("soon").is_err());
    }
}
