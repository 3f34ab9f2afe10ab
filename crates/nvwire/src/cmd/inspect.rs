use std::fs;

use nvwire_ext::{CodecConfig, ExtModule, RecordingChannel, Value};

use crate::cmd::InspectArgs;
use crate::exit::{ext_error, io_error, CliError, CliResult, SUCCESS};
use crate::output::{print_value, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = match (&args.hex, &args.file) {
        (Some(hex), _) => parse_hex(hex)?,
        (None, Some(path)) => fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        (None, None) => return Err(CliError::usage("expected a hex document or --file")),
    };

    let config = CodecConfig {
        reject_trailing_bytes: !args.allow_trailing,
        ..CodecConfig::default()
    };
    // Offline: decoded handles are bound to a channel nobody calls.
    let module = ExtModule::with_config(RecordingChannel::shared(), config);
    let value: Value = module
        .from_slice(&bytes)
        .map_err(|err| ext_error("decode failed", err))?;
    tracing::debug!(size = bytes.len(), kind = value.kind(), "decoded document");

    print_value(&value, &bytes, format);
    Ok(SUCCESS)
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .trim()
        .trim_start_matches("0x")
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.is_empty() {
        return Err(CliError::usage("hex document must not be empty"));
    }
    if digits.len() % 2 != 0 {
        return Err(CliError::usage("hex document has an odd number of digits"));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let high = nibble(pair[0])?;
            let low = nibble(pair[1])?;
            Ok((high << 4) | low)
        })
        .collect()
}

fn nibble(digit: u8) -> CliResult<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        other => Err(CliError::usage(format!(
            "invalid hex digit {:?}",
            char::from(other)
        ))),
    }
}
