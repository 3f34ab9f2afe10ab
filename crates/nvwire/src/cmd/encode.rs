use nvwire_ext::{ExtModule, Handle, RecordingChannel};

use crate::cmd::EncodeArgs;
use crate::exit::{ext_error, CliResult, SUCCESS};
use crate::output::{print_handle, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    // Offline: nothing is ever called through this channel.
    let module = ExtModule::new(RecordingChannel::shared());
    let handle = Handle::from_parts(args.kind.into(), module.channel().clone(), args.id);

    let bytes = if args.wrap {
        module.to_vec(std::slice::from_ref(&handle))
    } else {
        module.to_vec(&handle)
    }
    .map_err(|err| ext_error("encode failed", err))?;

    print_handle(&handle, &bytes, format);
    Ok(SUCCESS)
}
