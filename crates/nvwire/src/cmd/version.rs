use nvwire_ext::ExtTag;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("nvwire {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!("target: {}", env!("NVWIRE_BUILD_TARGET"));
    println!("features: async={}, cli=true", cfg!(feature = "async"));
    for tag in ExtTag::ALL {
        println!(
            "handle: {} tag={} prefix={}",
            tag.name(),
            tag.code(),
            tag.api_prefix()
        );
    }

    Ok(SUCCESS)
}
