use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("touchwire {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: touchwire");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("TOUCHWIRE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "features: engine={}, sim={}, cli=true",
        cfg!(feature = "engine"),
        cfg!(feature = "sim")
    );

    Ok(SUCCESS)
}
