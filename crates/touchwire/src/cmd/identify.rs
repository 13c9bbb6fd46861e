use std::sync::Arc;

use touchwire_core::{Engine, EngineConfig};
use touchwire_sim::{sim_pair, DeviceProfile};

use crate::cmd::IdentifyArgs;
use crate::exit::{core_error, CliResult, SUCCESS};
use crate::output::{print_identification, OutputFormat};
use crate::pump::AttentionPump;

pub fn run(args: IdentifyArgs, format: OutputFormat) -> CliResult<i32> {
    let profile = DeviceProfile {
        max_write_size: args.max_write,
        ..Default::default()
    };
    let (bus, handle) = sim_pair(profile);
    let config = EngineConfig::default().with_chunk_sizes(args.rd_chunk, args.wr_chunk);
    let engine = Arc::new(Engine::builder(bus).config(config).build());

    let pump = AttentionPump::start(&engine, &handle);
    let result = engine.identify();
    drop(pump);

    let id = result.map_err(|err| core_error("identify failed", err))?;
    print_identification(
        &id,
        engine.application_info(),
        engine.boot_info(),
        engine.write_chunk_size(),
        format,
    );
    Ok(SUCCESS)
}
