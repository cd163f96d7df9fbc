use anyhow::{bail, Result};
use glow_bridge::{
    config::AppConfig,
    observability,
    pipeline::Pipeline,
    sinks::MemoryEntityStore,
    sources::CaptureFileSource,
    DeviceRegistry, Dispatcher,
};
use std::{env, path::Path, sync::Arc};

/// Replays a capture file through the bridge and prints the final entity
/// snapshot as JSON on stdout.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: glow-replay <capture_ndjson_path>");
    }
    let file_path = &args[1];

    // Bridge settings come from GLOW_BRIDGE_CONFIG when that file exists.
    let cfg = match env::var("GLOW_BRIDGE_CONFIG") {
        Ok(path) if Path::new(&path).exists() => AppConfig::load()?,
        _ => AppConfig::default(),
    };

    let store = Arc::new(MemoryEntityStore::default());
    let registry = DeviceRegistry::new(cfg.bridge.registry_config()?, Some(store.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        cfg.bridge.topic_prefix(),
        cfg.bridge.device_filter(),
        registry,
    ));

    let stats = Pipeline {
        source: CaptureFileSource::new(file_path),
        dispatcher,
    }
    .run()
    .await?;

    tracing::info!(
        received = stats.received,
        entities = store.descriptors().len(),
        "replay finished"
    );

    println!("{}", serde_json::to_string_pretty(&store.snapshot())?);

    Ok(())
}
