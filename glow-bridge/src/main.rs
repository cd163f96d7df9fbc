use anyhow::Result;
use glow_bridge::{
    config::{AppConfig, SinkKind, SourceKind},
    metrics_server, observability,
    pipeline::{EntitySink, Pipeline, PipelineStats},
    sinks::{LogEntitySink, NdjsonEntitySink},
    sources::{CaptureFileSource, LineInput, MosquittoSubSource},
    DeviceRegistry, Dispatcher,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let sink: Arc<dyn EntitySink> = match (cfg.sink.kind, &cfg.sink.path) {
        (SinkKind::Ndjson, Some(path)) => Arc::new(NdjsonEntitySink::create(path)?),
        (SinkKind::Ndjson, None) => Arc::new(NdjsonEntitySink::stdout()),
        (SinkKind::Log, _) => Arc::new(LogEntitySink),
    };

    let registry = DeviceRegistry::new(cfg.bridge.registry_config()?, Some(sink));
    let dispatcher = Arc::new(Dispatcher::new(
        cfg.bridge.topic_prefix(),
        cfg.bridge.device_filter(),
        registry,
    ));

    let stats: PipelineStats = match (cfg.source.kind, cfg.source.path) {
        (SourceKind::MosquittoSub, path) => {
            let input = path.map_or(LineInput::Stdin, LineInput::File);
            Pipeline {
                source: MosquittoSubSource::new(input),
                dispatcher,
            }
            .run()
            .await?
        }
        (SourceKind::Capture, Some(path)) => {
            Pipeline {
                source: CaptureFileSource::new(path),
                dispatcher,
            }
            .run()
            .await?
        }
        (SourceKind::Capture, None) => anyhow::bail!("source kind 'capture' requires source.path"),
    };

    tracing::info!(dropped = stats.dropped, "input exhausted, exiting");

    Ok(())
}
