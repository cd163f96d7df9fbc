use std::{pin::Pin, sync::Arc, time::SystemTime};

use futures::{Stream, StreamExt};
use glow_entities::{EntityDescriptor, EntityState};

use crate::dispatcher::{DispatchOutcome, Dispatcher};

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

/// One message as delivered by the MQTT transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl MqttMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("sink error: {0}")]
    Sink(String),
}

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;
}

/// Receiver of entity lifecycle notifications, i.e. the host's registry.
///
/// Calls are fire-and-forget: implementations handle their own failures and
/// never report them back to the measurement that emitted.
pub trait EntitySink: Send + Sync {
    /// Entities of a newly seen device, in group order.
    fn register(&self, entities: &[EntityDescriptor]);

    /// A measurement produced a new state.
    fn publish(&self, state: &EntityState);
}

/// Counts reported when a pipeline's source is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub received: u64,
    pub dispatched: u64,
    pub ignored: u64,
    pub dropped: u64,
    pub source_errors: u64,
}

pub struct Pipeline<S> {
    pub source: S,
    pub dispatcher: Arc<Dispatcher>,
}

impl<S> Pipeline<S>
where
    S: Source<MqttMessage> + Send + Sync + 'static,
{
    /// Drain the source into the dispatcher until it ends.
    ///
    /// Errors on individual items are logged and counted; they never stop
    /// the pipeline.
    pub async fn run(self) -> Result<PipelineStats, PipelineError> {
        let mut stream = self.source.stream().await;
        let mut stats = PipelineStats::default();

        tracing::info!(
            subscription = %self.dispatcher.subscription_topic(),
            "pipeline started"
        );

        while let Some(item) = stream.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) => {
                    tracing::error!(error = %e, "error in upstream source");
                    stats.source_errors += 1;
                    continue;
                }
            };
            stats.received += 1;

            let msg = env.payload;
            match self.dispatcher.on_message(&msg.topic, &msg.payload) {
                DispatchOutcome::Dispatched { .. } => stats.dispatched += 1,
                DispatchOutcome::Ignored(_) => stats.ignored += 1,
                DispatchOutcome::Dropped(_) => stats.dropped += 1,
            }

            if let Ok(dur) = SystemTime::now().duration_since(env.received_at) {
                metrics::histogram!("glow_end_to_end_latency_seconds").record(dur.as_secs_f64());
            }
        }

        tracing::info!(
            received = stats.received,
            dispatched = stats.dispatched,
            ignored = stats.ignored,
            dropped = stats.dropped,
            source_errors = stats.source_errors,
            "pipeline finished"
        );

        Ok(stats)
    }
}
