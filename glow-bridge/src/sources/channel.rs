use std::{sync::Arc, time::SystemTime};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::pipeline::{Envelope, MqttMessage, PipelineError, Source};

/// In-process source fed through an mpsc channel.
///
/// Used when the bridge is embedded next to an MQTT client owned by the
/// caller: the client pushes every received publish into the
/// [`MessageSender`].
#[derive(Clone)]
pub struct ChannelSource {
    receiver: Arc<tokio::sync::Mutex<Option<mpsc::Receiver<Envelope<MqttMessage>>>>>,
}

#[derive(Clone)]
pub struct MessageSender {
    tx: mpsc::Sender<Envelope<MqttMessage>>,
}

impl MessageSender {
    pub async fn send(&self, msg: MqttMessage) -> Result<(), PipelineError> {
        let env = Envelope {
            payload: msg,
            received_at: SystemTime::now(),
        };
        self.tx.send(env).await.map_err(|_| {
            metrics::counter!("glow_channel_send_failed_total").increment(1);
            PipelineError::Source("channel source closed".to_string())
        })
    }
}

impl ChannelSource {
    pub fn new(channel_capacity: usize) -> (Self, MessageSender) {
        let (tx, rx) = mpsc::channel(channel_capacity.max(1));
        let source = Self {
            receiver: Arc::new(tokio::sync::Mutex::new(Some(rx))),
        };
        (source, MessageSender { tx })
    }
}

#[async_trait::async_trait]
impl Source<MqttMessage> for ChannelSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<
        Box<dyn Stream<Item = Result<Envelope<MqttMessage>, PipelineError>> + Send>,
    > {
        let mut guard = self.receiver.lock().await;
        match guard.take() {
            Some(rx) => Box::pin(ReceiverStream::new(rx).map(Ok)),
            None => Box::pin(futures::stream::iter([Err(PipelineError::Source(
                "ChannelSource stream already taken; only one consumer supported".to_string(),
            ))])),
        }
    }
}
