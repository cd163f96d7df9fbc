use std::path::PathBuf;

use futures::Stream;
use serde_json::Value;

use super::file_line_messages;
use crate::pipeline::{Envelope, MqttMessage, PipelineError, Source};

/// NDJSON capture of MQTT traffic, one message per line.
///
/// `payload` may be the raw payload as a JSON string, or the decoded JSON
/// object itself:
///
/// ```text
/// {"topic":"glow/ABC/STATE","payload":"{\"software\":\"v1.8.12\"}"}
/// {"topic":"glow/ABC/STATE","payload":{"software":"v1.8.12"}}
/// ```
pub struct CaptureFileSource {
    path: PathBuf,
}

#[derive(serde::Deserialize)]
struct CapturedMessage {
    topic: String,
    payload: Value,
}

impl TryFrom<CapturedMessage> for MqttMessage {
    type Error = PipelineError;

    fn try_from(c: CapturedMessage) -> Result<Self, Self::Error> {
        let payload = match c.payload {
            Value::String(s) => s.into_bytes(),
            other => serde_json::to_vec(&other)
                .map_err(|e| PipelineError::Source(format!("failed to re-encode payload: {e}")))?,
        };
        Ok(MqttMessage::new(c.topic, payload))
    }
}

impl CaptureFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

pub(crate) fn parse_capture_line(line: &str) -> Result<MqttMessage, PipelineError> {
    let captured: CapturedMessage = serde_json::from_str(line)
        .map_err(|e| PipelineError::Source(format!("failed to parse capture json line: {e}")))?;
    captured.try_into()
}

#[async_trait::async_trait]
impl Source<MqttMessage> for CaptureFileSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<Envelope<MqttMessage>, PipelineError>> + Send>> {
        file_line_messages(self.path.clone(), "capture", parse_capture_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::io::Write;

    #[test]
    fn string_payload_is_taken_verbatim() {
        let msg = parse_capture_line(r#"{"topic":"glow/A/STATE","payload":"{\"software\": 1}"}"#).unwrap();
        assert_eq!(msg.topic, "glow/A/STATE");
        assert_eq!(msg.payload, br#"{"software": 1}"#.to_vec());
    }

    #[test]
    fn object_payload_is_re_encoded() {
        let msg = parse_capture_line(r#"{"topic":"glow/A/STATE","payload":{"software":"v1"}}"#).unwrap();
        let back: Value = serde_json::from_slice(&msg.payload).unwrap();
        assert_eq!(back["software"], "v1");
    }

    #[test]
    fn line_without_topic_is_an_error() {
        assert!(matches!(
            parse_capture_line(r#"{"payload":"{}"}"#),
            Err(PipelineError::Source(_))
        ));
    }

    #[tokio::test]
    async fn reads_every_line_of_the_capture() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"topic":"glow/A/STATE","payload":{{"software":"v1"}}}}"#).unwrap();
        writeln!(file, r#"{{"topic":"glow/A/SENSOR/gasmeter","payload":"{{}}"}}"#).unwrap();

        let source = CaptureFileSource::new(file.path());
        let topics: Vec<_> = source
            .stream()
            .await
            .map(|i| i.unwrap().payload.topic)
            .collect()
            .await;
        assert_eq!(topics, vec!["glow/A/STATE", "glow/A/SENSOR/gasmeter"]);
    }
}
