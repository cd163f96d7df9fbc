use std::path::PathBuf;

use futures::Stream;
use tokio::io::BufReader;

use super::{file_line_messages, line_messages};
use crate::pipeline::{Envelope, MqttMessage, PipelineError, Source};

/// Where line-oriented input is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineInput {
    Stdin,
    File(PathBuf),
}

/// Source reading the output of `mosquitto_sub -v -t 'glow/#'`.
///
/// Each line is `<topic> <payload>`; the topic ends at the first space and
/// the rest of the line is the payload verbatim.
pub struct MosquittoSubSource {
    input: LineInput,
}

impl MosquittoSubSource {
    pub fn new(input: LineInput) -> Self {
        Self { input }
    }
}

pub(crate) fn parse_mosquitto_line(line: &str) -> Result<MqttMessage, PipelineError> {
    let (topic, payload) = line
        .split_once(' ')
        .ok_or_else(|| PipelineError::Source(format!("no payload after topic in line '{line}'")))?;

    if topic.is_empty() {
        return Err(PipelineError::Source("empty topic".to_string()));
    }

    Ok(MqttMessage::new(topic, payload))
}

#[async_trait::async_trait]
impl Source<MqttMessage> for MosquittoSubSource {
    async fn stream(
        &self,
    ) -> std::pin::Pin<Box<dyn Stream<Item = Result<Envelope<MqttMessage>, PipelineError>> + Send>> {
        match &self.input {
            LineInput::Stdin => line_messages(
                BufReader::new(tokio::io::stdin()),
                "mosquitto_sub",
                parse_mosquitto_line,
            ),
            LineInput::File(path) => file_line_messages(path.clone(), "mosquitto_sub", parse_mosquitto_line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::io::Write;

    #[test]
    fn splits_topic_from_payload_at_first_space() {
        let msg = parse_mosquitto_line(r#"glow/ABC/STATE {"han": {"status": "joined ok"}}"#).unwrap();
        assert_eq!(msg.topic, "glow/ABC/STATE");
        assert_eq!(msg.payload, br#"{"han": {"status": "joined ok"}}"#.to_vec());
    }

    #[test]
    fn rejects_lines_without_payload() {
        assert!(parse_mosquitto_line("glow/ABC/STATE").is_err());
        assert!(parse_mosquitto_line(" {}").is_err());
    }

    #[tokio::test]
    async fn file_source_skips_blank_lines_and_reports_bad_ones() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "glow/ABC/STATE {{\"software\":\"v1\"}}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "garbage").unwrap();
        writeln!(file, "glow/ABC/SENSOR/gasmeter {{}}\r").unwrap();

        let source = MosquittoSubSource::new(LineInput::File(file.path().to_path_buf()));
        let items: Vec<_> = source.stream().await.collect().await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().payload.topic, "glow/ABC/STATE");
        assert!(matches!(items[1], Err(PipelineError::Source(_))));
        assert_eq!(items[2].as_ref().unwrap().payload.payload, b"{}".to_vec());
    }

    #[tokio::test]
    async fn missing_file_yields_single_error() {
        let source = MosquittoSubSource::new(LineInput::File(PathBuf::from("/nonexistent/glow.log")));
        let items: Vec<_> = source.stream().await.collect().await;
        assert!(matches!(items.as_slice(), [Err(PipelineError::Source(_))]));
    }
}
