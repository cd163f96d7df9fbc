pub mod capture_file;
pub mod channel;
pub mod mosquitto_sub;

pub use capture_file::CaptureFileSource;
pub use channel::{ChannelSource, MessageSender};
pub use mosquitto_sub::{LineInput, MosquittoSubSource};

use std::{path::PathBuf, pin::Pin, time::SystemTime};

use futures::{stream, Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::pipeline::{Envelope, MqttMessage, PipelineError};

pub(crate) type MessageStream = Pin<Box<dyn Stream<Item = Result<Envelope<MqttMessage>, PipelineError>> + Send>>;

type LineParser = fn(&str) -> Result<MqttMessage, PipelineError>;

/// Stream one message per non-blank line of `reader`.
///
/// A line that fails to parse becomes an error item and reading continues;
/// an I/O error ends the stream.
pub(crate) fn line_messages<R>(reader: R, what: &'static str, parse: LineParser) -> MessageStream
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let s = async_stream::stream! {
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim_end_matches('\r');
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse(line) {
                        Ok(msg) => yield Ok(Envelope {
                            payload: msg,
                            received_at: SystemTime::now(),
                        }),
                        Err(e) => {
                            metrics::counter!("glow_source_parse_errors_total", "source" => what).increment(1);
                            yield Err(e);
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to read {what} line: {e}")));
                    break;
                }
            }
        }
    };

    Box::pin(s)
}

/// Like [`line_messages`], reading from a file opened when the stream is polled.
pub(crate) fn file_line_messages(path: PathBuf, what: &'static str, parse: LineParser) -> MessageStream {
    let opened = stream::once(async move {
        let res = tokio::fs::File::open(&path).await;
        (path, res)
    });

    let s = opened.flat_map(move |(path, res)| -> MessageStream {
        match res {
            Ok(file) => line_messages(BufReader::new(file), what, parse),
            Err(e) => Box::pin(stream::iter([Err(PipelineError::Source(format!(
                "failed to open {what} file {}: {e}",
                path.display()
            )))])),
        }
    });

    Box::pin(s)
}
