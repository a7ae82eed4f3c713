use std::future;

use anyhow::Result;
use clap::ValueEnum;
use futures::{stream::BoxStream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, LengthDelimitedCodec, LinesCodec};
use tracing::{trace, warn};

use super::{BrowserSignal, HostMessage};

/// Browsers cap extension → host messages at 64 MiB.
pub const MAX_FRAME_LENGTH: usize = 64 * 1024 * 1024;

/// How messages are delimited on stdio.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum Framing {
    /// Native messaging: 32-bit length in native byte order followed by UTF-8 JSON.
    #[default]
    Native,
    /// One JSON document per line. Handy for feeding recorded signals by hand.
    Lines,
}

fn decode(payload: &[u8]) -> Option<BrowserSignal> {
    match serde_json::from_slice::<BrowserSignal>(payload) {
        Ok(signal) => {
            trace!("Decoded {signal:?}");
            Some(signal)
        }
        Err(e) => {
            warn!(
                "Skipping malformed signal {}: {e}",
                String::from_utf8_lossy(payload)
            );
            None
        }
    }
}

/// Turns a byte stream from the extension into signals. Malformed messages are skipped, transport
/// errors are passed through and end processing.
pub fn signal_stream<R>(reader: R, framing: Framing) -> BoxStream<'static, Result<BrowserSignal>>
where
    R: AsyncRead + Send + 'static,
{
    match framing {
        Framing::Native => LengthDelimitedCodec::builder()
            .length_field_length(4)
            .native_endian()
            .max_frame_length(MAX_FRAME_LENGTH)
            .new_read(reader)
            .filter_map(|frame| {
                future::ready(match frame {
                    Ok(frame) => decode(&frame).map(Ok),
                    Err(e) => Some(Err(e.into())),
                })
            })
            .boxed(),
        Framing::Lines => FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_FRAME_LENGTH))
            .filter_map(|line| {
                future::ready(match line {
                    Ok(line) if line.trim().is_empty() => None,
                    Ok(line) => decode(line.as_bytes()).map(Ok),
                    Err(e) => Some(Err(e.into())),
                })
            })
            .boxed(),
    }
}

pub async fn write_message(
    writer: &mut (impl AsyncWrite + Unpin),
    message: &HostMessage,
    framing: Framing,
) -> Result<()> {
    let payload = serde_json::to_vec(message)?;
    match framing {
        Framing::Native => {
            let length = u32::try_from(payload.len())?;
            writer.write_all(&length.to_ne_bytes()).await?;
            writer.write_all(&payload).await?;
        }
        Framing::Lines => {
            writer.write_all(&payload).await?;
            writer.write_all(b"\n").await?;
        }
    }
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use anyhow::Result;
    use futures::StreamExt;

    use crate::daemon::signals::{BrowserSignal, HostMessage, IdleState, TabId, WindowId};

    use super::{signal_stream, write_message, Framing};

    fn native_frame(json: &str) -> Vec<u8> {
        let mut frame = (json.len() as u32).to_ne_bytes().to_vec();
        frame.extend_from_slice(json.as_bytes());
        frame
    }

    #[tokio::test]
    async fn test_native_frames_skip_malformed() -> Result<()> {
        let mut input = native_frame(r#"{"type":"windowFocusChanged","windowId":3}"#);
        input.extend(native_frame("not json"));
        input.extend(native_frame(r#"{"type":"idleStateChanged","state":"idle"}"#));

        let signals = signal_stream(Cursor::new(input), Framing::Native)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        assert_eq!(
            signals,
            vec![
                BrowserSignal::WindowFocusChanged {
                    window_id: WindowId(3)
                },
                BrowserSignal::IdleStateChanged {
                    state: IdleState::Idle
                },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_truncated_native_frame_is_an_error() {
        let mut input = native_frame(r#"{"type":"tabRemoved","tabId":1}"#);
        input.truncate(input.len() - 3);

        let signals = signal_stream(Cursor::new(input), Framing::Native)
            .collect::<Vec<_>>()
            .await;

        assert_eq!(signals.len(), 1);
        assert!(signals[0].is_err());
    }

    #[tokio::test]
    async fn test_line_framing() -> Result<()> {
        let input = "{\"type\":\"tabRemoved\",\"tabId\":9}\n\n{\"type\":\"tabRemoved\",\"tabId\":10}\n";

        let signals = signal_stream(Cursor::new(input.as_bytes().to_vec()), Framing::Lines)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        assert_eq!(
            signals,
            vec![
                BrowserSignal::TabRemoved { tab_id: TabId(9) },
                BrowserSignal::TabRemoved { tab_id: TabId(10) },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_write_native_message() -> Result<()> {
        let mut output = Vec::new();
        write_message(
            &mut output,
            &HostMessage::Configure {
                idle_detection_seconds: 60,
            },
            Framing::Native,
        )
        .await?;

        let expected = r#"{"type":"configure","idleDetectionSeconds":60}"#;
        assert_eq!(output, native_frame(expected));
        Ok(())
    }
}
