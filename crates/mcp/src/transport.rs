//! Newline-delimited JSON framing over a pair of byte streams.

use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{Error, Result};

/// Maximum size of a single message (1MB), newline excluded.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One side of a duplex line-delimited JSON-RPC channel.
pub struct Transport {
    reader: BufReader<BoxReader>,
    writer: BoxWriter,
}

impl Transport {
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            reader: BufReader::new(Box::new(reader)),
            writer: Box::new(writer),
        }
    }

    /// Write one message followed by a newline.
    pub async fn send<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read the next non-empty line as JSON. `None` means end of stream.
    ///
    /// At most `MAX_MESSAGE_SIZE + 1` bytes are buffered per line.
    pub async fn recv(&mut self) -> Result<Option<Value>> {
        loop {
            let mut line = Vec::new();
            let bytes_read = (&mut self.reader)
                .take(MAX_MESSAGE_SIZE as u64 + 1)
                .read_until(b'\n', &mut line)
                .await?;
            if bytes_read == 0 {
                return Ok(None);
            }

            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if line.len() > MAX_MESSAGE_SIZE {
                return Err(Error::OutputTooLarge {
                    max: MAX_MESSAGE_SIZE,
                });
            }

            if line.trim_ascii().is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_slice(&line)?));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn round_trips_lines_and_skips_blanks() {
        let (a, b) = tokio::io::duplex(1024);
        let (ar, aw) = tokio::io::split(a);
        let (br, mut bw) = tokio::io::split(b);
        let mut left = Transport::new(ar, aw);

        bw.write_all(b"\n  \r\n{\"x\":1}\r\n").await.unwrap();
        assert_eq!(left.recv().await.unwrap(), Some(json!({"x": 1})));

        let mut right = Transport::new(br, bw);
        left.send(&json!({"y": 2})).await.unwrap();
        assert_eq!(right.recv().await.unwrap(), Some(json!({"y": 2})));

        drop(left);
        assert_eq!(right.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_line_is_rejected_before_it_is_buffered() {
        let (a, b) = tokio::io::duplex(64 * 1024);
        let (ar, aw) = tokio::io::split(a);
        let (_br, mut bw) = tokio::io::split(b);
        let mut left = Transport::new(ar, aw);

        // The writer never sends a newline; the read must stop at the cap.
        let writer = tokio::spawn(async move {
            let chunk = vec![b'a'; 64 * 1024];
            loop {
                if bw.write_all(&chunk).await.is_err() {
                    break;
                }
            }
        });

        let err = left.recv().await.unwrap_err();
        assert!(matches!(err, Error::OutputTooLarge { max } if max == MAX_MESSAGE_SIZE));
        writer.abort();
    }

    #[tokio::test]
    async fn line_at_the_limit_is_accepted() {
        let (a, b) = tokio::io::duplex(64 * 1024);
        let (ar, aw) = tokio::io::split(a);
        let (_br, mut bw) = tokio::io::split(b);
        let mut left = Transport::new(ar, aw);

        // A JSON string filling the limit exactly: two quotes plus padding.
        let mut line = vec![b'"'];
        line.extend(std::iter::repeat_n(b'x', MAX_MESSAGE_SIZE - 2));
        line.extend_from_slice(b"\"\n");
        tokio::spawn(async move { bw.write_all(&line).await });

        let value = left.recv().await.unwrap().unwrap();
        assert_eq!(value.as_str().map(str::len), Some(MAX_MESSAGE_SIZE - 2));
    }
}
