//! Newline-delimited JSON framing.
//!
//! One frame per line. Works over anything that is `AsyncRead` /
//! `AsyncWrite`: TCP halves in the binary, `tokio::io::duplex` in tests.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};

use crate::error::DelegationResult;

pub struct FrameReader<R> {
    lines: Lines<BufReader<R>>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }

    /// Next frame, or `None` at end of stream. Blank lines are skipped.
    pub async fn next_frame<T: DeserializeOwned>(&mut self) -> DelegationResult<Option<T>> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(serde_json::from_str(&line)?));
        }
    }
}

pub struct FrameWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn send<T: Serialize>(&mut self, frame: &T) -> DelegationResult<()> {
        let mut bytes = serde_json::to_vec(frame)?;
        bytes.push(b'\n');
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
