//! Helpers for reading line-oriented streaming responses.
//!
//! Network chunks do not respect line boundaries, so bytes are buffered until a
//! full line is available. Ollama streams JSON lines; OpenAI streams server-sent
//! events (`data: {...}` lines terminated by `data: [DONE]`).

use crate::error::{LlmError, LlmResult};
use futures_util::{Stream, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::warn;

/// Tokens of one streamed completion. An `Err` item ends the stream.
pub type TokenStream = mpsc::Receiver<LlmResult<String>>;

/// Capacity of the token channel between the reader task and the consumer.
pub(crate) const TOKEN_CHANNEL_CAPACITY: usize = 100;

const INCOMPLETE: &str = "stream ended before completion";

/// Accumulates bytes and yields complete lines.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append bytes and drain every complete line (without the newline).
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]);
            let text = text.trim_end_matches('\r');
            if !text.is_empty() {
                lines.push(text.to_string());
            }
        }
        lines
    }

    /// Whatever is left once the stream has ended.
    pub(crate) fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        (!rest.is_empty()).then_some(rest)
    }
}

/// What a single stream line means to the reader loop.
#[derive(Debug, PartialEq)]
pub(crate) enum LineOutcome {
    Token(String),
    /// The last token, on the same line as the completion marker.
    Final(String),
    Skip,
    Done,
    Failed(String),
}

/// Drive a byte stream through `parse_line`, forwarding tokens on a channel.
/// Runs on a spawned task; stops quietly when the receiver is dropped.
///
/// Each read waits at most `idle` for the next chunk. A stream that closes
/// before `parse_line` reports [`LineOutcome::Done`] ends with an error, so a
/// truncated answer is never mistaken for a complete one.
pub(crate) fn spawn_reader<S, B, F>(stream: S, parse_line: F, idle: Duration) -> TokenStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    F: Fn(&str) -> LineOutcome + Send + 'static,
{
    let (tx, rx) = mpsc::channel(TOKEN_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut stream = Box::pin(stream);
        let mut buffer = LineBuffer::new();

        loop {
            let chunk_result = match timeout(idle, stream.next()).await {
                Ok(Some(chunk_result)) => chunk_result,
                Ok(None) => break,
                Err(_) => {
                    warn!("Stream stalled for {:?}", idle);
                    let _ = tx
                        .send(Err(LlmError::Timeout {
                            seconds: idle.as_secs(),
                        }))
                        .await;
                    return;
                }
            };
            let bytes = match chunk_result {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Stream error: {}", e);
                    let _ = tx.send(Err(LlmError::Stream(e.to_string()))).await;
                    return;
                }
            };

            for line in buffer.push(bytes.as_ref()) {
                match parse_line(&line) {
                    LineOutcome::Token(token) => {
                        if tx.send(Ok(token)).await.is_err() {
                            return; // Receiver dropped
                        }
                    }
                    LineOutcome::Final(token) => {
                        let _ = tx.send(Ok(token)).await;
                        return;
                    }
                    LineOutcome::Skip => {}
                    LineOutcome::Done => return,
                    LineOutcome::Failed(message) => {
                        let _ = tx.send(Err(LlmError::Stream(message))).await;
                        return;
                    }
                }
            }
        }

        let last = buffer.finish().map(|line| parse_line(&line));
        let outcome = match last {
            Some(LineOutcome::Done) => return,
            Some(LineOutcome::Final(token)) => {
                let _ = tx.send(Ok(token)).await;
                return;
            }
            Some(LineOutcome::Failed(message)) => Err(LlmError::Stream(message)),
            Some(LineOutcome::Token(token)) => {
                if tx.send(Ok(token)).await.is_err() {
                    return;
                }
                Err(LlmError::Stream(INCOMPLETE.to_string()))
            }
            Some(LineOutcome::Skip) | None => Err(LlmError::Stream(INCOMPLETE.to_string())),
        };
        warn!("Stream closed without a completion marker");
        let _ = tx.send(outcome).await;
    });

    rx
}
