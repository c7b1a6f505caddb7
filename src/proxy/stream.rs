//! Synthetic streaming of an already-complete text body.
//!
//! The body is produced by a future (normally the aggregator) that is polled
//! on the first pull of the stream. Its text is then replayed one character
//! per SSE frame with a fixed pause between characters, followed by a single
//! `finish_reason: "stop"` chunk and the `[DONE]` sentinel.
//!
//! Any failure after the stream has started becomes a visible error chunk
//! carrying the stop reason, so the client always sees a clean ending.

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{FutureExt, Stream};
use std::future::Future;
use std::time::Duration;

use super::sse::{chunk, sse_frame, DONE_FRAME, FINISH_STOP};
use crate::error::Result;

enum Phase {
    /// Waiting for the body text.
    Aggregating(BoxFuture<'static, Result<String>>),
    /// Replaying `text`; `pos` is a byte offset on a char boundary.
    StreamingChars { text: String, pos: usize },
    /// Next frame is the stop chunk, optionally carrying an error message.
    Terminal { error: Option<String> },
    /// Next frame is the sentinel.
    Closing,
    Closed,
}

/// Cursor over one synthetic stream. Single-pass; dropped when closed.
struct StreamState {
    id: String,
    model: String,
    delay: Duration,
    phase: Phase,
}

impl StreamState {
    /// Advance to the next frame, or `None` once the sentinel has gone out.
    async fn next_frame(mut self) -> Option<(Bytes, Self)> {
        loop {
            match std::mem::replace(&mut self.phase, Phase::Closed) {
                Phase::Aggregating(body) => {
                    self.phase = match body.await {
                        Ok(text) => {
                            tracing::debug!(id = %self.id, chars = text.chars().count(), "Streaming composite text");
                            Phase::StreamingChars { text, pos: 0 }
                        }
                        Err(e) => {
                            tracing::error!(id = %self.id, error = %e, "Aggregation failed mid-stream");
                            Phase::Terminal {
                                error: Some(e.to_string()),
                            }
                        }
                    };
                }
                Phase::StreamingChars { text, pos } => {
                    let Some(ch) = text[pos..].chars().next() else {
                        self.phase = Phase::Terminal { error: None };
                        continue;
                    };

                    if pos > 0 && !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }

                    let mut buf = [0u8; 4];
                    let delta = ch.encode_utf8(&mut buf);
                    match sse_frame(&chunk(&self.id, &self.model, delta, None)) {
                        Ok(frame) => {
                            tracing::trace!(id = %self.id, pos, "Sent character chunk");
                            self.phase = Phase::StreamingChars {
                                text,
                                pos: pos + ch.len_utf8(),
                            };
                            return Some((frame, self));
                        }
                        Err(e) => {
                            tracing::error!(id = %self.id, error = %e, "Chunk encoding failed mid-stream");
                            self.phase = Phase::Terminal {
                                error: Some(e.to_string()),
                            };
                        }
                    }
                }
                Phase::Terminal { error } => {
                    self.phase = Phase::Closing;
                    let content = match error {
                        Some(message) => format!("\n{}", message),
                        None => String::new(),
                    };
                    match sse_frame(&chunk(&self.id, &self.model, &content, Some(FINISH_STOP))) {
                        Ok(frame) => return Some((frame, self)),
                        Err(e) => {
                            tracing::error!(id = %self.id, error = %e, "Failed to encode stop chunk");
                        }
                    }
                }
                Phase::Closing => {
                    tracing::info!(id = %self.id, "Stream finished");
                    return Some((Bytes::from_static(DONE_FRAME.as_bytes()), self));
                }
                Phase::Closed => return None,
            }
        }
    }
}

/// Build the lazy frame sequence for one streaming response.
///
/// `body` is not polled until the first frame is requested.
pub fn synthetic_stream<F>(
    id: String,
    model: String,
    delay: Duration,
    body: F,
) -> impl Stream<Item = Bytes> + Send + 'static
where
    F: Future<Output = Result<String>> + Send + 'static,
{
    let state = StreamState {
        id,
        model,
        delay,
        phase: Phase::Aggregating(body.boxed()),
    };

    futures::stream::unfold(state, StreamState::next_frame)
}
