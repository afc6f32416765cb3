//! Transport framing for the event channel.
//!
//! One event is framed as one UTF-8 text record: `"data: " + JSON + "\n\n"`
//! (Server-Sent Events). Decoding reassembles records split across
//! delivery boundaries by buffering until a full terminated record is
//! available, then parses the JSON payload back into a typed [`RunEvent`].
//! Framing preserves emission order exactly.
//!
//! A record that fails to parse is a framing error, never silently
//! dropped. A well-formed record whose `type` tag is unknown to this
//! build decodes to [`RunEvent::Raw`] instead, so new event kinds degrade
//! to no-ops downstream rather than killing the run.

use crate::error::{FrameError, FrameResult};
use crate::events::{EventType, RunEvent};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

const MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// Output format for encoded events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Server-Sent Events format (`data: {...}\n\n`).
    #[default]
    Sse,
    /// Newline-delimited JSON format (`{...}\n`).
    Ndjson,
}

/// Encode one event as one transport frame.
pub fn encode_frame(event: &RunEvent, format: OutputFormat) -> String {
    let json = serde_json::to_string(event).unwrap_or_default();
    match format {
        OutputFormat::Sse => format!("data: {}\n\n", json),
        OutputFormat::Ndjson => format!("{}\n", json),
    }
}

/// Decode one record payload into a typed event.
///
/// Records with a recognized `type` tag must deserialize fully (a missing
/// required field is a [`FrameError::Parse`]); records with an unknown
/// tag become [`RunEvent::Raw`].
pub fn decode_event(payload: &str) -> FrameResult<RunEvent> {
    let value: Value = serde_json::from_str(payload).map_err(|source| FrameError::Parse {
        source,
        payload: payload.to_string(),
    })?;

    let tag = value.get("type").and_then(Value::as_str);
    if let Some(tag) = tag {
        if EventType::from_wire_tag(tag).is_none() {
            let timestamp = value.get("timestamp").and_then(Value::as_i64);
            return Ok(RunEvent::Raw {
                data: value,
                timestamp,
            });
        }
    }

    serde_json::from_value(value).map_err(|source| FrameError::Parse {
        source,
        payload: payload.to_string(),
    })
}

/// Buffering decoder for the SSE event channel.
///
/// Feed transport chunks as they arrive; decoded events are queued in
/// arrival order and popped with [`FrameDecoder::next_event`]. Call
/// [`FrameDecoder::finish`] at end of stream to flush a trailing record
/// the peer never terminated.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: String,
    events: VecDeque<RunEvent>,
}

impl FrameDecoder {
    /// Create a new decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the decoder.
    pub fn feed(&mut self, bytes: &Bytes) -> FrameResult<()> {
        let chunk = String::from_utf8_lossy(bytes);
        self.feed_str(&chunk)
    }

    /// Feed a string into the decoder.
    pub fn feed_str(&mut self, s: &str) -> FrameResult<()> {
        self.buffer.push_str(s);

        if self.buffer.len() > MAX_BUFFER_SIZE {
            return Err(FrameError::BufferOverflow);
        }

        self.drain_buffer()
    }

    /// Flush any trailing unterminated record at end of stream.
    pub fn finish(&mut self) -> FrameResult<()> {
        self.drain_buffer()?;

        if !self.buffer.trim().is_empty() {
            let record = self.buffer.trim_end_matches(['\n', '\r']).to_string();
            self.buffer.clear();
            if let Some(payload) = extract_data(&record) {
                self.events.push_back(decode_event(&payload)?);
            }
        } else {
            self.buffer.clear();
        }

        Ok(())
    }

    /// Pop the next decoded event, in arrival order.
    pub fn next_event(&mut self) -> Option<RunEvent> {
        self.events.pop_front()
    }

    /// Check if decoded events are waiting.
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    fn drain_buffer(&mut self) -> FrameResult<()> {
        while let Some((pos, delimiter_len)) = self.find_record_boundary() {
            let record = self.buffer[..pos].to_string();
            self.buffer = self.buffer[pos + delimiter_len..].to_string();
            self.buffer = self.buffer.trim_start_matches(['\n', '\r']).to_string();

            if let Some(payload) = extract_data(&record) {
                self.events.push_back(decode_event(&payload)?);
            }
        }

        Ok(())
    }

    fn find_record_boundary(&self) -> Option<(usize, usize)> {
        let newline = self.buffer.find("\n\n").map(|pos| (pos, 2));
        let carriage = self.buffer.find("\r\n\r\n").map(|pos| (pos, 4));

        match (newline, carriage) {
            (Some(nl), Some(cr)) => Some(if cr.0 < nl.0 { cr } else { nl }),
            (Some(nl), None) => Some(nl),
            (None, Some(cr)) => Some(cr),
            (None, None) => None,
        }
    }
}

/// Extract the joined `data:` payload of one record.
///
/// Comment lines (`:` prefix) and non-data fields are skipped; a record
/// with no data lines (e.g. a keep-alive comment) yields `None`.
fn extract_data(record: &str) -> Option<String> {
    let mut data_lines = Vec::new();

    for line in record.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value).to_string());
        } else if line == "data" {
            data_lines.push(String::new());
        }
    }

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

pin_project! {
    /// Stream adapter that decodes events from a transport byte stream.
    pub struct FrameStream<S> {
        #[pin]
        inner: S,
        decoder: FrameDecoder,
        finished: bool,
    }
}

impl<S> FrameStream<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>>,
{
    /// Create a new frame stream from a byte stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            finished: false,
        }
    }
}

impl<S> Stream for FrameStream<S>
where
    S: Stream<Item = Result<Bytes, std::io::Error>> + Unpin,
{
    type Item = FrameResult<RunEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Return buffered events first
        if let Some(event) = this.decoder.next_event() {
            return Poll::Ready(Some(Ok(event)));
        }

        if *this.finished {
            return Poll::Ready(None);
        }

        match this.inner.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(bytes))) => {
                if let Err(error) = this.decoder.feed(&bytes) {
                    return Poll::Ready(Some(Err(error)));
                }

                if let Some(event) = this.decoder.next_event() {
                    Poll::Ready(Some(Ok(event)))
                } else {
                    cx.waker().wake_by_ref();
                    Poll::Pending
                }
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(FrameError::Io(e)))),
            Poll::Ready(None) => {
                *this.finished = true;

                if let Err(error) = this.decoder.finish() {
                    return Poll::Ready(Some(Err(error)));
                }

                if let Some(event) = this.decoder.next_event() {
                    Poll::Ready(Some(Ok(event)))
                } else {
                    Poll::Ready(None)
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
