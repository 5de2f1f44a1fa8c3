//! Server-sent-event framing.
//!
//! One event per frame:
//!
//! ```text
//! id: content_delta_1738764000123
//! event: content_delta
//! data: {"type":"content_delta","timestamp":1738764000123,...}
//!
//! ```

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use acp_protocol::{Event, ProtocolResult};

use super::Transport;
use crate::error::TransportError;

/// Render one event as a complete SSE frame, including the blank terminator line.
pub fn encode_frame(event: &Event) -> Result<String, TransportError> {
    let data = serde_json::to_string(event)?;
    let mut frame = format!("id: {}\nevent: {}\n", event.sse_id(), event.event_type());
    for line in data.split('\n') {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    Ok(frame)
}

// ============================================================================
// Writer
// ============================================================================

/// Writes SSE frames to an underlying writer, flushing after every event.
#[derive(Debug)]
pub struct SseTransport<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> SseTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Transport for SseTransport<W> {
    fn send(&self, event: &Event) -> Result<(), TransportError> {
        let frame = encode_frame(event)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(frame.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// One parsed SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub id: Option<String>,
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    /// Decode the frame body as a protocol event.
    pub fn to_event(&self) -> ProtocolResult<Event> {
        Event::from_json(&self.data)
    }
}

/// Incremental SSE parser; chunks may split frames at any byte.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return every frame completed by them.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf) {
            let frame_bytes: Vec<u8> = self.buf.drain(..idx + delim_len).take(idx).collect();
            if let Some(frame) = parse_frame(&frame_bytes) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Feed bytes and decode every completed frame, one result per frame.
    ///
    /// A frame that fails to decode does not hide the frames around it.
    pub fn push_events(&mut self, chunk: &[u8]) -> Vec<ProtocolResult<Event>> {
        self.push_chunk(chunk)
            .iter()
            .map(SseFrame::to_event)
            .collect()
    }

    /// Bytes received but not yet terminated by a blank line.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }
}

fn find_frame_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if buf[i..].starts_with(b"\r\n\r\n") {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_frame(bytes: &[u8]) -> Option<SseFrame> {
    let text = String::from_utf8_lossy(bytes);
    let mut id = None;
    let mut event = None;
    let mut data_lines: Vec<&str> = Vec::new();
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        // Comments start with ':'.
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "id" => id = Some(value.to_string()),
            "event" => event = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }
    if event.is_none() && data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        id,
        event,
        data: data_lines.join("\n"),
    })
}
