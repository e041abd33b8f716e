//! Record decoder for the chunked generation stream.
//!
//! Records are separated by a blank line; `\r\n` line endings are folded to
//! `\n` before records are split. Each record carries an `event: <type>`
//! line followed by a `data: <json>` line. Chunk boundaries are arbitrary: bytes
//! are carried over until a record is terminated by the separator, and a
//! multi-byte character split across chunks is reassembled before decoding.

use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::stream::event::StreamEvent;

pub const RECORD_SEPARATOR: &str = "\n\n";
const EVENT_MARKER: &str = "event:";
const DATA_MARKER: &str = "data:";

#[derive(Debug, Default)]
pub struct RecordDecoder {
    /// Undecoded tail of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
    /// Decoded text of the record currently being assembled.
    buffer: String,
    discarded: usize,
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every record it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.pending.extend_from_slice(chunk);
        self.decode_pending();

        let mut events = Vec::new();
        while let Some(end) = self.buffer.find(RECORD_SEPARATOR) {
            let record: String = self.buffer.drain(..end + RECORD_SEPARATOR.len()).collect();
            let record = &record[..end];
            if record.trim().is_empty() {
                continue;
            }
            match parse_record(record) {
                Ok(event) => events.push(event),
                Err(err) => {
                    self.discarded += 1;
                    match err {
                        DecodeError::InvalidPayload { .. } => {
                            warn!(error = %err, "Discarding stream record")
                        }
                        _ => debug!(error = %err, "Discarding stream record"),
                    }
                }
            }
        }
        events
    }

    /// Signal end of data. An unterminated trailing record is dropped.
    pub fn finish(&mut self) {
        if !self.pending.is_empty() || !self.buffer.trim().is_empty() {
            debug!(
                buffered_bytes = self.buffer.len() + self.pending.len(),
                "Dropping unterminated record at end of stream"
            );
        }
        self.pending.clear();
        self.buffer.clear();
    }

    /// Number of records discarded so far.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Bytes (decoded or not) still waiting for a separator.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.pending.len()
    }

    fn decode_pending(&mut self) {
        self.decode_utf8();
        // A lone trailing `\r` stays until the next chunk shows whether a `\n` follows.
        if self.buffer.contains("\r\n") {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }
    }

    fn decode_utf8(&mut self) {
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.pending.clear();
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    // Valid prefix is known good UTF-8.
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        // Incomplete sequence at the end; wait for the next chunk.
                        None => {
                            self.pending.drain(..valid);
                            return;
                        }
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }
}

/// Parse one separator-free record into a typed event.
pub fn parse_record(record: &str) -> Result<StreamEvent, DecodeError> {
    let mut lines = record
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .skip_while(|line| line.trim().is_empty());
    let event_line = lines.next().ok_or(DecodeError::MissingLine("event"))?;
    let data_line = lines.next().ok_or(DecodeError::MissingLine("data"))?;

    let event_type = event_line
        .trim_start()
        .strip_prefix(EVENT_MARKER)
        .ok_or(DecodeError::MissingMarker(EVENT_MARKER))?
        .trim();
    let data = data_line
        .trim_start()
        .strip_prefix(DATA_MARKER)
        .ok_or(DecodeError::MissingMarker(DATA_MARKER))?
        .trim();

    StreamEvent::from_record(event_type, data)
}
