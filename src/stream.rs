//! Generation stream decoding
//!
//! Turns the chunked response body of a bulk generation request into a lazy,
//! finite sequence of typed events. The decoder knows nothing about what the
//! events mean; applying them is the orchestrator's job.

use std::collections::VecDeque;
use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};

use crate::error::ApiError;

pub mod decoder;
pub mod event;

pub use decoder::{parse_record, RecordDecoder, RECORD_SEPARATOR};
pub use event::{EventKind, FinishEvent, ItemEvent, ItemStatus, Phase, StreamEvent};

/// Raw response body, delivered in arbitrary chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ApiError>> + Send>>;

/// Decoded events. A transport error is yielded once and ends the sequence.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ApiError>> + Send>>;

struct DecodeState {
    chunks: ByteStream,
    decoder: RecordDecoder,
    ready: VecDeque<StreamEvent>,
    finished: bool,
}

/// Decode a byte stream into events, pulling chunks only as events are consumed.
pub fn decode_stream(chunks: ByteStream) -> EventStream {
    let state = DecodeState {
        chunks,
        decoder: RecordDecoder::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    let events = stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.ready.pop_front() {
                return Some((Ok(event), state));
            }
            if state.finished {
                return None;
            }
            match state.chunks.next().await {
                Some(Ok(chunk)) => {
                    let decoded = state.decoder.push(&chunk);
                    state.ready.extend(decoded);
                }
                Some(Err(err)) => {
                    state.finished = true;
                    state.decoder.finish();
                    return Some((Err(err), state));
                }
                None => {
                    state.finished = true;
                    state.decoder.finish();
                }
            }
        }
    });
    Box::pin(events.fuse())
}

/// Wrap in-memory chunks as a byte stream.
pub fn byte_stream_from_chunks<I>(chunks: I) -> ByteStream
where
    I: IntoIterator<Item = Vec<u8>>,
    I::IntoIter: Send + 'static,
{
    Box::pin(stream::iter(chunks.into_iter().map(Ok)))
}
