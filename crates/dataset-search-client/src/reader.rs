use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;
use tracing::{debug, warn};

use crate::errors::{FrameError, SearchError};
use crate::event::StreamEvent;

const DATA_MARKER: &str = "data:";

/// Raw response body chunks as delivered by a transport.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, SearchError>> + Send + 'static>>;

/// Decoded events in arrival order.
pub type EventStream =
    Pin<Box<dyn futures::Stream<Item = Result<StreamEvent, SearchError>> + Send + 'static>>;

/// One blank-line delimited block of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    text: String,
}

impl RawFrame {
    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            text: String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Payload of the first `data:` line, if the frame has one.
    pub fn data_line(&self) -> Option<&str> {
        self.text
            .split('\n')
            .map(|line| line.trim_end_matches('\r'))
            .find_map(|line| line.strip_prefix(DATA_MARKER))
            .map(str::trim)
    }
}

/// Incremental frame splitter.
///
/// Bytes are buffered until a blank line closes a frame. Lines may end in
/// `\n` or `\r\n`, mixed freely. Text decoding only happens on complete
/// frames, so multi-byte characters split across chunks are reassembled
/// before decoding.
pub struct FrameDecoder {
    buf: Vec<u8>,
    scan_from: usize,
    max_buffer_bytes: usize,
    overflowed: bool,
}

impl FrameDecoder {
    pub fn new(max_buffer_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            scan_from: 0,
            max_buffer_bytes,
            overflowed: false,
        }
    }

    /// Appends a chunk and returns every frame it completed.
    ///
    /// When the unterminated remainder grows past `max_buffer_bytes`, the
    /// frames completed by the same chunk are still returned; the overflow
    /// is reported by [`FrameDecoder::overflow`] and by every later call.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Result<Vec<RawFrame>, SearchError> {
        if let Some(err) = self.overflow() {
            return Err(err);
        }
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        let mut start = 0;
        let mut scan = self.scan_from;
        while let Some((end, next)) = find_frame_delimiter(&self.buf, scan) {
            if end > start {
                frames.push(RawFrame::from_bytes(&self.buf[start..end]));
            }
            start = next;
            scan = start;
        }
        self.buf.drain(..start);
        // A blank line starts at most three bytes before the end of the remainder.
        self.scan_from = self.buf.len().saturating_sub(3);
        if self.buf.len() > self.max_buffer_bytes {
            self.overflowed = true;
            self.buf = Vec::new();
            self.scan_from = 0;
            if frames.is_empty() {
                return Err(self.overflow_error());
            }
        }
        Ok(frames)
    }

    /// Set once an unterminated frame outgrew the buffer cap.
    pub fn overflow(&self) -> Option<SearchError> {
        self.overflowed.then(|| self.overflow_error())
    }

    fn overflow_error(&self) -> SearchError {
        SearchError::BufferOverflow {
            limit: self.max_buffer_bytes,
        }
    }

    /// Bytes buffered for a frame that has not been terminated yet.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }
}

/// Finds the next blank line at or after `from`.
///
/// Returns the end of the frame text and the index just past the blank line.
fn find_frame_delimiter(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' {
            let next = match buf[i + 1] {
                b'\n' => Some(i + 2),
                b'\r' if buf.get(i + 2) == Some(&b'\n') => Some(i + 3),
                _ => None,
            };
            if let Some(next) = next {
                let end = if i > 0 && buf[i - 1] == b'\r' { i - 1 } else { i };
                return Some((end, next));
            }
        }
        i += 1;
    }
    None
}

/// Decodes the `data:` line of a frame.
///
/// Returns `None` for frames without a data line (comments, keep-alives).
pub fn decode_frame(frame: &RawFrame) -> Option<Result<StreamEvent, FrameError>> {
    let data = frame.data_line()?;
    Some(serde_json::from_str(data).map_err(|e| FrameError::invalid_json(&e, data)))
}

/// Turns a byte stream into decoded events.
///
/// Malformed frames are logged and skipped. A transport error or a buffer
/// overflow ends the stream with that error, after any events already
/// decoded; a trailing unterminated frame at end-of-input is dropped.
pub fn event_stream(bytes_stream: ByteStream, max_buffer_bytes: usize) -> EventStream {
    struct State {
        bytes_stream: ByteStream,
        decoder: FrameDecoder,
        pending: VecDeque<StreamEvent>,
        failure: Option<SearchError>,
        done: bool,
    }

    Box::pin(stream::try_unfold(
        State {
            bytes_stream,
            decoder: FrameDecoder::new(max_buffer_bytes),
            pending: VecDeque::new(),
            failure: None,
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if let Some(err) = state.failure.take() {
                    return Err(err);
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        for frame in state.decoder.push_chunk(&chunk)? {
                            match decode_frame(&frame) {
                                Some(Ok(event)) => state.pending.push_back(event),
                                Some(Err(err)) => {
                                    warn!(error = %err, "skipping malformed stream frame");
                                }
                                None => {}
                            }
                        }
                        // Frames completed alongside an overflow are delivered first.
                        state.failure = state.decoder.overflow();
                    }
                    Some(Err(err)) => return Err(err),
                    None => {
                        let dropped = state.decoder.buffered_len();
                        if dropped > 0 {
                            debug!(dropped_bytes = dropped, "stream ended inside a frame");
                        }
                        state.done = true;
                    }
                }
            }
        },
    ))
}
