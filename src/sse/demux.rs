//! Chunk demultiplexer
//!
//! Turns an arbitrarily chunked text stream into complete `event:`/`data:`
//! frames. The transport delivers chunks with no line alignment, so a
//! carry-over buffer holds any trailing partial line between calls.

use crate::sse::events::RawFrame;

/// Stateful line assembler for the scenario SSE dialect.
///
/// An `event:` line names exactly one following `data:` line; the name is
/// cleared once that data line is consumed. Blank lines and any other line
/// shape are ignored without error.
#[derive(Debug, Default)]
pub struct FrameDemux {
    /// Trailing partial line carried over from the previous chunk
    buffer: String,
    /// Undecoded tail of a multibyte character split across chunks
    partial_utf8: Vec<u8>,
    /// Event name awaiting its data line
    current_event: Option<String>,
}

impl FrameDemux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of text, returning every frame it completes.
    ///
    /// The chunk may be empty, span multiple lines, or end mid-line; any
    /// incomplete trailing fragment is buffered until the next call.
    pub fn push_chunk(&mut self, chunk: &str) -> Vec<RawFrame> {
        self.buffer.push_str(chunk);
        self.drain_lines()
    }

    /// Feed one chunk of raw transport bytes.
    ///
    /// The transport splits on byte boundaries, so a chunk may end in the
    /// middle of a multibyte character; the undecodable tail is carried
    /// over and completed by the next chunk. Invalid byte sequences are
    /// skipped without losing the surrounding text.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<RawFrame> {
        self.partial_utf8.extend_from_slice(chunk);

        let mut decoded = 0;
        loop {
            match std::str::from_utf8(&self.partial_utf8[decoded..]) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    decoded = self.partial_utf8.len();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.partial_utf8[decoded..decoded + valid]) {
                        self.buffer.push_str(text);
                    }
                    decoded += valid;
                    match e.error_len() {
                        Some(invalid) => {
                            tracing::warn!(bytes = invalid, "skipping invalid UTF-8 in stream");
                            decoded += invalid;
                        }
                        // Incomplete character; wait for the next chunk
                        None => break,
                    }
                }
            }
        }
        self.partial_utf8.drain(..decoded);

        self.drain_lines()
    }

    fn drain_lines(&mut self) -> Vec<RawFrame> {
        let mut frames = Vec::new();
        while let Some(newline_pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline_pos).collect();
            if let Some(frame) = self.accept_line(line.trim_end()) {
                frames.push(frame);
            }
        }
        frames
    }

    fn accept_line(&mut self, line: &str) -> Option<RawFrame> {
        if line.is_empty() {
            return None;
        }

        if let Some(rest) = line.strip_prefix("event:") {
            self.current_event = Some(rest.trim().to_string());
            return None;
        }

        if let Some(rest) = line.strip_prefix("data:") {
            let data = rest.strip_prefix(' ').unwrap_or(rest);
            return Some(RawFrame {
                event_name: self.current_event.take(),
                data_line: data.to_string(),
            });
        }

        tracing::trace!(line, "ignoring unrecognized SSE line");
        None
    }

    /// Signal end of input.
    ///
    /// A buffered partial line represents an incomplete frame and is
    /// discarded, never delivered.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() || !self.partial_utf8.is_empty() {
            tracing::debug!(
                discarded = self.buffer.len() + self.partial_utf8.len(),
                "discarding partial line at end of stream"
            );
        }
        self.buffer.clear();
        self.partial_utf8.clear();
        self.current_event = None;
    }
}
