//! Incremental Server-Sent Events decoder
//!
//! Network chunks arrive at arbitrary boundaries. The decoder buffers bytes
//! until a full line is available and emits a frame at each blank line:
//! - `data: <payload>` lines accumulate, joined with `\n`
//! - lines starting with `:` are comments (keep-alive pings)
//! - `event`, `id` and `retry` fields are accepted and ignored; the payload
//!   carries its own type
//!
//! Lines may end in `\n` or `\r\n`.

/// A dispatched SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: String,
    has_data: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every frame it completes, in order
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Whether a partially received frame is pending. It is discarded if the
    /// stream ends here.
    pub fn has_pending(&self) -> bool {
        self.has_data || !self.buffer.is_empty()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "event" | "id" | "retry" => {}
            other => tracing::debug!(field = %other, "Ignoring unknown SSE field"),
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if !std::mem::take(&mut self.has_data) {
            return None;
        }
        Some(SseFrame {
            data: std::mem::take(&mut self.data),
        })
    }
}
