//! Bounded accumulator for a session's interleaved stdout and stderr.

use std::sync::{Arc, Mutex};

pub const TRUNCATION_NOTICE: &str = "\n[output truncated]\n";

/// Shared handle the process readers append into.
pub type OutputSink = Arc<Mutex<OutputBuffer>>;

#[derive(Debug)]
pub struct OutputBuffer {
    data: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl OutputBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            limit,
            truncated: false,
        }
    }

    pub fn shared(limit: usize) -> OutputSink {
        Arc::new(Mutex::new(Self::new(limit)))
    }

    /// Append process output. Bytes beyond the limit are dropped and a single
    /// notice is recorded until the next [`clear`](Self::clear).
    pub fn push(&mut self, chunk: &[u8]) {
        if self.truncated {
            return;
        }
        let room = self.limit.saturating_sub(self.data.len());
        if chunk.len() <= room {
            self.data.extend_from_slice(chunk);
        } else {
            self.data.extend_from_slice(&chunk[..room]);
            self.data.extend_from_slice(TRUNCATION_NOTICE.as_bytes());
            self.truncated = true;
        }
    }

    /// Append server-generated text regardless of the limit.
    pub fn push_marker(&mut self, text: &str) {
        self.data.extend_from_slice(text.as_bytes());
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.truncated = false;
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current contents as text. Invalid UTF-8 (including a character split
    /// across the truncation point) is replaced rather than rejected.
    pub fn snapshot(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}
