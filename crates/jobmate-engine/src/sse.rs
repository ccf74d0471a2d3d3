//! Minimal server-sent-events decoding for streamed chat completions.

/// Incremental SSE decoder yielding complete `data:` payloads.
///
/// Line-oriented: partial lines are buffered across arbitrary chunk splits,
/// a trailing `\r` is stripped, consecutive `data:` lines of one frame are
/// joined with `\n`. Comments and fields other than `data:` carry nothing
/// for this wire format and are skipped.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    partial_line: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseDecoder {
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut frames = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                let line = std::mem::take(&mut self.partial_line);
                self.accept_line(&line, &mut frames);
            } else {
                self.partial_line.push(byte);
            }
        }
        frames
    }

    /// Flushes a final frame that was never closed by a blank line.
    ///
    /// Some servers end the body right after the last payload; the data seen
    /// so far is still a usable frame.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if !self.partial_line.is_empty() {
            let line = std::mem::take(&mut self.partial_line);
            let mut frames = Vec::new();
            self.accept_line(&line, &mut frames);
            if let Some(frame) = frames.pop() {
                return Some(frame);
            }
        }
        if self.data_lines.is_empty() {
            return None;
        }
        let payload = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(payload)
    }

    fn accept_line(&mut self, raw: &[u8], frames: &mut Vec<String>) {
        let line = String::from_utf8_lossy(raw);
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if line.is_empty() {
            if !self.data_lines.is_empty() {
                frames.push(self.data_lines.join("\n"));
                self.data_lines.clear();
            }
        } else if let Some(value) = line.strip_prefix("data:") {
            let value = value.strip_prefix(' ').unwrap_or(value);
            self.data_lines.push(value.to_string());
        }
    }
}
