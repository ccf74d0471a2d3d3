//! Incremental splitting of a streamed response into reasoning and content.
//!
//! Reasoning-capable models wrap their thinking segment in textual markers
//! (`<think>`/`</think>` by default) that arrive as ordinary text, cut at
//! arbitrary chunk boundaries. The splitter holds back any stream suffix
//! that could still turn out to be a marker and classifies everything else
//! the moment it arrives.

use crate::errors::EngineError;

/// Open/close marker pair wrapping the reasoning segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningMarkers {
    open: String,
    close: String,
}

impl ReasoningMarkers {
    /// Builds a marker pair. Both markers must be non-empty.
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Result<Self, EngineError> {
        let open = open.into();
        let close = close.into();
        if open.is_empty() || close.is_empty() {
            return Err(EngineError::config("reasoning markers must be non-empty"));
        }
        Ok(Self { open, close })
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }
}

impl Default for ReasoningMarkers {
    fn default() -> Self {
        Self {
            open: "<think>".to_string(),
            close: "</think>".to_string(),
        }
    }
}

/// Where the splitter currently stands relative to the reasoning segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxPhase {
    BeforeReasoning,
    InReasoning,
    AfterReasoning,
}

/// One maximal run of same-channel text produced by a single push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemuxSegment {
    Reasoning(String),
    Content(String),
}

/// Streaming state machine separating reasoning from final content.
///
/// Deltas go in, classified segments come out in arrival order; marker text
/// itself is emitted on neither channel. Classification does not depend on
/// how the stream was chunked: any split of the same character sequence
/// yields the same per-channel totals. Only the first open/close pair is
/// recognized; once the close marker has passed, everything is content.
#[derive(Debug)]
pub struct ReasoningDemux {
    markers: ReasoningMarkers,
    phase: DemuxPhase,
    pending: String,
}

impl ReasoningDemux {
    pub fn new(markers: ReasoningMarkers) -> Self {
        Self {
            markers,
            phase: DemuxPhase::BeforeReasoning,
            pending: String::new(),
        }
    }

    pub fn phase(&self) -> DemuxPhase {
        self.phase
    }

    /// Classifies one incoming delta.
    ///
    /// A single delta may cross several markers and then produces several
    /// segments; empty segments are never produced. Text held back from
    /// earlier pushes is classified here once its fate is decided.
    pub fn push(&mut self, delta: &str) -> Vec<DemuxSegment> {
        let mut combined = std::mem::take(&mut self.pending);
        combined.push_str(delta);

        let mut out = Vec::new();
        let mut rest = combined.as_str();
        loop {
            if self.phase == DemuxPhase::AfterReasoning {
                self.emit(rest, &mut out);
                break;
            }
            let marker = self.active_marker();
            if let Some(at) = rest.find(marker) {
                let advance = at + marker.len();
                self.emit(&rest[..at], &mut out);
                rest = &rest[advance..];
                self.phase = match self.phase {
                    DemuxPhase::BeforeReasoning => DemuxPhase::InReasoning,
                    _ => DemuxPhase::AfterReasoning,
                };
            } else {
                // The longest tail that is still a marker prefix stays
                // buffered until the next delta settles what it was.
                let keep = partial_marker_suffix(rest, marker);
                let cut = rest.len() - keep;
                self.emit(&rest[..cut], &mut out);
                self.pending.push_str(&rest[cut..]);
                break;
            }
        }
        out
    }

    /// Flushes the held-back suffix at end of stream.
    ///
    /// A tail held back as a possible marker prefix that never completed was
    /// ordinary text all along; it belongs to the channel that was active
    /// when it arrived. The phase is left untouched so callers can detect a
    /// reasoning segment that never closed.
    pub fn finish(&mut self) -> Option<DemuxSegment> {
        if self.pending.is_empty() {
            return None;
        }
        let text = std::mem::take(&mut self.pending);
        Some(match self.phase {
            DemuxPhase::InReasoning => DemuxSegment::Reasoning(text),
            _ => DemuxSegment::Content(text),
        })
    }

    fn active_marker(&self) -> &str {
        match self.phase {
            DemuxPhase::BeforeReasoning => &self.markers.open,
            _ => &self.markers.close,
        }
    }

    fn emit(&self, text: &str, out: &mut Vec<DemuxSegment>) {
        if text.is_empty() {
            return;
        }
        out.push(match self.phase {
            DemuxPhase::InReasoning => DemuxSegment::Reasoning(text.to_string()),
            _ => DemuxSegment::Content(text.to_string()),
        });
    }
}

/// Length in bytes of the longest suffix of `text` that is a non-empty
/// proper prefix of `marker`.
///
/// Candidates are compared bytewise. The returned cut is always a char
/// boundary: a marker never starts with a UTF-8 continuation byte, so a
/// matching suffix cannot start inside a multi-byte character.
fn partial_marker_suffix(text: &str, marker: &str) -> usize {
    let text = text.as_bytes();
    let marker = marker.as_bytes();
    let max = text.len().min(marker.len() - 1);
    (1..=max)
        .rev()
        .find(|&k| text[text.len() - k..] == marker[..k])
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demux() -> ReasoningDemux {
        ReasoningDemux::new(ReasoningMarkers::default())
    }

    /// Runs a chunk sequence through a fresh splitter and returns the
    /// concatenated channels plus the final phase.
    fn run_chunks(chunks: &[&str]) -> (String, String, DemuxPhase) {
        run_chunks_with(demux(), chunks)
    }

    fn run_chunks_with(
        mut demux: ReasoningDemux,
        chunks: &[&str],
    ) -> (String, String, DemuxPhase) {
        let mut reasoning = String::new();
        let mut content = String::new();
        for chunk in chunks {
            for segment in demux.push(chunk) {
                match segment {
                    DemuxSegment::Reasoning(text) => reasoning.push_str(&text),
                    DemuxSegment::Content(text) => content.push_str(&text),
                }
            }
        }
        if let Some(segment) = demux.finish() {
            match segment {
                DemuxSegment::Reasoning(text) => reasoning.push_str(&text),
                DemuxSegment::Content(text) => content.push_str(&text),
            }
        }
        (reasoning, content, demux.phase())
    }

    #[test]
    fn plain_stream_is_all_content() {
        let (reasoning, content, phase) = run_chunks(&["Dear hiring", " manager,"]);
        assert_eq!(reasoning, "");
        assert_eq!(content, "Dear hiring manager,");
        assert_eq!(phase, DemuxPhase::BeforeReasoning);
    }

    #[test]
    fn reasoning_then_content_in_one_delta() {
        let (reasoning, content, phase) = run_chunks(&["<think>plan the letter</think>Dear Acme,"]);
        assert_eq!(reasoning, "plan the letter");
        assert_eq!(content, "Dear Acme,");
        assert_eq!(phase, DemuxPhase::AfterReasoning);
    }

    #[test]
    fn markers_straddling_chunk_boundaries() {
        let (reasoning, content, _) = run_chunks(&["<th", "ink>ab", "c</th", "ink>xyz"]);
        assert_eq!(reasoning, "abc");
        assert_eq!(content, "xyz");
    }

    #[test]
    fn every_two_way_split_classifies_identically() {
        let stream = "<think>abc</think>xyz";
        for at in 0..=stream.len() {
            let (reasoning, content, phase) = run_chunks(&[&stream[..at], &stream[at..]]);
            assert_eq!(reasoning, "abc", "split at {at}");
            assert_eq!(content, "xyz", "split at {at}");
            assert_eq!(phase, DemuxPhase::AfterReasoning, "split at {at}");
        }
    }

    #[test]
    fn every_three_way_split_classifies_identically() {
        let stream = "<think>abc</think>xyz";
        for first in 0..=stream.len() {
            for second in first..=stream.len() {
                let chunks = [&stream[..first], &stream[first..second], &stream[second..]];
                let (reasoning, content, _) = run_chunks(&chunks);
                assert_eq!(reasoning, "abc", "splits at {first}/{second}");
                assert_eq!(content, "xyz", "splits at {first}/{second}");
            }
        }
    }

    #[test]
    fn byte_by_byte_delivery_matches() {
        let stream = "<think>abc</think>xyz";
        let chunks: Vec<&str> = (0..stream.len()).map(|i| &stream[i..=i]).collect();
        let (reasoning, content, _) = run_chunks(&chunks);
        assert_eq!(reasoning, "abc");
        assert_eq!(content, "xyz");
    }

    #[test]
    fn text_before_open_marker_is_content() {
        let (reasoning, content, _) = run_chunks(&["Hello <think>why</think> world"]);
        assert_eq!(reasoning, "why");
        assert_eq!(content, "Hello  world");
    }

    #[test]
    fn multiple_transitions_in_one_delta_stay_ordered() {
        let mut demux = demux();
        let segments = demux.push("a<think>b</think>c");
        assert_eq!(
            segments,
            vec![
                DemuxSegment::Content("a".to_string()),
                DemuxSegment::Reasoning("b".to_string()),
                DemuxSegment::Content("c".to_string()),
            ]
        );
    }

    #[test]
    fn false_marker_prefix_is_flushed_at_end() {
        let (reasoning, content, phase) = run_chunks(&["abc", "<thi"]);
        assert_eq!(reasoning, "");
        assert_eq!(content, "abc<thi");
        assert_eq!(phase, DemuxPhase::BeforeReasoning);
    }

    #[test]
    fn false_prefix_is_released_by_later_text() {
        let (reasoning, content, _) = run_chunks(&["a<th", "at is all"]);
        assert_eq!(reasoning, "");
        assert_eq!(content, "a<that is all");
    }

    #[test]
    fn unclosed_reasoning_leaves_in_phase() {
        let (reasoning, content, phase) = run_chunks(&["<think>half a thought"]);
        assert_eq!(reasoning, "half a thought");
        assert_eq!(content, "");
        assert_eq!(phase, DemuxPhase::InReasoning);
    }

    #[test]
    fn partial_close_marker_flushes_verbatim_into_reasoning() {
        let (reasoning, content, phase) = run_chunks(&["<think>half</thi"]);
        assert_eq!(reasoning, "half</thi");
        assert_eq!(content, "");
        assert_eq!(phase, DemuxPhase::InReasoning);
    }

    #[test]
    fn markers_after_the_first_pair_are_literal_content() {
        let (reasoning, content, _) = run_chunks(&["<think>x</think>y</think>z<think>w"]);
        assert_eq!(reasoning, "x");
        assert_eq!(content, "y</think>z<think>w");
    }

    #[test]
    fn empty_push_is_a_no_op() {
        let mut demux = demux();
        assert!(demux.push("<th").is_empty());
        assert!(demux.push("").is_empty());
        let segments = demux.push("ink>r");
        assert_eq!(segments, vec![DemuxSegment::Reasoning("r".to_string())]);
    }

    #[test]
    fn multibyte_text_splits_at_every_char_boundary() {
        let stream = "Grüße<think>日本語の計画</think>café";
        let boundaries: Vec<usize> = stream
            .char_indices()
            .map(|(at, _)| at)
            .chain(std::iter::once(stream.len()))
            .collect();
        for &at in &boundaries {
            let (reasoning, content, _) = run_chunks(&[&stream[..at], &stream[at..]]);
            assert_eq!(reasoning, "日本語の計画", "split at {at}");
            assert_eq!(content, "Grüßecafé", "split at {at}");
        }
    }

    #[test]
    fn custom_markers_are_honored() {
        let markers = ReasoningMarkers::new("[[reason]]", "[[/reason]]").unwrap();
        let (reasoning, content, _) = run_chunks_with(
            ReasoningDemux::new(markers),
            &["[[rea", "son]]steps[[/reason]]done"],
        );
        assert_eq!(reasoning, "steps");
        assert_eq!(content, "done");
    }

    #[test]
    fn self_overlapping_marker_prefixes_resolve() {
        let markers = ReasoningMarkers::new("abab", "baba").unwrap();
        let (reasoning, content, _) =
            run_chunks_with(ReasoningDemux::new(markers), &["ab", "ab", "Xbaba", "Y"]);
        assert_eq!(reasoning, "X");
        assert_eq!(content, "Y");
    }

    #[test]
    fn empty_markers_are_rejected() {
        assert!(matches!(
            ReasoningMarkers::new("", "</think>"),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            ReasoningMarkers::new("<think>", ""),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn partial_suffix_prefers_the_longest_candidate() {
        assert_eq!(partial_marker_suffix("aba", "abab"), 3);
        assert_eq!(partial_marker_suffix("xy<", "<think>"), 1);
        assert_eq!(partial_marker_suffix("xy<th", "<think>"), 3);
        assert_eq!(partial_marker_suffix("plain", "<think>"), 0);
        // A full marker never reaches here, but its tail must still count
        // only as a proper prefix.
        assert_eq!(partial_marker_suffix("<think", "<think>"), 6);
    }
}
