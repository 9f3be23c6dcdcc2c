use crate::lipsync::segment::segment;
use crate::lipsync::viseme::{pick_viseme, Viseme};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Milliseconds of speech per character at rate 1.0.
pub const MS_PER_CHAR: f64 = 80.0;
pub const MIN_UTTERANCE_MS: f64 = 200.0;
pub const MIN_ENTRY_MS: u64 = 40;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineEntry {
    pub start_ms: u64,
    pub duration_ms: u64,
    pub viseme: Viseme,
    pub source_chunk: String,
}

impl TimelineEntry {
    pub fn start(&self) -> Duration {
        Duration::from_millis(self.start_ms)
    }

    pub fn end(&self) -> Duration {
        Duration::from_millis(self.end_ms())
    }

    pub fn end_ms(&self) -> u64 {
        self.start_ms + self.duration_ms
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    pub total_ms: u64,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> Duration {
        Duration::from_millis(self.total_ms)
    }
}

pub(crate) fn effective_rate(rate: f64) -> f64 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        tracing::debug!(rate, "invalid speech rate; using 1.0");
        1.0
    }
}

/// Rough utterance length for `text` at `rate`, never below 200 ms.
pub fn estimate_duration_ms(text: &str, rate: f64) -> f64 {
    let chars = text.chars().count() as f64;
    (chars * MS_PER_CHAR / effective_rate(rate)).max(MIN_UTTERANCE_MS)
}

/// Builds the viseme schedule for one utterance.
///
/// The estimated duration is spread over the chunks in proportion to
/// their length, each chunk getting at least [`MIN_ENTRY_MS`]. Because of
/// that floor the returned total can exceed the estimate.
pub fn build_timeline(text: &str, rate: f64) -> Timeline {
    let chunks = segment(text);
    if chunks.is_empty() {
        return Timeline::default();
    }

    let estimate = estimate_duration_ms(text, rate);
    let total_len: usize = chunks.iter().map(|c| c.len).sum();

    let mut entries = Vec::with_capacity(chunks.len());
    let mut cursor = 0u64;
    for chunk in chunks {
        let share = estimate * chunk.len as f64 / total_len as f64;
        let duration_ms = (share.round() as u64).max(MIN_ENTRY_MS);
        entries.push(TimelineEntry {
            start_ms: cursor,
            duration_ms,
            viseme: pick_viseme(&chunk.text),
            source_chunk: chunk.text,
        });
        cursor += duration_ms;
    }

    Timeline {
        entries,
        total_ms: cursor,
    }
}
