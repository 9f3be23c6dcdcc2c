mod segment;
mod timeline;
mod viseme;

pub use segment::{segment, Chunk};
pub use timeline::{
    build_timeline, estimate_duration_ms, Timeline, TimelineEntry, MIN_ENTRY_MS,
    MIN_UTTERANCE_MS, MS_PER_CHAR,
};
pub use viseme::{pick_viseme, Viseme};
