mod analyzer;
mod overlay;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use analyzer::{EmotionError, EmotionSource, KeywordEmotionSource};
pub use overlay::EmotionOverlay;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Neutral,
    Joy,
    Sadness,
    Anger,
    Surprise,
}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::Neutral,
        Emotion::Joy,
        Emotion::Sadness,
        Emotion::Anger,
        Emotion::Surprise,
    ];

    /// Unrecognised labels (the classifier also emits `love` and `fear`)
    /// fall back to neutral.
    pub fn from_label(label: &str) -> Self {
        Self::recognise(label).unwrap_or_default()
    }

    fn recognise(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "neutral" => Some(Emotion::Neutral),
            "joy" => Some(Emotion::Joy),
            "sadness" => Some(Emotion::Sadness),
            "anger" => Some(Emotion::Anger),
            "surprise" => Some(Emotion::Surprise),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Joy => "joy",
            Emotion::Sadness => "sadness",
            Emotion::Anger => "anger",
            Emotion::Surprise => "surprise",
        }
    }

    pub fn prosody(self) -> SpeechProsody {
        let (rate, pitch) = match self {
            Emotion::Neutral => (1.0, 1.0),
            Emotion::Joy => (1.1, 1.15),
            Emotion::Sadness => (0.85, 0.85),
            Emotion::Anger => (1.05, 0.95),
            Emotion::Surprise => (1.15, 1.25),
        };
        SpeechProsody { rate, pitch }
    }

    pub fn overlay(self) -> EmotionOverlay {
        EmotionOverlay::for_emotion(self)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<&str> for Emotion {
    fn from(label: &str) -> Self {
        Emotion::from_label(label)
    }
}

/// Rate and pitch multipliers handed to the speech engine.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpeechProsody {
    pub rate: f64,
    pub pitch: f64,
}

impl Default for SpeechProsody {
    fn default() -> Self {
        Emotion::Neutral.prosody()
    }
}

/// Reduces per-sentence labels to one emotion for the whole utterance:
/// the most frequent recognised label, earliest wins a tie. Labels outside
/// the vocabulary (`love`, `fear`) are not counted.
pub fn dominant_emotion<'a, I>(labels: I) -> Emotion
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(Emotion, usize)> = Vec::new();
    for emotion in labels.into_iter().filter_map(Emotion::recognise) {
        match counts.iter_mut().find(|(e, _)| *e == emotion) {
            Some((_, n)) => *n += 1,
            None => counts.push((emotion, 1)),
        }
    }

    let mut best: Option<(Emotion, usize)> = None;
    for (emotion, n) in counts {
        if best.map_or(true, |(_, top)| n > top) {
            best = Some((emotion, n));
        }
    }
    best.map(|(e, _)| e).unwrap_or_default()
}
