use crate::emotion::Emotion;

/// Static per-emotion baseline weights for mouth and brow shapes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmotionOverlay {
    emotion: Emotion,
    weights: &'static [(&'static str, f32)],
}

const JOY: &[(&str, f32)] = &[("mouthSmile", 0.6), ("browInnerUp", 0.2)];
const SADNESS: &[(&str, f32)] = &[("mouthFrown", 0.5), ("browInnerUp", 0.6)];
const ANGER: &[(&str, f32)] = &[("mouthFrown", 0.3), ("browDown", 0.7)];
const SURPRISE: &[(&str, f32)] = &[("mouthOpen", 0.3), ("browOuterUp", 0.7)];
const NEUTRAL: &[(&str, f32)] = &[];

impl EmotionOverlay {
    pub fn for_emotion(emotion: Emotion) -> Self {
        let weights = match emotion {
            Emotion::Joy => JOY,
            Emotion::Sadness => SADNESS,
            Emotion::Anger => ANGER,
            Emotion::Surprise => SURPRISE,
            Emotion::Neutral => NEUTRAL,
        };
        Self { emotion, weights }
    }

    pub fn emotion(&self) -> Emotion {
        self.emotion
    }

    /// Baseline weight for `shape`, 0 when this overlay does not touch it.
    pub fn baseline(&self, shape: &str) -> f32 {
        self.weights
            .iter()
            .find(|(name, _)| *name == shape)
            .map(|(_, w)| *w)
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        self.weights.iter().copied()
    }
}

impl Default for EmotionOverlay {
    fn default() -> Self {
        Self::for_emotion(Emotion::Neutral)
    }
}
