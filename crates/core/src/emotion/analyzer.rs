use crate::emotion::Emotion;
use futures::future::BoxFuture;
use futures::FutureExt;

#[derive(thiserror::Error, Debug)]
pub enum EmotionError {
    #[error("emotion analysis failed: {0}")]
    AnalysisFailed(String),
}

/// Supplies the emotion label for a message before it is spoken.
pub trait EmotionSource: Send + Sync {
    fn classify(&self, text: String) -> BoxFuture<'_, Result<Emotion, EmotionError>>;
}

const JOY_WORDS: &[&str] = &[
    "happy", "joy", "glad", "great", "excited", "welcome", "wonderful", "enjoy", "thanks",
];
const SADNESS_WORDS: &[&str] = &[
    "sad", "sorry", "unfortunately", "cancelled", "canceled", "miss", "unhappy",
];
const ANGER_WORDS: &[&str] = &["angry", "mad", "furious", "annoyed", "unacceptable"];
const SURPRISE_WORDS: &[&str] = &["wow", "surprise", "amazing", "incredible", "unbelievable"];

/// Local keyword classifier used when no remote classifier is configured.
#[derive(Clone, Debug, Default)]
pub struct KeywordEmotionSource;

impl KeywordEmotionSource {
    pub fn new() -> Self {
        Self
    }

    pub fn classify_now(&self, text: &str) -> Emotion {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        let has_any = |table: &[&str]| words.iter().any(|w| table.contains(&w.as_str()));

        if has_any(ANGER_WORDS) {
            Emotion::Anger
        } else if has_any(SADNESS_WORDS) {
            Emotion::Sadness
        } else if has_any(SURPRISE_WORDS) {
            Emotion::Surprise
        } else if has_any(JOY_WORDS) {
            Emotion::Joy
        } else {
            Emotion::Neutral
        }
    }
}

impl EmotionSource for KeywordEmotionSource {
    fn classify(&self, text: String) -> BoxFuture<'_, Result<Emotion, EmotionError>> {
        async move { Ok(self.classify_now(&text)) }.boxed()
    }
}
