mod local;
mod rag;

use crate::config::ConfigError;
use crate::emotion::{dominant_emotion, Emotion, EmotionError};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

pub use local::LocalChatClient;
pub use rag::RagChatClient;

/// A generated answer plus the classifier's label for each sentence.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    pub generated_text: String,
    #[serde(default)]
    pub sentences: Vec<String>,
    #[serde(default)]
    pub emotions: Vec<String>,
}

impl ChatReply {
    pub fn dominant_emotion(&self) -> Emotion {
        dominant_emotion(self.emotions.iter().map(String::as_str))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ChatError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("chat backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("chat backend reported an error: {0}")]
    Backend(String),
    #[error("invalid chat response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Emotion(#[from] EmotionError),
}

pub trait ChatClient: Send + Sync {
    fn reply(&self, user_input: String) -> BoxFuture<'_, Result<ChatReply, ChatError>>;
}
