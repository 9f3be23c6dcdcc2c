use crate::chat::{ChatClient, ChatError, ChatReply};
use crate::emotion::{EmotionSource, KeywordEmotionSource};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;

/// Offline stand-in for the chat backend: the avatar repeats the input,
/// labelled by an [`EmotionSource`] (the keyword classifier by default).
#[derive(Clone)]
pub struct LocalChatClient {
    classifier: Arc<dyn EmotionSource>,
}

impl LocalChatClient {
    pub fn new() -> Self {
        Self::with_classifier(Arc::new(KeywordEmotionSource::new()))
    }

    pub fn with_classifier(classifier: Arc<dyn EmotionSource>) -> Self {
        Self { classifier }
    }
}

impl Default for LocalChatClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatClient for LocalChatClient {
    fn reply(&self, user_input: String) -> BoxFuture<'_, Result<ChatReply, ChatError>> {
        async move {
            let text = user_input.trim().to_owned();
            let emotion = self.classifier.classify(text.clone()).await?;
            Ok(ChatReply {
                sentences: vec![text.clone()],
                emotions: vec![emotion.label().to_owned()],
                generated_text: text,
            })
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::{Emotion, EmotionError};

    struct FixedSource(Result<Emotion, &'static str>);

    impl EmotionSource for FixedSource {
        fn classify(&self, _text: String) -> BoxFuture<'_, Result<Emotion, EmotionError>> {
            let result = self.0.map_err(|e| EmotionError::AnalysisFailed(e.to_owned()));
            async move { result }.boxed()
        }
    }

    #[tokio::test]
    async fn echoes_input_with_keyword_emotion() {
        let client = LocalChatClient::new();
        let reply = client.reply("  Wow, what a turnout!  ".into()).await.unwrap();
        assert_eq!(reply.generated_text, "Wow, what a turnout!");
        assert_eq!(reply.dominant_emotion(), Emotion::Surprise);
    }

    #[tokio::test]
    async fn labels_come_from_the_configured_source() {
        let source = FixedSource(Ok(Emotion::Sadness));
        let client = LocalChatClient::with_classifier(Arc::new(source));
        let reply = client.reply("Wow, what a turnout!".into()).await.unwrap();
        assert_eq!(reply.emotions, vec!["sadness".to_owned()]);
        assert_eq!(reply.dominant_emotion(), Emotion::Sadness);
    }

    #[tokio::test]
    async fn classifier_failure_is_a_chat_error() {
        let source = FixedSource(Err("model offline"));
        let client = LocalChatClient::with_classifier(Arc::new(source));
        let err = client.reply("hello".into()).await.unwrap_err();
        assert!(matches!(
            err,
            ChatError::Emotion(EmotionError::AnalysisFailed(msg)) if msg == "model offline"
        ));
    }
}
