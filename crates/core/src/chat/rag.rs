use crate::chat::{ChatClient, ChatError, ChatReply};
use crate::config::{ApiKey, ChatConfig};
use crate::util::{is_http_retryable, retry_with_backoff, RetryConfig};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const LOG_TARGET: &str = "chat::rag";
const RAG_PATH: &str = "rag-groq";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the event assistant backend (`POST /rag-groq`).
#[derive(Clone)]
pub struct RagChatClient {
    client: Client,
    url: Url,
    api_key: Option<ApiKey>,
    event_details: String,
    retry: RetryConfig,
}

impl RagChatClient {
    pub fn new(config: &ChatConfig) -> Result<Self, ChatError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: config.endpoint.join(RAG_PATH)?,
            api_key: config.api_key.clone(),
            event_details: config.event_details.clone(),
            retry: RetryConfig::default(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn post_once(&self, body: &RagRequest<'_>) -> Result<ChatReply, ChatError> {
        let mut request = self.client.post(self.url.clone()).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_owned());
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        parse_reply(&text)
    }
}

#[derive(Serialize)]
struct RagRequest<'a> {
    event_details: &'a str,
    user_input: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RagResponse {
    Reply(ChatReply),
    Failure { error: String },
}

/// The backend answers 200 with `{"error": ...}` on failure.
pub(crate) fn parse_reply(body: &str) -> Result<ChatReply, ChatError> {
    let parsed: RagResponse = serde_json::from_str(body)
        .map_err(|e| ChatError::InvalidResponse(format!("failed to parse JSON: {e}")))?;
    match parsed {
        RagResponse::Reply(reply) => Ok(reply),
        RagResponse::Failure { error } => Err(ChatError::Backend(error)),
    }
}

fn is_retryable(error: &ChatError) -> bool {
    match error {
        ChatError::Network(e) => e.is_timeout() || e.is_connect(),
        ChatError::Status { status, .. } => is_http_retryable(*status),
        _ => false,
    }
}

impl ChatClient for RagChatClient {
    fn reply(&self, user_input: String) -> BoxFuture<'_, Result<ChatReply, ChatError>> {
        async move {
            let body = RagRequest {
                event_details: &self.event_details,
                user_input: &user_input,
            };
            let reply =
                retry_with_backoff(&self.retry, || self.post_once(&body), is_retryable).await;
            match &reply {
                Ok(r) => tracing::debug!(
                    target: LOG_TARGET,
                    sentences = r.sentences.len(),
                    emotion = %r.dominant_emotion(),
                    "chat reply received"
                ),
                Err(e) => tracing::warn!(target: LOG_TARGET, error = %e, "chat request failed"),
            }
            reply
        }
        .boxed()
    }
}
