use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use url::Url;

pub const DEFAULT_SPEECH_RATE: f64 = 1.0;
pub const DEFAULT_GRACE_MS: u64 = 120;
pub const DEFAULT_BLINK_MIN_MS: u64 = 3000;
pub const DEFAULT_BLINK_MAX_MS: u64 = 7000;
pub const DEFAULT_BLINK_HOLD_MS: u64 = 120;
pub const DEFAULT_FPS: u32 = 60;
pub const MAX_FPS: u32 = 1000;
pub const DEFAULT_EVENT_DETAILS: &str = "Virtusphere virtual event";
pub const ENV_CHAT_URL: &str = "VIRTUSPHERE_CHAT_URL";
pub const ENV_API_KEY: &str = "VIRTUSPHERE_API_KEY";
pub const ENV_SPEECH_COMMAND: &str = "VIRTUSPHERE_SPEECH_COMMAND";
pub const DEFAULT_SPEECH_PROGRAM: &str = "espeak-ng";
pub const DEFAULT_SPEECH_ARGS: &[&str] = &["-s", "{rate}", "-p", "{pitch}"];

/// Base speech-rate multiplier, before per-emotion prosody.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpeechRate(f64);

impl SpeechRate {
    pub fn new(value: f64) -> Result<Self, ConfigError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::InvalidSpeechRate(value));
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> f64 {
        self.0
    }
}

impl Default for SpeechRate {
    fn default() -> Self {
        Self(DEFAULT_SPEECH_RATE)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlinkInterval {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl BlinkInterval {
    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self, ConfigError> {
        if min_ms == 0 || min_ms > max_ms {
            return Err(ConfigError::InvalidBlinkInterval { min_ms, max_ms });
        }
        Ok(Self { min_ms, max_ms })
    }
}

impl Default for BlinkInterval {
    fn default() -> Self {
        Self {
            min_ms: DEFAULT_BLINK_MIN_MS,
            max_ms: DEFAULT_BLINK_MAX_MS,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameRate(u32);

impl FrameRate {
    pub fn new(fps: u32) -> Result<Self, ConfigError> {
        if fps == 0 {
            return Err(ConfigError::ZeroFrameRate);
        }
        if fps > MAX_FPS {
            return Err(ConfigError::FrameRateTooHigh { fps, max: MAX_FPS });
        }
        Ok(Self(fps))
    }

    pub fn fps(&self) -> u32 {
        self.0
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.0
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self(DEFAULT_FPS)
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

/// Base URL of the chat backend; `/rag-groq` is resolved against it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatEndpoint(Url);

impl ChatEndpoint {
    pub fn new(value: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(value.trim())
            .map_err(|e| ConfigError::InvalidChatUrl(format!("{value}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidChatUrl(format!(
                "{value}: scheme must be http or https"
            )));
        }
        Ok(Self(url))
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn join(&self, path: &str) -> Result<Url, ConfigError> {
        let mut base = self.0.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path)
            .map_err(|e| ConfigError::InvalidChatUrl(format!("{path}: {e}")))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatConfig {
    pub endpoint: ChatEndpoint,
    pub api_key: Option<ApiKey>,
    pub event_details: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpeechBackend {
    #[default]
    Simulated,
    Command {
        program: String,
        args: Vec<String>,
    },
    Disabled,
}

impl SpeechBackend {
    pub fn espeak() -> Self {
        SpeechBackend::Command {
            program: DEFAULT_SPEECH_PROGRAM.to_owned(),
            args: DEFAULT_SPEECH_ARGS.iter().map(|a| (*a).to_owned()).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnimationConfig {
    pub speech_rate: SpeechRate,
    pub grace_ms: u64,
    pub blink: BlinkInterval,
    pub blink_hold_ms: u64,
    pub seed: Option<u64>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            speech_rate: SpeechRate::default(),
            grace_ms: DEFAULT_GRACE_MS,
            blink: BlinkInterval::default(),
            blink_hold_ms: DEFAULT_BLINK_HOLD_MS,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AvatarConfig {
    pub animation: AnimationConfig,
    pub speech: SpeechBackend,
    pub chat: Option<ChatConfig>,
    pub frame_rate: FrameRate,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("speech rate must be a positive number, got {0}")]
    InvalidSpeechRate(f64),
    #[error("blink interval must satisfy 0 < min <= max, got {min_ms}..{max_ms} ms")]
    InvalidBlinkInterval { min_ms: u64, max_ms: u64 },
    #[error("frame rate must be > 0")]
    ZeroFrameRate,
    #[error("frame rate {fps} exceeds the maximum of {max} fps")]
    FrameRateTooHigh { fps: u32, max: u32 },
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("invalid chat url {0}")]
    InvalidChatUrl(String),
    #[error("speech command must not be empty")]
    EmptySpeechCommand,
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            Some(v) => Ok(Some(ApiKey::new(v)?)),
            None => Ok(None),
        },
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}

pub fn resolve_chat_endpoint(
    cli_value: Option<String>,
    env: &impl Env,
) -> Result<Option<ChatEndpoint>, ConfigError> {
    resolve_optional_string(cli_value, ENV_CHAT_URL, env)
        .filter(|v| !v.trim().is_empty())
        .map(|v| ChatEndpoint::new(&v))
        .transpose()
}

/// Splits a command line such as `espeak-ng -s {rate}` on whitespace into
/// a speech backend.
pub fn parse_speech_command(command: &str) -> Result<SpeechBackend, ConfigError> {
    let mut parts = command.split_whitespace().map(str::to_owned);
    let program = parts.next().ok_or(ConfigError::EmptySpeechCommand)?;
    Ok(SpeechBackend::Command {
        program,
        args: parts.collect(),
    })
}
