use crate::config::{DEFAULT_SPEECH_ARGS, DEFAULT_SPEECH_PROGRAM};
use crate::speech::{SpeechEngine, SpeechError, SpeechRequest};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::{Child, Command};

const LOG_TARGET: &str = "speech::command";

/// espeak-ng defaults: 175 words per minute, pitch 50 on a 0-99 scale.
const BASE_WORDS_PER_MINUTE: f64 = 175.0;
const BASE_PITCH: f64 = 50.0;

/// Speaks through an external TTS program such as `espeak-ng`.
///
/// Arguments may contain `{rate}` (words per minute), `{pitch}` (0-99)
/// and `{text}` placeholders. Without a `{text}` placeholder the text is
/// appended as the last argument.
#[derive(Debug)]
pub struct CommandSpeechEngine {
    program: String,
    args: Vec<String>,
    available: bool,
    child: Option<Child>,
}

impl CommandSpeechEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            available: true,
            child: None,
        }
    }

    pub fn espeak() -> Self {
        Self::new(
            DEFAULT_SPEECH_PROGRAM,
            DEFAULT_SPEECH_ARGS.iter().map(|a| (*a).to_owned()).collect(),
        )
    }

    fn render_args(&self, request: &SpeechRequest) -> Vec<String> {
        let rate = (BASE_WORDS_PER_MINUTE * request.prosody.rate).round() as i64;
        let pitch = (BASE_PITCH * request.prosody.pitch).round().clamp(0.0, 99.0) as i64;

        let mut has_text = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains("{text}") {
                    has_text = true;
                }
                arg.replace("{rate}", &rate.to_string())
                    .replace("{pitch}", &pitch.to_string())
                    .replace("{text}", &request.text)
            })
            .collect();
        if !has_text {
            args.push(request.text.clone());
        }
        args
    }
}

impl SpeechEngine for CommandSpeechEngine {
    fn is_available(&self) -> bool {
        self.available
    }

    fn speak(&mut self, request: &SpeechRequest, _now: Instant) -> Result<(), SpeechError> {
        self.cancel();

        let args = self.render_args(request);
        let spawned = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(child) => {
                tracing::debug!(
                    target: LOG_TARGET,
                    program = %self.program,
                    pid = ?child.id(),
                    "speech command started"
                );
                self.child = Some(child);
                Ok(())
            }
            Err(source) => {
                if source.kind() == std::io::ErrorKind::NotFound {
                    self.available = false;
                }
                Err(SpeechError::Spawn {
                    program: self.program.clone(),
                    source,
                })
            }
        }
    }

    /// Sends the kill signal without waiting; the runtime reaps the child
    /// once it is dropped.
    fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                tracing::debug!(target: LOG_TARGET, error = %e, "speech command already gone");
            }
        }
    }

    fn poll_finished(&mut self, _now: Instant) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    tracing::warn!(
                        target: LOG_TARGET,
                        program = %self.program,
                        code = ?status.code(),
                        "speech command failed"
                    );
                }
                self.child = None;
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "lost track of speech command");
                self.child = None;
                true
            }
        }
    }
}
