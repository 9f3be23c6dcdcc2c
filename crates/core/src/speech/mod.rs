mod command;
mod simulated;
mod unavailable;

use crate::config::SpeechBackend;
use crate::emotion::{Emotion, SpeechProsody};
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub use command::CommandSpeechEngine;
pub use simulated::SimulatedSpeechEngine;
pub use unavailable::UnavailableSpeechEngine;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    pub emotion: Emotion,
    pub prosody: SpeechProsody,
}

#[derive(thiserror::Error, Debug)]
pub enum SpeechError {
    #[error("speech synthesis is not available on this host")]
    Unavailable,

    #[error("failed to start speech command `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Black-box text-to-speech facility the playback driver runs alongside.
///
/// Engines are polled from the same loop that drives animation; the
/// end-of-utterance signal is `poll_finished` returning `true` once.
pub trait SpeechEngine {
    fn is_available(&self) -> bool;

    fn speak(&mut self, request: &SpeechRequest, now: Instant) -> Result<(), SpeechError>;

    /// Stops the in-flight utterance. A no-op when nothing is playing.
    fn cancel(&mut self);

    fn poll_finished(&mut self, now: Instant) -> bool;
}

impl<E: SpeechEngine + ?Sized> SpeechEngine for Box<E> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn speak(&mut self, request: &SpeechRequest, now: Instant) -> Result<(), SpeechError> {
        (**self).speak(request, now)
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }

    fn poll_finished(&mut self, now: Instant) -> bool {
        (**self).poll_finished(now)
    }
}

/// Builds the engine a [`SpeechBackend`] describes.
pub fn engine_for(backend: &SpeechBackend) -> Box<dyn SpeechEngine> {
    match backend {
        SpeechBackend::Simulated => Box::new(SimulatedSpeechEngine::new()),
        SpeechBackend::Command { program, args } => {
            Box::new(CommandSpeechEngine::new(program.clone(), args.clone()))
        }
        SpeechBackend::Disabled => Box::new(UnavailableSpeechEngine::new()),
    }
}
