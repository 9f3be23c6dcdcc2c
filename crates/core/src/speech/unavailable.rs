use crate::speech::{SpeechEngine, SpeechError, SpeechRequest};
use std::time::Instant;

/// Host without any speech synthesis.
#[derive(Clone, Debug, Default)]
pub struct UnavailableSpeechEngine;

impl UnavailableSpeechEngine {
    pub fn new() -> Self {
        Self
    }
}

impl SpeechEngine for UnavailableSpeechEngine {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&mut self, _request: &SpeechRequest, _now: Instant) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable)
    }

    fn cancel(&mut self) {}

    fn poll_finished(&mut self, _now: Instant) -> bool {
        false
    }
}
