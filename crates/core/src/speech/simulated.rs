use crate::lipsync::estimate_duration_ms;
use crate::speech::{SpeechEngine, SpeechError, SpeechRequest};
use std::time::{Duration, Instant};

const LOG_TARGET: &str = "speech::simulated";

/// Pretends to speak for as long as the text would take at the requested
/// rate. Useful headless and in tests.
#[derive(Clone, Debug, Default)]
pub struct SimulatedSpeechEngine {
    finishes_at: Option<Instant>,
    started: usize,
    cancelled: usize,
}

impl SimulatedSpeechEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> usize {
        self.started
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled
    }
}

impl SpeechEngine for SimulatedSpeechEngine {
    fn is_available(&self) -> bool {
        true
    }

    fn speak(&mut self, request: &SpeechRequest, now: Instant) -> Result<(), SpeechError> {
        let ms = estimate_duration_ms(&request.text, request.prosody.rate);
        let length = Duration::from_millis(ms.round() as u64);
        tracing::debug!(
            target: LOG_TARGET,
            ?length,
            emotion = %request.emotion,
            "utterance started"
        );
        self.finishes_at = Some(now + length);
        self.started += 1;
        Ok(())
    }

    fn cancel(&mut self) {
        if self.finishes_at.take().is_some() {
            self.cancelled += 1;
            tracing::debug!(target: LOG_TARGET, "utterance cancelled");
        }
    }

    fn poll_finished(&mut self, now: Instant) -> bool {
        match self.finishes_at {
            Some(at) if now >= at => {
                self.finishes_at = None;
                true
            }
            _ => false,
        }
    }
}
