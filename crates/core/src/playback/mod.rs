mod driver;
mod idle;
mod timers;

use crate::config::{AvatarConfig, BlinkInterval, DEFAULT_BLINK_HOLD_MS, DEFAULT_GRACE_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use driver::{AvatarDriver, JAW_FACTOR, MAX_VISEME_INTENSITY, MIN_VISEME_INTENSITY};
pub use idle::frame_motion;
pub use timers::TimerQueue;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Idle,
    Speaking,
    /// The last utterance was cut short by a new one or by shutdown.
    Interrupted,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DriverConfig {
    pub speech_rate: f64,
    /// Delay after the last viseme before the utterance is declared over.
    pub grace: Duration,
    pub blink: BlinkInterval,
    pub blink_hold: Duration,
    pub seed: Option<u64>,
}

impl DriverConfig {
    pub fn from_app(app: &AvatarConfig) -> Self {
        let animation = &app.animation;
        Self {
            speech_rate: animation.speech_rate.get(),
            grace: Duration::from_millis(animation.grace_ms),
            blink: animation.blink,
            blink_hold: Duration::from_millis(animation.blink_hold_ms),
            seed: animation.seed,
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            speech_rate: 1.0,
            grace: Duration::from_millis(DEFAULT_GRACE_MS),
            blink: BlinkInterval::default(),
            blink_hold: Duration::from_millis(DEFAULT_BLINK_HOLD_MS),
            seed: None,
        }
    }
}
