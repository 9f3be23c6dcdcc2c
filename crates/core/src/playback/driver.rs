use crate::emotion::{Emotion, EmotionOverlay, SpeechProsody};
use crate::lipsync::{build_timeline, Timeline, Viseme};
use crate::morph::{facial_shapes, Renderable, JAW_OPEN};
use crate::playback::idle::{frame_motion, IdleMotion};
use crate::playback::timers::TimerQueue;
use crate::playback::{DriverConfig, PlaybackState};
use crate::speech::{SpeechEngine, SpeechRequest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

const LOG_TARGET: &str = "playback::driver";

pub const MIN_VISEME_INTENSITY: f32 = 0.5;
pub const MAX_VISEME_INTENSITY: f32 = 0.95;
/// Jaw opening relative to the viseme intensity for open/funnel shapes.
pub const JAW_FACTOR: f32 = 0.6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SpeechAction {
    Apply(Viseme),
    Release,
    Finish,
}

/// Lip-sync driver for one avatar.
///
/// Owns the face's mouth and brow weights, the speech engine and every
/// timer; the host calls [`AvatarDriver::tick`] from its render loop.
pub struct AvatarDriver<R, S> {
    face: R,
    speech: S,
    config: DriverConfig,
    rng: StdRng,
    state: PlaybackState,
    overlay: EmotionOverlay,
    timeline: Timeline,
    speech_timers: TimerQueue<SpeechAction>,
    idle: IdleMotion,
    started_at: Instant,
    utterances: u64,
}

impl<R, S> AvatarDriver<R, S>
where
    R: Renderable,
    S: SpeechEngine,
{
    pub fn new(face: R, speech: S, config: DriverConfig, now: Instant) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let idle = IdleMotion::new(config.blink, config.blink_hold, now, &mut rng);
        if !speech.is_available() {
            tracing::warn!(
                target: LOG_TARGET,
                "speech engine unavailable; avatar will stay silent"
            );
        }
        Self {
            face,
            speech,
            config,
            rng,
            state: PlaybackState::Idle,
            overlay: EmotionOverlay::default(),
            timeline: Timeline::default(),
            speech_timers: TimerQueue::new(),
            idle,
            started_at: now,
            utterances: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn emotion(&self) -> Emotion {
        self.overlay.emotion()
    }

    pub fn face(&self) -> &R {
        &self.face
    }

    pub fn speech(&self) -> &S {
        &self.speech
    }

    /// Timeline of the current (or most recent) utterance.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn pending_speech_timers(&self) -> usize {
        self.speech_timers.len()
    }

    pub fn utterances(&self) -> u64 {
        self.utterances
    }

    /// Starts speaking `text`, cancelling whatever was in flight.
    pub fn submit(&mut self, text: &str, emotion: Emotion, now: Instant) -> PlaybackState {
        if self.state == PlaybackState::Speaking {
            self.interrupt("superseded by a new utterance");
        }

        self.overlay = emotion.overlay();
        self.zero_facial_shapes();
        self.apply_overlay();
        self.utterances += 1;

        let base = emotion.prosody();
        let prosody = SpeechProsody {
            rate: self.config.speech_rate * base.rate,
            pitch: base.pitch,
        };
        self.timeline = build_timeline(text, prosody.rate);

        if self.timeline.is_empty() {
            tracing::debug!(target: LOG_TARGET, "blank utterance; nothing to animate");
            self.transition(PlaybackState::Speaking);
            self.finish("blank utterance");
            return self.state;
        }

        if !self.speech.is_available() {
            tracing::debug!(target: LOG_TARGET, "speech engine unavailable; skipping utterance");
            self.transition(PlaybackState::Idle);
            return self.state;
        }

        let request = SpeechRequest {
            text: text.to_owned(),
            emotion,
            prosody,
        };
        if let Err(e) = self.speech.speak(&request, now) {
            tracing::warn!(target: LOG_TARGET, error = %e, "speech engine failed to start");
            self.transition(PlaybackState::Idle);
            return self.state;
        }

        for entry in &self.timeline.entries {
            self.speech_timers
                .schedule(now + entry.start(), SpeechAction::Apply(entry.viseme));
            self.speech_timers
                .schedule(now + entry.end(), SpeechAction::Release);
        }
        self.speech_timers.schedule(
            now + self.timeline.total() + self.config.grace,
            SpeechAction::Finish,
        );

        tracing::debug!(
            target: LOG_TARGET,
            emotion = %emotion,
            entries = self.timeline.entries.len(),
            total_ms = self.timeline.total_ms,
            "utterance scheduled"
        );
        self.transition(PlaybackState::Speaking);
        self.state
    }

    /// Advances timers, polls the speech engine and applies frame motion.
    pub fn tick(&mut self, now: Instant) {
        while let Some((_, action)) = self.speech_timers.pop_due(now) {
            match action {
                SpeechAction::Apply(viseme) => self.apply_viseme(viseme),
                SpeechAction::Release => self.reset_to_baseline(),
                SpeechAction::Finish => self.finish("timeline complete"),
            }
        }

        // Polled in every state; a command can outlive its timeline.
        let engine_ended = self.speech.poll_finished(now);
        if engine_ended && self.state == PlaybackState::Speaking {
            self.finish("speech engine ended");
        }

        self.idle.tick(&mut self.face, now, &mut self.rng);

        let elapsed = now.saturating_duration_since(self.started_at);
        let motion = frame_motion(elapsed, self.state == PlaybackState::Speaking);
        self.face.apply_motion(motion);
    }

    /// End-of-speech signal from a host that receives engine callbacks
    /// instead of polling.
    pub fn on_speech_end(&mut self) {
        if self.state == PlaybackState::Speaking {
            self.finish("speech end signal");
        }
    }

    /// Tears down the in-flight utterance. Idle motion keeps running.
    pub fn shutdown(&mut self) {
        self.interrupt("shutdown");
        self.reset_to_baseline();
    }

    /// Sets every mouth and brow shape to the current overlay baseline.
    pub fn reset_to_baseline(&mut self) {
        let overlay = self.overlay;
        for shape in facial_shapes() {
            self.face.set_weight(shape, overlay.baseline(shape));
        }
    }

    fn interrupt(&mut self, reason: &str) {
        let cancelled = self.speech_timers.cancel_all();
        self.speech.cancel();
        tracing::debug!(target: LOG_TARGET, reason, cancelled, "utterance interrupted");
        self.transition(PlaybackState::Interrupted);
    }

    fn finish(&mut self, reason: &str) {
        self.speech_timers.cancel_all();
        self.reset_to_baseline();
        tracing::debug!(target: LOG_TARGET, reason, "utterance finished");
        self.transition(PlaybackState::Idle);
    }

    fn apply_viseme(&mut self, viseme: Viseme) {
        self.zero_facial_shapes();
        let intensity = self
            .rng
            .random_range(MIN_VISEME_INTENSITY..=MAX_VISEME_INTENSITY);
        self.face.set_weight(viseme.shape_name(), intensity);
        self.apply_overlay();
        if viseme.opens_jaw() {
            self.face.raise_weight(JAW_OPEN, intensity * JAW_FACTOR);
        }
    }

    fn apply_overlay(&mut self) {
        for (shape, weight) in self.overlay.iter() {
            self.face.raise_weight(shape, weight);
        }
    }

    fn zero_facial_shapes(&mut self) {
        for shape in facial_shapes() {
            self.face.set_weight(shape, 0.0);
        }
    }

    fn transition(&mut self, next: PlaybackState) {
        if self.state != next {
            tracing::debug!(target: LOG_TARGET, from = ?self.state, to = ?next, "state change");
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlinkInterval;
    use crate::morph::{MorphTable, EYELID_SHAPES, MOUTH_SHAPES};
    use crate::speech::{SimulatedSpeechEngine, SpeechError, UnavailableSpeechEngine};
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn config() -> DriverConfig {
        DriverConfig {
            seed: Some(42),
            ..DriverConfig::default()
        }
    }

    fn driver(t0: Instant) -> AvatarDriver<MorphTable, SimulatedSpeechEngine> {
        AvatarDriver::new(MorphTable::full_face(), SimulatedSpeechEngine::new(), config(), t0)
    }

    fn weight(d: &AvatarDriver<MorphTable, impl SpeechEngine>, shape: &str) -> f32 {
        d.face().weight(shape).expect("shape present")
    }

    fn assert_facial_baseline(d: &AvatarDriver<MorphTable, impl SpeechEngine>, emotion: Emotion) {
        let overlay = emotion.overlay();
        for shape in facial_shapes() {
            assert_eq!(
                weight(d, shape),
                overlay.baseline(shape),
                "{shape} not at {emotion} baseline"
            );
        }
    }

    /// Speech engine that never reports completion on its own.
    #[derive(Default)]
    struct EndlessEngine;

    impl SpeechEngine for EndlessEngine {
        fn is_available(&self) -> bool {
            true
        }

        fn speak(&mut self, _request: &SpeechRequest, _now: Instant) -> Result<(), SpeechError> {
            Ok(())
        }

        fn cancel(&mut self) {}

        fn poll_finished(&mut self, _now: Instant) -> bool {
            false
        }
    }

    #[test]
    fn hi_animates_open_then_smile() {
        let t0 = Instant::now();
        let mut d = driver(t0);

        assert_eq!(d.submit("hi", Emotion::Neutral, t0), PlaybackState::Speaking);
        assert_eq!(d.timeline().total_ms, 200);
        // two entries, two events each, plus finish
        assert_eq!(d.pending_speech_timers(), 5);
        assert_eq!(d.speech().started(), 1);

        d.tick(t0);
        let open = weight(&d, "mouthOpen");
        assert!((MIN_VISEME_INTENSITY..=MAX_VISEME_INTENSITY).contains(&open));
        assert!((weight(&d, JAW_OPEN) - open * JAW_FACTOR).abs() < 1e-6);

        d.tick(t0 + ms(100));
        let smile = weight(&d, "mouthSmile");
        assert!((MIN_VISEME_INTENSITY..=MAX_VISEME_INTENSITY).contains(&smile));
        assert_eq!(weight(&d, "mouthOpen"), 0.0);
        assert_eq!(weight(&d, JAW_OPEN), 0.0);
        assert_eq!(d.state(), PlaybackState::Speaking);

        d.tick(t0 + ms(200));
        assert_eq!(d.state(), PlaybackState::Idle);
        assert_eq!(d.pending_speech_timers(), 0);
        assert_facial_baseline(&d, Emotion::Neutral);
    }

    #[test]
    fn release_restores_overlay_after_last_viseme() {
        let t0 = Instant::now();
        let mut d = AvatarDriver::new(MorphTable::full_face(), EndlessEngine, config(), t0);
        d.submit("hey", Emotion::Sadness, t0);
        let first_end = d.timeline().entries[0].end();
        let total = d.timeline().total();

        d.tick(t0);
        assert!(weight(&d, "mouthOpen") >= MIN_VISEME_INTENSITY);
        assert_eq!(weight(&d, "mouthFrown"), 0.5);

        d.tick(t0 + first_end - ms(1));
        assert!(weight(&d, "mouthOpen") > 0.0);

        d.tick(t0 + first_end);
        assert_eq!(weight(&d, "mouthOpen"), 0.0);
        assert!(weight(&d, "mouthSmile") >= MIN_VISEME_INTENSITY);

        // last release fired, finish is still within its grace period
        d.tick(t0 + total);
        assert_eq!(d.state(), PlaybackState::Speaking);
        assert_facial_baseline(&d, Emotion::Sadness);
    }

    #[test]
    fn overlay_is_a_floor_under_visemes() {
        let t0 = Instant::now();
        let mut d = driver(t0);
        d.submit("ee", Emotion::Joy, t0);
        d.tick(t0);
        assert!(weight(&d, "mouthSmile") >= 0.6);
        assert_eq!(weight(&d, "browInnerUp"), 0.2);
        assert_eq!(weight(&d, JAW_OPEN), 0.0);
    }

    #[test]
    fn finish_timer_ends_speech_after_grace() {
        let t0 = Instant::now();
        let mut d = AvatarDriver::new(MorphTable::full_face(), EndlessEngine, config(), t0);
        d.submit("hi", Emotion::Neutral, t0);

        d.tick(t0 + ms(319));
        assert_eq!(d.state(), PlaybackState::Speaking);
        assert_eq!(d.pending_speech_timers(), 1);

        d.tick(t0 + ms(320));
        assert_eq!(d.state(), PlaybackState::Idle);
        assert_facial_baseline(&d, Emotion::Neutral);
    }

    #[test]
    fn new_utterance_cancels_every_pending_callback() {
        let t0 = Instant::now();
        let mut d = driver(t0);
        d.submit(
            "Welcome everyone to the opening keynote of the spring showcase",
            Emotion::Joy,
            t0,
        );
        let first_total = d.timeline().total();
        d.tick(t0 + ms(50));
        assert_eq!(d.state(), PlaybackState::Speaking);

        let t1 = t0 + ms(60);
        assert_eq!(d.submit("ok", Emotion::Sadness, t1), PlaybackState::Speaking);
        assert_eq!(d.speech().cancelled(), 1);
        assert_eq!(d.speech().started(), 2);
        assert_eq!(d.pending_speech_timers(), 2 * d.timeline().entries.len() + 1);
        assert_facial_baseline(&d, Emotion::Sadness);

        // "ok" finishes at t1 + 200ms; the first utterance would have run far longer
        d.tick(t1 + ms(200));
        assert_eq!(d.state(), PlaybackState::Idle);
        let mut t = t1 + ms(200);
        while t < t0 + first_total + ms(500) {
            d.tick(t);
            assert_facial_baseline(&d, Emotion::Sadness);
            t += ms(10);
        }
        assert_eq!(d.pending_speech_timers(), 0);
    }

    #[test]
    fn engine_end_signal_wins_over_pending_visemes() {
        let t0 = Instant::now();
        let mut d = AvatarDriver::new(MorphTable::full_face(), EndlessEngine, config(), t0);
        d.submit("a much longer sentence", Emotion::Anger, t0);
        d.tick(t0 + ms(30));

        d.on_speech_end();
        assert_eq!(d.state(), PlaybackState::Idle);
        assert_eq!(d.pending_speech_timers(), 0);
        assert_facial_baseline(&d, Emotion::Anger);

        d.on_speech_end();
        assert_eq!(d.state(), PlaybackState::Idle);
        d.tick(t0 + ms(5000));
        assert_facial_baseline(&d, Emotion::Anger);
    }

    #[test]
    fn blank_text_goes_straight_back_to_idle() {
        let t0 = Instant::now();
        let mut d = driver(t0);
        assert_eq!(d.submit("   ", Emotion::Neutral, t0), PlaybackState::Idle);
        assert!(d.timeline().is_empty());
        assert_eq!(d.timeline().total_ms, 0);
        assert_eq!(d.pending_speech_timers(), 0);
        assert_eq!(d.speech().started(), 0);
        for shape in MOUTH_SHAPES {
            assert_eq!(weight(&d, shape), 0.0);
        }
    }

    #[test]
    fn sad_idle_keeps_frown_while_blinking() {
        let t0 = Instant::now();
        let mut d = driver(t0);
        d.submit("", Emotion::Sadness, t0);
        assert_eq!(d.state(), PlaybackState::Idle);

        let mut blink_starts = Vec::new();
        let mut was_closed = false;
        for step in 0..2000u64 {
            let now = t0 + ms(step * 10);
            d.tick(now);
            assert_eq!(weight(&d, "mouthFrown"), 0.5);
            let closed = weight(&d, "eyeBlinkLeft") == 1.0;
            assert_eq!(weight(&d, "eyeBlinkRight"), weight(&d, "eyeBlinkLeft"));
            if closed && !was_closed {
                blink_starts.push(step * 10);
            }
            was_closed = closed;
        }

        assert!(blink_starts.len() >= 2, "blinks at {blink_starts:?}");
        assert!(blink_starts[0] >= 3000 && blink_starts[0] <= 7010);
        for pair in blink_starts.windows(2) {
            let gap = pair[1] - pair[0];
            assert!((2990..=7010).contains(&gap), "gap {gap}ms");
        }
    }

    #[test]
    fn unavailable_engine_stays_silent_but_keeps_baseline() {
        let t0 = Instant::now();
        let mut d = AvatarDriver::new(
            MorphTable::full_face(),
            UnavailableSpeechEngine::new(),
            config(),
            t0,
        );
        assert_eq!(d.submit("hello there", Emotion::Joy, t0), PlaybackState::Idle);
        assert_eq!(d.pending_speech_timers(), 0);
        for step in 0..100 {
            d.tick(t0 + ms(step * 10));
            assert_facial_baseline(&d, Emotion::Joy);
        }
    }

    #[test]
    fn missing_shapes_are_skipped_quietly() {
        let t0 = Instant::now();
        let face = MorphTable::new(EYELID_SHAPES.iter().copied());
        let mut d = AvatarDriver::new(face, SimulatedSpeechEngine::new(), config(), t0);
        d.submit("bob and mom", Emotion::Surprise, t0);
        for step in 0..200 {
            d.tick(t0 + ms(step * 10));
        }
        assert_eq!(d.state(), PlaybackState::Idle);
        assert_eq!(d.face().weight("mouthPucker"), None);
    }

    #[test]
    fn reset_to_baseline_is_idempotent() {
        let t0 = Instant::now();
        let mut d = driver(t0);
        d.submit("amazing", Emotion::Surprise, t0);
        d.tick(t0 + ms(10));
        d.reset_to_baseline();
        let once = d.face().snapshot();
        d.reset_to_baseline();
        assert_eq!(d.face().snapshot(), once);
    }

    #[test]
    fn shutdown_cancels_speech_but_not_blinks() {
        let t0 = Instant::now();
        let mut d = driver(t0);
        d.submit("see you at the next session", Emotion::Joy, t0);
        d.tick(t0 + ms(20));

        d.shutdown();
        assert_eq!(d.state(), PlaybackState::Interrupted);
        assert_eq!(d.pending_speech_timers(), 0);
        assert_eq!(d.speech().cancelled(), 1);
        assert_facial_baseline(&d, Emotion::Joy);

        let mut blinked = false;
        for step in 0..800u64 {
            d.tick(t0 + ms(step * 10));
            blinked |= weight(&d, "eyeBlinkLeft") == 1.0;
            assert_facial_baseline(&d, Emotion::Joy);
        }
        assert!(blinked);
    }

    #[test]
    fn viseme_intensity_stays_in_bounds() {
        let t0 = Instant::now();
        let mut d = AvatarDriver::new(MorphTable::full_face(), EndlessEngine, config(), t0);
        for i in 0..200u64 {
            let now = t0 + ms(i * 1000);
            d.submit("a", Emotion::Neutral, now);
            d.tick(now);
            let w = weight(&d, "mouthOpen");
            assert!((MIN_VISEME_INTENSITY..=MAX_VISEME_INTENSITY).contains(&w), "{w}");
        }
    }

    #[test]
    fn same_seed_same_animation() {
        let t0 = Instant::now();
        let mut a = driver(t0);
        let mut b = driver(t0);
        for d in [&mut a, &mut b] {
            d.submit("deterministic demo", Emotion::Joy, t0);
            for step in 0..50 {
                d.tick(t0 + ms(step * 20));
            }
        }
        assert_eq!(a.face().snapshot(), b.face().snapshot());
    }

    #[test]
    fn head_sways_faster_while_speaking() {
        let t0 = Instant::now();
        let mut d = driver(t0);
        d.tick(t0 + ms(1000));
        let idle = d.face().motion();
        d.submit("a long enough sentence to keep talking", Emotion::Neutral, t0 + ms(1000));
        d.tick(t0 + ms(1000));
        let speaking = d.face().motion();
        assert_eq!(idle.breath_scale, speaking.breath_scale);
        assert_ne!(idle.head_yaw, speaking.head_yaw);
    }

    #[test]
    fn custom_blink_interval_is_respected() {
        let t0 = Instant::now();
        let cfg = DriverConfig {
            blink: BlinkInterval::new(500, 500).expect("valid"),
            ..config()
        };
        let mut d =
            AvatarDriver::new(MorphTable::full_face(), SimulatedSpeechEngine::new(), cfg, t0);
        d.tick(t0 + ms(499));
        assert_eq!(weight(&d, "eyeBlinkLeft"), 0.0);
        d.tick(t0 + ms(500));
        assert_eq!(weight(&d, "eyeBlinkLeft"), 1.0);
    }
}
