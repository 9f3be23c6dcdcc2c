use crate::config::BlinkInterval;
use crate::morph::{FrameMotion, Renderable, EYELID_SHAPES};
use crate::playback::timers::TimerQueue;
use rand::Rng;
use std::time::{Duration, Instant};

const BREATH_AMPLITUDE: f32 = 0.01;
const BREATH_FREQUENCY: f32 = 1.6;
const PITCH_AMPLITUDE: f32 = 0.02;
const PITCH_FREQUENCY: f32 = 0.7;
const IDLE_YAW_AMPLITUDE: f32 = 0.04;
const IDLE_YAW_FREQUENCY: f32 = 0.5;
const SPEAKING_YAW_AMPLITUDE: f32 = 0.09;
const SPEAKING_YAW_FREQUENCY: f32 = 1.8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlinkAction {
    Close,
    Open,
}

/// Periodic eyelid blinks. Runs for the driver's whole life and only
/// touches [`EYELID_SHAPES`].
#[derive(Debug)]
pub(crate) struct IdleMotion {
    timers: TimerQueue<BlinkAction>,
    interval: BlinkInterval,
    hold: Duration,
}

impl IdleMotion {
    pub(crate) fn new(
        interval: BlinkInterval,
        hold: Duration,
        now: Instant,
        rng: &mut impl Rng,
    ) -> Self {
        let mut idle = Self {
            timers: TimerQueue::new(),
            interval,
            hold,
        };
        idle.schedule_next_blink(now, rng);
        idle
    }

    fn schedule_next_blink(&mut self, from: Instant, rng: &mut impl Rng) {
        let wait = rng.random_range(self.interval.min_ms..=self.interval.max_ms);
        self.timers
            .schedule(from + Duration::from_millis(wait), BlinkAction::Close);
    }

    pub(crate) fn tick(&mut self, face: &mut impl Renderable, now: Instant, rng: &mut impl Rng) {
        while let Some((at, action)) = self.timers.pop_due(now) {
            match action {
                BlinkAction::Close => {
                    set_eyelids(face, 1.0);
                    self.timers.schedule(at + self.hold, BlinkAction::Open);
                    self.schedule_next_blink(at, rng);
                }
                BlinkAction::Open => set_eyelids(face, 0.0),
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }
}

fn set_eyelids(face: &mut impl Renderable, weight: f32) {
    for shape in EYELID_SHAPES {
        face.set_weight(shape, weight);
    }
}

/// Continuous per-frame breathing and head sway; `elapsed` is time since
/// the driver started.
pub fn frame_motion(elapsed: Duration, speaking: bool) -> FrameMotion {
    let t = elapsed.as_secs_f32();
    let (yaw_amplitude, yaw_frequency) = if speaking {
        (SPEAKING_YAW_AMPLITUDE, SPEAKING_YAW_FREQUENCY)
    } else {
        (IDLE_YAW_AMPLITUDE, IDLE_YAW_FREQUENCY)
    };
    FrameMotion {
        breath_scale: 1.0 + BREATH_AMPLITUDE * (t * BREATH_FREQUENCY).sin(),
        head_yaw: yaw_amplitude * (t * yaw_frequency).sin(),
        head_pitch: PITCH_AMPLITUDE * (t * PITCH_FREQUENCY).sin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morph::MorphTable;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn blink_closes_then_reopens_after_hold() {
        let t0 = Instant::now();
        let mut rng = StdRng::seed_from_u64(1);
        let mut face = MorphTable::full_face();
        let mut idle = IdleMotion::new(
            BlinkInterval::default(),
            Duration::from_millis(120),
            t0,
            &mut rng,
        );

        let first = idle.next_deadline().expect("blink scheduled");
        let wait = first - t0;
        assert!(wait >= Duration::from_secs(3) && wait <= Duration::from_secs(7));

        idle.tick(&mut face, first - Duration::from_millis(1), &mut rng);
        assert_eq!(face.weight("eyeBlinkLeft"), Some(0.0));

        idle.tick(&mut face, first, &mut rng);
        assert_eq!(face.weight("eyeBlinkLeft"), Some(1.0));
        assert_eq!(face.weight("eyeBlinkRight"), Some(1.0));

        idle.tick(&mut face, first + Duration::from_millis(119), &mut rng);
        assert_eq!(face.weight("eyeBlinkRight"), Some(1.0));

        idle.tick(&mut face, first + Duration::from_millis(120), &mut rng);
        assert_eq!(face.weight("eyeBlinkLeft"), Some(0.0));
        assert_eq!(face.weight("eyeBlinkRight"), Some(0.0));

        let next = idle.next_deadline().expect("rescheduled");
        let gap = next - first;
        assert!(gap >= Duration::from_secs(3) && gap <= Duration::from_secs(7));
    }

    #[test]
    fn blinking_leaves_facial_shapes_alone() {
        let t0 = Instant::now();
        let mut rng = StdRng::seed_from_u64(2);
        let mut face = MorphTable::full_face();
        face.set_weight("mouthFrown", 0.5);
        let mut idle = IdleMotion::new(
            BlinkInterval::default(),
            Duration::from_millis(120),
            t0,
            &mut rng,
        );
        for step in 0..3000 {
            idle.tick(&mut face, t0 + Duration::from_millis(step * 10), &mut rng);
            assert_eq!(face.weight("mouthFrown"), Some(0.5));
        }
    }

    #[test]
    fn breathing_stays_subtle() {
        for ms in (0..20_000).step_by(37) {
            let m = frame_motion(Duration::from_millis(ms), false);
            assert!((m.breath_scale - 1.0).abs() <= BREATH_AMPLITUDE + f32::EPSILON);
            assert!(m.head_yaw.abs() <= IDLE_YAW_AMPLITUDE + f32::EPSILON);
            assert!(m.head_pitch.abs() <= PITCH_AMPLITUDE + f32::EPSILON);
        }
    }

    #[test]
    fn speaking_sways_wider_than_idle() {
        let peak = |speaking: bool| {
            (0..20_000)
                .step_by(10)
                .map(|ms| frame_motion(Duration::from_millis(ms), speaking).head_yaw.abs())
                .fold(0.0f32, f32::max)
        };
        assert!(peak(true) > IDLE_YAW_AMPLITUDE);
        assert!(peak(false) <= IDLE_YAW_AMPLITUDE + f32::EPSILON);
    }
}
