mod table;

use serde::{Deserialize, Serialize};

pub use table::MorphTable;

pub const JAW_OPEN: &str = "jawOpen";

/// Shapes driven by visemes and emotion overlays.
pub const MOUTH_SHAPES: &[&str] = &[
    "mouthOpen",
    "mouthSmile",
    "mouthFunnel",
    "mouthPucker",
    "mouthClosed",
    "mouthTense",
    "mouthNarrow",
    "mouthFrown",
    JAW_OPEN,
];

pub const BROW_SHAPES: &[&str] = &["browInnerUp", "browDown", "browOuterUp"];

/// Shapes owned by idle blinking. Disjoint from the facial set, so
/// blinks and speech never write the same slot.
pub const EYELID_SHAPES: &[&str] = &["eyeBlinkLeft", "eyeBlinkRight"];

/// Mouth and brow shapes, the set the speech driver owns.
pub fn facial_shapes() -> impl Iterator<Item = &'static str> {
    MOUTH_SHAPES.iter().chain(BROW_SHAPES.iter()).copied()
}

pub fn is_facial_shape(name: &str) -> bool {
    facial_shapes().any(|s| s == name)
}

/// Whole-head transform for one render frame.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct FrameMotion {
    pub breath_scale: f32,
    pub head_yaw: f32,
    pub head_pitch: f32,
}

impl Default for FrameMotion {
    fn default() -> Self {
        Self {
            breath_scale: 1.0,
            head_yaw: 0.0,
            head_pitch: 0.0,
        }
    }
}

/// A face exposing named morph targets.
///
/// Shape lookup is capability-checked: a name the model does not carry
/// yields `None` and writes to it are dropped.
pub trait Renderable {
    fn morph_slot(&mut self, name: &str) -> Option<&mut f32>;

    fn weight(&self, name: &str) -> Option<f32>;

    fn apply_motion(&mut self, _motion: FrameMotion) {}

    /// Returns whether the shape exists on this model.
    fn set_weight(&mut self, name: &str, weight: f32) -> bool {
        match self.morph_slot(name) {
            Some(slot) => {
                *slot = weight.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    /// Like [`Renderable::set_weight`] but never lowers the current value.
    fn raise_weight(&mut self, name: &str, weight: f32) -> bool {
        match self.morph_slot(name) {
            Some(slot) => {
                *slot = slot.max(weight.clamp(0.0, 1.0));
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lipsync::Viseme;

    #[test]
    fn eyelids_and_facial_shapes_are_disjoint() {
        for eyelid in EYELID_SHAPES {
            assert!(!is_facial_shape(eyelid));
        }
    }

    #[test]
    fn every_viseme_drives_a_mouth_shape() {
        for viseme in Viseme::ALL {
            assert!(MOUTH_SHAPES.contains(&viseme.shape_name()));
        }
    }
}
