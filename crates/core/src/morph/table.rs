use crate::morph::{facial_shapes, FrameMotion, Renderable, EYELID_SHAPES};
use std::collections::BTreeMap;

/// In-memory morph-target table standing in for a loaded avatar mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MorphTable {
    weights: BTreeMap<String, f32>,
    motion: FrameMotion,
}

impl MorphTable {
    pub fn new<I, S>(shape_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            weights: shape_names.into_iter().map(|s| (s.into(), 0.0)).collect(),
            motion: FrameMotion::default(),
        }
    }

    /// A model carrying every mouth, brow and eyelid shape the driver knows.
    pub fn full_face() -> Self {
        Self::new(facial_shapes().chain(EYELID_SHAPES.iter().copied()))
    }

    pub fn has_shape(&self, name: &str) -> bool {
        self.weights.contains_key(name)
    }

    pub fn snapshot(&self) -> BTreeMap<String, f32> {
        self.weights.clone()
    }

    pub fn motion(&self) -> FrameMotion {
        self.motion
    }
}

impl Renderable for MorphTable {
    fn morph_slot(&mut self, name: &str) -> Option<&mut f32> {
        self.weights.get_mut(name)
    }

    fn weight(&self, name: &str) -> Option<f32> {
        self.weights.get(name).copied()
    }

    fn apply_motion(&mut self, motion: FrameMotion) {
        self.motion = motion;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_shapes_are_silently_ignored() {
        let mut table = MorphTable::new(["mouthOpen"]);
        assert!(!table.set_weight("mouthPucker", 0.8));
        assert_eq!(table.weight("mouthPucker"), None);
        assert!(!table.has_shape("mouthPucker"));
    }

    #[test]
    fn writes_are_clamped() {
        let mut table = MorphTable::new(["mouthOpen", "jawOpen"]);
        assert!(table.set_weight("mouthOpen", 1.7));
        assert_eq!(table.weight("mouthOpen"), Some(1.0));
        table.set_weight("jawOpen", -0.3);
        assert_eq!(table.weight("jawOpen"), Some(0.0));
    }

    #[test]
    fn raise_keeps_the_larger_weight() {
        let mut table = MorphTable::new(["mouthFrown"]);
        table.set_weight("mouthFrown", 0.7);
        table.raise_weight("mouthFrown", 0.5);
        assert_eq!(table.weight("mouthFrown"), Some(0.7));
        table.raise_weight("mouthFrown", 0.9);
        assert_eq!(table.weight("mouthFrown"), Some(0.9));
    }

    #[test]
    fn full_face_starts_at_rest() {
        let table = MorphTable::full_face();
        assert!(table.has_shape("eyeBlinkLeft"));
        assert!(table.has_shape("browDown"));
        assert!(table.snapshot().values().all(|w| *w == 0.0));
        assert_eq!(table.motion(), FrameMotion::default());
    }
}
