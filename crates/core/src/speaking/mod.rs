use crate::{BlendShape, WeightMap};

/// Secondary smile and brow motion layered over lip-sync.
///
/// Only touches the smile and brow shapes, so it never competes with the
/// lip-sync driver for a shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeakingMotion;

impl SpeakingMotion {
    pub fn new() -> Self {
        Self
    }

    /// `elapsed` is total scene time, not audio time.
    pub fn update(&self, elapsed: f32, targets: &mut WeightMap) {
        let smile = (elapsed * 2.0).sin() * 0.1 + 0.15;
        targets.set(BlendShape::MouthSmileLeft, smile);
        targets.set(BlendShape::MouthSmileRight, smile);

        let brow = (elapsed * 1.5).sin() * 0.1 + 0.1;
        targets.set(BlendShape::BrowInnerUp, brow);
    }
}
