use crate::{config::FrameTiming, AnimationParams, WeightMap};

/// Values within this distance of zero or of their target are snapped there.
pub const SNAP_EPSILON: f32 = 0.005;

/// Eases current weights toward their targets.
///
/// The per-tick factor grows with the size of the gap, so large changes
/// catch up quickly while small ones settle gently, capped by the smoothing
/// ceiling. Each shape is filtered independently.
#[derive(Debug, Clone)]
pub struct TargetBlender {
    speed: f32,
    smoothing: f32,
    timing: FrameTiming,
}

impl TargetBlender {
    pub fn new(speed: f32, smoothing: f32, timing: FrameTiming) -> Self {
        Self {
            speed,
            smoothing,
            timing,
        }
    }

    pub fn from_params(params: &AnimationParams) -> Self {
        Self::new(
            params.lip_sync_speed,
            params.lip_sync_smoothing,
            params.frame_timing,
        )
    }

    /// One filter step for a single shape. The result is always in `[0, 1]`.
    pub fn advance(&self, current: f32, target: f32, delta: f32) -> f32 {
        let diff = target - current;
        let factor = (self.speed * (0.5 + diff.abs() * 0.5)).min(self.smoothing);
        let factor = self.timing.scale_factor(factor, delta);

        let mut value = current + diff * factor;
        // only snap to rest on the way down, otherwise small positive targets
        // starting from zero would be pinned there forever
        if diff <= 0.0 && value.abs() < SNAP_EPSILON {
            value = 0.0;
        }
        if (value - target).abs() < SNAP_EPSILON {
            value = target;
        }

        value.clamp(0.0, 1.0)
    }

    /// Advances every shape of `current` toward `target`.
    pub fn advance_all(&self, current: &mut WeightMap, target: &WeightMap, delta: f32) {
        for (shape, goal) in target.iter() {
            let next = self.advance(current.get(shape), goal, delta);
            current.set(shape, next);
        }
    }
}
