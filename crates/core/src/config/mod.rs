use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{AvatarError, Result};

/// Top-level configuration structure for an avatar scene.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    pub animation: AnimationParams,
}

impl AvatarConfig {
    /// Parses and validates a JSON document. Missing fields keep their
    /// defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.animation.validate()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Tunable animation constants.
///
/// Speeds are per-tick increments unless [`FrameTiming::Compensated`] is
/// selected; intervals are seconds of scene time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationParams {
    /// Base rate of the target blender.
    pub lip_sync_speed: f32,
    /// Ceiling on the blender's per-tick factor.
    pub lip_sync_smoothing: f32,
    /// Weight written to every shape of the active viseme.
    pub lip_sync_intensity: f32,
    /// Blink progress added per tick.
    pub blink_speed: f32,
    pub blink_interval: IntervalConfig,
    /// Fraction of the remaining gaze offset closed per tick.
    pub eye_move_speed: f32,
    pub eye_move_interval: IntervalConfig,
    pub breath_speed: f32,
    pub breath_intensity: f32,
    pub micro_expression_speed: f32,
    pub frame_timing: FrameTiming,
    /// Seed for the idle random source. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for AnimationParams {
    fn default() -> Self {
        Self {
            lip_sync_speed: 0.02,
            lip_sync_smoothing: 0.08,
            lip_sync_intensity: 0.5,
            blink_speed: 0.25,
            blink_interval: IntervalConfig {
                seconds: 2.5,
                min_seconds: 1.5,
                max_seconds: 3.5,
                randomize: false,
            },
            eye_move_speed: 0.12,
            eye_move_interval: IntervalConfig {
                seconds: 1.0,
                min_seconds: 0.5,
                max_seconds: 1.5,
                randomize: false,
            },
            breath_speed: 0.4,
            breath_intensity: 0.015,
            micro_expression_speed: 0.4,
            frame_timing: FrameTiming::PerTick,
            seed: None,
        }
    }
}

impl AnimationParams {
    /// Rejects values that would stall or invert the generators.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            self.lip_sync_speed,
            self.lip_sync_smoothing,
            self.lip_sync_intensity,
            self.blink_speed,
            self.eye_move_speed,
            self.breath_speed,
            self.breath_intensity,
            self.micro_expression_speed,
        ];
        if rates.iter().any(|rate| !rate.is_finite() || *rate < 0.0) {
            return Err(AvatarError::InvalidInput(
                "animation speeds and intensities must be finite and non-negative",
            ));
        }
        self.blink_interval.validate()?;
        self.eye_move_interval.validate()?;
        if let FrameTiming::Compensated { reference_fps } = self.frame_timing {
            if reference_fps.is_nan() || reference_fps <= 0.0 {
                return Err(AvatarError::InvalidInput("reference_fps must be positive"));
            }
        }
        Ok(())
    }
}

/// Re-arm interval for a periodic idle behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    /// Fixed interval used when `randomize` is off.
    pub seconds: f32,
    pub min_seconds: f32,
    pub max_seconds: f32,
    /// Draw each interval uniformly from `[min_seconds, max_seconds]`.
    pub randomize: bool,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            seconds: 1.0,
            min_seconds: 1.0,
            max_seconds: 1.0,
            randomize: false,
        }
    }
}

impl IntervalConfig {
    pub fn validate(&self) -> Result<()> {
        let bounds = [self.seconds, self.min_seconds, self.max_seconds];
        if bounds.iter().any(|bound| bound.is_nan() || *bound < 0.0) {
            return Err(AvatarError::InvalidInput("intervals must be non-negative"));
        }
        if self.min_seconds > self.max_seconds {
            return Err(AvatarError::InvalidInput("interval min_seconds exceeds max_seconds"));
        }
        Ok(())
    }
}

/// How the blender and idle speeds relate to frame time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FrameTiming {
    /// Constants are applied once per tick regardless of frame duration.
    PerTick,
    /// Constants are tuned for `reference_fps` and rescaled by frame time.
    Compensated { reference_fps: f32 },
}

impl Default for FrameTiming {
    fn default() -> Self {
        FrameTiming::PerTick
    }
}

impl FrameTiming {
    /// Number of reference ticks a frame of `delta` seconds represents.
    pub fn tick_scale(&self, delta: f32) -> f32 {
        match *self {
            FrameTiming::PerTick => 1.0,
            FrameTiming::Compensated { reference_fps } => (delta * reference_fps).max(0.0),
        }
    }

    /// Converts a per-tick exponential factor to this frame's equivalent.
    pub fn scale_factor(&self, factor: f32, delta: f32) -> f32 {
        match *self {
            FrameTiming::PerTick => factor,
            FrameTiming::Compensated { .. } => {
                let factor = factor.clamp(0.0, 1.0);
                1.0 - (1.0 - factor).powf(self.tick_scale(delta))
            }
        }
    }
}
