//! Procedural "alive" motion used while the avatar is not speaking.
//!
//! Four behaviors run together on every idle tick and write disjoint shapes:
//! blinking, eye saccades, breathing (which owns the jaw while idle) and a
//! slow smile/brow micro-expression.

use std::f32::consts::PI;

use rand::{Rng, RngCore};

use crate::{
    config::{AnimationParams, FrameTiming, IntervalConfig},
    BlendShape, WeightMap,
};

/// Horizontal saccade half-range.
const EYE_RANGE_X: f32 = 0.3;
/// Vertical saccade half-range.
const EYE_RANGE_Y: f32 = 0.2;

/// Blink state machine. A blink is either running or not.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BlinkState {
    #[default]
    Idle,
    /// `progress` runs from 0 to 1 over the blink.
    Blinking { progress: f32 },
}

/// Normalised gaze offset. Positive `x` looks to the avatar's left, positive
/// `y` looks up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EyeOffset {
    pub x: f32,
    pub y: f32,
}

/// Mutable phase state of the idle generator.
#[derive(Debug, Clone, PartialEq)]
pub struct IdlePhaseState {
    pub blink: BlinkState,
    /// Scene time the last blink started.
    pub last_blink_time: f32,
    /// Interval until the next blink, redrawn per blink when randomized.
    pub blink_interval: f32,
    pub eye_target: EyeOffset,
    pub eye_current: EyeOffset,
    pub last_eye_move_time: f32,
    pub eye_move_interval: f32,
    pub breath_phase: f32,
    pub micro_expression_phase: f32,
}

impl IdlePhaseState {
    /// Resting state: eyes centred, no blink in progress, phases at zero.
    pub fn quiescent(params: &AnimationParams) -> Self {
        Self {
            blink: BlinkState::Idle,
            last_blink_time: 0.0,
            blink_interval: params.blink_interval.seconds,
            eye_target: EyeOffset::default(),
            eye_current: EyeOffset::default(),
            last_eye_move_time: 0.0,
            eye_move_interval: params.eye_move_interval.seconds,
            breath_phase: 0.0,
            micro_expression_phase: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdleMotion {
    params: AnimationParams,
    state: IdlePhaseState,
    /// Whether the first intervals have been drawn from the random source.
    armed: bool,
}

impl IdleMotion {
    pub fn new(params: AnimationParams) -> Self {
        let state = IdlePhaseState::quiescent(&params);
        Self {
            params,
            state,
            armed: false,
        }
    }

    pub fn state(&self) -> &IdlePhaseState {
        &self.state
    }

    /// Replaces the phase state, e.g. to resume from a known point. The
    /// intervals in `state` are kept as given.
    pub fn set_state(&mut self, state: IdlePhaseState) {
        self.state = state;
        self.armed = true;
    }

    /// Advances every idle behavior by one tick and writes their targets.
    pub fn update(
        &mut self,
        elapsed: f32,
        delta: f32,
        rng: &mut dyn RngCore,
        targets: &mut WeightMap,
    ) {
        if !self.armed {
            self.state.blink_interval = next_interval(&self.params.blink_interval, rng);
            self.state.eye_move_interval = next_interval(&self.params.eye_move_interval, rng);
            self.armed = true;
        }

        let timing = self.params.frame_timing;
        self.update_blink(elapsed, delta, timing, rng, targets);
        self.update_eyes(elapsed, delta, timing, rng, targets);
        self.update_breath(delta, timing, targets);
        self.update_micro_expressions(delta, timing, targets);
    }

    fn update_blink(
        &mut self,
        elapsed: f32,
        delta: f32,
        timing: FrameTiming,
        rng: &mut dyn RngCore,
        targets: &mut WeightMap,
    ) {
        let state = &mut self.state;

        if state.blink == BlinkState::Idle
            && elapsed - state.last_blink_time > state.blink_interval
        {
            state.blink = BlinkState::Blinking { progress: 0.0 };
            state.last_blink_time = elapsed;
            state.blink_interval = next_interval(&self.params.blink_interval, rng);
            tracing::debug!(elapsed, next = state.blink_interval, "blink started");
        }

        if let BlinkState::Blinking { progress } = state.blink {
            let progress = progress + self.params.blink_speed * timing.tick_scale(delta);

            if progress >= 1.0 {
                state.blink = BlinkState::Idle;
                targets.set(BlendShape::EyeBlinkLeft, 0.0);
                targets.set(BlendShape::EyeBlinkRight, 0.0);
            } else {
                state.blink = BlinkState::Blinking { progress };
                let value = (progress * PI).sin();
                targets.set(BlendShape::EyeBlinkLeft, value);
                targets.set(BlendShape::EyeBlinkRight, value);
            }
        }
    }

    fn update_eyes(
        &mut self,
        elapsed: f32,
        delta: f32,
        timing: FrameTiming,
        rng: &mut dyn RngCore,
        targets: &mut WeightMap,
    ) {
        let state = &mut self.state;

        if elapsed - state.last_eye_move_time > state.eye_move_interval {
            state.eye_target = EyeOffset {
                x: (rng.gen::<f32>() - 0.5) * EYE_RANGE_X,
                y: (rng.gen::<f32>() - 0.5) * EYE_RANGE_Y,
            };
            state.last_eye_move_time = elapsed;
            state.eye_move_interval = next_interval(&self.params.eye_move_interval, rng);
        }

        // first-order lag toward the target, not a spring
        let factor = timing.scale_factor(self.params.eye_move_speed, delta);
        state.eye_current.x += (state.eye_target.x - state.eye_current.x) * factor;
        state.eye_current.y += (state.eye_target.y - state.eye_current.y) * factor;

        write_gaze(state.eye_current, targets);
    }

    fn update_breath(&mut self, delta: f32, timing: FrameTiming, targets: &mut WeightMap) {
        self.state.breath_phase += self.params.breath_speed * timing.tick_scale(delta);
        let breath = self.state.breath_phase.sin() * self.params.breath_intensity;
        targets.set(BlendShape::JawOpen, breath.max(0.0));
    }

    fn update_micro_expressions(
        &mut self,
        delta: f32,
        timing: FrameTiming,
        targets: &mut WeightMap,
    ) {
        self.state.micro_expression_phase +=
            self.params.micro_expression_speed * timing.tick_scale(delta);
        let phase = self.state.micro_expression_phase;

        let smile = ((phase * 0.7).sin() * 0.1 + 0.05).max(0.0);
        targets.set(BlendShape::MouthSmileLeft, smile);
        targets.set(BlendShape::MouthSmileRight, smile);

        let brow = ((phase * 0.3).sin() * 0.05).max(0.0);
        targets.set(BlendShape::BrowInnerUp, brow);
    }
}

/// Splits a gaze offset over the directional look shapes. The pair for the
/// opposite direction of each axis is zeroed.
fn write_gaze(offset: EyeOffset, targets: &mut WeightMap) {
    let (out_left, in_left) = if offset.x > 0.0 {
        (offset.x, 0.0)
    } else {
        (0.0, -offset.x)
    };
    targets.set(BlendShape::EyeLookOutLeft, out_left);
    targets.set(BlendShape::EyeLookInRight, out_left);
    targets.set(BlendShape::EyeLookInLeft, in_left);
    targets.set(BlendShape::EyeLookOutRight, in_left);

    let (up, down) = if offset.y > 0.0 {
        (offset.y, 0.0)
    } else {
        (0.0, -offset.y)
    };
    targets.set(BlendShape::EyeLookUpLeft, up);
    targets.set(BlendShape::EyeLookUpRight, up);
    targets.set(BlendShape::EyeLookDownLeft, down);
    targets.set(BlendShape::EyeLookDownRight, down);
}

fn next_interval(config: &IntervalConfig, rng: &mut dyn RngCore) -> f32 {
    if config.randomize && config.max_seconds > config.min_seconds {
        rng.gen_range(config.min_seconds..=config.max_seconds)
    } else if config.randomize {
        config.min_seconds
    } else {
        config.seconds
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::mock::StepRng;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use super::*;

    fn zero_rng() -> StepRng {
        StepRng::new(0, 0)
    }

    #[test]
    fn blink_cycle_runs_to_completion() {
        let mut idle = IdleMotion::new(AnimationParams::default());
        let mut state = idle.state().clone();
        state.last_blink_time = -100.0;
        idle.set_state(state);

        let mut rng = zero_rng();
        let mut targets = WeightMap::new();

        idle.update(0.0, 1.0 / 60.0, &mut rng, &mut targets);
        assert_eq!(idle.state().blink, BlinkState::Blinking { progress: 0.25 });
        assert_eq!(idle.state().last_blink_time, 0.0);

        let mut last_progress = 0.25;
        for _ in 0..2 {
            idle.update(0.0, 1.0 / 60.0, &mut rng, &mut targets);
            match idle.state().blink {
                BlinkState::Blinking { progress } => {
                    assert!((progress - last_progress - 0.25).abs() < 1e-6);
                    assert!(targets.get(BlendShape::EyeBlinkLeft) > 0.0);
                    last_progress = progress;
                }
                BlinkState::Idle => panic!("blink ended early"),
            }
        }

        idle.update(0.0, 1.0 / 60.0, &mut rng, &mut targets);
        assert_eq!(idle.state().blink, BlinkState::Idle);
        assert_eq!(targets.get(BlendShape::EyeBlinkLeft), 0.0);
        assert_eq!(targets.get(BlendShape::EyeBlinkRight), 0.0);
    }

    #[test]
    fn blink_waits_for_interval() {
        let mut idle = IdleMotion::new(AnimationParams::default());
        let mut rng = zero_rng();
        let mut targets = WeightMap::new();

        idle.update(2.5, 0.016, &mut rng, &mut targets);
        assert_eq!(idle.state().blink, BlinkState::Idle);

        idle.update(2.6, 0.016, &mut rng, &mut targets);
        assert!(matches!(idle.state().blink, BlinkState::Blinking { .. }));
    }

    #[test]
    fn blink_peaks_mid_cycle() {
        let mut targets = WeightMap::new();
        let mut params = AnimationParams::default();
        params.blink_speed = 0.5;
        let mut idle = IdleMotion::new(params);
        let mut rng = zero_rng();

        idle.update(3.0, 0.016, &mut rng, &mut targets);

        assert!((targets.get(BlendShape::EyeBlinkLeft) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn saccade_uses_injected_random_source() {
        let mut idle = IdleMotion::new(AnimationParams::default());
        let mut rng = zero_rng();
        let mut targets = WeightMap::new();

        idle.update(1.5, 0.016, &mut rng, &mut targets);

        let state = idle.state();
        assert_eq!(state.eye_target, EyeOffset { x: -0.15, y: -0.1 });
        assert_eq!(state.last_eye_move_time, 1.5);
        assert!((state.eye_current.x - -0.15 * 0.12).abs() < 1e-6);
        assert!((state.eye_current.y - -0.1 * 0.12).abs() < 1e-6);

        assert!(targets.get(BlendShape::EyeLookInLeft) > 0.0);
        assert_eq!(
            targets.get(BlendShape::EyeLookInLeft),
            targets.get(BlendShape::EyeLookOutRight)
        );
        assert_eq!(targets.get(BlendShape::EyeLookOutLeft), 0.0);
        assert!(targets.get(BlendShape::EyeLookDownLeft) > 0.0);
        assert_eq!(targets.get(BlendShape::EyeLookUpRight), 0.0);
    }

    #[test]
    fn gaze_switches_sides() {
        let mut targets = WeightMap::new();
        write_gaze(EyeOffset { x: -0.1, y: 0.05 }, &mut targets);
        write_gaze(EyeOffset { x: 0.1, y: -0.05 }, &mut targets);

        assert_eq!(targets.get(BlendShape::EyeLookOutLeft), 0.1);
        assert_eq!(targets.get(BlendShape::EyeLookInRight), 0.1);
        assert_eq!(targets.get(BlendShape::EyeLookInLeft), 0.0);
        assert_eq!(targets.get(BlendShape::EyeLookOutRight), 0.0);
        assert_eq!(targets.get(BlendShape::EyeLookDownRight), 0.05);
        assert_eq!(targets.get(BlendShape::EyeLookUpLeft), 0.0);
    }

    #[test]
    fn saccade_targets_stay_in_range() {
        let mut params = AnimationParams::default();
        params.eye_move_interval.seconds = 0.0;
        let mut idle = IdleMotion::new(params);
        let mut rng = Pcg32::seed_from_u64(11);
        let mut targets = WeightMap::new();

        for frame in 1..500 {
            idle.update(frame as f32 * 0.016, 0.016, &mut rng, &mut targets);
            let target = idle.state().eye_target;
            assert!((-0.15..=0.15).contains(&target.x));
            assert!((-0.1..=0.1).contains(&target.y));
        }
    }

    #[test]
    fn breathing_only_opens_the_jaw() {
        let mut idle = IdleMotion::new(AnimationParams::default());
        let mut rng = zero_rng();
        let mut targets = WeightMap::new();

        for frame in 0..200 {
            idle.update(frame as f32 * 0.016, 0.016, &mut rng, &mut targets);
            let jaw = targets.get(BlendShape::JawOpen);
            assert!((0.0..=0.015).contains(&jaw));
        }
        assert!((idle.state().breath_phase - 200.0 * 0.4).abs() < 1e-2);
    }

    #[test]
    fn micro_expressions_follow_phase() {
        let mut idle = IdleMotion::new(AnimationParams::default());
        let mut rng = zero_rng();
        let mut targets = WeightMap::new();

        idle.update(0.0, 0.016, &mut rng, &mut targets);

        let phase = 0.4_f32;
        let smile = (phase * 0.7).sin() * 0.1 + 0.05;
        let brow = (phase * 0.3).sin() * 0.05;
        assert!((targets.get(BlendShape::MouthSmileLeft) - smile).abs() < 1e-6);
        assert_eq!(
            targets.get(BlendShape::MouthSmileLeft),
            targets.get(BlendShape::MouthSmileRight)
        );
        assert!((targets.get(BlendShape::BrowInnerUp) - brow).abs() < 1e-6);
    }

    #[test]
    fn randomized_intervals_stay_within_bounds() {
        let config = IntervalConfig {
            seconds: 2.5,
            min_seconds: 1.5,
            max_seconds: 3.5,
            randomize: true,
        };
        let mut rng = Pcg32::seed_from_u64(3);

        for _ in 0..100 {
            let interval = next_interval(&config, &mut rng);
            assert!((1.5..=3.5).contains(&interval));
        }

        let fixed = IntervalConfig {
            randomize: false,
            ..config
        };
        assert_eq!(next_interval(&fixed, &mut rng), 2.5);
    }

    #[test]
    fn first_intervals_are_drawn_when_randomized() {
        let mut params = AnimationParams::default();
        params.blink_interval = IntervalConfig {
            seconds: 10.0,
            min_seconds: 1.5,
            max_seconds: 3.5,
            randomize: true,
        };
        params.eye_move_interval = IntervalConfig {
            seconds: 10.0,
            min_seconds: 0.5,
            max_seconds: 1.5,
            randomize: true,
        };
        let mut idle = IdleMotion::new(params);
        let mut rng = Pcg32::seed_from_u64(11);
        let mut targets = WeightMap::new();

        idle.update(0.0, 1.0 / 60.0, &mut rng, &mut targets);
        let state = idle.state();
        assert!((1.5..=3.5).contains(&state.blink_interval));
        assert!((0.5..=1.5).contains(&state.eye_move_interval));

        idle.update(3.6, 1.0 / 60.0, &mut rng, &mut targets);
        assert!(matches!(idle.state().blink, BlinkState::Blinking { .. }));
    }

    #[test]
    fn fixed_first_intervals_leave_random_source_untouched() {
        let mut idle = IdleMotion::new(AnimationParams::default());
        let mut rng = Pcg32::seed_from_u64(5);
        let mut reference = Pcg32::seed_from_u64(5);
        let mut targets = WeightMap::new();

        idle.update(0.0, 1.0 / 60.0, &mut rng, &mut targets);

        assert_eq!(idle.state().blink_interval, 2.5);
        assert_eq!(idle.state().eye_move_interval, 1.0);
        assert_eq!(rng.next_u32(), reference.next_u32());
    }
}
