//! Rep engine
//!
//! Routes frames to the selected exercise's activity and rep detectors. Every
//! mode owns its own detector pair, so switching modes never disturbs the
//! state of the others.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::activity::ActivityDetector;
use crate::config::{EngineConfig, ModeSwitchPolicy};
use crate::error::EngineError;
use crate::exercises::ExerciseMode;
use crate::reps::RepDetector;
use crate::types::{EngineOutput, Frame};

/// Activity and rep detector for one exercise
#[derive(Debug, Clone)]
struct DetectorPair {
    activity: ActivityDetector,
    reps: RepDetector,
}

impl DetectorPair {
    fn new(mode: ExerciseMode) -> Self {
        let profile = mode.profile();
        Self {
            activity: ActivityDetector::for_profile(&profile.activity),
            reps: RepDetector::for_profile(&profile.reps),
        }
    }

    fn reset(&mut self) {
        self.activity.reset();
        self.reps.reset();
    }
}

/// Stateful engine for one session.
///
/// Not synchronized: callers serialize access to an instance, and independent
/// sessions use independent engines.
#[derive(Debug, Clone)]
pub struct RepEngine {
    config: EngineConfig,
    mode: ExerciseMode,
    pairs: HashMap<ExerciseMode, DetectorPair>,
}

impl RepEngine {
    /// Create an engine with the default configuration
    pub fn new(mode: ExerciseMode) -> Self {
        Self::build(mode, EngineConfig::default())
    }

    /// Create an engine with a validated configuration
    pub fn with_config(mode: ExerciseMode, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(mode, config))
    }

    fn build(mode: ExerciseMode, config: EngineConfig) -> Self {
        let pairs = ExerciseMode::ALL
            .iter()
            .map(|&m| (m, DetectorPair::new(m)))
            .collect();
        Self { config, mode, pairs }
    }

    pub fn mode(&self) -> ExerciseMode {
        self.mode
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn pair_mut(&mut self, mode: ExerciseMode) -> &mut DetectorPair {
        self.pairs.entry(mode).or_insert_with(|| DetectorPair::new(mode))
    }

    /// Feed one frame observed at `now` (milliseconds).
    ///
    /// A frame whose pose is flagged unusable is treated as having no landmarks.
    pub fn process(&mut self, frame: &Frame, now: i64) -> EngineOutput {
        let empty;
        let frame = if frame.pose_usable {
            frame
        } else {
            empty = Frame::empty(frame.timestamp_ms);
            &empty
        };

        let mode = self.mode;
        let pair = self.pairs.entry(mode).or_insert_with(|| DetectorPair::new(mode));
        let active = pair.activity.process(frame, now, &self.config);
        let (reps, rep_event) = pair.reps.process(frame, active, now, &self.config);
        if rep_event {
            info!(mode = %mode, reps, at_ms = now, "repetition");
        }

        EngineOutput {
            mode,
            active,
            reps,
            rep_event,
        }
    }

    /// Select `mode`.
    ///
    /// Reselecting the current mode with `reset` resets only its pair. Switching
    /// to another mode resets the newly selected pair when `reset` is set, or
    /// always under [`ModeSwitchPolicy::ResetOnReturn`]. Other pairs are left as
    /// they are.
    pub fn set_mode(&mut self, mode: ExerciseMode, reset: bool) {
        if mode == self.mode {
            if reset {
                self.reset_current();
            }
            return;
        }

        let reset = reset || self.config.mode_switch == ModeSwitchPolicy::ResetOnReturn;
        info!(from = %self.mode, to = %mode, reset, "exercise mode switched");
        self.mode = mode;
        if reset {
            self.pair_mut(mode).reset();
        }
    }

    /// Reset the selected mode's detectors
    pub fn reset_current(&mut self) {
        debug!(mode = %self.mode, "resetting current detectors");
        let mode = self.mode;
        self.pair_mut(mode).reset();
    }

    /// Swap the configuration; counted repetitions are kept.
    ///
    /// An invalid configuration is rejected and the current one stays in place.
    pub fn set_config(&mut self, config: EngineConfig) -> Result<(), EngineError> {
        config.validate()?;
        self.config = config;
        info!("engine configuration updated");
        Ok(())
    }

    /// Repetitions counted for the selected mode
    pub fn current_reps(&self) -> u32 {
        self.reps_for(self.mode)
    }

    /// Repetitions counted for any mode, selected or not
    pub fn reps_for(&self, mode: ExerciseMode) -> u32 {
        self.pairs.get(&mode).map_or(0, |pair| pair.reps.current_reps())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Joint, Side};
    use pretty_assertions::assert_eq;

    /// Side view of a push-up with the given elbow angle
    fn push_up_frame(t: i64, elbow_deg: f32) -> Frame {
        let half = (elbow_deg / 2.0).to_radians();
        let shoulder_y = 0.75 - 0.2 * half.sin();
        let elbow = (0.3 - 0.1 * half.cos(), (shoulder_y + 0.75) / 2.0);
        let mut frame = Frame::new(t);
        for side in [Side::Left, Side::Right] {
            frame = frame
                .with(side.shoulder(), 0.3, shoulder_y)
                .with(side.elbow(), elbow.0, elbow.1)
                .with(side.wrist(), 0.3, 0.75)
                .with(side.hip(), 0.65, shoulder_y + 0.02);
        }
        frame
    }

    /// Run `count` push-ups at 30 fps starting at `t`; returns the end time and rep events
    fn push_ups(engine: &mut RepEngine, mut t: i64, count: usize) -> (i64, u32) {
        let mut events = 0;
        for _ in 0..count {
            for i in 0..16 {
                let angle = if i < 8 { 175.0 } else { 85.0 };
                events += engine.process(&push_up_frame(t, angle), t).rep_event as u32;
                t += 33;
            }
        }
        for _ in 0..8 {
            events += engine.process(&push_up_frame(t, 175.0), t).rep_event as u32;
            t += 33;
        }
        (t, events)
    }

    #[test]
    fn test_counts_push_ups() {
        let mut engine = RepEngine::new(ExerciseMode::PushUp);
        let (_, events) = push_ups(&mut engine, 0, 4);
        assert_eq!(events, 4);
        assert_eq!(engine.current_reps(), 4);
    }

    #[test]
    fn test_deselected_modes_keep_state() {
        let mut engine = RepEngine::new(ExerciseMode::PushUp);
        let (t, _) = push_ups(&mut engine, 0, 2);

        engine.set_mode(ExerciseMode::Squat, false);
        assert_eq!(engine.mode(), ExerciseMode::Squat);
        assert_eq!(engine.current_reps(), 0);
        assert_eq!(engine.reps_for(ExerciseMode::PushUp), 2);

        // Returning without reset keeps the stale count
        engine.set_mode(ExerciseMode::PushUp, false);
        assert_eq!(engine.current_reps(), 2);
        let (_, events) = push_ups(&mut engine, t + 5000, 1);
        assert_eq!(events, 1);
        assert_eq!(engine.current_reps(), 3);
    }

    #[test]
    fn test_reset_on_return_policy() {
        let config = EngineConfig {
            mode_switch: ModeSwitchPolicy::ResetOnReturn,
            ..EngineConfig::default()
        };
        let mut engine = RepEngine::with_config(ExerciseMode::PushUp, config).unwrap();
        push_ups(&mut engine, 0, 2);

        engine.set_mode(ExerciseMode::Dip, false);
        assert_eq!(engine.reps_for(ExerciseMode::PushUp), 2);
        engine.set_mode(ExerciseMode::PushUp, false);
        assert_eq!(engine.current_reps(), 0);
    }

    #[test]
    fn test_set_mode_reset_flag() {
        let mut engine = RepEngine::new(ExerciseMode::PushUp);
        push_ups(&mut engine, 0, 2);

        // Same mode without reset is a no-op
        engine.set_mode(ExerciseMode::PushUp, false);
        assert_eq!(engine.current_reps(), 2);

        engine.set_mode(ExerciseMode::Squat, true);
        assert_eq!(engine.reps_for(ExerciseMode::PushUp), 2);
        engine.set_mode(ExerciseMode::PushUp, true);
        assert_eq!(engine.current_reps(), 0);

        push_ups(&mut engine, 10_000, 1);
        engine.reset_current();
        assert_eq!(engine.current_reps(), 0);
    }

    #[test]
    fn test_config_hot_swap_keeps_count() {
        let mut engine = RepEngine::new(ExerciseMode::PushUp);
        let (t, _) = push_ups(&mut engine, 0, 2);

        let mut config = engine.config().clone();
        config.reps.stable_ms = 60;
        config.reps.min_rep_interval_ms = 200;
        engine.set_config(config).unwrap();
        assert_eq!(engine.current_reps(), 2);
        assert_eq!(engine.config().reps.stable_ms, 60);

        let (_, events) = push_ups(&mut engine, t, 2);
        assert_eq!(events, 2);
        assert_eq!(engine.current_reps(), 4);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut engine = RepEngine::new(ExerciseMode::PushUp);
        let mut config = EngineConfig::default();
        config.motion.baseline_weight = 1.5;
        assert!(matches!(engine.set_config(config.clone()), Err(EngineError::InvalidConfig(_))));
        assert_eq!(engine.config(), &EngineConfig::default());
        assert!(RepEngine::with_config(ExerciseMode::Squat, config).is_err());
    }

    #[test]
    fn test_unusable_pose_is_an_empty_frame() {
        let mut engine = RepEngine::new(ExerciseMode::Plank);
        let mut frame = Frame::new(0)
            .with(Joint::LeftShoulder, 0.30, 0.50)
            .with(Joint::LeftWrist, 0.30, 0.70)
            .with(Joint::LeftHip, 0.55, 0.52)
            .with(Joint::LeftAnkle, 0.85, 0.54);
        frame.pose_usable = false;
        for i in 0..40_i64 {
            let output = engine.process(&frame, i * 33);
            assert!(!output.active);
        }
    }

    #[test]
    fn test_dead_hang_from_json_frames() {
        let mut engine = RepEngine::new(ExerciseMode::DeadHang);
        let mut outputs = Vec::new();
        for i in 0..20_i64 {
            let t = i * 33;
            let json = format!(
                r#"{{"timestamp_ms":{t},"landmarks":{{
                    "left_shoulder":{{"x":0.42,"y":0.40}},"right_shoulder":{{"x":0.58,"y":0.40}},
                    "left_elbow":{{"x":0.42,"y":0.28}},"right_elbow":{{"x":0.58,"y":0.28}},
                    "left_wrist":{{"x":0.42,"y":0.16}},"right_wrist":{{"x":0.58,"y":0.16}}}}}}"#
            );
            let frame = Frame::from_json(&json).unwrap();
            outputs.push(engine.process(&frame, frame.timestamp_ms));
        }
        assert!(!outputs[0].active);
        let last = outputs[outputs.len() - 1];
        assert_eq!(
            last,
            EngineOutput {
                mode: ExerciseMode::DeadHang,
                active: true,
                reps: 0,
                rep_event: false,
            }
        );
    }

    #[test]
    fn test_engines_are_independent_and_send() {
        fn assert_send<T: Send>() {}
        assert_send::<RepEngine>();

        let mut a = RepEngine::new(ExerciseMode::PushUp);
        let b = RepEngine::new(ExerciseMode::PushUp);
        push_ups(&mut a, 0, 1);
        assert_eq!(a.current_reps(), 1);
        assert_eq!(b.current_reps(), 0);
    }

    const BAR_Y: f32 = 0.16;
    const SEGMENT: f32 = 0.12;

    /// Two-hand grip on the bar with the given elbow angle
    fn pull_frame(t: i64, elbow_deg: f32, nose_y: f32) -> Frame {
        let half = (elbow_deg / 2.0).to_radians();
        let shoulder_y = BAR_Y + 2.0 * SEGMENT * half.sin();
        let elbow_y = (shoulder_y + BAR_Y) / 2.0;
        let flare = SEGMENT * half.cos();
        Frame::new(t)
            .with(Joint::Nose, 0.5, nose_y)
            .with(Joint::LeftShoulder, 0.42, shoulder_y)
            .with(Joint::RightShoulder, 0.58, shoulder_y)
            .with(Joint::LeftElbow, 0.42 - flare, elbow_y)
            .with(Joint::RightElbow, 0.58 + flare, elbow_y)
            .with(Joint::LeftWrist, 0.42, BAR_Y)
            .with(Joint::RightWrist, 0.58, BAR_Y)
    }

    /// Top of a muscle-up: locked out above the bar
    fn support_frame(t: i64) -> Frame {
        Frame::new(t)
            .with(Joint::Nose, 0.5, 0.0)
            .with(Joint::LeftShoulder, 0.42, 0.05)
            .with(Joint::RightShoulder, 0.58, 0.05)
            .with(Joint::LeftElbow, 0.42, 0.105)
            .with(Joint::RightElbow, 0.58, 0.105)
            .with(Joint::LeftWrist, 0.42, BAR_Y)
            .with(Joint::RightWrist, 0.58, BAR_Y)
    }

    /// Standing under the bar, arms down; the left hand sits `left_lift` higher
    fn standing_frame(t: i64, left_lift: f32) -> Frame {
        Frame::new(t)
            .with(Joint::Nose, 0.5, 0.30)
            .with(Joint::LeftShoulder, 0.42, 0.40)
            .with(Joint::RightShoulder, 0.58, 0.40)
            .with(Joint::LeftElbow, 0.42, 0.52)
            .with(Joint::RightElbow, 0.58, 0.52)
            .with(Joint::LeftWrist, 0.42, 0.64 - left_lift)
            .with(Joint::RightWrist, 0.58, 0.64)
    }

    /// One hand on the bar, the free arm hanging straight down
    fn one_arm_frame(t: i64, grip: Side, elbow_deg: f32, nose_y: f32) -> Frame {
        let half = (elbow_deg / 2.0).to_radians();
        let shoulder_y = BAR_Y + 2.0 * SEGMENT * half.sin();
        let elbow_y = (shoulder_y + BAR_Y) / 2.0;
        let flare = SEGMENT * half.cos();
        let (grip_x, free_x, outward) = match grip {
            Side::Left => (0.42, 0.58, -1.0),
            Side::Right => (0.58, 0.42, 1.0),
        };
        let free = grip.opposite();
        Frame::new(t)
            .with(Joint::Nose, 0.5, nose_y)
            .with(grip.shoulder(), grip_x, shoulder_y)
            .with(grip.elbow(), grip_x + outward * flare, elbow_y)
            .with(grip.wrist(), grip_x, BAR_Y)
            .with(free.shoulder(), free_x, shoulder_y)
            .with(free.elbow(), free_x, shoulder_y + SEGMENT)
            .with(free.wrist(), free_x, shoulder_y + 2.0 * SEGMENT)
    }

    /// Feed `count` frames 33 ms apart; returns the next timestamp and rep events
    fn feed(engine: &mut RepEngine, mut t: i64, count: usize, frame: impl Fn(i64) -> Frame) -> (i64, u32) {
        let mut events = 0;
        for _ in 0..count {
            events += engine.process(&frame(t), t).rep_event as u32;
            t += 33;
        }
        (t, events)
    }

    #[test]
    fn test_pull_up_set() {
        for mode in [ExerciseMode::PullUp, ExerciseMode::ChinUp] {
            let mut engine = RepEngine::new(mode);
            let (mut t, mut events) = feed(&mut engine, 0, 20, |t| pull_frame(t, 175.0, 0.35));
            for _ in 0..3 {
                let (next, top) = feed(&mut engine, t, 10, |t| pull_frame(t, 70.0, 0.12));
                let (next, bottom) = feed(&mut engine, next, 10, |t| pull_frame(t, 175.0, 0.35));
                events += top + bottom;
                t = next;
            }
            assert_eq!(events, 3, "{mode}");
            assert_eq!(engine.current_reps(), 3, "{mode}");
        }
    }

    #[test]
    fn test_dropping_off_the_bar_is_not_a_rep() {
        for mode in [ExerciseMode::PullUp, ExerciseMode::ChinUp, ExerciseMode::MuscleUp] {
            let mut engine = RepEngine::new(mode);
            let (t, hang) = feed(&mut engine, 0, 46, |t| pull_frame(t, 178.0, 0.35));
            assert!(engine.process(&pull_frame(t, 178.0, 0.35), t).active, "{mode}");
            let (_, stand) = feed(&mut engine, t + 33, 46, |t| standing_frame(t, 0.0));
            assert_eq!(hang + stand, 0, "{mode}");
            assert_eq!(engine.current_reps(), 0, "{mode}");
        }
    }

    #[test]
    fn test_muscle_up_set_then_dismount() {
        let mut engine = RepEngine::new(ExerciseMode::MuscleUp);
        let mut t = 0;
        let mut events = 0;
        for _ in 0..3 {
            let (next, hang) = feed(&mut engine, t, 20, |t| pull_frame(t, 175.0, 0.35));
            let (next, top) = feed(&mut engine, next, 10, support_frame);
            events += hang + top;
            t = next;
        }
        assert_eq!(events, 3);

        // Back down into the hang, then off the bar
        let (t, hang) = feed(&mut engine, t, 20, |t| pull_frame(t, 175.0, 0.35));
        let (_, stand) = feed(&mut engine, t, 40, |t| standing_frame(t, 0.0));
        assert_eq!(hang + stand, 0);
        assert_eq!(engine.current_reps(), 3);
    }

    #[test]
    fn test_one_arm_pull_up_static_hang_after_standing() {
        let mut engine = RepEngine::new(ExerciseMode::OneArmPullUp);
        // The free hand starts a hair higher than the one that grips
        let (t, standing) = feed(&mut engine, 0, 15, |t| standing_frame(t, 0.001));
        let (_, hang) = feed(&mut engine, t, 300, |t| one_arm_frame(t, Side::Right, 178.0, 0.35));
        assert_eq!(standing + hang, 0);
        assert_eq!(engine.current_reps(), 0);
    }

    #[test]
    fn test_one_arm_pull_up_counts_across_arm_switch() {
        let mut engine = RepEngine::new(ExerciseMode::OneArmPullUp);
        let (mut t, mut events) = feed(&mut engine, 0, 20, |t| one_arm_frame(t, Side::Right, 175.0, 0.35));
        for _ in 0..2 {
            let (next, top) = feed(&mut engine, t, 10, |t| one_arm_frame(t, Side::Right, 70.0, 0.12));
            let (next, bottom) = feed(&mut engine, next, 10, |t| one_arm_frame(t, Side::Right, 175.0, 0.35));
            events += top + bottom;
            t = next;
        }
        assert_eq!(events, 2);

        // Regrip with the left hand
        let (next, settle) = feed(&mut engine, t, 20, |t| one_arm_frame(t, Side::Left, 175.0, 0.35));
        events += settle;
        t = next;
        for _ in 0..2 {
            let (next, top) = feed(&mut engine, t, 10, |t| one_arm_frame(t, Side::Left, 70.0, 0.12));
            let (next, bottom) = feed(&mut engine, next, 10, |t| one_arm_frame(t, Side::Left, 175.0, 0.35));
            events += top + bottom;
            t = next;
        }
        assert_eq!(events, 4);
        assert_eq!(engine.current_reps(), 4);
    }

    #[test]
    fn test_one_arm_hang_follows_gripping_arm() {
        let mut engine = RepEngine::new(ExerciseMode::OneArmHang);
        // Both hands on the bar, the left one a hair higher
        let two_hands = |t: i64| pull_frame(t, 178.0, 0.35).with(Joint::LeftWrist, 0.42, BAR_Y - 0.001);
        let (t, _) = feed(&mut engine, 0, 20, two_hands);
        assert!(engine.process(&two_hands(t), t).active);

        // Left hand lets go and rests on the hip, right arm stays straight
        let one_arm = |t: i64| {
            Frame::new(t)
                .with(Joint::LeftShoulder, 0.42, 0.40)
                .with(Joint::RightShoulder, 0.58, 0.40)
                .with(Joint::LeftElbow, 0.36, 0.52)
                .with(Joint::LeftWrist, 0.44, 0.60)
                .with(Joint::RightElbow, 0.58, 0.28)
                .with(Joint::RightWrist, 0.58, BAR_Y)
        };
        let (t, events) = feed(&mut engine, t + 33, 60, one_arm);
        let last = engine.process(&one_arm(t), t);
        assert!(last.active);
        assert_eq!(events, 0);
        assert_eq!(last.reps, 0);
    }
}
