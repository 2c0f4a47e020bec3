//! Repetition detectors
//!
//! A rep detector turns a frame plus the activity state into down/up
//! predicates for a [`CycleCounter`]. The down phase always requires the
//! exercise to be active; profiles whose top position can drop the activity
//! signal (a chin over the bar hides the hang geometry) let the up phase
//! through regardless. The counter's cycle rule still demands a confirmed down
//! phase first, and an ungated top only counts while the hands are still at
//! the bar height recorded during the hang, so letting go of the bar and
//! standing up never completes a repetition.

use crate::config::{EngineConfig, HangConfig};
use crate::cycle::CycleCounter;
use crate::exercises::{RepProfile, RepSignal};
use crate::geometry::{average_elbow_angle, elbow_angle, hip_mid, knee_mid, shoulder_mid, wrist_mid, AngleJoint};
use crate::side::{wrist_y, SideSelection, SidedMeasure};
use crate::types::{Frame, Joint};

#[derive(Debug, Clone)]
pub enum RepDetector {
    /// Duration-based exercises never count repetitions
    Timed,
    Cycle(CycleRepDetector),
}

impl RepDetector {
    pub fn for_profile(profile: &RepProfile) -> Self {
        match *profile {
            RepProfile::Timed => RepDetector::Timed,
            RepProfile::Cycle {
                signal,
                up_requires_active,
            } => RepDetector::Cycle(CycleRepDetector::new(signal, up_requires_active)),
        }
    }

    pub fn reset(&mut self) {
        if let RepDetector::Cycle(detector) = self {
            detector.reset();
        }
    }

    pub fn current_reps(&self) -> u32 {
        match self {
            RepDetector::Timed => 0,
            RepDetector::Cycle(detector) => detector.current_reps(),
        }
    }

    /// Returns the repetition count and whether a repetition was confirmed now
    pub fn process(&mut self, frame: &Frame, active: bool, now: i64, config: &EngineConfig) -> (u32, bool) {
        match self {
            RepDetector::Timed => (0, false),
            RepDetector::Cycle(detector) => detector.process(frame, active, now, config),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CycleRepDetector {
    signal: RepSignal,
    up_requires_active: bool,
    counter: CycleCounter,
    measure: SidedMeasure,
    /// Wrist height while hanging; hand-over-bar signals only
    bar_y: Option<f32>,
}

impl CycleRepDetector {
    pub fn new(signal: RepSignal, up_requires_active: bool) -> Self {
        let selection = match signal {
            RepSignal::Angle { sides, .. } | RepSignal::Pull { sides, .. } => sides,
            RepSignal::KneeRaise { .. } | RepSignal::Transition { .. } => SideSelection::Average,
        };
        Self {
            signal,
            up_requires_active,
            counter: CycleCounter::new(),
            measure: SidedMeasure::new(selection),
            bar_y: None,
        }
    }

    pub fn reset(&mut self) {
        self.counter.reset();
        self.measure.reset();
        self.bar_y = None;
    }

    pub fn current_reps(&self) -> u32 {
        self.counter.current_reps()
    }

    pub fn process(&mut self, frame: &Frame, active: bool, now: i64, config: &EngineConfig) -> (u32, bool) {
        let (down, up) = self.predicates(frame, active, now, config);
        let is_down = active && down;
        let is_up = (active || !self.up_requires_active) && up;
        self.counter.process(is_down, is_up, now, &config.reps)
    }

    /// Remember where the hands grip while the body visibly hangs below them
    fn track_bar(&mut self, hands: Option<f32>, shoulders: Option<f32>, active: bool, config: &HangConfig) {
        if let (true, Some(hands), Some(shoulders)) = (active, hands, shoulders) {
            if hands < shoulders - config.margin {
                self.bar_y = Some(hands);
            }
        }
    }

    fn on_bar(&self, hands: Option<f32>, config: &HangConfig) -> bool {
        match (hands, self.bar_y) {
            (Some(hands), Some(bar)) => (hands - bar).abs() <= config.bar_tolerance,
            _ => false,
        }
    }

    fn predicates(&mut self, frame: &Frame, active: bool, now: i64, config: &EngineConfig) -> (bool, bool) {
        match self.signal {
            RepSignal::Angle {
                joint,
                down_at_most,
                up_at_least,
                ..
            } => match self.measure.angle(frame, joint, now, &config.side) {
                Some(angle) => (angle <= down_at_most, angle >= up_at_least),
                None => (false, false),
            },
            RepSignal::Pull {
                down_elbow_at_least,
                up_elbow_at_most,
                ..
            } => {
                let side = self.measure.side(frame, AngleJoint::Elbow, now, &config.side);
                let elbow = match side {
                    Some(side) => elbow_angle(frame, side),
                    None => average_elbow_angle(frame),
                };
                let hands = wrist_y(frame, side);
                let shoulders = match side {
                    Some(side) => frame.get(side.shoulder()).map(|s| s.y),
                    None => shoulder_mid(frame).map(|s| s.y),
                };
                self.track_bar(hands, shoulders, active, &config.hang);

                let chin_over_bar = match (frame.get(Joint::Nose), hands) {
                    (Some(nose), Some(bar)) => nose.y < bar,
                    _ => false,
                };
                let down = elbow.is_some_and(|angle| angle >= down_elbow_at_least);
                let up = self.on_bar(hands, &config.hang)
                    && (chin_over_bar || elbow.is_some_and(|angle| angle <= up_elbow_at_most));
                (down, up)
            }
            RepSignal::KneeRaise {
                down_gap_at_least,
                up_gap_at_most,
            } => match (hip_mid(frame), knee_mid(frame)) {
                (Some(hips), Some(knees)) => {
                    let gap = knees.y - hips.y;
                    (gap >= down_gap_at_least, gap <= up_gap_at_most)
                }
                _ => (false, false),
            },
            RepSignal::Transition {
                down_elbow_at_least,
                up_margin,
            } => {
                let shoulders = shoulder_mid(frame).map(|s| s.y);
                let hands = wrist_mid(frame).map(|w| w.y);
                self.track_bar(hands, shoulders, active, &config.hang);

                let hanging_below = match (shoulders, hands) {
                    (Some(shoulders), Some(hands)) => hands < shoulders,
                    _ => false,
                };
                let down = hanging_below
                    && average_elbow_angle(frame).is_some_and(|angle| angle >= down_elbow_at_least);
                let up = match (shoulders, hands) {
                    (Some(shoulders), Some(hands)) => {
                        self.on_bar(Some(hands), &config.hang) && shoulders + up_margin < hands
                    }
                    _ => false,
                };
                (down, up)
            }
        }
    }
}
