//! Hang-family activity
//!
//! The hang detector is the prerequisite. Variants with an elbow sub-state
//! layer a second hysteresis on the elbow angle on top of it.

use tracing::debug;

use crate::config::{ElbowGateConfig, EngineConfig};
use crate::cycle::elapsed;
use crate::exercises::{ElbowMode, HangProfile};
use crate::geometry::AngleJoint;
use crate::hang::{Grip, HangDetector};
use crate::side::{SidePreference, SideSelection, SideSignal, SidedMeasure};
use crate::types::Frame;

/// Elbow angle hysteresis with distinct entry and exit thresholds
#[derive(Debug, Clone)]
pub struct ElbowGate {
    mode: ElbowMode,
    active: bool,
    missing_since: Option<i64>,
}

impl ElbowGate {
    pub fn new(mode: ElbowMode) -> Self {
        Self {
            mode,
            active: false,
            missing_since: None,
        }
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.missing_since = None;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn process(&mut self, angle: Option<f32>, now: i64, config: &ElbowGateConfig) -> bool {
        let Some(angle) = angle else {
            if self.active {
                let since = *self.missing_since.get_or_insert(now);
                if elapsed(since, now) > config.missing_angle_grace_ms {
                    debug!(at_ms = now, mode = ?self.mode, "elbow gate closed: angle missing");
                    self.reset();
                }
            }
            return self.active;
        };
        self.missing_since = None;

        let (enters, stays) = match self.mode {
            ElbowMode::Straight => (angle >= config.straight_entry_deg, angle >= config.straight_exit_deg),
            ElbowMode::Bent => (angle <= config.bent_entry_deg, angle <= config.bent_exit_deg),
        };
        let next = if self.active { stays } else { enters };
        if next != self.active {
            debug!(at_ms = now, mode = ?self.mode, angle, open = next, "elbow gate toggled");
            self.active = next;
        }
        self.active
    }
}

#[derive(Debug, Clone)]
pub struct HangActivity {
    hang: HangDetector,
    gate: Option<ElbowGate>,
    measure: SidedMeasure,
}

impl HangActivity {
    pub fn new(profile: HangProfile) -> Self {
        let selection = match profile.grip {
            Grip::TwoHands => SideSelection::Average,
            // The gripping arm is the one with the higher hand
            Grip::OneHand => SideSelection::Tracked {
                signal: SideSignal::WristHeight,
                preference: SidePreference::Lower,
            },
        };
        Self {
            hang: HangDetector::new(profile.grip),
            gate: profile.elbow.map(ElbowGate::new),
            measure: SidedMeasure::new(selection),
        }
    }

    pub fn reset(&mut self) {
        self.hang.reset();
        self.measure.reset();
        if let Some(gate) = self.gate.as_mut() {
            gate.reset();
        }
    }

    pub fn is_hanging(&self) -> bool {
        self.hang.is_hanging()
    }

    pub fn process(&mut self, frame: &Frame, now: i64, config: &EngineConfig) -> bool {
        let update = self.hang.process(frame, now, &config.hang);
        let Some(gate) = self.gate.as_mut() else {
            return update.is_hanging;
        };
        if !update.is_hanging {
            gate.reset();
            return false;
        }
        let angle = self.measure.angle(frame, AngleJoint::Elbow, now, &config.side);
        gate.process(angle, now, &config.elbow_gate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Joint, Side};

    const BAR_Y: f32 = 0.16;
    const SEGMENT: f32 = 0.12;

    /// Two-hand hang from a bar with the given elbow angle
    fn hang_frame(t: i64, elbow_deg: f32) -> Frame {
        let half = (elbow_deg / 2.0).to_radians();
        let shoulder_y = BAR_Y + 2.0 * SEGMENT * half.sin();
        let elbow_y = (shoulder_y + BAR_Y) / 2.0;
        let flare = SEGMENT * half.cos();
        Frame::new(t)
            .with(Joint::LeftShoulder, 0.42, shoulder_y)
            .with(Joint::RightShoulder, 0.58, shoulder_y)
            .with(Joint::LeftElbow, 0.42 - flare, elbow_y)
            .with(Joint::RightElbow, 0.58 + flare, elbow_y)
            .with(Joint::LeftWrist, 0.42, BAR_Y)
            .with(Joint::RightWrist, 0.58, BAR_Y)
    }

    fn without_elbows(mut frame: Frame) -> Frame {
        frame.landmarks.remove(&Side::Left.elbow());
        frame.landmarks.remove(&Side::Right.elbow());
        frame
    }

    fn run(activity: &mut HangActivity, from: i64, to: i64, elbow_deg: f32, cfg: &EngineConfig) -> (bool, i64) {
        let mut t = from;
        let mut active = false;
        while t <= to {
            active = activity.process(&hang_frame(t, elbow_deg), t, cfg);
            t += 33;
        }
        (active, t)
    }

    #[test]
    fn test_dead_hang_elbow_hysteresis() {
        let cfg = EngineConfig::default();
        let mut activity = HangActivity::new(HangProfile {
            grip: Grip::TwoHands,
            elbow: Some(ElbowMode::Straight),
        });

        let (active, t) = run(&mut activity, 0, 500, 178.0, &cfg);
        assert!(active);
        assert!(activity.is_hanging());

        // Between the exit and entry thresholds: stays active
        let (active, t) = run(&mut activity, t, t + 300, 150.0, &cfg);
        assert!(active);

        let (active, t) = run(&mut activity, t, t + 300, 130.0, &cfg);
        assert!(!active);
        assert!(activity.is_hanging());

        // Re-entry needs the stricter threshold
        let (active, t) = run(&mut activity, t, t + 300, 150.0, &cfg);
        assert!(!active);
        let (active, _) = run(&mut activity, t, t + 300, 170.0, &cfg);
        assert!(active);
    }

    #[test]
    fn test_active_hang_needs_bent_arms() {
        let cfg = EngineConfig::default();
        let mut activity = HangActivity::new(HangProfile {
            grip: Grip::TwoHands,
            elbow: Some(ElbowMode::Bent),
        });
        let (active, t) = run(&mut activity, 0, 500, 175.0, &cfg);
        assert!(!active);
        let (active, t) = run(&mut activity, t, t + 300, 120.0, &cfg);
        assert!(active);
        let (active, t) = run(&mut activity, t, t + 300, 150.0, &cfg);
        assert!(active);
        let (active, _) = run(&mut activity, t, t + 300, 165.0, &cfg);
        assert!(!active);
    }

    #[test]
    fn test_missing_elbow_angle_grace() {
        let cfg = EngineConfig::default();
        let mut activity = HangActivity::new(HangProfile {
            grip: Grip::TwoHands,
            elbow: Some(ElbowMode::Straight),
        });
        let (active, start) = run(&mut activity, 0, 500, 178.0, &cfg);
        assert!(active);

        let mut t = start;
        while t <= start + cfg.elbow_gate.missing_angle_grace_ms {
            let frame = without_elbows(hang_frame(t, 178.0));
            assert!(activity.process(&frame, t, &cfg), "gate closed early at {t}");
            t += 50;
        }
        let frame = without_elbows(hang_frame(t + 50, 178.0));
        assert!(!activity.process(&frame, t + 50, &cfg));
    }

    #[test]
    fn test_plain_hang_follows_detector() {
        let cfg = EngineConfig::default();
        let mut activity = HangActivity::new(HangProfile {
            grip: Grip::TwoHands,
            elbow: None,
        });
        // Bent arms are still a hang without an elbow sub-state
        let (active, _) = run(&mut activity, 0, 500, 90.0, &cfg);
        assert!(active);
        activity.reset();
        assert!(!activity.is_hanging());
    }

    #[test]
    fn test_gate_thresholds() {
        let cfg = ElbowGateConfig::default();
        let mut gate = ElbowGate::new(ElbowMode::Straight);
        assert!(!gate.process(Some(155.0), 0, &cfg));
        assert!(gate.process(Some(165.0), 10, &cfg));
        assert!(gate.process(Some(146.0), 20, &cfg));
        assert!(!gate.process(Some(140.0), 30, &cfg));
        // Missing angle while closed stays closed
        assert!(!gate.process(None, 40, &cfg));
        assert!(!gate.is_active());
    }
}
