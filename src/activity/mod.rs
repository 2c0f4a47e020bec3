//! Activity detectors
//!
//! One detector per archetype. Each answers "is the exercise being performed
//! right now" for a single frame, owning all the state it needs.

mod hang;
mod hold;
mod motion;

pub use hang::{ElbowGate, HangActivity};
pub use hold::{classify, HoldActivity, HoldMatch};
pub use motion::MotionActivity;

use crate::config::EngineConfig;
use crate::exercises::ActivityProfile;
use crate::types::Frame;

/// Activity detector for one exercise
#[derive(Debug, Clone)]
pub enum ActivityDetector {
    Motion(MotionActivity),
    Hang(HangActivity),
    Hold(HoldActivity),
}

impl ActivityDetector {
    pub fn for_profile(profile: &ActivityProfile) -> Self {
        match *profile {
            ActivityProfile::Motion(motion) => ActivityDetector::Motion(MotionActivity::new(motion)),
            ActivityProfile::Hang(hang) => ActivityDetector::Hang(HangActivity::new(hang)),
            ActivityProfile::Hold { pose } => ActivityDetector::Hold(HoldActivity::new(pose)),
        }
    }

    pub fn reset(&mut self) {
        match self {
            ActivityDetector::Motion(d) => d.reset(),
            ActivityDetector::Hang(d) => d.reset(),
            ActivityDetector::Hold(d) => d.reset(),
        }
    }

    /// Whether the exercise is active after this frame
    pub fn process(&mut self, frame: &Frame, now: i64, config: &EngineConfig) -> bool {
        match self {
            ActivityDetector::Motion(d) => d.process(frame, now, config),
            ActivityDetector::Hang(d) => d.process(frame, now, config),
            ActivityDetector::Hold(d) => d.process(frame, now, &config.hold),
        }
    }
}
