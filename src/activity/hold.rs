//! Static-hold activity
//!
//! Every frame is classified as MATCH, NO_MATCH or UNKNOWN by a conjunction of
//! geometric gates for the pose. UNKNOWN means a required joint is missing.
//! Image coordinates grow downwards, so "above" is a smaller `y`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::HoldConfig;
use crate::cycle::elapsed;
use crate::exercises::HoldPose;
use crate::geometry::{
    angle_at, angle_between, ankle_mid, average_elbow_angle, average_hip_angle, average_knee_angle, hip_mid,
    shoulder_mid, wrist_mid,
};
use crate::types::{Frame, Joint, Side};

/// Per-frame classification of a static hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldMatch {
    Match,
    NoMatch,
    Unknown,
}

impl HoldMatch {
    fn from_gates(gates: bool) -> Self {
        if gates {
            HoldMatch::Match
        } else {
            HoldMatch::NoMatch
        }
    }
}

/// Classify one frame against a hold pose
pub fn classify(pose: HoldPose, frame: &Frame, config: &HoldConfig) -> HoldMatch {
    let verdict = match pose {
        HoldPose::Plank => plank(frame, config),
        HoldPose::Handstand => handstand(frame, config),
        HoldPose::MiddleSplit => middle_split(frame, config),
        HoldPose::Bridge => bridge(frame, config),
        HoldPose::LSit => l_sit(frame, config),
    };
    verdict.unwrap_or(HoldMatch::Unknown)
}

/// Straight body line, horizontal, supported under the shoulder. Either side
/// may be the visible one.
fn plank(frame: &Frame, config: &HoldConfig) -> Option<HoldMatch> {
    let sides: Vec<bool> = [Side::Left, Side::Right]
        .into_iter()
        .filter_map(|side| plank_side(frame, side, config))
        .collect();
    if sides.is_empty() {
        return None;
    }
    Some(HoldMatch::from_gates(sides.into_iter().any(|ok| ok)))
}

fn plank_side(frame: &Frame, side: Side, config: &HoldConfig) -> Option<bool> {
    let shoulder = frame.get(side.shoulder())?;
    let hip = frame.get(side.hip())?;
    frame.get(side.ankle())?;
    let support = frame.get(side.wrist()).or_else(|| frame.get(side.elbow()))?;
    let body_line = angle_at(frame, side.shoulder(), side.hip(), side.ankle())?;

    let straight = body_line >= config.straight_deg;
    let horizontal = (shoulder.x - hip.x).abs() >= (shoulder.y - hip.y).abs();
    let supported = (support.x - shoulder.x).abs() <= config.support_tolerance && support.y > shoulder.y;
    Some(straight && horizontal && supported)
}

fn handstand(frame: &Frame, config: &HoldConfig) -> Option<HoldMatch> {
    let shoulders = shoulder_mid(frame)?;
    let wrists = wrist_mid(frame)?;
    let hips = hip_mid(frame)?;

    let on_hands = wrists.y > shoulders.y;
    let inverted = hips.y < shoulders.y - config.elevation_margin;
    let legs_up = ankle_mid(frame).map_or(true, |ankles| ankles.y < hips.y);
    let arms_locked = average_elbow_angle(frame).map_or(true, |angle| angle >= config.straight_deg);
    Some(HoldMatch::from_gates(on_hands && inverted && legs_up && arms_locked))
}

fn middle_split(frame: &Frame, config: &HoldConfig) -> Option<HoldMatch> {
    let hips = hip_mid(frame)?;
    let left_knee = frame.get(Joint::LeftKnee)?;
    let right_knee = frame.get(Joint::RightKnee)?;
    let spread = angle_between(left_knee, hips, right_knee)?;

    let wide = spread >= config.split_deg;
    let level = [left_knee, right_knee]
        .iter()
        .all(|knee| (knee.y - hips.y).abs() <= config.support_tolerance);
    let legs_straight = average_knee_angle(frame).map_or(true, |angle| angle >= config.straight_deg);
    Some(HoldMatch::from_gates(wide && level && legs_straight))
}

fn bridge(frame: &Frame, config: &HoldConfig) -> Option<HoldMatch> {
    let shoulders = shoulder_mid(frame)?;
    let hips = hip_mid(frame)?;
    let wrists = wrist_mid(frame)?;
    let ankles = ankle_mid(frame)?;

    let arched = hips.y < shoulders.y - config.elevation_margin;
    let hands_down = wrists.y > shoulders.y;
    let feet_down = ankles.y > hips.y + config.elevation_margin;
    Some(HoldMatch::from_gates(arched && hands_down && feet_down))
}

fn l_sit(frame: &Frame, config: &HoldConfig) -> Option<HoldMatch> {
    let hip_angle = average_hip_angle(frame)?;
    let knee_angle = average_knee_angle(frame)?;
    let shoulders = shoulder_mid(frame)?;
    let hips = hip_mid(frame)?;
    let ankles = ankle_mid(frame)?;
    let wrists = wrist_mid(frame)?;

    let folded = hip_angle <= config.lsit_max_hip_deg;
    let legs_straight = knee_angle >= config.straight_deg;
    let legs_raised = ankles.y <= hips.y + config.elevation_margin;
    let supported = wrists.y > shoulders.y && shoulders.y < hips.y;
    Some(HoldMatch::from_gates(folded && legs_straight && legs_raised && supported))
}

/// Entry/exit hysteresis around [`classify`]
#[derive(Debug, Clone)]
pub struct HoldActivity {
    pose: HoldPose,
    active: bool,
    match_since: Option<i64>,
    no_match_since: Option<i64>,
    unknown_since: Option<i64>,
}

impl HoldActivity {
    pub fn new(pose: HoldPose) -> Self {
        Self {
            pose,
            active: false,
            match_since: None,
            no_match_since: None,
            unknown_since: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.pose);
    }

    pub fn process(&mut self, frame: &Frame, now: i64, config: &HoldConfig) -> bool {
        let verdict = classify(self.pose, frame, config);

        if !self.active {
            if verdict == HoldMatch::Match {
                let since = *self.match_since.get_or_insert(now);
                if elapsed(since, now) >= config.entry_stable_ms {
                    debug!(at_ms = now, pose = ?self.pose, "hold entered");
                    self.active = true;
                    self.match_since = None;
                }
            } else {
                self.match_since = None;
            }
            return self.active;
        }

        match verdict {
            HoldMatch::Match => {
                self.no_match_since = None;
                self.unknown_since = None;
            }
            HoldMatch::NoMatch => {
                self.unknown_since = None;
                let since = *self.no_match_since.get_or_insert(now);
                if elapsed(since, now) >= config.exit_stable_ms {
                    debug!(at_ms = now, pose = ?self.pose, "hold ended");
                    self.reset();
                }
            }
            // Occlusion does not restart a pending exit
            HoldMatch::Unknown => {
                let since = *self.unknown_since.get_or_insert(now);
                if elapsed(since, now) > config.missing_pose_grace_ms {
                    debug!(at_ms = now, pose = ?self.pose, "hold ended: pose lost");
                    self.reset();
                }
            }
        }
        self.active
    }
}
