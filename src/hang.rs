//! Hang state detection
//!
//! Decides whether the body is hanging from an overhead support. The raw
//! per-frame decision comes from wrist height relative to the shoulders when
//! the arm geometry is reliable; otherwise the prior state is carried through a
//! chain of bounded grace windows. A raw state that differs from the committed
//! one must be stable for `stable_switch_ms`, and flips are spaced by at least
//! `min_toggle_interval_ms`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::HangConfig;
use crate::cycle::elapsed;
use crate::geometry::shoulder_width;
use crate::types::{Frame, Joint, Side};

/// How many hands hold the support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grip {
    TwoHands,
    OneHand,
}

/// Result of one hang detector step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HangUpdate {
    pub is_hanging: bool,
    /// True only on the call where a flip was committed
    pub transitioned: bool,
}

/// Which evidence the raw state was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Evidence {
    Reliable(bool),
    PartialPose,
    ShoulderOnly,
    Missing,
}

#[derive(Debug, Clone)]
pub struct HangDetector {
    grip: Grip,
    is_hanging: bool,
    candidate: Option<(bool, i64)>,
    last_toggle_ms: Option<i64>,
    partial_since: Option<i64>,
    shoulder_only_since: Option<i64>,
    missing_since: Option<i64>,
}

impl HangDetector {
    pub fn new(grip: Grip) -> Self {
        Self {
            grip,
            is_hanging: false,
            candidate: None,
            last_toggle_ms: None,
            partial_since: None,
            shoulder_only_since: None,
            missing_since: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.grip);
    }

    pub fn is_hanging(&self) -> bool {
        self.is_hanging
    }

    pub fn process(&mut self, frame: &Frame, now: i64, config: &HangConfig) -> HangUpdate {
        let raw = self.raw_state(frame, now, config);
        let transitioned = self.commit(raw, now, config);
        HangUpdate {
            is_hanging: self.is_hanging,
            transitioned,
        }
    }

    fn raw_state(&mut self, frame: &Frame, now: i64, config: &HangConfig) -> bool {
        let evidence = self.evidence(frame, config);

        if !matches!(evidence, Evidence::PartialPose) {
            self.partial_since = None;
        }
        if !matches!(evidence, Evidence::ShoulderOnly) {
            self.shoulder_only_since = None;
        }
        if !matches!(evidence, Evidence::Missing) {
            self.missing_since = None;
        }

        match evidence {
            Evidence::Reliable(raw) => raw,
            Evidence::PartialPose => {
                let since = *self.partial_since.get_or_insert(now);
                self.is_hanging && elapsed(since, now) <= config.partial_pose_grace_ms
            }
            Evidence::ShoulderOnly => {
                let since = *self.shoulder_only_since.get_or_insert(now);
                self.is_hanging && elapsed(since, now) <= config.shoulder_only_grace_ms
            }
            Evidence::Missing => {
                let since = *self.missing_since.get_or_insert(now);
                self.is_hanging && elapsed(since, now) <= config.missing_pose_timeout_ms
            }
        }
    }

    fn evidence(&self, frame: &Frame, config: &HangConfig) -> Evidence {
        let shoulders = (frame.get(Joint::LeftShoulder), frame.get(Joint::RightShoulder));

        if let (Some(left), Some(right)) = shoulders {
            let wide_enough = shoulder_width(frame).is_some_and(|w| w >= config.min_shoulder_width);
            if wide_enough {
                let plausible = |side: Side| plausible_wrist_y(frame, side, config);
                match self.grip {
                    Grip::TwoHands => {
                        if let (Some(lw), Some(rw)) = (plausible(Side::Left), plausible(Side::Right)) {
                            let wrist_y = (lw + rw) / 2.0;
                            let shoulder_y = (left.y + right.y) / 2.0;
                            return Evidence::Reliable(wrist_y < shoulder_y - config.margin);
                        }
                    }
                    Grip::OneHand => {
                        let highest = [Side::Left, Side::Right]
                            .into_iter()
                            .filter_map(|side| {
                                let wrist_y = plausible(side)?;
                                let shoulder_y = frame.get(side.shoulder())?.y;
                                Some(shoulder_y - wrist_y)
                            })
                            .reduce(f32::max);
                        if let Some(lift) = highest {
                            return Evidence::Reliable(lift > config.margin);
                        }
                    }
                }
            }

            let arm_visible = [
                Joint::LeftElbow,
                Joint::RightElbow,
                Joint::LeftWrist,
                Joint::RightWrist,
            ]
            .iter()
            .any(|j| frame.has(*j));
            if arm_visible {
                return Evidence::PartialPose;
            }
            return Evidence::ShoulderOnly;
        }

        if shoulders.0.is_some() || shoulders.1.is_some() {
            Evidence::ShoulderOnly
        } else {
            Evidence::Missing
        }
    }

    fn commit(&mut self, raw: bool, now: i64, config: &HangConfig) -> bool {
        if raw == self.is_hanging {
            self.candidate = None;
            return false;
        }

        let since = match self.candidate {
            Some((state, since)) if state == raw => since,
            _ => {
                self.candidate = Some((raw, now));
                now
            }
        };

        let stable = elapsed(since, now) >= config.stable_switch_ms;
        let spaced = self
            .last_toggle_ms
            .map_or(true, |last| elapsed(last, now) >= config.min_toggle_interval_ms);
        if stable && spaced {
            self.is_hanging = raw;
            self.candidate = None;
            self.last_toggle_ms = Some(now);
            debug!(at_ms = now, is_hanging = raw, "hang state committed");
            return true;
        }
        false
    }
}

/// Wrist height on one side if its distance from the shoulder fits the arm
fn plausible_wrist_y(frame: &Frame, side: Side, config: &HangConfig) -> Option<f32> {
    let shoulder = frame.get(side.shoulder())?;
    let wrist = frame.get(side.wrist())?;

    let arm_length = match frame.get(side.elbow()) {
        Some(elbow) => shoulder.distance_to(&elbow) + elbow.distance_to(&wrist),
        None => shoulder_width(frame)? * config.arm_to_shoulder_width_ratio,
    };
    let reach = shoulder.distance_to(&wrist);
    if reach <= arm_length * config.max_reach_ratio {
        Some(wrist.y)
    } else {
        None
    }
}
