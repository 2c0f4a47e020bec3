//! Body side selection for unilateral exercises

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SideConfig;
use crate::cycle::elapsed;
use crate::geometry::{AngleJoint, average_sides};
use crate::types::{Frame, Side};

/// Which value of the per-side signal marks the working side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidePreference {
    Lower,
    Higher,
}

impl SidePreference {
    fn best(self, left: f32, right: f32) -> Side {
        let left_wins = match self {
            SidePreference::Lower => left < right,
            SidePreference::Higher => left > right,
        };
        if left_wins {
            Side::Left
        } else {
            Side::Right
        }
    }
}

/// Per-side value the tracker compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideSignal {
    /// The angle of the joint being measured
    JointAngle,
    /// Vertical wrist position (lower value = higher hand)
    WristHeight,
}

impl SideSignal {
    /// Minimum difference between the sides that can justify a switch
    pub fn switch_delta(self, config: &SideConfig) -> f32 {
        match self {
            SideSignal::JointAngle => config.switch_delta,
            SideSignal::WristHeight => config.wrist_switch_delta,
        }
    }
}

/// How a paired joint is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideSelection {
    /// Average of both sides, falling back to the visible one
    Average,
    /// One tracked side, chosen by comparing a per-side signal
    Tracked {
        signal: SideSignal,
        preference: SidePreference,
    },
}

/// Stabilized left/right selection.
///
/// A different side must be the clear winner (by at least the switch delta of
/// the compared signal) for `switch_stable_ms` before the selection changes.
#[derive(Debug, Clone)]
pub struct SideTracker {
    preference: SidePreference,
    current: Option<Side>,
    candidate: Option<(Side, i64)>,
}

impl SideTracker {
    pub fn new(preference: SidePreference) -> Self {
        Self {
            preference,
            current: None,
            candidate: None,
        }
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.candidate = None;
    }

    /// Committed side, if any frame has shown both sides yet
    pub fn current(&self) -> Option<Side> {
        self.current
    }

    /// Side to measure on this frame, comparing joint angles
    pub fn update(&mut self, left: Option<f32>, right: Option<f32>, now: i64, config: &SideConfig) -> Option<Side> {
        self.update_with_delta(left, right, now, config.switch_delta, config)
    }

    /// Side to measure on this frame, with the signal's own switch delta
    pub fn update_with_delta(
        &mut self,
        left: Option<f32>,
        right: Option<f32>,
        now: i64,
        switch_delta: f32,
        config: &SideConfig,
    ) -> Option<Side> {
        let (left, right) = match (left, right) {
            (Some(l), Some(r)) => (l, r),
            (Some(_), None) => return Some(Side::Left),
            (None, Some(_)) => return Some(Side::Right),
            (None, None) => return self.current,
        };

        let Some(current) = self.current else {
            let side = self.preference.best(left, right);
            self.current = Some(side);
            return self.current;
        };

        let proposed = if (left - right).abs() >= switch_delta {
            self.preference.best(left, right)
        } else {
            current
        };

        if proposed == current {
            self.candidate = None;
            return self.current;
        }

        let since = match self.candidate {
            Some((side, since)) if side == proposed => since,
            _ => {
                self.candidate = Some((proposed, now));
                now
            }
        };
        if elapsed(since, now) >= config.switch_stable_ms {
            debug!(at_ms = now, side = ?proposed, "tracked side switched");
            self.current = Some(proposed);
            self.candidate = None;
        }
        self.current
    }
}

/// Applies a [`SideSelection`] frame by frame, owning the tracker it needs
#[derive(Debug, Clone)]
pub struct SidedMeasure {
    selection: SideSelection,
    tracker: Option<SideTracker>,
}

impl SidedMeasure {
    pub fn new(selection: SideSelection) -> Self {
        let tracker = match selection {
            SideSelection::Average => None,
            SideSelection::Tracked { preference, .. } => Some(SideTracker::new(preference)),
        };
        Self { selection, tracker }
    }

    pub fn reset(&mut self) {
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.reset();
        }
    }

    /// Side to measure on this frame; `None` when averaging or nothing is visible
    pub fn side(&mut self, frame: &Frame, joint: AngleJoint, now: i64, config: &SideConfig) -> Option<Side> {
        let SideSelection::Tracked { signal, .. } = self.selection else {
            return None;
        };
        let tracker = self.tracker.as_mut()?;
        let (left, right) = match signal {
            SideSignal::JointAngle => (joint.angle(frame, Side::Left), joint.angle(frame, Side::Right)),
            SideSignal::WristHeight => (
                frame.get(Side::Left.wrist()).map(|w| w.y),
                frame.get(Side::Right.wrist()).map(|w| w.y),
            ),
        };
        tracker.update_with_delta(left, right, now, signal.switch_delta(config), config)
    }

    /// Angle of `joint` per the selection
    pub fn angle(&mut self, frame: &Frame, joint: AngleJoint, now: i64, config: &SideConfig) -> Option<f32> {
        match self.selection {
            SideSelection::Average => joint.average(frame),
            SideSelection::Tracked { .. } => {
                let side = self.side(frame, joint, now, config)?;
                joint.angle(frame, side)
            }
        }
    }
}

/// Vertical wrist position on one side, or averaged when no side is tracked
pub fn wrist_y(frame: &Frame, side: Option<Side>) -> Option<f32> {
    match side {
        Some(side) => frame.get(side.wrist()).map(|w| w.y),
        None => average_sides(
            frame.get(Side::Left.wrist()).map(|w| w.y),
            frame.get(Side::Right.wrist()).map(|w| w.y),
        ),
    }
}
