//! Tunable engine configuration
//!
//! All margins, angle thresholds and timing windows live here. The engine
//! passes the current configuration into every `process` call, so a new
//! configuration takes effect on the next frame without touching counted
//! repetitions.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Hang detector tuning (coordinates are normalized frame units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HangConfig {
    /// Wrists must be this far above the shoulder line to count as hanging
    pub margin: f32,
    /// Narrower shoulders are treated as unreliable geometry
    pub min_shoulder_width: f32,
    /// Wrist-shoulder distance may exceed the arm length by this factor
    pub max_reach_ratio: f32,
    /// Arm length estimate from shoulder width when an elbow is missing
    pub arm_to_shoulder_width_ratio: f32,
    /// Raw state must hold this long before a flip commits
    pub stable_switch_ms: i64,
    /// Minimum spacing between two committed flips
    pub min_toggle_interval_ms: i64,
    /// Hold the prior state while only shoulders plus an elbow or wrist are visible
    pub partial_pose_grace_ms: i64,
    /// Hold the prior state while only shoulders are visible
    pub shoulder_only_grace_ms: i64,
    /// Hold the prior state while nothing usable is visible
    pub missing_pose_timeout_ms: i64,
    /// Hands may drift this far from the bar height seen while hanging and
    /// still count as gripping it
    pub bar_tolerance: f32,
}

impl Default for HangConfig {
    fn default() -> Self {
        Self {
            margin: 0.02,
            min_shoulder_width: 0.04,
            max_reach_ratio: 1.3,
            arm_to_shoulder_width_ratio: 2.5,
            stable_switch_ms: 150,
            min_toggle_interval_ms: 400,
            partial_pose_grace_ms: 2500,
            shoulder_only_grace_ms: 1500,
            missing_pose_timeout_ms: 1000,
            bar_tolerance: 0.08,
        }
    }
}

/// Elbow-angle hysteresis for hang variants (dead hang / active hang)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElbowGateConfig {
    /// Straight-arm hang starts at or above this angle
    pub straight_entry_deg: f32,
    /// Straight-arm hang ends below this angle
    pub straight_exit_deg: f32,
    /// Bent-arm hang starts at or below this angle
    pub bent_entry_deg: f32,
    /// Bent-arm hang ends above this angle
    pub bent_exit_deg: f32,
    /// Tolerated run of frames without an elbow angle
    pub missing_angle_grace_ms: i64,
}

impl Default for ElbowGateConfig {
    fn default() -> Self {
        Self {
            straight_entry_deg: 160.0,
            straight_exit_deg: 145.0,
            bent_entry_deg: 140.0,
            bent_exit_deg: 155.0,
            missing_angle_grace_ms: 500,
        }
    }
}

/// Motion/idle activity tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Activity decays after this long without a qualifying frame
    pub idle_timeout_ms: i64,
    /// Frame-to-frame angle change that counts as movement
    pub jitter_deg: f32,
    /// Exponential blend weight of the resting baseline
    pub baseline_weight: f32,
    /// Drift of the reference coordinate from baseline that counts as movement
    pub baseline_delta: f32,
    /// Shorter measured limb segments fail the posture gate
    pub min_limb_span: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 2500,
            jitter_deg: 6.0,
            baseline_weight: 0.1,
            baseline_delta: 0.04,
            min_limb_span: 0.05,
        }
    }
}

/// Static-hold tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldConfig {
    /// MATCH must persist this long to start a hold
    pub entry_stable_ms: i64,
    /// NO_MATCH must persist this long to end a hold
    pub exit_stable_ms: i64,
    /// UNKNOWN frames are tolerated this long during a hold
    pub missing_pose_grace_ms: i64,
    /// Max horizontal offset of wrists (or elbows) from the shoulders
    pub support_tolerance: f32,
    /// Vertical margin for "above"/"below" comparisons
    pub elevation_margin: f32,
    /// Minimum angle for a joint to count as straight
    pub straight_deg: f32,
    /// Minimum angle between the thighs for a middle split
    pub split_deg: f32,
    /// Maximum hip angle for an L-sit (legs raised in front)
    pub lsit_max_hip_deg: f32,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            entry_stable_ms: 500,
            exit_stable_ms: 800,
            missing_pose_grace_ms: 1000,
            support_tolerance: 0.12,
            elevation_margin: 0.03,
            straight_deg: 150.0,
            split_deg: 140.0,
            lsit_max_hip_deg: 120.0,
        }
    }
}

/// Cycle counter timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepTiming {
    /// Dwell required for both the down and the up phase
    pub stable_ms: i64,
    /// Cooldown between two counted repetitions
    pub min_rep_interval_ms: i64,
}

impl Default for RepTiming {
    fn default() -> Self {
        Self {
            stable_ms: 100,
            min_rep_interval_ms: 400,
        }
    }
}

/// Side tracker tuning for unilateral exercises
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideConfig {
    /// Angles (degrees) closer than this keep the current selection
    pub switch_delta: f32,
    /// Wrist heights (frame units) closer than this keep the current selection
    pub wrist_switch_delta: f32,
    /// A new best side must stay best this long before switching
    pub switch_stable_ms: i64,
}

impl Default for SideConfig {
    fn default() -> Self {
        Self {
            switch_delta: 8.0,
            wrist_switch_delta: 0.05,
            switch_stable_ms: 400,
        }
    }
}

/// What happens to a mode's counters when the user switches back to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSwitchPolicy {
    /// Counters of a reselected mode are kept unless a reset is requested
    #[default]
    Retain,
    /// Switching to a different mode always starts it from zero
    ResetOnReturn,
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub hang: HangConfig,
    pub elbow_gate: ElbowGateConfig,
    pub motion: MotionConfig,
    pub hold: HoldConfig,
    pub reps: RepTiming,
    pub side: SideConfig,
    pub mode_switch: ModeSwitchPolicy,
}

impl EngineConfig {
    /// Load a configuration from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::EncodingError(e.to_string()))
    }

    /// Reject values that would make the state machines meaningless
    pub fn validate(&self) -> Result<(), EngineError> {
        let hang = &self.hang;
        check_non_negative("hang.margin", hang.margin)?;
        check_non_negative("hang.min_shoulder_width", hang.min_shoulder_width)?;
        check_positive("hang.max_reach_ratio", hang.max_reach_ratio)?;
        check_positive("hang.arm_to_shoulder_width_ratio", hang.arm_to_shoulder_width_ratio)?;
        check_duration("hang.stable_switch_ms", hang.stable_switch_ms)?;
        check_duration("hang.min_toggle_interval_ms", hang.min_toggle_interval_ms)?;
        check_duration("hang.partial_pose_grace_ms", hang.partial_pose_grace_ms)?;
        check_duration("hang.shoulder_only_grace_ms", hang.shoulder_only_grace_ms)?;
        check_duration("hang.missing_pose_timeout_ms", hang.missing_pose_timeout_ms)?;
        // More evidence of the arms never buys a shorter grace
        if hang.partial_pose_grace_ms < hang.shoulder_only_grace_ms
            || hang.shoulder_only_grace_ms < hang.missing_pose_timeout_ms
        {
            return Err(EngineError::InvalidConfig(
                "hang graces must satisfy partial_pose_grace_ms >= shoulder_only_grace_ms >= missing_pose_timeout_ms"
                    .to_string(),
            ));
        }
        check_non_negative("hang.bar_tolerance", hang.bar_tolerance)?;

        let gate = &self.elbow_gate;
        check_angle("elbow_gate.straight_entry_deg", gate.straight_entry_deg)?;
        check_angle("elbow_gate.straight_exit_deg", gate.straight_exit_deg)?;
        check_angle("elbow_gate.bent_entry_deg", gate.bent_entry_deg)?;
        check_angle("elbow_gate.bent_exit_deg", gate.bent_exit_deg)?;
        if gate.straight_entry_deg < gate.straight_exit_deg {
            return Err(EngineError::InvalidConfig(
                "elbow_gate.straight_entry_deg must be >= straight_exit_deg".to_string(),
            ));
        }
        if gate.bent_entry_deg > gate.bent_exit_deg {
            return Err(EngineError::InvalidConfig(
                "elbow_gate.bent_entry_deg must be <= bent_exit_deg".to_string(),
            ));
        }
        check_duration("elbow_gate.missing_angle_grace_ms", gate.missing_angle_grace_ms)?;

        let motion = &self.motion;
        check_duration("motion.idle_timeout_ms", motion.idle_timeout_ms)?;
        check_non_negative("motion.jitter_deg", motion.jitter_deg)?;
        if !(motion.baseline_weight > 0.0 && motion.baseline_weight <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "motion.baseline_weight must be in (0, 1], got {}",
                motion.baseline_weight
            )));
        }
        check_non_negative("motion.baseline_delta", motion.baseline_delta)?;
        check_non_negative("motion.min_limb_span", motion.min_limb_span)?;

        let hold = &self.hold;
        check_duration("hold.entry_stable_ms", hold.entry_stable_ms)?;
        check_duration("hold.exit_stable_ms", hold.exit_stable_ms)?;
        check_duration("hold.missing_pose_grace_ms", hold.missing_pose_grace_ms)?;
        check_non_negative("hold.support_tolerance", hold.support_tolerance)?;
        check_non_negative("hold.elevation_margin", hold.elevation_margin)?;
        check_angle("hold.straight_deg", hold.straight_deg)?;
        check_angle("hold.split_deg", hold.split_deg)?;
        check_angle("hold.lsit_max_hip_deg", hold.lsit_max_hip_deg)?;

        check_duration("reps.stable_ms", self.reps.stable_ms)?;
        check_duration("reps.min_rep_interval_ms", self.reps.min_rep_interval_ms)?;

        check_non_negative("side.switch_delta", self.side.switch_delta)?;
        check_non_negative("side.wrist_switch_delta", self.side.wrist_switch_delta)?;
        check_duration("side.switch_stable_ms", self.side.switch_stable_ms)?;

        Ok(())
    }
}

fn check_non_negative(name: &str, value: f32) -> Result<(), EngineError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{} must be a finite non-negative number, got {}",
            name, value
        )))
    }
}

fn check_positive(name: &str, value: f32) -> Result<(), EngineError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{} must be a finite positive number, got {}",
            name, value
        )))
    }
}

fn check_angle(name: &str, value: f32) -> Result<(), EngineError> {
    if value.is_finite() && (0.0..=180.0).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{} must be within 0-180 degrees, got {}",
            name, value
        )))
    }
}

fn check_duration(name: &str, value: i64) -> Result<(), EngineError> {
    if value >= 0 {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{} must not be negative, got {}",
            name, value
        )))
    }
}
