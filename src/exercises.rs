//! Exercise catalog
//!
//! Every exercise is one of three activity archetypes plus a rep signal,
//! described by numeric constants. Adding an exercise means adding a mode and
//! its profile here; the detectors themselves are shared.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;
use crate::geometry::AngleJoint;
use crate::hang::Grip;
use crate::side::{SidePreference, SideSelection, SideSignal};

/// Externally selected exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseMode {
    PullUp,
    ChinUp,
    OneArmPullUp,
    MuscleUp,
    HangingLegRaise,
    DeadHang,
    ActiveHang,
    OneArmHang,
    PushUp,
    BenchPress,
    Dip,
    Squat,
    Lunge,
    HipThrust,
    Plank,
    Handstand,
    MiddleSplit,
    Bridge,
    LSit,
}

/// Reusable detection pattern behind an exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    MotionIdle,
    HangFamily,
    StaticHold,
}

impl Archetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::MotionIdle => "motion_idle",
            Archetype::HangFamily => "hang_family",
            Archetype::StaticHold => "static_hold",
        }
    }
}

/// Coordinate whose drift from its resting baseline signals movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePoint {
    Shoulders,
    Hips,
    Wrists,
}

/// Torso orientation required by the posture gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    Horizontal,
    Upright,
    Any,
}

/// Motion/idle archetype constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    pub joint: AngleJoint,
    pub sides: SideSelection,
    pub reference: ReferencePoint,
    pub posture: Posture,
    /// The baseline only follows the reference while the limb is at least this straight
    pub extended_deg: f32,
    /// Bending the joint to this angle or below counts as activity
    pub activation_deg: f32,
}

/// Elbow sub-state for hang variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElbowMode {
    Straight,
    Bent,
}

/// Hang-family archetype constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HangProfile {
    pub grip: Grip,
    pub elbow: Option<ElbowMode>,
}

/// Static holds with their own geometric gates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldPose {
    Plank,
    Handstand,
    MiddleSplit,
    Bridge,
    LSit,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "archetype")]
pub enum ActivityProfile {
    Motion(MotionProfile),
    Hang(HangProfile),
    Hold { pose: HoldPose },
}

/// Geometric signal feeding the cycle counter's down/up predicates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "signal")]
pub enum RepSignal {
    /// Joint bends for the down phase and extends for the up phase
    Angle {
        joint: AngleJoint,
        sides: SideSelection,
        down_at_most: f32,
        up_at_least: f32,
    },
    /// Straight-arm hang is down; chin over the hands or a deep elbow bend is up
    Pull {
        sides: SideSelection,
        down_elbow_at_least: f32,
        up_elbow_at_most: f32,
    },
    /// Knees hanging below the hips is down; knees raised to hip height is up
    KneeRaise {
        down_gap_at_least: f32,
        up_gap_at_most: f32,
    },
    /// Straight-arm hang is down; shoulders above the hands is up
    Transition {
        down_elbow_at_least: f32,
        up_margin: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RepProfile {
    /// Duration-based exercise, never counts repetitions
    Timed,
    Cycle {
        signal: RepSignal,
        /// Whether the up phase also requires the activity state
        up_requires_active: bool,
    },
}

/// Full description of one exercise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProfile {
    pub activity: ActivityProfile,
    pub reps: RepProfile,
}

const AVERAGE: SideSelection = SideSelection::Average;
const WORKING_KNEE: SideSelection = SideSelection::Tracked {
    signal: SideSignal::JointAngle,
    preference: SidePreference::Lower,
};
const GRIPPING_ARM: SideSelection = SideSelection::Tracked {
    signal: SideSignal::WristHeight,
    preference: SidePreference::Lower,
};

const PULL: RepSignal = RepSignal::Pull {
    sides: AVERAGE,
    down_elbow_at_least: 150.0,
    up_elbow_at_most: 80.0,
};

impl ExerciseMode {
    pub const ALL: [ExerciseMode; 19] = [
        ExerciseMode::PullUp,
        ExerciseMode::ChinUp,
        ExerciseMode::OneArmPullUp,
        ExerciseMode::MuscleUp,
        ExerciseMode::HangingLegRaise,
        ExerciseMode::DeadHang,
        ExerciseMode::ActiveHang,
        ExerciseMode::OneArmHang,
        ExerciseMode::PushUp,
        ExerciseMode::BenchPress,
        ExerciseMode::Dip,
        ExerciseMode::Squat,
        ExerciseMode::Lunge,
        ExerciseMode::HipThrust,
        ExerciseMode::Plank,
        ExerciseMode::Handstand,
        ExerciseMode::MiddleSplit,
        ExerciseMode::Bridge,
        ExerciseMode::LSit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseMode::PullUp => "pull_up",
            ExerciseMode::ChinUp => "chin_up",
            ExerciseMode::OneArmPullUp => "one_arm_pull_up",
            ExerciseMode::MuscleUp => "muscle_up",
            ExerciseMode::HangingLegRaise => "hanging_leg_raise",
            ExerciseMode::DeadHang => "dead_hang",
            ExerciseMode::ActiveHang => "active_hang",
            ExerciseMode::OneArmHang => "one_arm_hang",
            ExerciseMode::PushUp => "push_up",
            ExerciseMode::BenchPress => "bench_press",
            ExerciseMode::Dip => "dip",
            ExerciseMode::Squat => "squat",
            ExerciseMode::Lunge => "lunge",
            ExerciseMode::HipThrust => "hip_thrust",
            ExerciseMode::Plank => "plank",
            ExerciseMode::Handstand => "handstand",
            ExerciseMode::MiddleSplit => "middle_split",
            ExerciseMode::Bridge => "bridge",
            ExerciseMode::LSit => "l_sit",
        }
    }

    pub fn archetype(&self) -> Archetype {
        match self.profile().activity {
            ActivityProfile::Motion(_) => Archetype::MotionIdle,
            ActivityProfile::Hang(_) => Archetype::HangFamily,
            ActivityProfile::Hold { .. } => Archetype::StaticHold,
        }
    }

    /// Whether this exercise counts repetitions (otherwise it is timed)
    pub fn counts_reps(&self) -> bool {
        !matches!(self.profile().reps, RepProfile::Timed)
    }

    pub fn profile(&self) -> ExerciseProfile {
        match self {
            ExerciseMode::PullUp | ExerciseMode::ChinUp => ExerciseProfile {
                activity: hang(Grip::TwoHands, None),
                reps: cycle(PULL, false),
            },
            ExerciseMode::OneArmPullUp => ExerciseProfile {
                activity: hang(Grip::OneHand, None),
                reps: cycle(
                    RepSignal::Pull {
                        sides: GRIPPING_ARM,
                        down_elbow_at_least: 150.0,
                        up_elbow_at_most: 80.0,
                    },
                    false,
                ),
            },
            ExerciseMode::MuscleUp => ExerciseProfile {
                activity: hang(Grip::TwoHands, None),
                reps: cycle(
                    RepSignal::Transition {
                        down_elbow_at_least: 150.0,
                        up_margin: 0.03,
                    },
                    false,
                ),
            },
            ExerciseMode::HangingLegRaise => ExerciseProfile {
                activity: hang(Grip::TwoHands, None),
                reps: cycle(
                    RepSignal::KneeRaise {
                        down_gap_at_least: 0.12,
                        up_gap_at_most: 0.08,
                    },
                    true,
                ),
            },
            ExerciseMode::DeadHang => ExerciseProfile {
                activity: hang(Grip::TwoHands, Some(ElbowMode::Straight)),
                reps: RepProfile::Timed,
            },
            ExerciseMode::ActiveHang => ExerciseProfile {
                activity: hang(Grip::TwoHands, Some(ElbowMode::Bent)),
                reps: RepProfile::Timed,
            },
            ExerciseMode::OneArmHang => ExerciseProfile {
                activity: hang(Grip::OneHand, Some(ElbowMode::Straight)),
                reps: RepProfile::Timed,
            },
            ExerciseMode::PushUp => motion(
                AngleJoint::Elbow,
                AVERAGE,
                ReferencePoint::Shoulders,
                Posture::Horizontal,
                (150.0, 100.0),
                (90.0, 155.0),
            ),
            ExerciseMode::BenchPress => motion(
                AngleJoint::Elbow,
                AVERAGE,
                ReferencePoint::Wrists,
                Posture::Horizontal,
                (150.0, 100.0),
                (95.0, 155.0),
            ),
            ExerciseMode::Dip => motion(
                AngleJoint::Elbow,
                AVERAGE,
                ReferencePoint::Shoulders,
                Posture::Upright,
                (150.0, 100.0),
                (95.0, 155.0),
            ),
            ExerciseMode::Squat => motion(
                AngleJoint::Knee,
                AVERAGE,
                ReferencePoint::Hips,
                Posture::Upright,
                (160.0, 120.0),
                (100.0, 160.0),
            ),
            ExerciseMode::Lunge => motion(
                AngleJoint::Knee,
                WORKING_KNEE,
                ReferencePoint::Hips,
                Posture::Upright,
                (160.0, 120.0),
                (100.0, 160.0),
            ),
            ExerciseMode::HipThrust => motion(
                AngleJoint::Hip,
                AVERAGE,
                ReferencePoint::Hips,
                Posture::Any,
                (160.0, 130.0),
                (130.0, 165.0),
            ),
            ExerciseMode::Plank => hold(HoldPose::Plank),
            ExerciseMode::Handstand => hold(HoldPose::Handstand),
            ExerciseMode::MiddleSplit => hold(HoldPose::MiddleSplit),
            ExerciseMode::Bridge => hold(HoldPose::Bridge),
            ExerciseMode::LSit => hold(HoldPose::LSit),
        }
    }
}

fn hang(grip: Grip, elbow: Option<ElbowMode>) -> ActivityProfile {
    ActivityProfile::Hang(HangProfile { grip, elbow })
}

fn cycle(signal: RepSignal, up_requires_active: bool) -> RepProfile {
    RepProfile::Cycle {
        signal,
        up_requires_active,
    }
}

fn hold(pose: HoldPose) -> ExerciseProfile {
    ExerciseProfile {
        activity: ActivityProfile::Hold { pose },
        reps: RepProfile::Timed,
    }
}

/// Motion/idle exercise whose reps bend and extend the same joint.
///
/// `activity` is (extended_deg, activation_deg), `reps` is (down_at_most, up_at_least).
fn motion(
    joint: AngleJoint,
    sides: SideSelection,
    reference: ReferencePoint,
    posture: Posture,
    activity: (f32, f32),
    reps: (f32, f32),
) -> ExerciseProfile {
    ExerciseProfile {
        activity: ActivityProfile::Motion(MotionProfile {
            joint,
            sides,
            reference,
            posture,
            extended_deg: activity.0,
            activation_deg: activity.1,
        }),
        reps: cycle(
            RepSignal::Angle {
                joint,
                sides,
                down_at_most: reps.0,
                up_at_least: reps.1,
            },
            true,
        ),
    }
}

impl fmt::Display for ExerciseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseMode {
    type Err = EngineError;

    /// Accepts snake_case names as well as "pull-up" / "Pull Up" spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        ExerciseMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| EngineError::UnknownMode(s.to_string()))
    }
}
