//! Geometric feature extraction
//!
//! Joint angles, paired-joint midpoints and simple distances computed from a
//! frame. Every helper returns `None` when a required joint is missing; paired
//! helpers fall back to whichever single side is visible.

use serde::{Deserialize, Serialize};

use crate::types::{Frame, Joint, Landmark, Side};

/// Vectors shorter than this are treated as degenerate
const MIN_VECTOR_LENGTH: f32 = 1e-4;

/// Joint whose flexion angle an exercise measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleJoint {
    /// shoulder - elbow - wrist
    Elbow,
    /// hip - knee - ankle
    Knee,
    /// shoulder - hip - knee
    Hip,
}

impl AngleJoint {
    /// Angle of this joint on one side
    pub fn angle(self, frame: &Frame, side: Side) -> Option<f32> {
        match self {
            AngleJoint::Elbow => elbow_angle(frame, side),
            AngleJoint::Knee => knee_angle(frame, side),
            AngleJoint::Hip => hip_angle(frame, side),
        }
    }

    /// Average of both sides, falling back to the visible one
    pub fn average(self, frame: &Frame) -> Option<f32> {
        average_sides(self.angle(frame, Side::Left), self.angle(frame, Side::Right))
    }

    /// The two joints bounding the measured limb segment next to the vertex
    pub fn span_joints(self, side: Side) -> (Joint, Joint) {
        match self {
            AngleJoint::Elbow => (side.shoulder(), side.elbow()),
            AngleJoint::Knee => (side.hip(), side.knee()),
            AngleJoint::Hip => (side.shoulder(), side.hip()),
        }
    }
}

/// Angle at `b` formed by the points `a` and `c`, in degrees (0-180).
///
/// Uses cos(θ) = (v1 · v2) / (|v1| × |v2|) with the cosine clamped to [-1, 1].
pub fn angle_between(a: Landmark, b: Landmark, c: Landmark) -> Option<f32> {
    let v1 = (a.x - b.x, a.y - b.y);
    let v2 = (c.x - b.x, c.y - b.y);

    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    if mag1 < MIN_VECTOR_LENGTH || mag2 < MIN_VECTOR_LENGTH {
        return None;
    }

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    Some(cos_angle.acos().to_degrees())
}

/// Angle at the middle joint `b`, absent if any of the three joints is missing
pub fn angle_at(frame: &Frame, a: Joint, b: Joint, c: Joint) -> Option<f32> {
    angle_between(frame.get(a)?, frame.get(b)?, frame.get(c)?)
}

pub fn elbow_angle(frame: &Frame, side: Side) -> Option<f32> {
    angle_at(frame, side.shoulder(), side.elbow(), side.wrist())
}

pub fn knee_angle(frame: &Frame, side: Side) -> Option<f32> {
    angle_at(frame, side.hip(), side.knee(), side.ankle())
}

pub fn hip_angle(frame: &Frame, side: Side) -> Option<f32> {
    angle_at(frame, side.shoulder(), side.hip(), side.knee())
}

pub fn average_elbow_angle(frame: &Frame) -> Option<f32> {
    AngleJoint::Elbow.average(frame)
}

pub fn average_knee_angle(frame: &Frame) -> Option<f32> {
    AngleJoint::Knee.average(frame)
}

pub fn average_hip_angle(frame: &Frame) -> Option<f32> {
    AngleJoint::Hip.average(frame)
}

/// Mean of two optional values, or whichever one is present
pub fn average_sides(left: Option<f32>, right: Option<f32>) -> Option<f32> {
    match (left, right) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

/// Midpoint of a joint pair, or the single visible joint
pub fn paired_midpoint(frame: &Frame, left: Joint, right: Joint) -> Option<Landmark> {
    match (frame.get(left), frame.get(right)) {
        (Some(l), Some(r)) => Some(l.midpoint(&r)),
        (Some(p), None) | (None, Some(p)) => Some(p),
        (None, None) => None,
    }
}

pub fn shoulder_mid(frame: &Frame) -> Option<Landmark> {
    paired_midpoint(frame, Joint::LeftShoulder, Joint::RightShoulder)
}

pub fn hip_mid(frame: &Frame) -> Option<Landmark> {
    paired_midpoint(frame, Joint::LeftHip, Joint::RightHip)
}

pub fn wrist_mid(frame: &Frame) -> Option<Landmark> {
    paired_midpoint(frame, Joint::LeftWrist, Joint::RightWrist)
}

pub fn knee_mid(frame: &Frame) -> Option<Landmark> {
    paired_midpoint(frame, Joint::LeftKnee, Joint::RightKnee)
}

pub fn ankle_mid(frame: &Frame) -> Option<Landmark> {
    paired_midpoint(frame, Joint::LeftAnkle, Joint::RightAnkle)
}

/// Horizontal distance between the shoulders; needs both
pub fn shoulder_width(frame: &Frame) -> Option<f32> {
    let left = frame.get(Joint::LeftShoulder)?;
    let right = frame.get(Joint::RightShoulder)?;
    Some((left.x - right.x).abs())
}

/// Straight-line distance between two joints
pub fn distance(frame: &Frame, a: Joint, b: Joint) -> Option<f32> {
    Some(frame.get(a)?.distance_to(&frame.get(b)?))
}

/// Longest visible span of a limb segment across both sides
pub fn limb_span(frame: &Frame, joint: AngleJoint) -> Option<f32> {
    let span = |side: Side| {
        let (a, b) = joint.span_joints(side);
        distance(frame, a, b)
    };
    match (span(Side::Left), span(Side::Right)) {
        (Some(l), Some(r)) => Some(l.max(r)),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

/// Torso orientation classified from the shoulder and hip midpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorsoOrientation {
    Horizontal,
    Upright,
}

pub fn torso_orientation(frame: &Frame) -> Option<TorsoOrientation> {
    let shoulders = shoulder_mid(frame)?;
    let hips = hip_mid(frame)?;
    let dx = (shoulders.x - hips.x).abs();
    let dy = (shoulders.y - hips.y).abs();
    if dx < MIN_VECTOR_LENGTH && dy < MIN_VECTOR_LENGTH {
        return None;
    }
    if dx >= dy {
        Some(TorsoOrientation::Horizontal)
    } else {
        Some(TorsoOrientation::Upright)
    }
}
