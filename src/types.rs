//! Core types for the rep engine
//!
//! This module defines the data that flows through every detector: landmarks,
//! frames of landmarks, body sides, and the per-frame engine output.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use crate::error::EngineError;
use crate::exercises::ExerciseMode;

/// Body joint identifiers tracked by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    Nose,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    pub const ALL: [Joint; 13] = [
        Joint::Nose,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];

    /// Joint for a snake_case name, `None` for joints the engine does not track
    pub fn from_name(name: &str) -> Option<Joint> {
        Joint::ALL.iter().copied().find(|joint| joint.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Joint::Nose => "nose",
            Joint::LeftShoulder => "left_shoulder",
            Joint::RightShoulder => "right_shoulder",
            Joint::LeftElbow => "left_elbow",
            Joint::RightElbow => "right_elbow",
            Joint::LeftWrist => "left_wrist",
            Joint::RightWrist => "right_wrist",
            Joint::LeftHip => "left_hip",
            Joint::RightHip => "right_hip",
            Joint::LeftKnee => "left_knee",
            Joint::RightKnee => "right_knee",
            Joint::LeftAnkle => "left_ankle",
            Joint::RightAnkle => "right_ankle",
        }
    }
}

/// Body side for paired joints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn shoulder(self) -> Joint {
        match self {
            Side::Left => Joint::LeftShoulder,
            Side::Right => Joint::RightShoulder,
        }
    }

    pub fn elbow(self) -> Joint {
        match self {
            Side::Left => Joint::LeftElbow,
            Side::Right => Joint::RightElbow,
        }
    }

    pub fn wrist(self) -> Joint {
        match self {
            Side::Left => Joint::LeftWrist,
            Side::Right => Joint::RightWrist,
        }
    }

    pub fn hip(self) -> Joint {
        match self {
            Side::Left => Joint::LeftHip,
            Side::Right => Joint::RightHip,
        }
    }

    pub fn knee(self) -> Joint {
        match self {
            Side::Left => Joint::LeftKnee,
            Side::Right => Joint::RightKnee,
        }
    }

    pub fn ankle(self) -> Joint {
        match self {
            Side::Left => Joint::LeftAnkle,
            Side::Right => Joint::RightAnkle,
        }
    }
}

/// A single 2D landmark, normalized to the visible frame (0-1, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another landmark
    pub fn distance_to(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Point halfway between two landmarks
    pub fn midpoint(&self, other: &Landmark) -> Landmark {
        Landmark::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Immutable snapshot of one analyzed camera frame.
///
/// Only detected joints are present in `landmarks`; absence is never encoded
/// as a sentinel coordinate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Capture time in milliseconds (caller clock)
    #[serde(default)]
    pub timestamp_ms: i64,
    /// Whether enough joints were detected to attempt classification
    #[serde(default = "default_pose_usable")]
    pub pose_usable: bool,
    /// Detected joints
    #[serde(default, deserialize_with = "deserialize_landmarks")]
    pub landmarks: HashMap<Joint, Landmark>,
}

/// Keeps the joints the engine tracks. Extra keypoints from richer pose models,
/// `null` entries and malformed points are treated as not detected.
fn deserialize_landmarks<'de, D>(deserializer: D) -> Result<HashMap<Joint, Landmark>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, value)| {
            let joint = Joint::from_name(&name)?;
            let landmark: Landmark = serde_json::from_value(value).ok()?;
            (landmark.x.is_finite() && landmark.y.is_finite()).then_some((joint, landmark))
        })
        .collect())
}

fn default_pose_usable() -> bool {
    true
}

impl Frame {
    /// Create an empty, usable frame at the given timestamp
    pub fn new(timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            pose_usable: true,
            landmarks: HashMap::new(),
        }
    }

    /// Frame with no landmarks, as produced when pose estimation fails
    pub fn empty(timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            pose_usable: false,
            landmarks: HashMap::new(),
        }
    }

    /// Builder-style landmark insertion
    pub fn with(mut self, joint: Joint, x: f32, y: f32) -> Self {
        self.landmarks.insert(joint, Landmark::new(x, y));
        self
    }

    /// Look up a joint, absent when it was not detected
    pub fn get(&self, joint: Joint) -> Option<Landmark> {
        self.landmarks.get(&joint).copied()
    }

    pub fn has(&self, joint: Joint) -> bool {
        self.landmarks.contains_key(&joint)
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Parse a frame from JSON
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse newline-delimited JSON frames, skipping blank lines
    pub fn parse_ndjson(input: &str) -> Result<Vec<Self>, EngineError> {
        let mut frames = Vec::new();
        for (line_no, line) in input.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let frame: Frame = serde_json::from_str(trimmed).map_err(|e| {
                EngineError::ParseError(format!("line {}: {}", line_no + 1, e))
            })?;
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Parse a JSON array of frames
    pub fn parse_array(input: &str) -> Result<Vec<Self>, EngineError> {
        Ok(serde_json::from_str(input)?)
    }
}

/// Result of one engine step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOutput {
    /// Mode that handled the frame
    pub mode: ExerciseMode,
    /// Whether the exercise is currently being performed (or the hold is on)
    pub active: bool,
    /// Repetitions counted so far by this mode's detector
    pub reps: u32,
    /// True only on the call where a repetition was confirmed
    pub rep_event: bool,
}
