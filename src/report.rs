//! Replay summaries
//!
//! Runs a recorded frame sequence through an engine and summarizes the
//! outputs: how long the exercise was active and when each repetition landed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cycle::elapsed;
use crate::engine::RepEngine;
use crate::error::EngineError;
use crate::exercises::ExerciseMode;
use crate::types::{EngineOutput, Frame};
use crate::{ENGINE_VERSION, PRODUCER_NAME};

/// Summary of one replayed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    pub session_id: String,
    pub producer: String,
    pub engine_version: String,
    pub computed_at_utc: String,
    pub mode: ExerciseMode,
    pub frames: usize,
    pub active_frames: usize,
    /// Sum of the intervals that started while the exercise was active
    pub active_duration_ms: i64,
    pub total_reps: u32,
    pub rep_timestamps_ms: Vec<i64>,
    pub first_timestamp_ms: Option<i64>,
    pub last_timestamp_ms: Option<i64>,
}

impl ReplayReport {
    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::EncodingError(e.to_string()))
    }
}

/// Accumulates engine outputs into a [`ReplayReport`]
#[derive(Debug, Clone)]
pub struct ReplayRecorder {
    session_id: String,
    mode: ExerciseMode,
    frames: usize,
    active_frames: usize,
    active_duration_ms: i64,
    total_reps: u32,
    rep_timestamps_ms: Vec<i64>,
    first_timestamp_ms: Option<i64>,
    /// Timestamp and activity of the previous output
    last: Option<(i64, bool)>,
}

impl ReplayRecorder {
    /// Start a recording with a fresh session id
    pub fn new(mode: ExerciseMode) -> Self {
        Self::with_session_id(mode, Uuid::new_v4().to_string())
    }

    pub fn with_session_id(mode: ExerciseMode, session_id: String) -> Self {
        Self {
            session_id,
            mode,
            frames: 0,
            active_frames: 0,
            active_duration_ms: 0,
            total_reps: 0,
            rep_timestamps_ms: Vec::new(),
            first_timestamp_ms: None,
            last: None,
        }
    }

    pub fn record(&mut self, now: i64, output: &EngineOutput) {
        self.frames += 1;
        self.first_timestamp_ms.get_or_insert(now);
        if output.active {
            self.active_frames += 1;
        }
        if let Some((prev, was_active)) = self.last {
            if was_active {
                self.active_duration_ms = self.active_duration_ms.saturating_add(elapsed(prev, now));
            }
        }
        if output.rep_event {
            self.rep_timestamps_ms.push(now);
        }
        self.total_reps = output.reps;
        self.last = Some((now, output.active));
    }

    pub fn finish(self) -> ReplayReport {
        ReplayReport {
            session_id: self.session_id,
            producer: PRODUCER_NAME.to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            mode: self.mode,
            frames: self.frames,
            active_frames: self.active_frames,
            active_duration_ms: self.active_duration_ms,
            total_reps: self.total_reps,
            rep_timestamps_ms: self.rep_timestamps_ms,
            first_timestamp_ms: self.first_timestamp_ms,
            last_timestamp_ms: self.last.map(|(t, _)| t),
        }
    }
}

/// Feed `frames` through `engine` using each frame's own timestamp.
///
/// Returns the per-frame outputs and the session summary.
pub fn replay_frames(engine: &mut RepEngine, frames: &[Frame]) -> (Vec<EngineOutput>, ReplayReport) {
    let mut recorder = ReplayRecorder::new(engine.mode());
    let outputs = frames
        .iter()
        .map(|frame| {
            let output = engine.process(frame, frame.timestamp_ms);
            recorder.record(frame.timestamp_ms, &output);
            output
        })
        .collect();
    (outputs, recorder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Joint;
    use pretty_assertions::assert_eq;

    fn output(active: bool, reps: u32, rep_event: bool) -> EngineOutput {
        EngineOutput {
            mode: ExerciseMode::PullUp,
            active,
            reps,
            rep_event,
        }
    }

    #[test]
    fn test_recorder_accumulates() {
        let mut recorder = ReplayRecorder::with_session_id(ExerciseMode::PullUp, "session-1".to_string());
        recorder.record(0, &output(false, 0, false));
        recorder.record(100, &output(true, 0, false));
        recorder.record(200, &output(true, 1, true));
        recorder.record(300, &output(false, 1, false));
        recorder.record(400, &output(false, 1, false));
        let report = recorder.finish();

        assert_eq!(report.session_id, "session-1");
        assert_eq!(report.frames, 5);
        assert_eq!(report.active_frames, 2);
        assert_eq!(report.active_duration_ms, 200);
        assert_eq!(report.total_reps, 1);
        assert_eq!(report.rep_timestamps_ms, vec![200]);
        assert_eq!(report.first_timestamp_ms, Some(0));
        assert_eq!(report.last_timestamp_ms, Some(400));
        assert_eq!(report.engine_version, ENGINE_VERSION);
    }

    #[test]
    fn test_extreme_timestamps_saturate() {
        let mut recorder = ReplayRecorder::new(ExerciseMode::PullUp);
        recorder.record(i64::MIN, &output(true, 0, false));
        recorder.record(i64::MAX, &output(true, 0, false));
        recorder.record(0, &output(true, 0, false));
        recorder.record(i64::MAX, &output(false, 0, false));
        let report = recorder.finish();
        assert_eq!(report.active_duration_ms, i64::MAX);
        assert_eq!(report.frames, 4);
    }

    #[test]
    fn test_replay_leg_raises_from_ndjson() {
        let step = 33;
        let mut lines = Vec::new();
        let mut t = 0_i64;
        for _ in 0..3 {
            for knee_gap in [0.18_f32; 12].into_iter().chain([0.05_f32; 12]) {
                let frame = Frame::new(t)
                    .with(Joint::LeftShoulder, 0.42, 0.40)
                    .with(Joint::RightShoulder, 0.58, 0.40)
                    .with(Joint::LeftElbow, 0.42, 0.28)
                    .with(Joint::RightElbow, 0.58, 0.28)
                    .with(Joint::LeftWrist, 0.42, 0.16)
                    .with(Joint::RightWrist, 0.58, 0.16)
                    .with(Joint::LeftHip, 0.46, 0.70)
                    .with(Joint::RightHip, 0.54, 0.70)
                    .with(Joint::LeftKnee, 0.46, 0.70 + knee_gap)
                    .with(Joint::RightKnee, 0.54, 0.70 + knee_gap);
                lines.push(serde_json::to_string(&frame).unwrap());
                t += step;
            }
        }
        let frames = Frame::parse_ndjson(&lines.join("\n")).unwrap();

        let mut engine = RepEngine::new(ExerciseMode::HangingLegRaise);
        let (outputs, report) = replay_frames(&mut engine, &frames);

        assert_eq!(outputs.len(), frames.len());
        assert_eq!(report.total_reps, 3);
        assert_eq!(report.rep_timestamps_ms.len(), 3);
        assert_eq!(report.mode, ExerciseMode::HangingLegRaise);
        assert!(report.active_duration_ms > 0);

        let json = report.to_json().unwrap();
        let parsed: ReplayReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
