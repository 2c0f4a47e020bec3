//! Motion/idle activity
//!
//! Active while the measured joint keeps moving. A frame qualifies when the
//! joint angle jumps by more than the jitter threshold, when the joint is bent
//! past the activation angle, or when the reference coordinate has drifted
//! away from its resting baseline. Activity decays after a quiet period.

use tracing::debug;

use crate::config::{EngineConfig, MotionConfig};
use crate::cycle::elapsed;
use crate::exercises::{MotionProfile, Posture, ReferencePoint};
use crate::geometry::{hip_mid, limb_span, shoulder_mid, torso_orientation, wrist_mid, TorsoOrientation};
use crate::side::SidedMeasure;
use crate::types::Frame;

#[derive(Debug, Clone)]
pub struct MotionActivity {
    profile: MotionProfile,
    measure: SidedMeasure,
    last_angle: Option<f32>,
    /// Resting height of the reference point
    baseline: Option<f32>,
    last_motion_ms: Option<i64>,
    active: bool,
}

impl MotionActivity {
    pub fn new(profile: MotionProfile) -> Self {
        Self {
            profile,
            measure: SidedMeasure::new(profile.sides),
            last_angle: None,
            baseline: None,
            last_motion_ms: None,
            active: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.profile);
    }

    pub fn baseline(&self) -> Option<f32> {
        self.baseline
    }

    pub fn process(&mut self, frame: &Frame, now: i64, config: &EngineConfig) -> bool {
        let motion = &config.motion;

        if !self.posture_ok(frame, motion) {
            self.last_angle = None;
            return self.decay(now, motion);
        }
        let Some(angle) = self.measure.angle(frame, self.profile.joint, now, &config.side) else {
            self.last_angle = None;
            return self.decay(now, motion);
        };

        let jumped = self
            .last_angle
            .is_some_and(|last| (angle - last).abs() >= motion.jitter_deg);
        self.last_angle = Some(angle);

        let bent = angle <= self.profile.activation_deg;

        let reference = reference_y(frame, self.profile.reference);
        let drifted = match (reference, self.baseline) {
            (Some(sample), Some(baseline)) => (sample - baseline).abs() >= motion.baseline_delta,
            _ => false,
        };

        // Only the extended position feeds the resting baseline
        if angle >= self.profile.extended_deg {
            if let Some(sample) = reference {
                let w = motion.baseline_weight;
                self.baseline = Some(match self.baseline {
                    Some(baseline) => baseline * (1.0 - w) + sample * w,
                    None => sample,
                });
            }
        }

        if jumped || bent || drifted {
            if !self.active {
                debug!(at_ms = now, angle, jumped, bent, drifted, "motion activity started");
            }
            self.active = true;
            self.last_motion_ms = Some(now);
            return true;
        }
        self.decay(now, motion)
    }

    fn posture_ok(&self, frame: &Frame, config: &MotionConfig) -> bool {
        let spread = limb_span(frame, self.profile.joint).is_some_and(|span| span >= config.min_limb_span);
        if !spread {
            return false;
        }
        match self.profile.posture {
            Posture::Any => true,
            Posture::Horizontal => torso_orientation(frame) == Some(TorsoOrientation::Horizontal),
            Posture::Upright => torso_orientation(frame) == Some(TorsoOrientation::Upright),
        }
    }

    fn decay(&mut self, now: i64, config: &MotionConfig) -> bool {
        if self.active {
            let quiet = self
                .last_motion_ms
                .map_or(true, |last| elapsed(last, now) >= config.idle_timeout_ms);
            if quiet {
                debug!(at_ms = now, "motion activity went idle");
                self.active = false;
            }
        }
        self.active
    }
}

fn reference_y(frame: &Frame, reference: ReferencePoint) -> Option<f32> {
    let point = match reference {
        ReferencePoint::Shoulders => shoulder_mid(frame),
        ReferencePoint::Hips => hip_mid(frame),
        ReferencePoint::Wrists => wrist_mid(frame),
    };
    point.map(|p| p.y)
}
