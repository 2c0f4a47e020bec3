//! Synheart Reps - On-device activity and repetition engine for bodyweight exercises
//!
//! Reps turns a stream of noisy, intermittently missing 2D pose keypoints into
//! two stable outputs per frame: whether the selected exercise is being
//! performed, and a monotonically increasing repetition count with discrete
//! repetition events.
//!
//! ## Modules
//!
//! - **Geometry**: joint angles and midpoints with explicit absence
//! - **State machines**: hang detection, the debounced down/up cycle counter and
//!   body side tracking
//! - **Detectors**: activity detectors for the motion/idle, hang-family and
//!   static-hold archetypes, plus rep detectors built on the cycle counter
//! - **Engine**: mode registry and dispatch, with replay reports and C bindings
//!
//! All timing comes from caller-supplied millisecond timestamps; the engine
//! never reads the clock and performs no I/O.

pub mod activity;
pub mod config;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod exercises;
pub mod geometry;
pub mod hang;
pub mod report;
pub mod reps;
pub mod side;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{EngineConfig, ModeSwitchPolicy};
pub use engine::RepEngine;
pub use error::EngineError;
pub use exercises::{Archetype, ExerciseMode};
pub use report::{replay_frames, ReplayRecorder, ReplayReport};
pub use types::{EngineOutput, Frame, Joint, Landmark, Side};

/// Engine version embedded in replay reports
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for replay reports
pub const PRODUCER_NAME: &str = "synheart-reps";
