//! Per-frame detectors and the classifiers that debounce them.
//!
//! Three strategies, in priority order:
//! - `landmark`: gaze offset from facial landmarks
//! - `cascade`: face present/absent from a classical detector
//! - `heuristic`: skin-tone ratio and frame-difference motion, no model needed

pub mod cascade;
pub mod gaze;
pub mod heuristic;
pub mod hysteresis;
pub mod landmark;
pub mod providers;

pub use cascade::CascadeStrategy;
pub use gaze::{GazeEstimator, GazeSample};
pub use heuristic::{HeuristicConfig, MotionSkinHeuristic};
pub use hysteresis::{AwayCandidate, HysteresisClassifier, HysteresisConfig, Signal};
pub use landmark::LandmarkStrategy;
pub use providers::{Capabilities, CascadeProvider, FrameSlot, FrameSource, LandmarkProvider};

/// Result of running one strategy over one frame.
#[derive(Debug, Default)]
pub struct FrameOutcome {
    pub candidates: Vec<AwayCandidate>,
    /// Set when the detector failed on this frame. The frame was still fed to
    /// the classifier as a no-signal sample.
    pub error: Option<String>,
}

impl FrameOutcome {
    pub fn from_candidate(candidate: Option<AwayCandidate>) -> Self {
        Self {
            candidates: candidate.into_iter().collect(),
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
