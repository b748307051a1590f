use std::sync::Arc;

use crate::models::Frame;

use super::{
    FrameOutcome, GazeEstimator, HysteresisClassifier, HysteresisConfig, LandmarkProvider, Signal,
};

/// Primary strategy: landmark detection → gaze offset → hysteresis.
pub struct LandmarkStrategy {
    provider: Arc<dyn LandmarkProvider>,
    estimator: GazeEstimator,
    classifier: HysteresisClassifier,
}

impl LandmarkStrategy {
    /// Expects an already-initialized provider.
    pub fn new(provider: Arc<dyn LandmarkProvider>, config: HysteresisConfig) -> Self {
        Self {
            provider,
            estimator: GazeEstimator::new(),
            classifier: HysteresisClassifier::new(config),
        }
    }

    pub fn process(&mut self, frame: &Frame) -> FrameOutcome {
        let (signal, error) = match self.provider.detect(frame) {
            Ok(Some(landmarks)) => match self.estimator.estimate(&landmarks) {
                Some(sample) => (Signal::Gaze(sample), None),
                None => (Signal::NoSignal, None),
            },
            Ok(None) => (Signal::NoSignal, None),
            Err(err) => (Signal::NoSignal, Some(format!("landmark detection failed: {err:#}"))),
        };

        let outcome = FrameOutcome::from_candidate(self.classifier.update(signal));
        match error {
            Some(message) => outcome.with_error(message),
            None => outcome,
        }
    }

    /// Feeds a frame the detector never answered for as a no-signal sample.
    pub fn miss_frame(&mut self) -> FrameOutcome {
        FrameOutcome::from_candidate(self.classifier.update(Signal::NoSignal))
    }

    pub fn reset(&mut self) {
        self.classifier.reset();
    }

    pub fn shutdown(&self) {
        self.provider.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EyeSide, LandmarkRole, LandmarkSet, WarningReason};
    use crate::utils::Point2;
    use anyhow::{anyhow, Result};
    use image::RgbaImage;
    use std::sync::Mutex;

    struct Scripted(Mutex<Vec<Result<Option<LandmarkSet>>>>);

    impl LandmarkProvider for Scripted {
        fn is_ready(&self) -> bool {
            true
        }

        fn detect(&self, _frame: &Frame) -> Result<Option<LandmarkSet>> {
            self.0.lock().unwrap().remove(0)
        }
    }

    fn looking_aside() -> LandmarkSet {
        let mut set = LandmarkSet::new();
        for role in LandmarkRole::eye(EyeSide::Left).chain(LandmarkRole::eye(EyeSide::Right)) {
            set.set(role, Point2::new(0.7, 0.3));
        }
        set.with(LandmarkRole::NoseTip, Point2::new(0.5, 0.5))
    }

    fn frame() -> Frame {
        Frame::new(RgbaImage::new(4, 4), 0)
    }

    #[test]
    fn detector_errors_count_as_missing_face() {
        let provider = Scripted(Mutex::new(vec![
            Err(anyhow!("malformed")),
            Ok(None),
            Err(anyhow!("malformed")),
        ]));
        let mut strategy = LandmarkStrategy::new(Arc::new(provider), HysteresisConfig::landmark());

        let first = strategy.process(&frame());
        assert!(first.error.is_some());
        assert!(first.candidates.is_empty());
        assert!(strategy.process(&frame()).candidates.is_empty());

        let third = strategy.process(&frame());
        assert!(third.error.is_some());
        assert_eq!(third.candidates.len(), 1);
        assert_eq!(third.candidates[0].cause, WarningReason::NoFace);
    }

    #[test]
    fn sustained_deviation_reports_looking_away_with_vector() {
        let provider = Scripted(Mutex::new(vec![Ok(Some(looking_aside())), Ok(Some(looking_aside()))]));
        let mut strategy = LandmarkStrategy::new(Arc::new(provider), HysteresisConfig::landmark());

        assert!(strategy.process(&frame()).candidates.is_empty());
        let outcome = strategy.process(&frame());
        let candidate = outcome.candidates[0];
        assert_eq!(candidate.cause, WarningReason::LookingAway);
        assert!(candidate.gaze.unwrap().magnitude > 0.05);
    }
}
