use std::sync::Arc;

use crate::models::Frame;

use super::{CascadeProvider, FrameOutcome, HysteresisClassifier, HysteresisConfig, Signal};

/// Secondary strategy: binary face presence from a classical detector.
/// There is no gaze vector, so only absence can fire.
pub struct CascadeStrategy {
    provider: Arc<dyn CascadeProvider>,
    classifier: HysteresisClassifier,
}

impl CascadeStrategy {
    /// Expects a provider whose model is already loaded.
    pub fn new(provider: Arc<dyn CascadeProvider>, config: HysteresisConfig) -> Self {
        Self {
            provider,
            classifier: HysteresisClassifier::new(config),
        }
    }

    pub fn process(&mut self, frame: &Frame) -> FrameOutcome {
        match self.provider.detect(frame) {
            Ok(true) => FrameOutcome::from_candidate(self.classifier.update(Signal::FacePresent)),
            Ok(false) => FrameOutcome::from_candidate(self.classifier.update(Signal::NoSignal)),
            Err(err) => FrameOutcome::from_candidate(self.classifier.update(Signal::NoSignal))
                .with_error(format!("cascade detection failed: {err:#}")),
        }
    }

    pub fn miss_frame(&mut self) -> FrameOutcome {
        FrameOutcome::from_candidate(self.classifier.update(Signal::NoSignal))
    }

    pub fn reset(&mut self) {
        self.classifier.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WarningReason;
    use anyhow::Result;
    use image::RgbaImage;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Toggle(AtomicBool);

    impl CascadeProvider for Toggle {
        fn load(&self) -> Result<()> {
            Ok(())
        }

        fn detect(&self, _frame: &Frame) -> Result<bool> {
            Ok(self.0.load(Ordering::SeqCst))
        }
    }

    #[test]
    fn fires_after_four_empty_frames() {
        let provider = Arc::new(Toggle(AtomicBool::new(false)));
        let mut strategy = CascadeStrategy::new(provider.clone(), HysteresisConfig::cascade());
        let frame = Frame::new(RgbaImage::new(4, 4), 0);

        let fired: Vec<_> = (0..4)
            .flat_map(|_| strategy.process(&frame).candidates)
            .collect();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].cause, WarningReason::NoFace);
        assert!((fired[0].confidence - 0.9).abs() < 1e-6);

        provider.0.store(true, Ordering::SeqCst);
        for _ in 0..20 {
            assert!(strategy.process(&frame).candidates.is_empty());
        }
    }
}
