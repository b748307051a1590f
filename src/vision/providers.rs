//! Capabilities the engine consumes. Hosts inject implementations; a missing
//! capability is `None` in [`Capabilities`] rather than a global lookup.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;

use crate::models::{Frame, LandmarkSet};

/// Source of camera frames.
pub trait FrameSource: Send + Sync {
    /// Most recent frame, or `None` when the camera has nothing yet.
    fn latest_frame(&self) -> Option<Frame>;

    /// Start the underlying capture driver.
    fn start(&self) -> Result<()> {
        Ok(())
    }

    /// Stop the underlying capture driver. Must be idempotent.
    fn stop(&self) {}
}

/// Face-landmark model. Readiness covers the model library loading
/// asynchronously after the host starts.
pub trait LandmarkProvider: Send + Sync {
    fn is_ready(&self) -> bool;

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// Landmarks of the first detected face, `None` when no face was found.
    fn detect(&self, frame: &Frame) -> Result<Option<LandmarkSet>>;

    fn shutdown(&self) {}
}

/// Classical face detector (e.g. a Haar cascade).
pub trait CascadeProvider: Send + Sync {
    /// Load the detector model.
    fn load(&self) -> Result<()>;

    /// Whether at least one face rectangle was found.
    fn detect(&self, frame: &Frame) -> Result<bool>;
}

#[derive(Clone, Default)]
pub struct Capabilities {
    pub frames: Option<Arc<dyn FrameSource>>,
    pub landmarks: Option<Arc<dyn LandmarkProvider>>,
    pub cascade: Option<Arc<dyn CascadeProvider>>,
}

impl Capabilities {
    pub fn new(frames: Arc<dyn FrameSource>) -> Self {
        Self {
            frames: Some(frames),
            ..Self::default()
        }
    }

    pub fn with_landmarks(mut self, provider: Arc<dyn LandmarkProvider>) -> Self {
        self.landmarks = Some(provider);
        self
    }

    pub fn with_cascade(mut self, provider: Arc<dyn CascadeProvider>) -> Self {
        self.cascade = Some(provider);
        self
    }
}

/// Push-driven frame source: a capture callback calls [`FrameSlot::push`],
/// the tracking loop reads whatever is newest.
#[derive(Default)]
pub struct FrameSlot {
    latest: Mutex<Option<Frame>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the held frame unless it is older than the one already held.
    pub fn push(&self, frame: Frame) {
        let mut guard = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        let is_newer = guard
            .as_ref()
            .map_or(true, |held| frame.timestamp_ms >= held.timestamp_ms);
        if is_newer {
            *guard = Some(frame);
        }
    }

    pub fn clear(&self) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl FrameSource for FrameSlot {
    fn latest_frame(&self) -> Option<Frame> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn stop(&self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn slot_keeps_newest_frame() {
        let slot = FrameSlot::new();
        assert!(slot.latest_frame().is_none());

        slot.push(Frame::new(RgbaImage::new(2, 2), 10));
        slot.push(Frame::new(RgbaImage::new(2, 2), 5));
        assert_eq!(slot.latest_frame().unwrap().timestamp_ms, 10);

        slot.push(Frame::new(RgbaImage::new(2, 2), 20));
        assert_eq!(slot.latest_frame().unwrap().timestamp_ms, 20);

        slot.stop();
        assert!(slot.latest_frame().is_none());
    }
}
