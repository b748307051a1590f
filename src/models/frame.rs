use std::sync::Arc;

use image::RgbaImage;

/// A captured camera frame.
///
/// `timestamp_ms` is monotonic per source; two frames with the same timestamp
/// are the same capture.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: Arc<RgbaImage>,
    pub timestamp_ms: u64,
}

impl Frame {
    pub fn new(pixels: RgbaImage, timestamp_ms: u64) -> Self {
        Self {
            pixels: Arc::new(pixels),
            timestamp_ms,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}
