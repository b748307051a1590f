//! Last-resort strategy with no model dependency.
//!
//! Each frame is resized to a fixed analysis raster, then:
//! - the skin-tone pixel ratio stands in for face presence
//! - the summed per-pixel difference against the previous frame is the
//!   motion energy
//!
//! Absence, stillness and excess motion each keep their own counter and fire
//! with a fixed confidence.

use image::{imageops, imageops::FilterType, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::models::{Frame, WarningReason};

use super::{AwayCandidate, FrameOutcome};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeuristicConfig {
    pub analysis_width: u32,
    pub analysis_height: u32,
    /// A frame whose skin ratio does not exceed this counts as "no face".
    pub min_skin_ratio: f32,
    pub absence_frames: u32,
    pub absence_confidence: f32,
    /// Motion energy above this counts as a moving frame.
    pub motion_threshold: f64,
    pub still_frames: u32,
    pub still_duration_ms: u64,
    pub still_confidence: f32,
    pub motion_frames: u32,
    pub motion_confidence: f32,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            analysis_width: 320,
            analysis_height: 240,
            min_skin_ratio: 0.1,
            absence_frames: 5,
            absence_confidence: 0.9,
            motion_threshold: 30_000.0,
            still_frames: 15,
            still_duration_ms: 3_000,
            still_confidence: 0.7,
            motion_frames: 5,
            motion_confidence: 0.5,
        }
    }
}

pub struct MotionSkinHeuristic {
    config: HeuristicConfig,
    previous: Option<RgbaImage>,
    absent_count: u32,
    motion_count: u32,
    still_count: u32,
    last_motion_ms: Option<u64>,
}

impl MotionSkinHeuristic {
    pub fn new(config: HeuristicConfig) -> Self {
        Self {
            config,
            previous: None,
            absent_count: 0,
            motion_count: 0,
            still_count: 0,
            last_motion_ms: None,
        }
    }

    pub fn process(&mut self, frame: &Frame) -> FrameOutcome {
        if frame.is_empty() {
            return FrameOutcome::default();
        }

        let current = self.normalize(frame);
        let now_ms = frame.timestamp_ms;
        let mut candidates = Vec::new();

        if skin_ratio(&current) > self.config.min_skin_ratio {
            self.absent_count = 0;
        } else {
            self.absent_count += 1;
            if self.absent_count > self.config.absence_frames {
                self.absent_count = 0;
                candidates.push(self.candidate(WarningReason::NoFace, self.config.absence_confidence));
            }
        }

        let last_motion_ms = *self.last_motion_ms.get_or_insert(now_ms);

        if let Some(previous) = &self.previous {
            if motion_energy(previous, &current) > self.config.motion_threshold {
                self.motion_count += 1;
                self.still_count = 0;
                self.last_motion_ms = Some(now_ms);
            } else {
                self.still_count += 1;
                self.motion_count = self.motion_count.saturating_sub(1);
            }

            let still_for_ms = now_ms.saturating_sub(last_motion_ms);
            if self.still_count > self.config.still_frames
                && still_for_ms > self.config.still_duration_ms
            {
                self.still_count = 0;
                candidates.push(self.candidate(WarningReason::NoMotion, self.config.still_confidence));
            }

            if self.motion_count > self.config.motion_frames {
                self.motion_count = 0;
                candidates.push(
                    self.candidate(WarningReason::ExcessMotion, self.config.motion_confidence),
                );
            }
        }

        self.previous = Some(current);

        FrameOutcome {
            candidates,
            error: None,
        }
    }

    pub fn reset(&mut self) {
        self.previous = None;
        self.absent_count = 0;
        self.motion_count = 0;
        self.still_count = 0;
        self.last_motion_ms = None;
    }

    fn normalize(&self, frame: &Frame) -> RgbaImage {
        let (width, height) = (self.config.analysis_width, self.config.analysis_height);
        if frame.width() == width && frame.height() == height {
            return (*frame.pixels).clone();
        }
        imageops::resize(&*frame.pixels, width, height, FilterType::Nearest)
    }

    fn candidate(&self, cause: WarningReason, confidence: f32) -> AwayCandidate {
        AwayCandidate {
            cause,
            confidence,
            gaze: None,
        }
    }
}

fn is_skin(r: u8, g: u8, b: u8) -> bool {
    let (r, g, b) = (i16::from(r), i16::from(g), i16::from(b));
    let spread = r.max(g).max(b) - r.min(g).min(b);
    r > 95 && g > 40 && b > 20 && spread > 15 && (r - g).abs() > 15 && r > g && r > b
}

/// Fraction of pixels that pass the skin-tone rule.
pub fn skin_ratio(image: &RgbaImage) -> f32 {
    let total = image.width() as usize * image.height() as usize;
    if total == 0 {
        return 0.0;
    }
    let skin = image
        .pixels()
        .filter(|px| is_skin(px[0], px[1], px[2]))
        .count();
    skin as f32 / total as f32
}

/// Sum over pixels of the mean absolute RGB difference. Images must share
/// dimensions.
pub fn motion_energy(previous: &RgbaImage, current: &RgbaImage) -> f64 {
    previous
        .pixels()
        .zip(current.pixels())
        .map(|(a, b)| {
            let diff = u32::from(a[0].abs_diff(b[0]))
                + u32::from(a[1].abs_diff(b[1]))
                + u32::from(a[2].abs_diff(b[2]));
            f64::from(diff) / 3.0
        })
        .sum()
}
