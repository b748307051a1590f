//! Counter-based smoothing that turns per-frame signals into away events.
//!
//! Two counters run side by side. `no_signal_count` tracks consecutive frames
//! without a face and fires fast with a fixed confidence. `away_count` tracks
//! frames whose gaze offset exceeds the threshold; it decays by one on every
//! frame under the threshold and fires with a confidence that grows with the
//! count.

use serde::{Deserialize, Serialize};

use crate::models::WarningReason;

use super::GazeSample;

/// One classifier input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    /// No face, empty detector output, or a failed frame.
    NoSignal,
    /// A face is present but the strategy has no gaze vector for it.
    FacePresent,
    Gaze(GazeSample),
}

/// A debounced away event before throttling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwayCandidate {
    pub cause: WarningReason,
    pub confidence: f32,
    pub gaze: Option<GazeSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HysteresisConfig {
    /// Fire once `no_signal_count` exceeds this.
    pub no_signal_threshold: u32,
    pub no_signal_confidence: f32,
    /// Gaze offsets with a larger magnitude count as looking away.
    pub gaze_threshold: f32,
    /// Fire once `away_count` exceeds this.
    pub away_trigger: u32,
    pub confidence_cap: f32,
    pub confidence_normalizer: f32,
}

impl HysteresisConfig {
    pub fn landmark() -> Self {
        Self {
            no_signal_threshold: 2,
            no_signal_confidence: 0.95,
            gaze_threshold: 0.05,
            away_trigger: 1,
            confidence_cap: 0.95,
            confidence_normalizer: 3.0,
        }
    }

    pub fn cascade() -> Self {
        Self {
            no_signal_threshold: 3,
            no_signal_confidence: 0.9,
            ..Self::landmark()
        }
    }
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self::landmark()
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub away: u32,
    pub no_signal: u32,
}

#[derive(Debug, Clone)]
pub struct HysteresisClassifier {
    config: HysteresisConfig,
    away_count: u32,
    no_signal_count: u32,
}

impl HysteresisClassifier {
    pub fn new(config: HysteresisConfig) -> Self {
        Self {
            config,
            away_count: 0,
            no_signal_count: 0,
        }
    }

    pub fn update(&mut self, signal: Signal) -> Option<AwayCandidate> {
        match signal {
            Signal::NoSignal => {
                self.no_signal_count += 1;
                if self.no_signal_count > self.config.no_signal_threshold {
                    self.reset();
                    return Some(AwayCandidate {
                        cause: WarningReason::NoFace,
                        confidence: self.config.no_signal_confidence,
                        gaze: None,
                    });
                }
                None
            }
            Signal::FacePresent => {
                self.no_signal_count = 0;
                None
            }
            Signal::Gaze(sample) => {
                self.no_signal_count = 0;
                if sample.magnitude > self.config.gaze_threshold {
                    self.away_count += 1;
                } else {
                    self.away_count = self.away_count.saturating_sub(1);
                }

                if self.away_count > self.config.away_trigger {
                    let confidence = (self.away_count as f32 / self.config.confidence_normalizer)
                        .min(self.config.confidence_cap);
                    self.away_count = 0;
                    return Some(AwayCandidate {
                        cause: WarningReason::LookingAway,
                        confidence,
                        gaze: Some(sample),
                    });
                }
                None
            }
        }
    }

    #[cfg(test)]
    pub fn counters(&self) -> Counters {
        Counters {
            away: self.away_count,
            no_signal: self.no_signal_count,
        }
    }

    pub fn reset(&mut self) {
        self.away_count = 0;
        self.no_signal_count = 0;
    }
}
