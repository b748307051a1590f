//! Gaze offset from landmarks: mean of both eye centroids minus the nose tip.

use serde::{Deserialize, Serialize};

use crate::models::{EyeSide, LandmarkRole, LandmarkSet};
use crate::utils::{centroid, Point2};

/// Per-frame gaze offset. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeSample {
    pub offset: Point2,
    pub magnitude: f32,
}

impl GazeSample {
    pub fn from_offset(offset: Point2) -> Self {
        Self {
            offset,
            magnitude: offset.magnitude(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GazeEstimator {
    reference: LandmarkRole,
}

impl Default for GazeEstimator {
    fn default() -> Self {
        Self {
            reference: LandmarkRole::NoseTip,
        }
    }
}

impl GazeEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` means "no signal": an eye with zero present points, a missing
    /// reference point, or an empty set. It is never reported as `(0, 0)`.
    pub fn estimate(&self, landmarks: &LandmarkSet) -> Option<GazeSample> {
        let left = eye_center(landmarks, EyeSide::Left)?;
        let right = eye_center(landmarks, EyeSide::Right)?;
        let reference = landmarks.get(self.reference)?;

        Some(GazeSample::from_offset(left.midpoint(right) - reference))
    }
}

fn eye_center(landmarks: &LandmarkSet, side: EyeSide) -> Option<Point2> {
    centroid(LandmarkRole::eye(side).filter_map(|role| landmarks.get(role)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EyeContour;

    fn face(left: Point2, right: Point2, nose: Point2) -> LandmarkSet {
        let mut set = LandmarkSet::new();
        for role in LandmarkRole::eye(EyeSide::Left) {
            set.set(role, left);
        }
        for role in LandmarkRole::eye(EyeSide::Right) {
            set.set(role, right);
        }
        set.with(LandmarkRole::NoseTip, nose)
    }

    #[test]
    fn offset_is_eye_midpoint_minus_nose() {
        let set = face(
            Point2::new(0.4, 0.4),
            Point2::new(0.6, 0.4),
            Point2::new(0.5, 0.5),
        );
        let sample = GazeEstimator::new().estimate(&set).unwrap();
        assert!((sample.offset.x - 0.0).abs() < 1e-6);
        assert!((sample.offset.y + 0.1).abs() < 1e-6);
        assert!((sample.magnitude - 0.1).abs() < 1e-6);
    }

    #[test]
    fn partial_eye_uses_present_points_only() {
        let mut set = face(
            Point2::new(0.4, 0.4),
            Point2::new(0.6, 0.4),
            Point2::new(0.5, 0.4),
        );
        for contour in EyeContour::ALL.into_iter().skip(1) {
            set.clear(LandmarkRole::Eye(EyeSide::Left, contour));
        }
        let sample = GazeEstimator::new().estimate(&set).unwrap();
        assert!(sample.magnitude < 1e-6);
    }

    #[test]
    fn missing_eye_or_nose_is_unavailable() {
        let full = face(
            Point2::new(0.4, 0.4),
            Point2::new(0.6, 0.4),
            Point2::new(0.5, 0.5),
        );

        let mut no_right = full.clone();
        for role in LandmarkRole::eye(EyeSide::Right) {
            no_right.clear(role);
        }
        assert!(GazeEstimator::new().estimate(&no_right).is_none());

        let mut no_nose = full;
        no_nose.clear(LandmarkRole::NoseTip);
        assert!(GazeEstimator::new().estimate(&no_nose).is_none());

        assert!(GazeEstimator::new().estimate(&LandmarkSet::new()).is_none());
    }
}
