//! Fixed-shape facial landmark set.
//!
//! Roles form a closed enumeration: sixteen contour points per eye plus the
//! nose tip. A role that the provider did not report is `None`, never a
//! zero point.

use serde::{Deserialize, Serialize};

use crate::utils::Point2;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EyeSide {
    Left,
    Right,
}

/// Points along one eye contour, ordered lateral corner → lower lid →
/// medial corner → upper lid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EyeContour {
    LateralCorner,
    Lower1,
    Lower2,
    Lower3,
    Lower4,
    Lower5,
    Lower6,
    Lower7,
    MedialCorner,
    Upper1,
    Upper2,
    Upper3,
    Upper4,
    Upper5,
    Upper6,
    Upper7,
}

impl EyeContour {
    pub const COUNT: usize = 16;

    pub const ALL: [EyeContour; Self::COUNT] = [
        EyeContour::LateralCorner,
        EyeContour::Lower1,
        EyeContour::Lower2,
        EyeContour::Lower3,
        EyeContour::Lower4,
        EyeContour::Lower5,
        EyeContour::Lower6,
        EyeContour::Lower7,
        EyeContour::MedialCorner,
        EyeContour::Upper1,
        EyeContour::Upper2,
        EyeContour::Upper3,
        EyeContour::Upper4,
        EyeContour::Upper5,
        EyeContour::Upper6,
        EyeContour::Upper7,
    ];

    fn position(self) -> usize {
        self as usize
    }
}

// Face-mesh indices in `EyeContour` order.
const LEFT_EYE_MESH: [usize; EyeContour::COUNT] = [
    33, 7, 163, 144, 145, 153, 154, 155, 133, 173, 157, 158, 159, 160, 161, 246,
];
const RIGHT_EYE_MESH: [usize; EyeContour::COUNT] = [
    263, 249, 390, 373, 374, 380, 381, 382, 362, 398, 384, 385, 386, 387, 388, 466,
];
const NOSE_TIP_MESH: usize = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum LandmarkRole {
    Eye(EyeSide, EyeContour),
    NoseTip,
}

impl LandmarkRole {
    pub const COUNT: usize = 2 * EyeContour::COUNT + 1;

    pub fn eye(side: EyeSide) -> impl Iterator<Item = LandmarkRole> {
        EyeContour::ALL
            .into_iter()
            .map(move |contour| LandmarkRole::Eye(side, contour))
    }

    pub fn all() -> impl Iterator<Item = LandmarkRole> {
        Self::eye(EyeSide::Left)
            .chain(Self::eye(EyeSide::Right))
            .chain(std::iter::once(LandmarkRole::NoseTip))
    }

    fn slot(self) -> usize {
        match self {
            LandmarkRole::Eye(EyeSide::Left, contour) => contour.position(),
            LandmarkRole::Eye(EyeSide::Right, contour) => EyeContour::COUNT + contour.position(),
            LandmarkRole::NoseTip => 2 * EyeContour::COUNT,
        }
    }

    /// Index of this role in a dense face-mesh point list.
    pub fn mesh_index(self) -> usize {
        match self {
            LandmarkRole::Eye(EyeSide::Left, contour) => LEFT_EYE_MESH[contour.position()],
            LandmarkRole::Eye(EyeSide::Right, contour) => RIGHT_EYE_MESH[contour.position()],
            LandmarkRole::NoseTip => NOSE_TIP_MESH,
        }
    }
}

/// Landmarks for a single detected face. May be partially populated.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [Option<Point2>; LandmarkRole::COUNT],
}

impl Default for LandmarkSet {
    fn default() -> Self {
        Self {
            points: [None; LandmarkRole::COUNT],
        }
    }
}

impl LandmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from a dense face-mesh list. Indices beyond the list,
    /// `None` entries and non-finite coordinates all become gaps.
    pub fn from_mesh(mesh: &[Option<[f32; 2]>]) -> Self {
        let mut set = Self::new();
        for role in LandmarkRole::all() {
            if let Some(Some([x, y])) = mesh.get(role.mesh_index()) {
                let point = Point2::new(*x, *y);
                if point.is_finite() {
                    set.set(role, point);
                }
            }
        }
        set
    }

    pub fn with(mut self, role: LandmarkRole, point: Point2) -> Self {
        self.set(role, point);
        self
    }

    pub fn set(&mut self, role: LandmarkRole, point: Point2) {
        self.points[role.slot()] = Some(point);
    }

    pub fn clear(&mut self, role: LandmarkRole) {
        self.points[role.slot()] = None;
    }

    pub fn get(&self, role: LandmarkRole) -> Option<Point2> {
        self.points[role.slot()]
    }

    pub fn present_count(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }
}
