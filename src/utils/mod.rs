pub mod geometry;
pub mod logging;

pub use geometry::{centroid, Point2};
