//! Pixel corners to solver coordinates.
//!
//! The pose solver works in a frame centered on the image center with the
//! vertical axis pointing up (right-handed camera with +Z in front of the
//! camera). Detector corners are top-left origin with y pointing down.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::FrameSize;

/// Four centered 2D observations, ordered like the canonical marker corners
/// (top-left, top-right, bottom-right, bottom-left).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub points: [Point2<f64>; 4],
    /// Frame the points were centered against.
    pub frame: FrameSize,
}

impl Correspondence {
    /// Build a correspondence from points that are already centered.
    pub fn from_centered(points: [Point2<f64>; 4], frame: FrameSize) -> Self {
        Self { points, frame }
    }
}

/// Center raw detector corners on the frame and flip the vertical axis:
/// `x' = x - width / 2`, `y' = height / 2 - y`.
///
/// Returns `None` when fewer than 4 corners are supplied. Corners past the
/// fourth are ignored.
pub fn build_correspondence(corners: &[Point2<f32>], frame: FrameSize) -> Option<Correspondence> {
    if corners.len() < 4 {
        return None;
    }
    let c = frame.center();
    let mut points = [Point2::origin(); 4];
    for (dst, src) in points.iter_mut().zip(corners) {
        *dst = Point2::new(src.x as f64 - c.x, c.y - src.y as f64);
    }
    Some(Correspondence { points, frame })
}
