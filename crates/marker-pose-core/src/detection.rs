use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Pixel dimensions of the processing frame the corners were detected in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Default 4:3 processing resolution.
    pub const DEFAULT_PROCESSING: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Image center in pixel coordinates.
    #[inline]
    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }
}

/// One decoded marker as reported by the external detector.
///
/// `corners` are in source pixel coordinates (x right, y down), in the
/// detector's canonical order: top-left, top-right, bottom-right, bottom-left
/// of the marker as seen from the front.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub id: u32,
    pub corners: Vec<Point2<f32>>,
}

impl MarkerDetection {
    pub fn new(id: u32, corners: impl Into<Vec<Point2<f32>>>) -> Self {
        Self {
            id,
            corners: corners.into(),
        }
    }
}

/// The detection result set for a single frame, shared by every tracked marker.
///
/// The set is borrowed from the detection collaborator; the pipeline never
/// re-runs detection and never mutates it.
#[derive(Clone, Copy, Debug)]
pub struct FrameDetections<'a> {
    pub size: FrameSize,
    pub markers: &'a [MarkerDetection],
}

impl<'a> FrameDetections<'a> {
    pub fn new(size: FrameSize, markers: &'a [MarkerDetection]) -> Self {
        Self { size, markers }
    }

    /// A frame in which the detector found nothing.
    pub fn empty(size: FrameSize) -> Self {
        Self { size, markers: &[] }
    }

    /// First detection carrying `id`, if any.
    pub fn find(&self, id: u32) -> Option<&'a MarkerDetection> {
        self.markers.iter().find(|m| m.id == id)
    }
}
