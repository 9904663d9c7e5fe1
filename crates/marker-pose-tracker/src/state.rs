use marker_pose_core::{PoseCandidate, ResolvedPose};
use nalgebra::{Matrix3, Vector3};

use crate::{OutputMapping, PoseSmoother, SmoothedPose, SmoothingParams, VisibilityTracker};

/// Last pose chosen by the disambiguator, kept for continuity checks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AcceptedPose {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
    /// Low-pass filtered unit face normal of the accepted poses.
    pub stable_normal: Vector3<f64>,
}

/// Everything a tracker remembers about one marker between frames.
#[derive(Clone, Debug)]
pub struct MarkerTrackState {
    pub(crate) accepted: Option<AcceptedPose>,
    pub(crate) smoother: PoseSmoother,
    pub(crate) visibility: VisibilityTracker,
}

impl MarkerTrackState {
    pub fn new(smoothing: SmoothingParams, max_frames_lost: u32) -> Self {
        Self {
            accepted: None,
            smoother: PoseSmoother::new(smoothing),
            visibility: VisibilityTracker::new(max_frames_lost),
        }
    }

    #[inline]
    pub fn accepted(&self) -> Option<&AcceptedPose> {
        self.accepted.as_ref()
    }

    #[inline]
    pub fn smoothed(&self) -> Option<&SmoothedPose> {
        self.smoother.current()
    }

    #[inline]
    pub fn visibility(&self) -> &VisibilityTracker {
        &self.visibility
    }

    #[inline]
    pub fn frames_lost(&self) -> u32 {
        self.visibility.frames_lost()
    }

    /// Feed a disambiguated pose through smoothing and mark the frame as a hit.
    pub(crate) fn record_pose(&mut self, chosen: &PoseCandidate) {
        self.smoother.update(SmoothedPose {
            position: chosen.translation,
            orientation: chosen.orientation(),
        });
        self.visibility.record_detection();
    }

    pub(crate) fn record_miss(&mut self) {
        self.visibility.record_miss();
    }

    /// Renderer-facing pose: the smoothed pose through `output`, or a hidden
    /// identity pose when nothing was ever resolved.
    pub fn emit(&self, output: &OutputMapping) -> ResolvedPose {
        match self.smoother.current() {
            Some(current) => ResolvedPose {
                position: output.apply(&current.position),
                orientation: current.orientation,
                visible: self.visibility.is_visible(),
            },
            None => ResolvedPose::hidden(),
        }
    }
}
