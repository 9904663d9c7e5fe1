use log::debug;
use marker_pose_core::{build_correspondence, FrameDetections, PoseCandidate, ResolvedPose};
use marker_pose_solver::{MarkerModel, PoseCandidateSolver, PoseSolveError};
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{MarkerTrackState, MarkerTrackerConfig, PoseDisambiguator, TrackerConfigError};

/// Why a frame produced no pose for a marker.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackMiss {
    #[error("marker not detected in frame")]
    MissingMarker,
    #[error("detection has {found} corners, need 4")]
    TooFewCorners { found: usize },
    #[error("pose solve failed: {reason}")]
    Solve {
        #[serde(serialize_with = "serialize_display")]
        reason: PoseSolveError,
    },
}

fn serialize_display<S: serde::Serializer>(
    err: &PoseSolveError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(err)
}

impl From<PoseSolveError> for TrackMiss {
    fn from(reason: PoseSolveError) -> Self {
        TrackMiss::Solve { reason }
    }
}

/// Outcome of one [`MarkerTracker::update`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackUpdate {
    pub pose: ResolvedPose,
    /// Set when this frame did not resolve a pose.
    pub miss: Option<TrackMiss>,
}

/// Pose resolution and stabilization for a single marker ID.
///
/// Per frame: locate the marker's detection, build the correspondence, solve
/// for both candidates, keep the one consistent with history, smooth, and
/// update visibility. The solver is borrowed so a session can share one.
#[derive(Clone, Debug)]
pub struct MarkerTracker {
    config: MarkerTrackerConfig,
    model: MarkerModel,
    disambiguator: PoseDisambiguator,
    state: MarkerTrackState,
}

impl MarkerTracker {
    pub fn new(config: MarkerTrackerConfig) -> Result<Self, TrackerConfigError> {
        config.validate()?;
        let model = MarkerModel::square(config.marker_size)?;
        let disambiguator =
            PoseDisambiguator::new(config.disambiguation, config.normal_smoothing);
        let state = MarkerTrackState::new(config.smoothing, config.max_frames_lost);
        Ok(Self {
            config,
            model,
            disambiguator,
            state,
        })
    }

    #[inline]
    pub fn marker_id(&self) -> u32 {
        self.config.marker_id
    }

    #[inline]
    pub fn config(&self) -> &MarkerTrackerConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> &MarkerTrackState {
        &self.state
    }

    /// Run the pipeline on one frame's detections.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(id = self.config.marker_id))
    )]
    pub fn update(
        &mut self,
        solver: &PoseCandidateSolver,
        frame: &FrameDetections<'_>,
    ) -> TrackUpdate {
        let miss = match self.resolve(solver, frame) {
            Ok(chosen) => {
                self.state.record_pose(&chosen);
                None
            }
            Err(miss) => {
                debug!("marker {}: {miss}", self.config.marker_id);
                self.state.record_miss();
                Some(miss)
            }
        };
        TrackUpdate {
            pose: self.state.emit(&self.config.output),
            miss,
        }
    }

    fn resolve(
        &mut self,
        solver: &PoseCandidateSolver,
        frame: &FrameDetections<'_>,
    ) -> Result<PoseCandidate, TrackMiss> {
        let detection = frame
            .find(self.config.marker_id)
            .ok_or(TrackMiss::MissingMarker)?;
        let correspondence = build_correspondence(&detection.corners, frame.size).ok_or(
            TrackMiss::TooFewCorners {
                found: detection.corners.len(),
            },
        )?;
        let solution = solver.solve(&self.model, &correspondence)?;
        Ok(self
            .disambiguator
            .resolve(&solution, &mut self.state.accepted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use marker_pose_core::{FrameSize, MarkerDetection};
    use marker_pose_solver::SolverParams;
    use nalgebra::{Point2, Vector3};

    fn solver() -> PoseCandidateSolver {
        PoseCandidateSolver::new(SolverParams::default()).expect("params")
    }

    fn frontal(id: u32, half: f32) -> MarkerDetection {
        MarkerDetection::new(
            id,
            vec![
                Point2::new(320.0 - half, 240.0 - half),
                Point2::new(320.0 + half, 240.0 - half),
                Point2::new(320.0 + half, 240.0 + half),
                Point2::new(320.0 - half, 240.0 + half),
            ],
        )
    }

    #[test]
    fn first_resolved_frame_snaps_and_shows() {
        let mut tracker = MarkerTracker::new(MarkerTrackerConfig::new(4, 50.0)).expect("cfg");
        let markers = [frontal(4, 20.0)];
        let frame = FrameDetections::new(FrameSize::new(640, 480), &markers);

        let update = tracker.update(&solver(), &frame);
        assert_eq!(update.miss, None);
        assert!(update.pose.visible);
        assert_relative_eq!(
            update.pose.position,
            Vector3::new(0.0, 0.0, -800.0),
            epsilon = 1e-6
        );
        assert_relative_eq!(update.pose.orientation.angle(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn reports_why_a_frame_missed() {
        let mut tracker = MarkerTracker::new(MarkerTrackerConfig::new(9, 50.0)).expect("cfg");
        let s = solver();
        let size = FrameSize::new(640, 480);

        let other = [frontal(2, 20.0)];
        let update = tracker.update(&s, &FrameDetections::new(size, &other));
        assert_eq!(update.miss, Some(TrackMiss::MissingMarker));
        assert!(!update.pose.visible);

        let short = [MarkerDetection::new(9, vec![Point2::new(1.0, 1.0); 3])];
        let update = tracker.update(&s, &FrameDetections::new(size, &short));
        assert_eq!(update.miss, Some(TrackMiss::TooFewCorners { found: 3 }));

        let line = [MarkerDetection::new(
            9,
            vec![
                Point2::new(100.0, 100.0),
                Point2::new(200.0, 100.0),
                Point2::new(300.0, 100.0),
                Point2::new(400.0, 100.0),
            ],
        )];
        let update = tracker.update(&s, &FrameDetections::new(size, &line));
        assert!(matches!(update.miss, Some(TrackMiss::Solve { .. })));
        assert!(!update.pose.visible);
        assert_eq!(tracker.state().frames_lost(), 3);
    }

    #[test]
    fn loss_freezes_pose_until_hidden() {
        let mut cfg = MarkerTrackerConfig::new(1, 50.0);
        cfg.max_frames_lost = 2;
        let mut tracker = MarkerTracker::new(cfg).expect("cfg");
        let s = solver();
        let size = FrameSize::new(640, 480);
        let markers = [frontal(1, 20.0)];

        let seen = tracker.update(&s, &FrameDetections::new(size, &markers)).pose;
        for expected_visible in [true, true, false, false] {
            let pose = tracker.update(&s, &FrameDetections::empty(size)).pose;
            assert_eq!(pose.visible, expected_visible);
            assert_eq!(pose.position, seen.position);
            assert_eq!(pose.orientation, seen.orientation);
        }

        let back = tracker.update(&s, &FrameDetections::new(size, &markers)).pose;
        assert!(back.visible);
        assert_eq!(tracker.state().frames_lost(), 0);
    }

    #[test]
    fn miss_serializes_with_kind_tag() {
        let json = serde_json::to_string(&TrackMiss::TooFewCorners { found: 2 }).expect("json");
        assert_eq!(json, r#"{"kind":"too_few_corners","found":2}"#);
        let solve: TrackMiss = PoseSolveError::NoValidCandidate.into();
        let json = serde_json::to_value(solve).expect("json");
        assert_eq!(json["kind"], "solve");
    }
}
