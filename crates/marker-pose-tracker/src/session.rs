use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use log::{debug, info};
use marker_pose_core::{FrameDetections, ResolvedPose};
use marker_pose_solver::{PoseCandidateSolver, SolverParams};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{MarkerTracker, MarkerTrackerConfig, TrackMiss, TrackUpdate, TrackerConfigError};

/// Solver parameters plus the markers to track.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub solver: SolverParams,
    pub markers: Vec<MarkerTrackerConfig>,
}

/// Pose of one tracked marker in one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerFrameResult {
    pub marker_id: u32,
    pub pose: ResolvedPose,
    pub miss: Option<TrackMiss>,
}

/// All tracked markers for one frame, in ascending marker ID order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameResult {
    pub markers: Vec<MarkerFrameResult>,
}

impl FrameResult {
    pub fn get(&self, marker_id: u32) -> Option<&MarkerFrameResult> {
        self.markers
            .binary_search_by_key(&marker_id, |m| m.marker_id)
            .ok()
            .map(|i| &self.markers[i])
    }

    pub fn visible_count(&self) -> usize {
        self.markers.iter().filter(|m| m.pose.visible).count()
    }
}

/// Tracks a fixed set of markers over a stream of frames.
///
/// One detection result per frame is shared by every tracker; each marker's
/// state is created the first time that marker is processed.
#[derive(Debug)]
pub struct TrackingSession {
    solver: PoseCandidateSolver,
    configs: BTreeMap<u32, MarkerTrackerConfig>,
    trackers: BTreeMap<u32, MarkerTracker>,
    frames: u64,
}

impl TrackingSession {
    pub fn new(config: SessionConfig) -> Result<Self, TrackerConfigError> {
        let solver = PoseCandidateSolver::new(config.solver)?;
        let mut configs = BTreeMap::new();
        for marker in config.markers {
            marker.validate()?;
            match configs.entry(marker.marker_id) {
                Entry::Occupied(_) => {
                    return Err(TrackerConfigError::DuplicateMarkerId(marker.marker_id))
                }
                Entry::Vacant(slot) => {
                    slot.insert(marker);
                }
            }
        }
        info!("tracking session with {} marker(s)", configs.len());
        Ok(Self {
            solver,
            configs,
            trackers: BTreeMap::new(),
            frames: 0,
        })
    }

    #[inline]
    pub fn solver(&self) -> &PoseCandidateSolver {
        &self.solver
    }

    /// Configured marker IDs in ascending order.
    pub fn marker_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.configs.keys().copied()
    }

    /// Frames processed so far.
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Tracker of `marker_id`, once it has processed at least one frame.
    pub fn tracker(&self, marker_id: u32) -> Option<&MarkerTracker> {
        self.trackers.get(&marker_id)
    }

    /// Advance every configured marker by one frame.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(frame = self.frames, detections = frame.markers.len()))
    )]
    pub fn process_frame(&mut self, frame: &FrameDetections<'_>) -> FrameResult {
        self.frames += 1;
        let mut markers = Vec::with_capacity(self.configs.len());
        for (&id, config) in &self.configs {
            let tracker = match self.trackers.entry(id) {
                Entry::Occupied(slot) => slot.into_mut(),
                Entry::Vacant(slot) => {
                    debug!("creating tracker for marker {id}");
                    // Configs were validated in `new`, so this cannot fail.
                    match MarkerTracker::new(config.clone()) {
                        Ok(tracker) => slot.insert(tracker),
                        Err(err) => {
                            debug!("marker {id}: {err}");
                            continue;
                        }
                    }
                }
            };
            let TrackUpdate { pose, miss } = tracker.update(&self.solver, frame);
            markers.push(MarkerFrameResult {
                marker_id: id,
                pose,
                miss,
            });
        }
        FrameResult { markers }
    }
}
