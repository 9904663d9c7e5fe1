//! High-level facade for the `marker-pose-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core, solver and tracker crates,
//! - a replay helper that drives a [`TrackingSession`] from a JSON-lines
//!   detection log (used by the `marker-pose` binary, feature `cli`).
//!
//! ## Quickstart
//!
//! ```
//! use marker_pose::{FrameDetections, FrameSize, MarkerDetection, MarkerTrackerConfig};
//! use marker_pose::{SessionConfig, TrackingSession};
//! use nalgebra::Point2;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = TrackingSession::new(SessionConfig {
//!     markers: vec![MarkerTrackerConfig::new(7, 50.0)],
//!     ..SessionConfig::default()
//! })?;
//!
//! let detections = [MarkerDetection::new(
//!     7,
//!     vec![
//!         Point2::new(300.0, 220.0),
//!         Point2::new(340.0, 220.0),
//!         Point2::new(340.0, 260.0),
//!         Point2::new(300.0, 260.0),
//!     ],
//! )];
//! let result = session.process_frame(&FrameDetections::new(FrameSize::new(640, 480), &detections));
//! assert!(result.get(7).is_some_and(|m| m.pose.visible));
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `marker_pose::core`: detections, correspondences, pose values, logger.
//! - `marker_pose::solver`: square marker model and the POSIT candidate solver.
//! - `marker_pose::tracker`: disambiguation, smoothing, visibility, sessions.
//! - `marker_pose::replay`: detection-log replay.

pub use marker_pose_core as core;
pub use marker_pose_solver as solver;
pub use marker_pose_tracker as tracker;

pub use marker_pose_core::{FrameDetections, FrameSize, MarkerDetection, ResolvedPose};
pub use marker_pose_solver::{PoseCandidateSolver, SolverParams};
pub use marker_pose_tracker::{
    DisambiguationStrategy, FrameResult, MarkerTrackerConfig, SessionConfig, TrackMiss,
    TrackingSession,
};

pub mod replay;
