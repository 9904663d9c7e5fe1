//! Core types for fiducial marker pose tracking.
//!
//! This crate is purely geometric and knows nothing about how markers are
//! decoded or how poses are rendered. It defines:
//! - the detector-facing input (`MarkerDetection`, `FrameDetections`),
//! - the centered solver input (`Correspondence`) and its builder,
//! - pose values passed between stages (`PoseCandidate`, `ResolvedPose`),
//! - a minimal logger shared by the workspace tools.

mod correspondence;
mod detection;
mod logger;
mod pose;

pub use correspondence::{build_correspondence, Correspondence};
pub use detection::{FrameDetections, FrameSize, MarkerDetection};
pub use pose::{
    face_normal, orthonormality_error, quaternion_from_rotation, PoseCandidate,
    ReprojectionError, ResolvedPose,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{env_level, init_from_env, init_with_level, LOG_ENV_VAR};
