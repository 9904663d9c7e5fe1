//! Temporal stabilization of single-marker poses.
//!
//! Every frame, a [`MarkerTracker`] turns the marker's detected corners into
//! both POSIT candidates, keeps the one consistent with previous frames
//! ([`PoseDisambiguator`]), smooths it ([`PoseSmoother`]) and keeps the marker
//! visible through short dropouts ([`VisibilityTracker`]).
//! [`TrackingSession`] runs one tracker per configured marker ID against a
//! single shared detection result.
//!
//! Per-frame failures never escape as errors: they are reported as a
//! [`TrackMiss`] next to the (possibly frozen or hidden) pose.

mod disambiguate;
mod io;
mod params;
mod session;
mod smoother;
mod state;
mod tracker;
mod visibility;

pub use disambiguate::{Choice, PoseDisambiguator};
pub use io::ConfigIoError;
pub use params::{
    DisambiguationStrategy, MarkerTrackerConfig, OutputMapping, SmoothingParams,
    TrackerConfigError,
};
pub use session::{FrameResult, MarkerFrameResult, SessionConfig, TrackingSession};
pub use smoother::{canonical_hemisphere, PoseSmoother, SmoothedPose};
pub use state::{AcceptedPose, MarkerTrackState};
pub use tracker::{MarkerTracker, TrackMiss, TrackUpdate};
pub use visibility::{VisibilityState, VisibilityTracker};
