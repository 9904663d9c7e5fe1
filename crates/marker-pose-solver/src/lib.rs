//! Pose candidates for a single square marker from its four image corners.
//!
//! The solver implements coplanar POSIT: starting from a scaled-orthographic
//! estimate it refines the two mirror-image poses any planar target admits
//! and returns both, ordered by reprojection error. Choosing between them
//! across frames is left to the tracker.
//!
//! ```
//! use marker_pose_core::{Correspondence, FrameSize};
//! use marker_pose_solver::{MarkerModel, PoseCandidateSolver, SolverParams};
//! use nalgebra::Point2;
//!
//! let model = MarkerModel::square(50.0).unwrap();
//! let solver = PoseCandidateSolver::new(SolverParams::default()).unwrap();
//! let corr = Correspondence::from_centered(
//!     [
//!         Point2::new(-20.0, 20.0),
//!         Point2::new(20.0, 20.0),
//!         Point2::new(20.0, -20.0),
//!         Point2::new(-20.0, -20.0),
//!     ],
//!     FrameSize::new(640, 480),
//! );
//! let solution = solver.solve(&model, &corr).unwrap();
//! assert!((solution.best.translation.z - 800.0).abs() < 1e-6);
//! ```

mod error;
mod model;
mod solver;

pub use error::{Degeneracy, MarkerModelError, PoseSolveError, SolverParamsError};
pub use model::MarkerModel;
pub use solver::{PoseCandidateSolver, PoseSolution, SolverParams};
