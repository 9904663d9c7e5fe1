use std::fmt;

/// Why a correspondence cannot support a pose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Degeneracy {
    /// A corner coordinate is NaN or infinite.
    NonFinite,
    /// Two adjacent corners coincide.
    CoincidentCorners,
    /// Three corners are (nearly) on one line.
    Collinear,
    /// The frame has zero width, so no focal length can be derived.
    EmptyFrame,
    /// The scaled-orthographic scale vanished.
    ZeroScale,
}

impl fmt::Display for Degeneracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Degeneracy::NonFinite => "non-finite corner coordinates",
            Degeneracy::CoincidentCorners => "coincident corners",
            Degeneracy::Collinear => "near-collinear corners",
            Degeneracy::EmptyFrame => "zero-width frame",
            Degeneracy::ZeroScale => "vanishing projection scale",
        };
        f.write_str(text)
    }
}

/// Per-frame solve failures. Every variant is a detection miss downstream.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseSolveError {
    #[error("degenerate correspondence: {0}")]
    DegenerateCorrespondence(Degeneracy),
    #[error("no candidate pose places the marker in front of the camera")]
    NoValidCandidate,
    #[error("pose refinement did not converge after {iterations} iterations")]
    NonConvergence { iterations: usize },
}

/// Rejected solver parameters.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum SolverParamsError {
    #[error("focal_length must be finite and > 0 (got {0})")]
    InvalidFocalLength(f64),
    #[error("max_iterations must be >= 1")]
    ZeroIterations,
    #[error("convergence_epsilon must be finite and > 0 (got {0})")]
    InvalidConvergenceEpsilon(f64),
    #[error("min_corner_sine must be in [0, 1) (got {0})")]
    InvalidCornerSine(f64),
}

/// Rejected marker model.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum MarkerModelError {
    #[error("marker size must be finite and > 0 (got {0})")]
    InvalidSize(f64),
    #[error("marker object vectors have no usable pseudo-inverse")]
    Singular,
}
