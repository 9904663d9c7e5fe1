//! Coplanar POSIT for a single square marker.
//!
//! Each solve starts from the scaled-orthographic (SOP) approximation, which
//! for a planar target yields two rotations: `I0 ± λn`, `J0 ± μn`. Both are
//! refined independently by re-running SOP on perspective-corrected image
//! points until the correction stops changing. The two refined poses are the
//! mirror pair every planar target admits under a single view.

use log::trace;
use marker_pose_core::{Correspondence, FrameSize, PoseCandidate, ReprojectionError};
use nalgebra::{Matrix3, Point2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{Degeneracy, MarkerModel, PoseSolveError, SolverParamsError};

const AXIS_EPS: f64 = 1e-12;
const EXACT_FIT_PX: f64 = 1e-9;
/// Below this fraction of `|I0|² + |J0|²` the SOP pose is treated as frontal.
const FRONTAL_TOL: f64 = 1e-12;

/// Solver configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Focal length in pixels. `None` approximates it by the frame width.
    pub focal_length: Option<f64>,
    /// Refinement budget per candidate.
    pub max_iterations: usize,
    /// Refinement stops once the total SOP correction changes by less than
    /// this many pixels between iterations.
    pub convergence_epsilon: f64,
    /// Sine of the smallest admissible angle between adjacent marker edges.
    pub min_corner_sine: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            focal_length: None,
            max_iterations: 100,
            convergence_epsilon: 0.01,
            min_corner_sine: 1e-3,
        }
    }
}

impl SolverParams {
    pub fn validate(&self) -> Result<(), SolverParamsError> {
        if let Some(f) = self.focal_length {
            if !f.is_finite() || f <= 0.0 {
                return Err(SolverParamsError::InvalidFocalLength(f));
            }
        }
        if self.max_iterations == 0 {
            return Err(SolverParamsError::ZeroIterations);
        }
        if !self.convergence_epsilon.is_finite() || self.convergence_epsilon <= 0.0 {
            return Err(SolverParamsError::InvalidConvergenceEpsilon(
                self.convergence_epsilon,
            ));
        }
        if !(0.0..1.0).contains(&self.min_corner_sine) {
            return Err(SolverParamsError::InvalidCornerSine(self.min_corner_sine));
        }
        Ok(())
    }
}

/// Both refined poses of one solve, ordered by mean reprojection error.
///
/// When only one of the two SOP branches yields a pose in front of the camera,
/// `alternative` repeats `best`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseSolution {
    pub best: PoseCandidate,
    pub alternative: PoseCandidate,
}

impl PoseSolution {
    /// Whether the two candidates are the same pose.
    pub fn is_unambiguous(&self) -> bool {
        self.best == self.alternative
    }
}

/// Stateless pose-from-four-points solver.
///
/// Construct once per session and share it by reference between marker
/// trackers; a solve never depends on previous solves.
#[derive(Clone, Debug)]
pub struct PoseCandidateSolver {
    params: SolverParams,
}

impl PoseCandidateSolver {
    pub fn new(params: SolverParams) -> Result<Self, SolverParamsError> {
        params.validate()?;
        Ok(Self { params })
    }

    #[inline]
    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    /// Focal length used for a correspondence taken from `frame`.
    #[inline]
    pub fn focal_length_for(&self, frame: FrameSize) -> f64 {
        self.params
            .focal_length
            .unwrap_or(frame.width as f64)
    }

    /// Compute both candidate poses of `model` for the observed corners.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(size = model.size()))
    )]
    pub fn solve(
        &self,
        model: &MarkerModel,
        correspondence: &Correspondence,
    ) -> Result<PoseSolution, PoseSolveError> {
        let image = &correspondence.points;
        check_corners(image, self.params.min_corner_sine)
            .map_err(PoseSolveError::DegenerateCorrespondence)?;

        let focal = self.focal_length_for(correspondence.frame);
        if focal <= 0.0 {
            return Err(PoseSolveError::DegenerateCorrespondence(
                Degeneracy::EmptyFrame,
            ));
        }

        let sop = sop_pose(model, image, focal).ok_or(PoseSolveError::DegenerateCorrespondence(
            Degeneracy::ZeroScale,
        ))?;

        let outcomes = sop.rotations.map(|rotation| {
            if !in_front(model, &rotation, &origin_translation(model, &rotation, &sop.reference)) {
                return Err(PoseSolveError::NoValidCandidate);
            }
            self.refine(model, image, rotation, sop.reference, focal)
        });

        let mut candidates: Vec<PoseCandidate> =
            outcomes.iter().filter_map(|o| o.ok()).collect();
        candidates.sort_by(|a, b| a.error.mean.total_cmp(&b.error.mean));

        match candidates.as_slice() {
            [best, alternative] => Ok(PoseSolution {
                best: *best,
                alternative: *alternative,
            }),
            [only] => Ok(PoseSolution {
                best: *only,
                alternative: *only,
            }),
            _ => Err(outcomes
                .iter()
                .filter_map(|o| o.err())
                .find(|e| matches!(e, PoseSolveError::NonConvergence { .. }))
                .unwrap_or(PoseSolveError::NoValidCandidate)),
        }
    }

    /// Iterate POSIT from one SOP branch until the perspective correction of
    /// the image points settles.
    fn refine(
        &self,
        model: &MarkerModel,
        image: &[Point2<f64>; 4],
        initial_rotation: Matrix3<f64>,
        initial_reference: Vector3<f64>,
        focal: f64,
    ) -> Result<PoseCandidate, PoseSolveError> {
        let eps = self.params.convergence_epsilon;
        let mut rotation = initial_rotation;
        let mut reference = initial_reference;

        let mut corrected = perspective_corrected(model, image, &rotation, &reference);
        let mut shift = total_shift(&corrected, image);
        let mut error = reprojection_error(
            model,
            image,
            &rotation,
            &origin_translation(model, &rotation, &reference),
            focal,
        )
        .ok_or(PoseSolveError::NoValidCandidate)?;

        let mut converged = error.max < EXACT_FIT_PX || shift < eps;
        let mut iterations = 0;

        while !converged {
            if iterations >= self.params.max_iterations {
                return Err(PoseSolveError::NonConvergence { iterations });
            }
            iterations += 1;

            let previous = corrected;
            let sop = sop_pose(model, &corrected, focal).ok_or(
                PoseSolveError::DegenerateCorrespondence(Degeneracy::ZeroScale),
            )?;
            reference = sop.reference;

            let scored = sop.rotations.map(|r| {
                reprojection_error(
                    model,
                    image,
                    &r,
                    &origin_translation(model, &r, &reference),
                    focal,
                )
            });
            match scored {
                [Some(a), Some(b)] if b.mean < a.mean => {
                    rotation = sop.rotations[1];
                    error = b;
                }
                [Some(a), _] => {
                    rotation = sop.rotations[0];
                    error = a;
                }
                [None, Some(b)] => {
                    rotation = sop.rotations[1];
                    error = b;
                }
                // Neither branch is in front: keep the previous rotation.
                [None, None] => {}
            }

            corrected = perspective_corrected(model, image, &rotation, &reference);
            let previous_shift = shift;
            shift = total_shift(&corrected, &previous);
            let delta = (shift - previous_shift).abs();
            trace!("posit iteration {iterations}: shift={shift:.5} delta={delta:.5}");

            converged = error.max < EXACT_FIT_PX || delta < eps;
        }

        let translation = origin_translation(model, &rotation, &reference);
        let error = reprojection_error(model, image, &rotation, &translation, focal)
            .ok_or(PoseSolveError::NoValidCandidate)?;

        Ok(PoseCandidate {
            rotation,
            translation,
            error,
        })
    }
}

/// Scaled-orthographic pose: two rotations and the translation of the
/// reference corner shared by both.
struct SopPose {
    rotations: [Matrix3<f64>; 2],
    reference: Vector3<f64>,
}

fn sop_pose(model: &MarkerModel, image: &[Point2<f64>; 4], focal: f64) -> Option<SopPose> {
    let x = Vector4::from_fn(|i, _| image[i].x - image[0].x);
    let y = Vector4::from_fn(|i, _| image[i].y - image[0].y);
    let i0 = model.object_pinv() * x;
    let j0 = model.object_pinv() * y;

    let i0i0 = i0.norm_squared();
    let j0j0 = j0.norm_squared();
    let i0j0 = i0.dot(&j0);

    // λ² - μ² = |J0|² - |I0|² and λμ = -I0·J0; take the non-negative root for λ².
    let diff = j0j0 - i0i0;
    let tol = FRONTAL_TOL * (i0i0 + j0j0);
    let (lambda, mu) = if diff.abs() <= tol && i0j0.abs() <= tol {
        // Frontal: both roots vanish, square roots would only amplify rounding noise.
        (0.0, 0.0)
    } else {
        let delta = diff * diff + 4.0 * i0j0 * i0j0;
        let lambda = (0.5 * (diff + delta.sqrt())).max(0.0).sqrt();
        let mu = if lambda > AXIS_EPS {
            -i0j0 / lambda
        } else {
            (i0i0 - j0j0).max(0.0).sqrt()
        };
        (lambda, mu)
    };

    let n = model.normal();
    let i_first = i0 + n * lambda;
    let j_first = j0 + n * mu;
    let scale = (i_first.norm() * j_first.norm()).sqrt();
    if !scale.is_finite() || scale <= AXIS_EPS {
        return None;
    }

    let first = rotation_from_axes(&i_first, &j_first)?;
    let second = rotation_from_axes(&(i0 - n * lambda), &(j0 - n * mu))?;

    Some(SopPose {
        rotations: [first, second],
        reference: Vector3::new(image[0].x / scale, image[0].y / scale, focal / scale),
    })
}

/// Orthonormal rotation whose first two rows follow `i` and `j`.
fn rotation_from_axes(i: &Vector3<f64>, j: &Vector3<f64>) -> Option<Matrix3<f64>> {
    let r1 = i.try_normalize(AXIS_EPS)?;
    let r2 = j.try_normalize(AXIS_EPS)?;
    let r3 = r1.cross(&r2).try_normalize(AXIS_EPS)?;
    let r2 = r3.cross(&r1);
    Some(Matrix3::from_rows(&[
        r1.transpose(),
        r2.transpose(),
        r3.transpose(),
    ]))
}

#[inline]
fn origin_translation(
    model: &MarkerModel,
    rotation: &Matrix3<f64>,
    reference: &Vector3<f64>,
) -> Vector3<f64> {
    reference - rotation * model.corners()[0]
}

fn in_front(model: &MarkerModel, rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> bool {
    model
        .corners()
        .iter()
        .all(|c| (rotation * c + translation).z > 0.0)
}

/// Image points scaled by `1 + ε_i`, `ε_i = (R₃ · (P_i - P_0)) / T_z`.
fn perspective_corrected(
    model: &MarkerModel,
    image: &[Point2<f64>; 4],
    rotation: &Matrix3<f64>,
    reference: &Vector3<f64>,
) -> [Point2<f64>; 4] {
    let depth_axis = rotation.row(2).transpose();
    let mut out = *image;
    for (i, p) in out.iter_mut().enumerate() {
        let eps = depth_axis.dot(&model.object_vector(i)) / reference.z;
        *p = Point2::new((1.0 + eps) * image[i].x, (1.0 + eps) * image[i].y);
    }
    out
}

fn total_shift(a: &[Point2<f64>; 4], b: &[Point2<f64>; 4]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(p, q)| (p.x - q.x).abs() + (p.y - q.y).abs())
        .sum()
}

/// Pixel reprojection residual, or `None` if any corner projects behind the camera.
fn reprojection_error(
    model: &MarkerModel,
    image: &[Point2<f64>; 4],
    rotation: &Matrix3<f64>,
    translation: &Vector3<f64>,
    focal: f64,
) -> Option<ReprojectionError> {
    let mut sum = 0.0;
    let mut max = 0.0_f64;
    for (corner, observed) in model.corners().iter().zip(image) {
        let p = rotation * corner + translation;
        if p.z <= 0.0 {
            return None;
        }
        let u = focal * p.x / p.z;
        let v = focal * p.y / p.z;
        let d = ((u - observed.x).powi(2) + (v - observed.y).powi(2)).sqrt();
        sum += d;
        max = max.max(d);
    }
    Some(ReprojectionError {
        mean: sum / 4.0,
        max,
    })
}

/// Reject corner sets that cannot define a plane: non-finite coordinates,
/// coincident neighbours, or an almost straight angle at any corner.
fn check_corners(points: &[Point2<f64>; 4], min_sine: f64) -> Result<(), Degeneracy> {
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(Degeneracy::NonFinite);
    }
    for k in 0..4 {
        let corner = points[k];
        let a = points[(k + 3) % 4] - corner;
        let b = points[(k + 1) % 4] - corner;
        let (la, lb) = (a.norm(), b.norm());
        if la <= f64::EPSILON || lb <= f64::EPSILON {
            return Err(Degeneracy::CoincidentCorners);
        }
        let sine = (a.x * b.y - a.y * b.x).abs() / (la * lb);
        if sine < min_sine {
            return Err(Degeneracy::Collinear);
        }
    }
    Ok(())
}
