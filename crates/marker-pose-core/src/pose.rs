use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Reprojection residual of a pose against its correspondence, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReprojectionError {
    /// Mean Euclidean distance between projected model corners and observations.
    pub mean: f64,
    /// Largest single-corner distance.
    pub max: f64,
}

/// One rigid transform consistent with the observed marker corners.
///
/// `rotation` maps marker-frame vectors into the camera frame; `translation`
/// is the marker center in the camera frame, in the units of the configured
/// marker size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseCandidate {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
    pub error: ReprojectionError,
}

impl PoseCandidate {
    /// Direction the marker's front face points to, in camera coordinates.
    #[inline]
    pub fn face_normal(&self) -> Vector3<f64> {
        face_normal(&self.rotation)
    }

    /// Rotation as a unit quaternion.
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        quaternion_from_rotation(&self.rotation)
    }
}

/// Final, per-frame artifact handed to the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPose {
    /// Smoothed position in renderer world units.
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub visible: bool,
}

impl ResolvedPose {
    /// Pose reported for a marker that has never been resolved.
    pub fn hidden() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            visible: false,
        }
    }
}

/// Third column of `rotation`: the marker +Z axis expressed in camera space.
#[inline]
pub fn face_normal(rotation: &Matrix3<f64>) -> Vector3<f64> {
    rotation.column(2).into_owned()
}

/// Convert a (near) orthonormal matrix into a unit quaternion.
pub fn quaternion_from_rotation(rotation: &Matrix3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*rotation))
}

/// Frobenius distance between `RᵀR` and identity.
pub fn orthonormality_error(rotation: &Matrix3<f64>) -> f64 {
    (rotation.transpose() * rotation - Matrix3::identity()).norm()
}
