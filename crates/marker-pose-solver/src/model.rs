//! Square marker model and the quantities POSIT precomputes from it.

use nalgebra::{Matrix3x4, Matrix4x3, Vector3};

use crate::MarkerModelError;

const PINV_EPS: f64 = 1e-9;

/// Planar square marker centered on its own origin, lying in `z = 0`.
///
/// Corner order matches the detector convention seen from the front:
/// top-left `(-h, h)`, top-right `(h, h)`, bottom-right `(h, -h)`,
/// bottom-left `(-h, -h)` with `h = size / 2`.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerModel {
    size: f64,
    corners: [Vector3<f64>; 4],
    /// Pseudo-inverse of the object vectors `P_i - P_0` (rows).
    object_pinv: Matrix3x4<f64>,
    /// Unit normal of the model plane from the first non-degenerate pair of
    /// object vectors.
    normal: Vector3<f64>,
}

impl MarkerModel {
    /// Build the model of a square marker with side `size`.
    pub fn square(size: f64) -> Result<Self, MarkerModelError> {
        if !size.is_finite() || size <= 0.0 {
            return Err(MarkerModelError::InvalidSize(size));
        }
        let h = size / 2.0;
        let corners = [
            Vector3::new(-h, h, 0.0),
            Vector3::new(h, h, 0.0),
            Vector3::new(h, -h, 0.0),
            Vector3::new(-h, -h, 0.0),
        ];

        let reference = corners[0];
        let vectors = corners.map(|c| c - reference);
        let object_vectors = Matrix4x3::from_fn(|r, c| vectors[r][c]);
        let object_pinv = object_vectors
            .pseudo_inverse(PINV_EPS)
            .map_err(|_| MarkerModelError::Singular)?;

        let normal = vectors[2..]
            .iter()
            .find_map(|v| vectors[1].cross(v).try_normalize(PINV_EPS))
            .ok_or(MarkerModelError::Singular)?;

        Ok(Self {
            size,
            corners,
            object_pinv,
            normal,
        })
    }

    /// Side length, in the units every translation is reported in.
    #[inline]
    pub fn size(&self) -> f64 {
        self.size
    }

    #[inline]
    pub fn corners(&self) -> &[Vector3<f64>; 4] {
        &self.corners
    }

    /// Vector from the reference (first) corner to corner `i`.
    #[inline]
    pub fn object_vector(&self, i: usize) -> Vector3<f64> {
        self.corners[i] - self.corners[0]
    }

    #[inline]
    pub(crate) fn object_pinv(&self) -> &Matrix3x4<f64> {
        &self.object_pinv
    }

    #[inline]
    pub(crate) fn normal(&self) -> &Vector3<f64> {
        &self.normal
    }
}
