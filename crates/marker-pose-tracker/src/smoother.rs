//! Frame-to-frame interpolation of the emitted pose.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::SmoothingParams;

const HEMISPHERE_EPS: f64 = 1e-6;
const SLERP_EPS: f64 = 1e-9;

/// Position and orientation as held by the smoother (camera frame, marker units).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmoothedPose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

/// LERP/SLERP smoother with a first-update snap.
#[derive(Clone, Debug)]
pub struct PoseSmoother {
    params: SmoothingParams,
    current: Option<SmoothedPose>,
}

impl PoseSmoother {
    pub fn new(params: SmoothingParams) -> Self {
        Self {
            params,
            current: None,
        }
    }

    /// Move the current pose toward `target` and return it.
    ///
    /// The very first call copies the target without blending.
    pub fn update(&mut self, target: SmoothedPose) -> SmoothedPose {
        let target = SmoothedPose {
            position: target.position,
            orientation: canonical_hemisphere(target.orientation),
        };

        let next = match self.current {
            None => target,
            Some(current) => SmoothedPose {
                position: current
                    .position
                    .lerp(&target.position, self.params.position_blend),
                orientation: canonical_hemisphere(
                    current
                        .orientation
                        .try_slerp(&target.orientation, self.params.rotation_blend, SLERP_EPS)
                        .unwrap_or(target.orientation),
                ),
            },
        };
        self.current = Some(next);
        next
    }

    /// Last pose returned by [`PoseSmoother::update`], if any.
    #[inline]
    pub fn current(&self) -> Option<&SmoothedPose> {
        self.current.as_ref()
    }

    /// Whether the next update snaps instead of blending.
    #[inline]
    pub fn is_first_update(&self) -> bool {
        self.current.is_none()
    }
}

/// Pick the representative of `{q, -q}` with `w > 0`.
///
/// Near `w = 0` the sign of the first vector component that is not negligible
/// decides, so a half-turn does not flicker between the two representatives.
pub fn canonical_hemisphere(q: UnitQuaternion<f64>) -> UnitQuaternion<f64> {
    let c = q.quaternion();
    let negate = if c.w.abs() < HEMISPHERE_EPS {
        [c.i, c.j, c.k]
            .into_iter()
            .find(|v| v.abs() >= HEMISPHERE_EPS)
            .is_some_and(|v| v < 0.0)
    } else {
        c.w < 0.0
    };
    if negate {
        UnitQuaternion::new_unchecked(Quaternion::new(-c.w, -c.i, -c.j, -c.k))
    } else {
        q
    }
}
