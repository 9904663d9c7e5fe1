//! Choosing one of the two mirror-image candidates of a planar pose.
//!
//! A single view of a square marker is consistent with two poses whose face
//! normals are reflected about the line of sight. The lower-error candidate
//! flips between them from frame to frame when the marker is small or seen
//! almost frontally, so the choice is anchored to what was accepted before.

use log::debug;
use marker_pose_core::PoseCandidate;
use marker_pose_solver::PoseSolution;
use nalgebra::Vector3;

use crate::{AcceptedPose, DisambiguationStrategy};

/// Which candidate of a [`PoseSolution`] was kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    Best,
    Alternative,
}

#[derive(Clone, Copy, Debug)]
pub struct PoseDisambiguator {
    strategy: DisambiguationStrategy,
    normal_smoothing: f64,
}

impl PoseDisambiguator {
    pub fn new(strategy: DisambiguationStrategy, normal_smoothing: f64) -> Self {
        Self {
            strategy,
            normal_smoothing,
        }
    }

    /// Decide between the candidates given the previously accepted pose.
    ///
    /// Without history the best candidate is always kept.
    pub fn choose(&self, solution: &PoseSolution, prior: Option<&AcceptedPose>) -> Choice {
        let Some(prior) = prior else {
            return Choice::Best;
        };
        if solution.is_unambiguous() {
            return Choice::Best;
        }
        let (best, alt) = (&solution.best, &solution.alternative);

        match self.strategy {
            DisambiguationStrategy::BestOnly => Choice::Best,
            DisambiguationStrategy::NormalContinuity { margin } => {
                let best_score = normal_distance(&best.face_normal(), &prior.stable_normal);
                let alt_score = normal_distance(&alt.face_normal(), &prior.stable_normal);
                if alt_score + margin < best_score {
                    Choice::Alternative
                } else {
                    Choice::Best
                }
            }
            DisambiguationStrategy::TranslationContinuity { min_jump } => {
                let best_jump = (best.translation - prior.translation).norm();
                let alt_jump = (alt.translation - prior.translation).norm();
                if best_jump > min_jump && alt_jump < best_jump {
                    Choice::Alternative
                } else {
                    Choice::Best
                }
            }
        }
    }

    /// Choose a candidate and record it as the new accepted pose.
    pub fn resolve(
        &self,
        solution: &PoseSolution,
        accepted: &mut Option<AcceptedPose>,
    ) -> PoseCandidate {
        let choice = self.choose(solution, accepted.as_ref());
        let chosen = match choice {
            Choice::Best => solution.best,
            Choice::Alternative => {
                debug!(
                    "keeping alternative candidate (err {:.3}px vs {:.3}px)",
                    solution.alternative.error.mean, solution.best.error.mean
                );
                solution.alternative
            }
        };

        let normal = chosen.face_normal();
        let stable_normal = match accepted {
            Some(prev) => blend_normal(&prev.stable_normal, &normal, self.normal_smoothing),
            None => normal,
        };
        *accepted = Some(AcceptedPose {
            rotation: chosen.rotation,
            translation: chosen.translation,
            stable_normal,
        });
        chosen
    }
}

/// `1 - cos` of the angle between two unit vectors.
#[inline]
fn normal_distance(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    1.0 - a.dot(b).clamp(-1.0, 1.0)
}

/// Exponential moving average of unit normals, renormalised. Falls back to
/// `current` when the two cancel out.
fn blend_normal(previous: &Vector3<f64>, current: &Vector3<f64>, weight: f64) -> Vector3<f64> {
    (previous * weight + current * (1.0 - weight))
        .try_normalize(1e-12)
        .unwrap_or(*current)
}
