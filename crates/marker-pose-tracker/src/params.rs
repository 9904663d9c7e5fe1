//! Per-marker tracking configuration.

use marker_pose_solver::{MarkerModelError, SolverParamsError};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Interpolation weights applied when moving the emitted pose toward a new target.
///
/// `1.0` jumps straight to the target; smaller values trade latency for
/// stability.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParams {
    pub position_blend: f64,
    pub rotation_blend: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            position_blend: 0.5,
            rotation_blend: 0.5,
        }
    }
}

/// Conversion from marker-size units in the camera frame to renderer world units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputMapping {
    pub scale: f64,
    /// Negate Z so a camera looking down `-Z` sees the marker in front of it.
    pub flip_z: bool,
}

impl Default for OutputMapping {
    fn default() -> Self {
        Self {
            scale: 1.0,
            flip_z: true,
        }
    }
}

impl OutputMapping {
    /// Identity mapping: camera frame, marker units.
    pub const CAMERA: OutputMapping = OutputMapping {
        scale: 1.0,
        flip_z: false,
    };

    #[inline]
    pub fn apply(&self, position: &Vector3<f64>) -> Vector3<f64> {
        let mut out = position * self.scale;
        if self.flip_z {
            out.z = -out.z;
        }
        out
    }
}

/// How to choose between the two candidate poses of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisambiguationStrategy {
    /// Always keep the lower-error candidate.
    BestOnly,
    /// Prefer the candidate whose face normal stays close to the filtered
    /// normal of previous frames. The alternative wins only when its
    /// `1 - cos` distance is smaller by more than `margin`.
    NormalContinuity { margin: f64 },
    /// Prefer the candidate closer to the last accepted translation, but only
    /// once the best candidate jumps farther than `min_jump` marker units.
    TranslationContinuity { min_jump: f64 },
}

impl Default for DisambiguationStrategy {
    fn default() -> Self {
        DisambiguationStrategy::NormalContinuity { margin: 0.05 }
    }
}

fn default_max_frames_lost() -> u32 {
    60
}

fn default_normal_smoothing() -> f64 {
    0.7
}

/// Static configuration of one tracked marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerTrackerConfig {
    pub marker_id: u32,
    /// Physical side length. Translations are reported in the same unit.
    pub marker_size: f64,
    #[serde(default)]
    pub smoothing: SmoothingParams,
    /// Consecutive misses after which the marker is hidden.
    #[serde(default = "default_max_frames_lost")]
    pub max_frames_lost: u32,
    #[serde(default)]
    pub disambiguation: DisambiguationStrategy,
    /// Weight of the previous estimate in the face-normal moving average.
    #[serde(default = "default_normal_smoothing")]
    pub normal_smoothing: f64,
    #[serde(default)]
    pub output: OutputMapping,
}

impl MarkerTrackerConfig {
    /// Configuration with every tunable at its default.
    pub fn new(marker_id: u32, marker_size: f64) -> Self {
        Self {
            marker_id,
            marker_size,
            smoothing: SmoothingParams::default(),
            max_frames_lost: default_max_frames_lost(),
            disambiguation: DisambiguationStrategy::default(),
            normal_smoothing: default_normal_smoothing(),
            output: OutputMapping::default(),
        }
    }

    pub fn validate(&self) -> Result<(), TrackerConfigError> {
        let id = self.marker_id;
        if !self.marker_size.is_finite() || self.marker_size <= 0.0 {
            return Err(TrackerConfigError::InvalidMarkerSize {
                id,
                size: self.marker_size,
            });
        }
        for (name, value) in [
            ("position_blend", self.smoothing.position_blend),
            ("rotation_blend", self.smoothing.rotation_blend),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(TrackerConfigError::InvalidBlend { id, name, value });
            }
        }
        match self.disambiguation {
            DisambiguationStrategy::BestOnly => {}
            DisambiguationStrategy::NormalContinuity { margin } => {
                if !margin.is_finite() || margin < 0.0 {
                    return Err(TrackerConfigError::InvalidMargin { id, margin });
                }
            }
            DisambiguationStrategy::TranslationContinuity { min_jump } => {
                if !min_jump.is_finite() || min_jump < 0.0 {
                    return Err(TrackerConfigError::InvalidMinJump { id, min_jump });
                }
            }
        }
        if !(0.0..1.0).contains(&self.normal_smoothing) {
            return Err(TrackerConfigError::InvalidNormalSmoothing {
                id,
                value: self.normal_smoothing,
            });
        }
        if !self.output.scale.is_finite() || self.output.scale <= 0.0 {
            return Err(TrackerConfigError::InvalidOutputScale {
                id,
                scale: self.output.scale,
            });
        }
        Ok(())
    }
}

/// Configuration validation errors. Construction fails instead of falling
/// back to defaults.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TrackerConfigError {
    #[error("marker {id}: marker_size must be finite and > 0 (got {size})")]
    InvalidMarkerSize { id: u32, size: f64 },
    #[error("marker {id}: {name} must be in (0, 1] (got {value})")]
    InvalidBlend {
        id: u32,
        name: &'static str,
        value: f64,
    },
    #[error("marker {id}: normal continuity margin must be finite and >= 0 (got {margin})")]
    InvalidMargin { id: u32, margin: f64 },
    #[error("marker {id}: translation continuity min_jump must be finite and >= 0 (got {min_jump})")]
    InvalidMinJump { id: u32, min_jump: f64 },
    #[error("marker {id}: normal_smoothing must be in [0, 1) (got {value})")]
    InvalidNormalSmoothing { id: u32, value: f64 },
    #[error("marker {id}: output scale must be finite and > 0 (got {scale})")]
    InvalidOutputScale { id: u32, scale: f64 },
    #[error("marker {0} is configured more than once")]
    DuplicateMarkerId(u32),
    #[error(transparent)]
    Model(#[from] MarkerModelError),
    #[error("invalid solver parameters: {0}")]
    Solver(#[from] SolverParamsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = MarkerTrackerConfig::new(7, 50.0);
        assert_eq!(cfg.smoothing.position_blend, 0.5);
        assert_eq!(cfg.smoothing.rotation_blend, 0.5);
        assert_eq!(cfg.max_frames_lost, 60);
        assert_eq!(cfg.normal_smoothing, 0.7);
        assert!(cfg.output.flip_z);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let raw = r#"{
            "marker_id": 3,
            "marker_size": 80.0,
            "smoothing": { "rotation_blend": 0.25 },
            "disambiguation": { "kind": "translation_continuity", "min_jump": 15.0 }
        }"#;
        let cfg: MarkerTrackerConfig = serde_json::from_str(raw).expect("valid json");
        assert_eq!(cfg.smoothing.position_blend, 0.5);
        assert_eq!(cfg.smoothing.rotation_blend, 0.25);
        assert_eq!(
            cfg.disambiguation,
            DisambiguationStrategy::TranslationContinuity { min_jump: 15.0 }
        );
        assert_eq!(cfg.max_frames_lost, 60);
    }

    #[test]
    fn unknown_strategy_fails_to_parse() {
        let raw = r#"{ "marker_id": 1, "marker_size": 10.0, "disambiguation": { "kind": "coin_flip" } }"#;
        assert!(serde_json::from_str::<MarkerTrackerConfig>(raw).is_err());
    }

    #[test]
    fn best_only_parses_without_fields() {
        let raw = r#"{ "kind": "best_only" }"#;
        let s: DisambiguationStrategy = serde_json::from_str(raw).expect("valid json");
        assert_eq!(s, DisambiguationStrategy::BestOnly);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut cfg = MarkerTrackerConfig::new(1, 0.0);
        assert!(matches!(
            cfg.validate(),
            Err(TrackerConfigError::InvalidMarkerSize { id: 1, .. })
        ));

        cfg.marker_size = 10.0;
        cfg.smoothing.position_blend = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(TrackerConfigError::InvalidBlend {
                name: "position_blend",
                ..
            })
        ));

        cfg.smoothing.position_blend = 1.0;
        cfg.smoothing.rotation_blend = 1.5;
        assert!(cfg.validate().is_err());

        cfg.smoothing.rotation_blend = 1.0;
        cfg.disambiguation = DisambiguationStrategy::NormalContinuity { margin: -0.1 };
        assert!(matches!(
            cfg.validate(),
            Err(TrackerConfigError::InvalidMargin { .. })
        ));

        cfg.disambiguation = DisambiguationStrategy::TranslationContinuity {
            min_jump: f64::NAN,
        };
        assert!(matches!(
            cfg.validate(),
            Err(TrackerConfigError::InvalidMinJump { .. })
        ));

        cfg.disambiguation = DisambiguationStrategy::BestOnly;
        cfg.normal_smoothing = 1.0;
        assert!(matches!(
            cfg.validate(),
            Err(TrackerConfigError::InvalidNormalSmoothing { .. })
        ));

        cfg.normal_smoothing = 0.0;
        cfg.output.scale = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(TrackerConfigError::InvalidOutputScale { .. })
        ));

        cfg.output.scale = 0.001;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn output_mapping_scales_then_flips_depth() {
        let p = Vector3::new(1.0, -2.0, 800.0);
        assert_eq!(
            OutputMapping::default().apply(&p),
            Vector3::new(1.0, -2.0, -800.0)
        );
        let mm_to_m = OutputMapping {
            scale: 0.001,
            flip_z: false,
        };
        approx::assert_relative_eq!(
            mm_to_m.apply(&p),
            Vector3::new(0.001, -0.002, 0.8),
            epsilon = 1e-12
        );
        assert_eq!(OutputMapping::CAMERA.apply(&p), p);
    }
}
