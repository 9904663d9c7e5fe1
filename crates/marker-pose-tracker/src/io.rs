//! JSON helpers for session configuration files.

use std::fs;
use std::path::Path;

use crate::SessionConfig;

#[derive(thiserror::Error, Debug)]
pub enum ConfigIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SessionConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DisambiguationStrategy, MarkerTrackerConfig};

    #[test]
    fn config_survives_disk_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");

        let mut marker = MarkerTrackerConfig::new(12, 80.0);
        marker.disambiguation = DisambiguationStrategy::TranslationContinuity { min_jump: 25.0 };
        marker.output.scale = 0.001;
        let mut cfg = SessionConfig {
            markers: vec![marker, MarkerTrackerConfig::new(4, 50.0)],
            ..SessionConfig::default()
        };
        cfg.solver.focal_length = Some(900.0);

        cfg.write_json(&path).expect("write");
        let loaded = SessionConfig::load_json(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(
            &path,
            r#"{ "markers": [ { "marker_id": 1, "marker_size": 50 } ] }"#,
        )
        .expect("write");

        let cfg = SessionConfig::load_json(&path).expect("load");
        assert_eq!(cfg.solver.max_iterations, 100);
        assert_eq!(cfg.markers[0].max_frames_lost, 60);
        assert_eq!(
            cfg.markers[0].disambiguation,
            DisambiguationStrategy::default()
        );
    }

    #[test]
    fn missing_file_and_bad_json_are_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = SessionConfig::load_json(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(ConfigIoError::Io(_))));

        let path = dir.path().join("bad.json");
        fs::write(&path, "{ \"markers\": 3 }").expect("write");
        assert!(matches!(
            SessionConfig::load_json(&path),
            Err(ConfigIoError::Json(_))
        ));
    }
}
