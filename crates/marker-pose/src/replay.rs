//! Replay a recorded detection log through a [`TrackingSession`].
//!
//! The input is JSON lines, one [`DetectionFrame`] per line; blank lines are
//! skipped. The output is JSON lines, one [`FrameReport`] per processed frame.

use std::io::{BufRead, Write};

use log::{debug, info};
use marker_pose_core::{FrameDetections, FrameSize, MarkerDetection};
use marker_pose_tracker::{FrameResult, TrackMiss, TrackingSession};
use serde::{Deserialize, Serialize};

/// One recorded frame of detector output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub markers: Vec<MarkerDetection>,
}

impl DetectionFrame {
    #[inline]
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    pub fn detections(&self) -> FrameDetections<'_> {
        FrameDetections::new(self.size(), &self.markers)
    }
}

/// Pose of one tracked marker as written to the report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseReport {
    pub id: u32,
    pub position: [f64; 3],
    /// Unit quaternion as `[x, y, z, w]`.
    pub orientation: [f64; 4],
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub miss: Option<serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Zero-based index among processed (non-blank) lines.
    pub frame: u64,
    pub poses: Vec<PoseReport>,
}

impl FrameReport {
    pub fn from_result(frame: u64, result: &FrameResult) -> Result<Self, serde_json::Error> {
        let poses = result
            .markers
            .iter()
            .map(|m| {
                let p = &m.pose.position;
                let q = m.pose.orientation.quaternion();
                Ok(PoseReport {
                    id: m.marker_id,
                    position: [p.x, p.y, p.z],
                    orientation: [q.i, q.j, q.k, q.w],
                    visible: m.pose.visible,
                    miss: m.miss.as_ref().map(serde_json::to_value).transpose()?,
                })
            })
            .collect::<Result<Vec<_>, serde_json::Error>>()?;
        Ok(Self { frame, poses })
    }
}

/// Counters accumulated over a replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: u64,
    /// Marker-frames that resolved a pose.
    pub resolved: u64,
    /// Marker-frames that missed, for any reason.
    pub misses: u64,
    /// Misses where the marker was detected but no pose could be solved.
    pub solve_failures: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Feed every frame of `input` through `session`, writing one report line per
/// frame to `output`.
pub fn replay<R: BufRead, W: Write>(
    session: &mut TrackingSession,
    input: R,
    mut output: W,
) -> Result<ReplaySummary, ReplayError> {
    let mut summary = ReplaySummary::default();

    for (idx, line) in input.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let frame: DetectionFrame =
            serde_json::from_str(trimmed).map_err(|source| ReplayError::Parse {
                line: idx + 1,
                source,
            })?;

        let result = session.process_frame(&frame.detections());
        for m in &result.markers {
            match m.miss {
                None => summary.resolved += 1,
                Some(miss) => {
                    summary.misses += 1;
                    if matches!(miss, TrackMiss::Solve { .. }) {
                        summary.solve_failures += 1;
                    }
                }
            }
        }

        let report = FrameReport::from_result(summary.frames, &result)?;
        serde_json::to_writer(&mut output, &report)?;
        output.write_all(b"\n")?;
        debug!(
            "frame {}: {} marker(s) visible",
            summary.frames,
            result.visible_count()
        );
        summary.frames += 1;
    }
    output.flush()?;

    info!(
        "replayed {} frame(s): {} resolved, {} missed ({} solve failures)",
        summary.frames, summary.resolved, summary.misses, summary.solve_failures
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marker_pose_tracker::{MarkerTrackerConfig, SessionConfig};

    const FRONTAL: &str = r#"{"width":640,"height":480,"markers":[{"id":1,"corners":[[300,220],[340,220],[340,260],[300,260]]}]}"#;

    fn session() -> TrackingSession {
        TrackingSession::new(SessionConfig {
            markers: vec![MarkerTrackerConfig::new(1, 50.0)],
            ..SessionConfig::default()
        })
        .expect("session")
    }

    #[test]
    fn writes_one_report_per_frame() {
        let input = format!("{FRONTAL}\n\n{{\"width\":640,\"height\":480}}\n");
        let mut out = Vec::new();
        let summary = replay(&mut session(), input.as_bytes(), &mut out).expect("replay");

        assert_eq!(summary.frames, 2);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.misses, 1);

        let text = String::from_utf8(out).expect("utf8");
        let reports: Vec<FrameReport> = text
            .lines()
            .map(|l| serde_json::from_str(l).expect("report"))
            .collect();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].frame, 0);
        assert!(reports[0].poses[0].visible);
        assert!((reports[0].poses[0].position[2] + 800.0).abs() < 1e-6);
        assert!(reports[0].poses[0].miss.is_none());
        let miss = reports[1].poses[0].miss.as_ref().expect("miss");
        assert_eq!(miss["kind"], "missing_marker");
    }

    #[test]
    fn malformed_line_reports_its_number() {
        let input = format!("{FRONTAL}\nnot json\n");
        let err = replay(&mut session(), input.as_bytes(), Vec::new()).expect_err("bad line");
        assert!(matches!(err, ReplayError::Parse { line: 2, .. }));
        assert!(err.to_string().starts_with("line 2:"));
    }
}
