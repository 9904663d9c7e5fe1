use serde::{Deserialize, Serialize};

/// Where a marker stands in the show/hide hysteresis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityState {
    /// Never resolved; counts the misses so far.
    Unseen(u32),
    /// Resolved in the most recent frame.
    Detected,
    /// Consecutive misses since the last resolved frame (`>= 1`).
    Lost(u32),
}

/// Keeps a marker visible through short detection dropouts.
#[derive(Clone, Debug)]
pub struct VisibilityTracker {
    max_frames_lost: u32,
    state: VisibilityState,
}

impl VisibilityTracker {
    pub fn new(max_frames_lost: u32) -> Self {
        Self {
            max_frames_lost,
            state: VisibilityState::Unseen(0),
        }
    }

    pub fn record_detection(&mut self) {
        self.state = VisibilityState::Detected;
    }

    pub fn record_miss(&mut self) {
        self.state = match self.state {
            VisibilityState::Unseen(n) => VisibilityState::Unseen(n.saturating_add(1)),
            VisibilityState::Detected => VisibilityState::Lost(1),
            VisibilityState::Lost(n) => VisibilityState::Lost(n.saturating_add(1)),
        };
    }

    #[inline]
    pub fn state(&self) -> VisibilityState {
        self.state
    }

    /// Consecutive misses; zero only right after a resolved frame or before
    /// the first frame.
    #[inline]
    pub fn frames_lost(&self) -> u32 {
        match self.state {
            VisibilityState::Unseen(n) | VisibilityState::Lost(n) => n,
            VisibilityState::Detected => 0,
        }
    }

    pub fn is_visible(&self) -> bool {
        match self.state {
            VisibilityState::Unseen(_) => false,
            VisibilityState::Detected => true,
            VisibilityState::Lost(n) => n <= self.max_frames_lost,
        }
    }
}
