use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Largest BPM the engine will ever report. Anything above is treated as a
/// corrupted estimate and triggers a reset.
pub const MAX_SANE_BPM: i32 = 500;

const HISTORY_RANGE: (usize, usize) = (4, 32);
const SMOOTHER_RANGE: (usize, usize) = (1, 32);

/// Tuning knobs for a single [`crate::Engine`].
///
/// The configuration is fixed for the lifetime of an engine; changing any of
/// these values means building a new engine, which also starts learning from
/// scratch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of beats kept for interval statistics.
    pub history_size: usize,
    /// Number of BPM samples averaged for the displayed value.
    pub smoother_size: usize,
    pub min_bpm: i32,
    pub max_bpm: i32,
    /// Enables the confidence-driven lock.
    pub sticky_enabled: bool,
    /// Confidence needed to qualify for the lock at 90 BPM and above.
    pub sticky_threshold_high: i32,
    /// Confidence needed to qualify for the lock below 90 BPM.
    pub sticky_threshold_low: i32,
    /// Consecutive qualifying cycles before the lock engages.
    pub min_sticky_count: i32,
    /// Start over whenever the track identity changes.
    pub reset_on_new_track: bool,
    /// Only output beats once the lock has engaged.
    pub only_sticky: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_size: 8,
            smoother_size: 8,
            min_bpm: 60,
            max_bpm: 200,
            sticky_enabled: false,
            sticky_threshold_high: 80,
            sticky_threshold_low: 60,
            min_sticky_count: 3,
            reset_on_new_track: true,
            only_sticky: false,
        }
    }
}

impl EngineConfig {
    /// Defaults with the sticky lock switched on.
    pub fn sticky_defaults() -> Self {
        Self {
            sticky_enabled: true,
            ..Self::default()
        }
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Returns a copy with every field clamped into its supported range.
    pub fn sanitized(&self) -> Self {
        let max_bpm = self.max_bpm.clamp(2, MAX_SANE_BPM);
        let sticky_threshold_high = self.sticky_threshold_high.clamp(0, 100);

        Self {
            history_size: self.history_size.clamp(HISTORY_RANGE.0, HISTORY_RANGE.1),
            smoother_size: self.smoother_size.clamp(SMOOTHER_RANGE.0, SMOOTHER_RANGE.1),
            min_bpm: self.min_bpm.clamp(1, max_bpm - 1),
            max_bpm,
            sticky_enabled: self.sticky_enabled,
            sticky_threshold_high,
            sticky_threshold_low: self.sticky_threshold_low.clamp(0, sticky_threshold_high),
            min_sticky_count: self.min_sticky_count.max(1),
            reset_on_new_track: self.reset_on_new_track,
            only_sticky: self.only_sticky,
        }
    }
}
