use serde::{Deserialize, Serialize};

use crate::analysis::{
    beat_period_ms, BeatDiscriminator, BeatPredictor, BpmEstimator, Correction,
    MissedBeatInterpolator, OctaveCorrector, Smoother, StickyLockController, Verdict,
};
use crate::config::EngineConfig;
use crate::history::{BeatHistory, BeatKind};

/// Coarse lifecycle of an [`Engine`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Still collecting beats; no tempo is reported.
    #[default]
    Learning,
    /// Reporting a tempo and confidence every cycle.
    Guessing,
    /// Sticky lock engaged; the reported tempo is frozen.
    Locked,
}

/// Read-only view handed to renderers after every update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Smoothed tempo, 0 while learning.
    pub bpm: i32,
    pub confidence: i32,
    pub is_locked: bool,
    pub predicted_next_beat_ms: Option<u64>,
    pub phase: Phase,
    /// A refined beat should be shown on this update.
    pub beat: bool,
}

/// Every tracked quantity, gathered into one value for inspection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineState {
    pub avg_interval_ms: u32,
    pub confidence: i32,
    pub confidence1: i32,
    pub confidence2: i32,
    pub intervals_used: usize,
    /// Latest unsmoothed tempo.
    pub bpm: i32,
    /// Smoothed tempo used for display and prediction.
    pub prediction_bpm: i32,
    pub last_beat_timestamp: Option<u64>,
    pub insertion_count: u64,
    pub half_count: i32,
    pub double_count: i32,
    pub sticky_qualifying_count: i32,
    pub is_locked: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tracking {
    avg_interval_ms: u32,
    confidence: i32,
    confidence1: i32,
    confidence2: i32,
    intervals_used: usize,
    bpm: i32,
    prediction_bpm: i32,
    last_beat_ms: Option<u64>,
    last_output_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
enum Octave {
    Up,
    Down,
}

/// Real-time tempo tracker fed with timestamped beat triggers.
///
/// The engine never reads a clock. Callers pass the timestamp of every update,
/// either once per detected onset or once per frame, and receive an
/// [`EngineSnapshot`]. Identical inputs always produce identical snapshots.
/// Storage is allocated once at construction.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    history: BeatHistory,
    discriminator: BeatDiscriminator,
    interpolator: MissedBeatInterpolator,
    smoother: Smoother,
    octave: OctaveCorrector,
    sticky: StickyLockController,
    tracking: Tracking,
    phase: Phase,
    last_track: Option<String>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Builds an engine. Out-of-range configuration values are clamped.
    pub fn new(config: EngineConfig) -> Self {
        let config = config.sanitized();
        Self {
            history: BeatHistory::new(config.history_size),
            discriminator: BeatDiscriminator::new(config.history_size),
            interpolator: MissedBeatInterpolator::new(config.history_size),
            smoother: Smoother::new(config.smoother_size),
            octave: OctaveCorrector::new(config.min_bpm, config.max_bpm, config.history_size),
            sticky: StickyLockController::new(
                config.sticky_enabled,
                config.sticky_threshold_high,
                config.sticky_threshold_low,
                config.min_sticky_count,
            ),
            tracking: Tracking::default(),
            phase: Phase::Learning,
            last_track: None,
            config,
        }
    }

    /// Returns the effective (clamped) configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn history(&self) -> &BeatHistory {
        &self.history
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> EngineState {
        EngineState {
            avg_interval_ms: self.tracking.avg_interval_ms,
            confidence: self.tracking.confidence,
            confidence1: self.tracking.confidence1,
            confidence2: self.tracking.confidence2,
            intervals_used: self.tracking.intervals_used,
            bpm: self.tracking.bpm,
            prediction_bpm: self.tracking.prediction_bpm,
            last_beat_timestamp: self.tracking.last_beat_ms,
            insertion_count: self.history.insertion_count(),
            half_count: self.octave.half_count(),
            double_count: self.octave.double_count(),
            sticky_qualifying_count: self.sticky.qualifying_count(),
            is_locked: self.sticky.is_locked(),
        }
    }

    /// Advances the tracker to `timestamp_ms`. `is_beat_trigger` reports
    /// whether the onset detector fired for this instant.
    pub fn update(&mut self, timestamp_ms: u64, is_beat_trigger: bool) -> EngineSnapshot {
        let accepted = is_beat_trigger && self.register_trigger(timestamp_ms);
        let accepted = accepted && self.run_cycle();
        let beat = self.refine_beat(timestamp_ms, accepted);

        self.update_phase();
        self.snapshot_with(beat)
    }

    /// Current snapshot without advancing time.
    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot_with(false)
    }

    pub fn predict_next_beat(&self) -> Option<u64> {
        BeatPredictor::predict_next_beat(self.tracking.last_beat_ms, self.tracking.prediction_bpm)
    }

    /// Forgets everything learned, including the lock. Configuration is kept.
    pub fn reset(&mut self) {
        self.history.clear();
        self.discriminator.reset();
        self.smoother.clear();
        self.octave.reset();
        self.sticky.reset();
        self.tracking = Tracking::default();
        if self.phase != Phase::Learning {
            tracing::debug!(from = ?self.phase, "tempo engine reset");
        }
        self.phase = Phase::Learning;
    }

    /// Reports the identity of the track now playing. Returns `true` when this
    /// caused a reset.
    pub fn on_track_changed(&mut self, name: &str) -> bool {
        if self.last_track.as_deref() == Some(name) {
            return false;
        }
        self.last_track = Some(name.to_owned());

        if !self.config.reset_on_new_track {
            return false;
        }
        tracing::info!(track = name, "new track, relearning tempo");
        self.reset();
        true
    }

    fn register_trigger(&mut self, timestamp_ms: u64) -> bool {
        let avg = self.tracking.avg_interval_ms;
        let this_len = self
            .tracking
            .last_beat_ms
            .map(|last| timestamp_ms.saturating_sub(last));

        match self.discriminator.judge(avg, this_len, &self.interpolator) {
            Verdict::Ignore | Verdict::Reject => false,
            Verdict::Accept => {
                if let Some(this_len) = this_len {
                    self.interpolator
                        .fill(&mut self.history, avg, timestamp_ms, this_len);
                }
                self.history.insert(timestamp_ms, BeatKind::Real, 0);
                self.tracking.last_beat_ms = Some(timestamp_ms);
                true
            }
            Verdict::Resync => {
                tracing::debug!(gap_ms = ?this_len, avg, "beat chain broken, resyncing");
                self.history.insert(timestamp_ms, BeatKind::Skipped, 0);
                self.tracking.last_beat_ms = Some(timestamp_ms);
                true
            }
        }
    }

    /// Re-estimates after a beat was added. Returns `false` if the estimate
    /// was discarded by a reset.
    fn run_cycle(&mut self) -> bool {
        let Some(estimate) = BpmEstimator::estimate(&self.history) else {
            return true;
        };

        self.tracking.avg_interval_ms = estimate.avg_interval_ms;
        self.tracking.confidence = estimate.confidence;
        self.tracking.confidence1 = estimate.confidence1;
        self.tracking.confidence2 = estimate.confidence2;
        self.tracking.intervals_used = estimate.intervals_used;

        let Some(bpm) = estimate.bpm else {
            return true;
        };

        let changed = bpm != self.tracking.bpm;
        if changed {
            self.tracking.bpm = bpm;
            self.smoother.push(bpm);
        }
        self.refresh_prediction();

        let correction = self.octave.evaluate(
            self.tracking.bpm,
            self.tracking.prediction_bpm,
            self.discriminator.flagged_count(),
            self.sticky.is_locked(),
        );
        match correction {
            Correction::None => {}
            Correction::Reset => {
                tracing::warn!(
                    bpm = self.tracking.bpm,
                    prediction_bpm = self.tracking.prediction_bpm,
                    "tempo estimate out of bounds, resetting"
                );
                self.reset();
                return false;
            }
            Correction::Double { off_course } => {
                if off_course {
                    self.discriminator.clear_flags();
                }
                self.shift_octave(Octave::Up);
            }
            Correction::Half => self.shift_octave(Octave::Down),
        }

        if changed
            && self
                .sticky
                .observe(self.tracking.confidence, self.tracking.prediction_bpm)
        {
            tracing::info!(
                bpm = self.tracking.prediction_bpm,
                confidence = self.tracking.confidence,
                "tempo locked"
            );
        }
        true
    }

    fn refresh_prediction(&mut self) {
        if !self.sticky.is_locked() {
            self.tracking.prediction_bpm = self.smoother.average();
        }
    }

    fn shift_octave(&mut self, octave: Octave) {
        let tracking = &mut self.tracking;
        match octave {
            Octave::Up => {
                tracking.avg_interval_ms = (tracking.avg_interval_ms / 2).max(1);
                tracking.bpm *= 2;
                self.history.rescale(1, 2);
                self.smoother.rescale(2, 1);
                if self.sticky.is_locked() {
                    tracking.prediction_bpm *= 2;
                }
            }
            Octave::Down => {
                tracking.avg_interval_ms = tracking.avg_interval_ms.saturating_mul(2);
                tracking.bpm /= 2;
                self.history.rescale(2, 1);
                self.smoother.rescale(1, 2);
                if self.sticky.is_locked() {
                    tracking.prediction_bpm /= 2;
                }
            }
        }
        tracing::debug!(
            ?octave,
            bpm = self.tracking.bpm,
            avg_interval_ms = self.tracking.avg_interval_ms,
            "octave corrected"
        );
        self.refresh_prediction();
    }

    /// Decides whether a beat should be shown now: accepted triggers, plus
    /// predicted beats while the detector stays silent.
    fn refine_beat(&mut self, timestamp_ms: u64, accepted: bool) -> bool {
        if self.config.only_sticky && !self.sticky.is_locked() {
            return false;
        }

        let period = beat_period_ms(self.tracking.prediction_bpm);
        let last_output = self.tracking.last_output_ms;

        let due = if accepted {
            match (period, last_output) {
                (Some(period), Some(last)) => timestamp_ms.saturating_sub(last) >= period / 2,
                _ => true,
            }
        } else {
            match (period, self.tracking.last_beat_ms) {
                (Some(period), Some(last_beat)) => {
                    let reference = last_output.map_or(last_beat, |last| last.max(last_beat));
                    timestamp_ms >= reference.saturating_add(period)
                }
                _ => false,
            }
        };

        if due {
            self.tracking.last_output_ms = Some(timestamp_ms);
        }
        due
    }

    fn update_phase(&mut self) {
        let phase = if self.sticky.is_locked() {
            Phase::Locked
        } else if self.tracking.prediction_bpm > 0 {
            Phase::Guessing
        } else {
            Phase::Learning
        };

        if phase != self.phase {
            tracing::debug!(from = ?self.phase, to = ?phase, "tempo phase changed");
            self.phase = phase;
        }
    }

    fn snapshot_with(&self, beat: bool) -> EngineSnapshot {
        EngineSnapshot {
            bpm: self.tracking.prediction_bpm,
            confidence: self.tracking.confidence,
            is_locked: self.sticky.is_locked(),
            predicted_next_beat_ms: self.predict_next_beat(),
            phase: self.phase,
            beat,
        }
    }
}
