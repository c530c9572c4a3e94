use crate::config::MAX_SANE_BPM;

use super::MissedBeatInterpolator;

/// Triggers closer together than one beat at the sanity ceiling are detector
/// chatter, not beats.
pub const MIN_BEAT_INTERVAL_MS: u64 = 60_000 / MAX_SANE_BPM as u64;

/// Outcome of judging one trigger against the learned beat period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Too close to the previous beat to be considered at all.
    Ignore,
    /// Shorter than half a period. Recorded as a discrimination.
    Reject,
    /// Fits the period, possibly after interpolating missed beats.
    Accept,
    /// Gap too long to explain; the beat restarts the interval chain.
    Resync,
}

/// Validates beat intervals and remembers recent rejections in a small ring.
#[derive(Debug, Clone)]
pub struct BeatDiscriminator {
    flags: Vec<bool>,
    cursor: usize,
}

impl BeatDiscriminator {
    pub fn new(capacity: usize) -> Self {
        Self {
            flags: vec![false; capacity.max(1)],
            cursor: 0,
        }
    }

    /// Judges a trigger arriving `this_len` ms after the last accepted beat
    /// (`None` for the very first beat) given the learned average `avg`.
    pub fn judge(
        &mut self,
        avg: u32,
        this_len: Option<u64>,
        interpolator: &MissedBeatInterpolator,
    ) -> Verdict {
        let Some(this_len) = this_len else {
            self.record(false);
            return Verdict::Accept;
        };

        if this_len < MIN_BEAT_INTERVAL_MS {
            return Verdict::Ignore;
        }

        let avg_ms = u64::from(avg);
        let verdict = if avg_ms == 0 {
            Verdict::Accept
        } else if this_len < avg_ms.div_ceil(2) {
            Verdict::Reject
        } else if this_len <= avg_ms * 2 || interpolator.missed_beats(avg, this_len).is_some() {
            Verdict::Accept
        } else {
            Verdict::Resync
        };

        self.record(verdict == Verdict::Reject);
        verdict
    }

    /// Number of rejections within the last `capacity` judgements.
    pub fn flagged_count(&self) -> usize {
        self.flags.iter().filter(|&&flag| flag).count()
    }

    pub fn clear_flags(&mut self) {
        self.flags.iter_mut().for_each(|flag| *flag = false);
    }

    pub fn reset(&mut self) {
        self.clear_flags();
        self.cursor = 0;
    }

    fn record(&mut self, rejected: bool) {
        self.flags[self.cursor] = rejected;
        self.cursor = (self.cursor + 1) % self.flags.len();
    }
}
