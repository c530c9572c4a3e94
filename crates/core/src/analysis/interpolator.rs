use crate::history::{BeatHistory, BeatKind};

/// Relative tolerance when matching a gap against a multiple of the period.
const MULTIPLE_TOLERANCE: f64 = 0.2;

/// Back-fills beats the onset detector missed.
#[derive(Debug, Clone, Copy)]
pub struct MissedBeatInterpolator {
    max_multiple: u32,
}

impl MissedBeatInterpolator {
    pub fn new(history_size: usize) -> Self {
        let max_multiple = u32::try_from(history_size / 2).unwrap_or(u32::MAX).max(2);
        Self { max_multiple }
    }

    /// Number of whole beats missed within a gap of `this_len` ms, if the gap
    /// is within tolerance of a multiple of `avg`. The smallest multiple wins.
    pub fn missed_beats(&self, avg: u32, this_len: u64) -> Option<u32> {
        if avg == 0 {
            return None;
        }

        let avg = f64::from(avg);
        let this_len = this_len as f64;
        (2..=self.max_multiple)
            .find(|&multiple| (avg * f64::from(multiple) - this_len).abs() < avg * MULTIPLE_TOLERANCE)
            .map(|multiple| multiple - 1)
    }

    /// Inserts one [`BeatKind::Guessed`] event per missed beat, oldest first,
    /// ending one period before `timestamp_ms`. Returns how many were added.
    pub fn fill(
        &self,
        history: &mut BeatHistory,
        avg: u32,
        timestamp_ms: u64,
        this_len: u64,
    ) -> u32 {
        let Some(missed) = self.missed_beats(avg, this_len) else {
            return 0;
        };

        let offset = i32::try_from(missed).unwrap_or(i32::MAX);
        for j in (1..=missed).rev() {
            let guessed = timestamp_ms.saturating_sub(u64::from(avg) * u64::from(j));
            history.insert(guessed, BeatKind::Guessed, offset);
        }
        missed
    }
}
