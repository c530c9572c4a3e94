/// Below this displayed tempo the lower confidence threshold applies.
const LOW_TEMPO_BPM: i32 = 90;

/// Freezes the displayed tempo once confidence has held up for long enough.
#[derive(Debug, Clone)]
pub struct StickyLockController {
    enabled: bool,
    threshold_high: i32,
    threshold_low: i32,
    min_count: i32,
    qualifying: i32,
    locked: bool,
}

impl StickyLockController {
    pub fn new(enabled: bool, threshold_high: i32, threshold_low: i32, min_count: i32) -> Self {
        Self {
            enabled,
            threshold_high,
            threshold_low,
            min_count: min_count.max(1),
            qualifying: 0,
            locked: false,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn qualifying_count(&self) -> i32 {
        self.qualifying
    }

    /// Feeds one cycle in which the tempo changed. Returns `true` on the cycle
    /// that engages the lock.
    pub fn observe(&mut self, confidence: i32, prediction_bpm: i32) -> bool {
        if !self.enabled || self.locked {
            return false;
        }

        let threshold = if prediction_bpm < LOW_TEMPO_BPM {
            self.threshold_low
        } else {
            self.threshold_high
        };

        if confidence < threshold {
            self.qualifying = 0;
            return false;
        }

        self.qualifying += 1;
        if self.qualifying >= self.min_count {
            self.locked = true;
        }
        self.locked
    }

    pub fn reset(&mut self) {
        self.qualifying = 0;
        self.locked = false;
    }
}
