use crate::config::MAX_SANE_BPM;

/// Cycles outside the tempo range tolerated, beyond the first, before the
/// following cycle is corrected.
const HYSTERESIS_CYCLES: i32 = 4;

/// Action requested by the [`OctaveCorrector`] for the current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    None,
    /// Double the tempo. `off_course` is set when too many beats were
    /// discriminated rather than the tempo falling below range.
    Double { off_course: bool },
    Half,
    /// The estimate is nonsense; start over.
    Reset,
}

/// Catches half-rate and double-rate locks.
#[derive(Debug, Clone)]
pub struct OctaveCorrector {
    min_bpm: i32,
    max_bpm: i32,
    off_course_threshold: usize,
    half_count: i32,
    double_count: i32,
}

impl OctaveCorrector {
    pub fn new(min_bpm: i32, max_bpm: i32, history_size: usize) -> Self {
        Self {
            min_bpm,
            max_bpm,
            off_course_threshold: (history_size / 2).max(1),
            half_count: 0,
            double_count: 0,
        }
    }

    /// Consecutive cycles spent above the range.
    pub fn half_count(&self) -> i32 {
        self.half_count
    }

    /// Consecutive cycles spent below the range.
    pub fn double_count(&self) -> i32 {
        self.double_count
    }

    /// Inspects one cycle. `raw_bpm` is the unsmoothed estimate, `bpm` the
    /// displayed one and `discriminated` the number of recently rejected beats.
    pub fn evaluate(&mut self, raw_bpm: i32, bpm: i32, discriminated: usize, locked: bool) -> Correction {
        if raw_bpm > MAX_SANE_BPM || raw_bpm < 0 || bpm > MAX_SANE_BPM || bpm < 0 {
            self.reset();
            return Correction::Reset;
        }

        if discriminated >= self.off_course_threshold && bpm * 2 < self.max_bpm && !locked {
            self.reset();
            return Correction::Double { off_course: true };
        }

        if bpm < self.min_bpm {
            self.half_count = 0;
            if self.double_count > HYSTERESIS_CYCLES {
                self.double_count = 0;
                return Correction::Double { off_course: false };
            }
            self.double_count += 1;
        } else if bpm > self.max_bpm {
            self.double_count = 0;
            if self.half_count > HYSTERESIS_CYCLES {
                self.half_count = 0;
                return Correction::Half;
            }
            self.half_count += 1;
        } else {
            self.reset();
        }

        Correction::None
    }

    pub fn reset(&mut self) {
        self.half_count = 0;
        self.double_count = 0;
    }
}
