use crate::history::{BeatHistory, BeatKind};

/// Milliseconds per minute.
const MS_PER_MINUTE: f64 = 60_000.0;

/// Result of one estimation pass over the beat history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// Drift-refined average beat interval.
    pub avg_interval_ms: u32,
    /// Combined confidence, `0..=100`.
    pub confidence: i32,
    /// Share of real beats in the history, as a percentage.
    pub confidence1: i32,
    /// Interval regularity, as a percentage.
    pub confidence2: i32,
    /// Intervals that survived the drift filter.
    pub intervals_used: usize,
    /// Tempo, only once the history has been cycled enough to guess.
    pub bpm: Option<i32>,
}

/// Converts a beat interval to a rounded BPM. Zero intervals yield zero.
pub fn bpm_from_interval(interval_ms: u32) -> i32 {
    if interval_ms == 0 {
        return 0;
    }
    (MS_PER_MINUTE / f64::from(interval_ms)).round() as i32
}

/// Learns the beat period and its reliability from the history.
#[derive(Debug, Clone, Copy, Default)]
pub struct BpmEstimator;

impl BpmEstimator {
    /// Returns `None` until every history slot is filled or when the history
    /// holds no usable interval.
    pub fn estimate(history: &BeatHistory) -> Option<Estimate> {
        if !history.ready_to_learn() {
            return None;
        }

        let (count, sum, sum_sq, max_drift) = history.intervals().fold(
            (0usize, 0.0f64, 0.0f64, 0u64),
            |(count, sum, sum_sq, max), interval| {
                let v = interval as f64;
                (count + 1, sum + v, sum_sq + v * v, max.max(interval))
            },
        );
        if count == 0 {
            return None;
        }

        let mean = sum / count as f64;
        let real = history.count_kind(BeatKind::Real) as f64;
        let real_ratio = (real / history.capacity() as f64 * 2.0).min(1.0);

        // Rounding can push the variance slightly below zero.
        let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
        let typical_drift = variance.sqrt();
        let regularity = if max_drift == 0 {
            1.0
        } else {
            1.0 - typical_drift / max_drift as f64
        };

        let confidence = ((real_ratio * regularity * 100.0 - 50.0) * 2.0).clamp(0.0, 100.0) as i32;

        let (used, used_sum) = history
            .intervals()
            .filter(|&interval| (interval as f64 - mean).abs() <= typical_drift)
            .fold((0usize, 0.0f64), |(n, total), interval| (n + 1, total + interval as f64));
        let refined = if used > 0 { used_sum / used as f64 } else { mean };
        let avg_interval_ms = refined.round() as u32;

        let bpm = history
            .ready_to_guess()
            .then(|| bpm_from_interval(avg_interval_ms));

        Some(Estimate {
            avg_interval_ms,
            confidence,
            confidence1: (real_ratio * 100.0).round() as i32,
            confidence2: (regularity * 100.0).round() as i32,
            intervals_used: used,
            bpm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_from(timestamps: &[u64], kinds: &[BeatKind]) -> BeatHistory {
        let mut history = BeatHistory::new(timestamps.len());
        for (ts, kind) in timestamps.iter().zip(kinds) {
            history.insert(*ts, *kind, 0);
        }
        history
    }

    fn periodic(period: u64, count: usize) -> BeatHistory {
        let mut history = BeatHistory::new(8);
        for i in 0..count {
            history.insert(1000 + period * i as u64, BeatKind::Real, 0);
        }
        history
    }

    #[test]
    fn waits_for_a_full_history() {
        assert!(BpmEstimator::estimate(&periodic(500, 7)).is_none());
    }

    #[test]
    fn learns_before_it_guesses() {
        let estimate = BpmEstimator::estimate(&periodic(500, 8)).unwrap();
        assert_eq!(estimate.avg_interval_ms, 500);
        assert_eq!(estimate.bpm, None);

        let estimate = BpmEstimator::estimate(&periodic(500, 16)).unwrap();
        assert_eq!(estimate.bpm, Some(120));
    }

    #[test]
    fn perfect_periodic_input_is_fully_confident() {
        let estimate = BpmEstimator::estimate(&periodic(600, 16)).unwrap();

        assert_eq!(estimate.confidence, 100);
        assert_eq!(estimate.confidence1, 100);
        assert_eq!(estimate.confidence2, 100);
        assert_eq!(estimate.intervals_used, 7);
        assert_eq!(estimate.bpm, Some(100));
    }

    #[test]
    fn guessed_beats_lower_confidence() {
        use BeatKind::{Guessed, Real};
        let history = history_from(
            &[0, 500, 1000, 1500, 2000, 2500, 3000, 3500],
            &[Real, Guessed, Guessed, Guessed, Guessed, Guessed, Guessed, Real],
        );

        let estimate = BpmEstimator::estimate(&history).unwrap();
        assert_eq!(estimate.confidence1, 50);
        assert_eq!(estimate.confidence, 0);
    }

    #[test]
    fn outliers_are_dropped_from_the_refined_average() {
        use BeatKind::Real;
        let history = history_from(
            &[0, 500, 1000, 1500, 2000, 2500, 3000, 3900],
            &[Real; 8],
        );

        let estimate = BpmEstimator::estimate(&history).unwrap();
        assert_eq!(estimate.avg_interval_ms, 500);
        assert_eq!(estimate.intervals_used, 6);
        assert!(estimate.confidence < 100);
        assert!(estimate.confidence2 < 100);
    }

    #[test]
    fn skipped_intervals_are_not_measured() {
        use BeatKind::{Real, Skipped};
        let history = history_from(
            &[0, 400, 800, 1200, 9000, 9400, 9800, 10_200],
            &[Real, Real, Real, Real, Skipped, Real, Real, Real],
        );

        let estimate = BpmEstimator::estimate(&history).unwrap();
        assert_eq!(estimate.avg_interval_ms, 400);
        assert_eq!(estimate.confidence2, 100);
    }

    #[test]
    fn converts_intervals_to_bpm() {
        assert_eq!(bpm_from_interval(500), 120);
        assert_eq!(bpm_from_interval(517), 116);
        assert_eq!(bpm_from_interval(0), 0);
    }
}
