/// Length of one beat at `bpm`, rounded to the millisecond.
pub fn beat_period_ms(bpm: i32) -> Option<u64> {
    (bpm > 0).then(|| (60_000.0 / f64::from(bpm)).round() as u64)
}

/// Projects when the next beat is due from the last accepted beat.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeatPredictor;

impl BeatPredictor {
    pub fn predict_next_beat(last_beat_ms: Option<u64>, prediction_bpm: i32) -> Option<u64> {
        last_beat_ms?.checked_add(beat_period_ms(prediction_bpm)?)
    }
}
